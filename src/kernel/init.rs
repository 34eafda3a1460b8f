//! Kernel initialization phases

use crate::arch::{Cpu, HardwareCpu};
use crate::config::KernelConfig;
use crate::devices::{self, drivers::keyboard_interrupt_handler, KEYBOARD};
use crate::error::KernelError;
use crate::interrupts::interrupts as irq;
use crate::interrupts::pic::InterruptIndex;
use crate::interrupts::HandlerContext;
use crate::kernel::status::{
    all_components_ready, for_each_status, register_component, update_component_status,
    InitStatus,
};
use crate::{logger, println, serial};

const PHASES: [&str; 7] = [
    "Logger",
    "PIC",
    "IDT",
    "Timer",
    "Interrupt Handlers",
    "PS/2 Controller",
    "IRQ Masks",
];

/// Bring the interrupt core up in order and finish with `sti`.
pub fn init_kernel(config: &KernelConfig) -> Result<(), &'static str> {
    config.validate().map_err(KernelError::as_str)?;

    serial::init();
    for name in PHASES {
        register_component(name);
    }
    println!("╔════════════════════════════════════════╗");
    println!("║        chime kernel initialization     ║");
    println!("╚════════════════════════════════════════╝\n");

    init_phase(0, logger::init)?;
    init_phase(1, || {
        irq::remap_pics();
        Ok(())
    })?;
    init_phase(2, || {
        irq::load_idt();
        Ok(())
    })?;
    init_phase(3, || irq::start_timer(config.tick_hz).map_err(KernelError::as_str))?;
    init_phase(4, install_handlers)?;

    // a machine without a PS/2 controller still gets a working timer
    if let Err(e) = init_phase(5, || KEYBOARD.init_controller().map_err(KernelError::as_str)) {
        log::warn!("continuing without keyboard: {}", e);
    }

    devices::set_note_gap(config.note_gap_ms);
    init_phase(6, || {
        irq::apply_irq_masks(config.unmasked_irqs);
        Ok(())
    })?;

    HardwareCpu.enable_interrupts();
    print_summary();
    Ok(())
}

fn print_summary() {
    println!("Component status:");
    for_each_status(|component| println!("  {:<20} {}", component.name, component.status));

    let icon = if all_components_ready() { "✅" } else { "⚠️" };
    println!(
        "\n{} Kernel initialization complete! IRQ consumers: {:#06x}\n",
        icon,
        irq::installed_irqs().bits()
    );
}

fn install_handlers() -> Result<(), &'static str> {
    irq::install_default_handlers().map_err(KernelError::as_str)?;
    irq::register_irq(
        InterruptIndex::Keyboard.irq(),
        keyboard_interrupt_handler::<crate::arch::HardwarePorts>,
        HandlerContext::of(&KEYBOARD),
    )
    .map_err(KernelError::as_str)
}

fn init_phase(
    index: usize,
    init_fn: impl FnOnce() -> Result<(), &'static str>,
) -> Result<(), &'static str> {
    let name = PHASES[index];
    update_component_status(name, InitStatus::InProgress);
    println!("[{}/{}] Initializing {}...", index + 1, PHASES.len(), name);

    match init_fn() {
        Ok(()) => {
            update_component_status(name, InitStatus::Completed);
            println!("    ✓ {} initialized successfully\n", name);
            Ok(())
        }
        Err(e) => {
            update_component_status(name, InitStatus::Failed(e));
            println!("    ✗ {} failed: {}\n", name, e);
            Err(e)
        }
    }
}
