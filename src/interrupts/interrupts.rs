//! # Kernel Interrupt State
//!
//! The hardware-facing statics (PIC pair, handler registry, tick counter, IDT)
//! and the Rust entry every stub calls. The free functions here are the public
//! surface re-exported from [`crate::interrupts`].

use spin::Lazy;

use crate::arch::stubs::STUBS;
use crate::arch::{HardwareCpu, HardwarePorts};
use crate::error::KernelError;
use crate::interrupts::dispatch::{DispatchOutcome, Dispatcher};
use crate::interrupts::exceptions::{self, Exception, EXCEPTION_COUNT};
use crate::interrupts::frame::InterruptFrame;
use crate::interrupts::idt::Idt;
use crate::interrupts::pic::{ChainedPics, InterruptIndex, PIC_1_OFFSET, PIC_2_OFFSET};
use crate::interrupts::registry::{HandlerContext, HandlerRegistry, InterruptHandler, IrqSet};
use crate::interrupts::timer::{timer_interrupt_handler, Pit, Timer};
use crate::println;

pub static PICS: ChainedPics<HardwarePorts> =
    ChainedPics::new(unsafe { HardwarePorts::new() }, PIC_1_OFFSET, PIC_2_OFFSET);

pub static REGISTRY: HandlerRegistry<HardwareCpu> = HandlerRegistry::new(HardwareCpu);

pub static TIMER: Timer = Timer::new(1000);

static DISPATCHER: Dispatcher = Dispatcher::new();

static IDT: Lazy<Idt> = Lazy::new(|| {
    let selector = ::x86::segmentation::cs().bits();
    let mut idt = Idt::new();
    for (vector, stub) in STUBS.iter().enumerate() {
        idt.set_gate(vector as u8, *stub as usize as u32, selector);
    }
    idt
});

/// Called by the common stub with interrupts disabled.
pub extern "C" fn interrupt_entry(frame: &mut InterruptFrame) {
    match DISPATCHER.dispatch(frame, &REGISTRY, &PICS) {
        DispatchOutcome::Handled => {}
        DispatchOutcome::Unhandled if exceptions::is_exception(frame.vector()) => {
            fatal(frame, "no handler installed")
        }
        DispatchOutcome::Unhandled => {}
        DispatchOutcome::FaultInHandler => fatal(frame, "fault inside an interrupt handler"),
        DispatchOutcome::RegistryBusy if exceptions::is_exception(frame.vector()) => {
            fatal(frame, "raised during a handler registry update")
        }
        DispatchOutcome::RegistryBusy => {}
    }
}

fn fatal(frame: &InterruptFrame, reason: &str) -> ! {
    // the interrupted code may have been mid-println
    unsafe { crate::serial::force_unlock() };

    let vector = frame.vector();
    println!("EXCEPTION: {} ({})", exceptions::describe(vector), reason);
    if Exception::from_vector(vector) == Some(Exception::PageFault) {
        println!("Accessed Address: {:#010x}", unsafe { ::x86::controlregs::cr2() });
    }
    println!("{}", frame);
    HardwareCpu::halt_forever()
}

fn exception_handler(frame: &mut InterruptFrame, _context: HandlerContext) {
    fatal(frame, "unrecoverable")
}

fn breakpoint_handler(frame: &mut InterruptFrame, _context: HandlerContext) {
    println!("EXCEPTION: BREAKPOINT\n{}", frame);
}

pub fn remap_pics() {
    PICS.remap();
    // nothing is delivered until the final mask set is applied
    PICS.apply_unmasked(0);
}

pub fn load_idt() {
    IDT.load();
}

pub fn start_timer(frequency_hz: u32) -> Result<(), KernelError> {
    let divisor = Pit::new(unsafe { HardwarePorts::new() }).start_periodic(frequency_hz)?;
    TIMER.set_frequency(frequency_hz);
    log::info!("PIT channel 0 at {} Hz (divisor {})", frequency_hz, divisor);
    Ok(())
}

pub fn install_default_handlers() -> Result<(), KernelError> {
    for vector in 0..EXCEPTION_COUNT {
        let handler: InterruptHandler = match Exception::from_vector(vector) {
            Some(Exception::Breakpoint) => breakpoint_handler,
            _ => exception_handler,
        };
        REGISTRY.register(vector, handler, HandlerContext::NONE)?;
    }
    REGISTRY.register_irq(
        InterruptIndex::Timer.irq(),
        timer_interrupt_handler,
        HandlerContext::of(&TIMER),
    )
}

pub fn apply_irq_masks(unmasked_irqs: u16) {
    PICS.apply_unmasked(unmasked_irqs);
    log::debug!("IRQ masks {:#06x}", !unmasked_irqs);
}

/// Install `handler` on one of the 48 gated vectors.
pub fn register(
    vector: u8,
    handler: InterruptHandler,
    context: HandlerContext,
) -> Result<(), KernelError> {
    REGISTRY.register(vector, handler, context)
}

pub fn register_irq(
    irq: u8,
    handler: InterruptHandler,
    context: HandlerContext,
) -> Result<(), KernelError> {
    REGISTRY.register_irq(irq, handler, context)
}

pub fn unregister(vector: u8) -> Result<(), KernelError> {
    REGISTRY.unregister(vector)
}

pub fn installed_irqs() -> IrqSet {
    REGISTRY.installed_irqs()
}

pub fn ticks() -> u32 {
    TIMER.ticks()
}

pub fn uptime_ms() -> u64 {
    TIMER.uptime_ms()
}

pub fn sleep_busy(ms: u32) {
    TIMER.sleep_busy(&HardwareCpu, ms);
}

pub fn sleep_interrupt(ms: u32) {
    TIMER.sleep_interrupt(&HardwareCpu, ms);
}
