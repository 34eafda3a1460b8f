//! # Interrupt Handling Module
//!
//! Provides the interrupt infrastructure for the kernel:
//!
//! - **IDT**: 256 gates, 48 of them pointing at the per-vector entry stubs
//! - **PIC**: 8259 remapping, masks and end-of-interrupt
//! - **Registry**: `(handler, context)` slot per vector with an IRQ overlay
//! - **Dispatch**: the one Rust entry every stub calls
//! - **Timer**: PIT channel 0 tick counter and the sleep primitives
//!
//! ## Interrupt Vector Layout
//!
//! | Vector | Type                   | Handler                    |
//! |--------|------------------------|----------------------------|
//! | 0-31   | CPU Exceptions         | fatal dump, #BP continues  |
//! | 32     | Timer (IRQ0)           | timer_interrupt_handler    |
//! | 33     | Keyboard (IRQ1)        | keyboard_interrupt_handler |
//! | 34-47  | Remaining IRQ lines    | unhandled unless registered|
//! | 48-255 | Free                   | no stub installed          |
//!
//! ## Usage
//!
//! ```ignore
//! fn on_mouse(frame: &mut InterruptFrame, context: HandlerContext) { /* ... */ }
//!
//! chime::interrupts::register_irq(12, on_mouse, HandlerContext::NONE)?;
//! ```

pub mod dispatch;
pub mod exceptions;
pub mod frame;
pub mod idt;
#[cfg(target_arch = "x86")]
#[allow(clippy::module_inception)]
pub mod interrupts;
pub mod pic;
pub mod registry;
pub mod timer;

#[cfg(target_arch = "x86")]
pub use self::interrupts::{
    installed_irqs, register, register_irq, sleep_busy, sleep_interrupt, ticks, unregister,
    uptime_ms,
};
pub use frame::InterruptFrame;
pub use registry::{HandlerContext, InterruptHandler};
