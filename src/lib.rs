//! # chime
//!
//! Interrupt and timing core for a 32-bit x86 kernel: PIC remapping, the IDT
//! and its entry stubs, a handler registry, the PIT tick and sleep primitives,
//! the PC speaker with a small song player, and a PS/2 keyboard feeding a
//! ring buffer.
//!
//! Everything touching hardware sits behind [`arch::PortIo`] and [`arch::Cpu`],
//! so the device logic builds and is unit tested on the host while the
//! statics, stubs and boot path only exist on `target_arch = "x86"`.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod data_structures;
pub mod devices;
pub mod error;
pub mod interrupts;
pub mod kernel;
pub mod logger;
#[cfg(target_arch = "x86")]
pub mod serial;
#[cfg(all(target_arch = "x86", target_os = "none"))]
pub mod test_env;
#[cfg(test)]
mod testing;

pub use config::KernelConfig;
pub use error::KernelError;

/// Initialize with [`KernelConfig::DEFAULT`].
#[cfg(target_arch = "x86")]
pub fn init() -> Result<(), &'static str> {
    init_with(&KernelConfig::DEFAULT)
}

#[cfg(target_arch = "x86")]
pub fn init_with(config: &KernelConfig) -> Result<(), &'static str> {
    kernel::init_kernel(config)
}
