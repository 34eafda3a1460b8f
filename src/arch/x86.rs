//! 32-bit protected-mode implementations of the hardware seams.

use core::arch::asm;

use super::{Cpu, PortIo};

const EFLAGS_IF: u32 = 1 << 9;

/// Direct `in`/`out` instructions.
#[derive(Debug, Clone, Copy)]
pub struct HardwarePorts {
    _private: (),
}

impl HardwarePorts {
    /// # Safety
    ///
    /// Writes through this handle go straight to hardware. Callers must only
    /// hand it to drivers that own the ports they touch.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PortIo for HardwarePorts {
    #[inline]
    fn read_u8(&self, port: u16) -> u8 {
        unsafe { ::x86::io::inb(port) }
    }

    #[inline]
    fn write_u8(&self, port: u16, value: u8) {
        unsafe { ::x86::io::outb(port, value) }
    }
}

/// The boot CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareCpu;

impl HardwareCpu {
    #[inline]
    fn read_eflags() -> u32 {
        let flags: u32;
        unsafe {
            asm!("pushfd", "pop {}", out(reg) flags, options(preserves_flags));
        }
        flags
    }

    /// Mask interrupts and stop the CPU for good.
    pub fn halt_forever() -> ! {
        loop {
            unsafe {
                ::x86::irq::disable();
                ::x86::halt();
            }
        }
    }
}

impl Cpu for HardwareCpu {
    #[inline]
    fn interrupts_enabled(&self) -> bool {
        Self::read_eflags() & EFLAGS_IF != 0
    }

    #[inline]
    fn disable_interrupts(&self) {
        unsafe { ::x86::irq::disable() }
    }

    #[inline]
    fn enable_interrupts(&self) {
        unsafe { ::x86::irq::enable() }
    }

    #[inline]
    fn enable_interrupts_and_halt(&self) {
        unsafe {
            asm!("sti", "hlt", options(nomem, nostack));
        }
    }

    #[inline]
    fn relax(&self) {
        core::hint::spin_loop();
    }
}
