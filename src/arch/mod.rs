//! # Hardware Access Seams
//!
//! Every driver in the core talks to the machine through two small traits:
//!
//! - [`PortIo`]: byte-wide `in`/`out` on the x86 I/O port space
//! - [`Cpu`]: the interrupt flag, `sti; hlt`, and the spin-loop hint
//!
//! On the kernel target these are implemented by the zero-sized
//! [`HardwarePorts`] and [`HardwareCpu`]. Everything above this module is
//! generic over them, so the PIC, PIT, speaker and keyboard logic run unchanged
//! against the mocks in the unit tests.
//!
//! ## Critical Sections
//!
//! ```text
//! let _guard = InterruptGuard::new(&cpu); // cli, remembers IF
//! ... read-modify-write shared device state ...
//! // drop: sti only if IF was set on entry
//! ```

#[cfg(target_arch = "x86")]
pub mod stubs;
#[cfg(target_arch = "x86")]
pub mod x86;

#[cfg(target_arch = "x86")]
pub use self::x86::{HardwareCpu, HardwarePorts};

/// Byte access to the I/O port space.
pub trait PortIo {
    fn read_u8(&self, port: u16) -> u8;
    fn write_u8(&self, port: u16, value: u8);
}

impl<T: PortIo + ?Sized> PortIo for &T {
    fn read_u8(&self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn write_u8(&self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }
}

/// Interrupt-flag and idle control of the (single) CPU.
pub trait Cpu {
    /// Whether EFLAGS.IF is currently set.
    fn interrupts_enabled(&self) -> bool;
    fn disable_interrupts(&self);
    fn enable_interrupts(&self);
    /// `sti; hlt` as one sequence: the `sti` shadow guarantees a pending
    /// interrupt is taken after the `hlt` starts, so no wakeup is lost.
    fn enable_interrupts_and_halt(&self);
    /// Spin-loop hint (`pause`).
    fn relax(&self);
}

impl<T: Cpu + ?Sized> Cpu for &T {
    fn interrupts_enabled(&self) -> bool {
        (**self).interrupts_enabled()
    }

    fn disable_interrupts(&self) {
        (**self).disable_interrupts()
    }

    fn enable_interrupts(&self) {
        (**self).enable_interrupts()
    }

    fn enable_interrupts_and_halt(&self) {
        (**self).enable_interrupts_and_halt()
    }

    fn relax(&self) {
        (**self).relax()
    }
}

/// Masks interrupts for its lifetime and restores the previous IF on drop.
pub struct InterruptGuard<'a, C: Cpu + ?Sized> {
    cpu: &'a C,
    was_enabled: bool,
}

impl<'a, C: Cpu + ?Sized> InterruptGuard<'a, C> {
    pub fn new(cpu: &'a C) -> Self {
        let was_enabled = cpu.interrupts_enabled();
        if was_enabled {
            cpu.disable_interrupts();
        }
        Self { cpu, was_enabled }
    }
}

impl<C: Cpu + ?Sized> Drop for InterruptGuard<'_, C> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.cpu.enable_interrupts();
        }
    }
}

/// Run `f` with interrupts masked.
pub fn without_interrupts<C: Cpu + ?Sized, R>(cpu: &C, f: impl FnOnce() -> R) -> R {
    let _guard = InterruptGuard::new(cpu);
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCpu;

    #[test]
    fn test_guard_restores_enabled_flag() {
        let cpu = MockCpu::new();
        cpu.set_interrupts(true);
        {
            let _guard = InterruptGuard::new(&cpu);
            assert!(!cpu.interrupts_enabled());
        }
        assert!(cpu.interrupts_enabled());
        assert_eq!(cpu.disable_count(), 1);
    }

    #[test]
    fn test_guard_keeps_disabled_flag() {
        let cpu = MockCpu::new();
        cpu.set_interrupts(false);
        let value = without_interrupts(&cpu, || {
            assert!(!cpu.interrupts_enabled());
            7
        });
        assert_eq!(value, 7);
        assert!(!cpu.interrupts_enabled());
        assert_eq!(cpu.enable_count(), 0);
    }

    #[test]
    fn test_nested_guards() {
        let cpu = MockCpu::new();
        cpu.set_interrupts(true);
        without_interrupts(&cpu, || {
            without_interrupts(&cpu, || assert!(!cpu.interrupts_enabled()));
            // inner guard saw IF clear and must not re-enable
            assert!(!cpu.interrupts_enabled());
        });
        assert!(cpu.interrupts_enabled());
    }
}
