//! Kernel error type.

use core::fmt;

/// Errors reported by configuration and registration calls.
///
/// Nothing in interrupt context returns these; failures there are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// IRQ line outside 0..=15.
    IrqOutOfRange(u8),
    /// Vector outside the 48 that have an entry stub.
    VectorUnavailable(u8),
    /// PIT cannot produce this rate (divisor would leave 1..=65535).
    FrequencyOutOfRange(u32),
    /// The PS/2 controller never became ready.
    ControllerTimeout,
}

impl KernelError {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IrqOutOfRange(_) => "IRQ line out of range",
            Self::VectorUnavailable(_) => "vector has no IDT gate",
            Self::FrequencyOutOfRange(_) => "timer frequency out of range",
            Self::ControllerTimeout => "PS/2 controller timeout",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IrqOutOfRange(irq) => write!(f, "{} ({})", self.as_str(), irq),
            Self::VectorUnavailable(vector) => write!(f, "{} ({})", self.as_str(), vector),
            Self::FrequencyOutOfRange(hz) => write!(f, "{} ({} Hz)", self.as_str(), hz),
            Self::ControllerTimeout => f.write_str(self.as_str()),
        }
    }
}
