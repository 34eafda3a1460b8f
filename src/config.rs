//! Compile-time kernel configuration.

use crate::error::KernelError;
use crate::interrupts::timer::{MAX_TICK_HZ, MIN_TICK_HZ};

/// Knobs for [`crate::init_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// PIT channel 0 rate; 1000 Hz gives one tick per millisecond.
    pub tick_hz: u32,
    /// Silence inserted after every note so repeated pitches stay distinct.
    pub note_gap_ms: u32,
    /// IRQ lines left unmasked once init finishes (bit n = IRQ n).
    pub unmasked_irqs: u16,
}

impl KernelConfig {
    pub const DEFAULT: Self = Self {
        tick_hz: 1000,
        note_gap_ms: 2,
        // timer, keyboard, cascade
        unmasked_irqs: 0b0000_0000_0000_0111,
    };

    pub fn validate(&self) -> Result<(), KernelError> {
        if !(MIN_TICK_HZ..=MAX_TICK_HZ).contains(&self.tick_hz) {
            return Err(KernelError::FrequencyOutOfRange(self.tick_hz));
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
