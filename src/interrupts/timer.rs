//! # System Timer (8253/8254 PIT)
//!
//! Channel 0 drives IRQ0 at the configured rate; every IRQ0 bumps a
//! monotonic 32-bit tick counter. Channel 2 is left to the PC speaker.
//!
//! ## Timer Resolution
//!
//! The PIT oscillator runs at 1 193 182 Hz. The channel 0 divisor is
//! `round(1_193_182 / tick_hz)`, so the canonical 1000 Hz setting loads 1193
//! and yields one tick per millisecond.
//!
//! ## Sleeping
//!
//! | Primitive          | Waits with   | Wakes on           |
//! |--------------------|--------------|--------------------|
//! | `sleep_busy`       | `pause` spin | every poll         |
//! | `sleep_interrupt`  | `sti; hlt`   | any interrupt      |
//!
//! Both convert milliseconds to ticks from the configured frequency and
//! compare with wrapping arithmetic, so a counter rollover mid-sleep is
//! harmless.

use core::sync::atomic::{AtomicU32, Ordering};

use bitfield_struct::bitfield;

use crate::arch::{Cpu, PortIo};
use crate::error::KernelError;
use crate::interrupts::frame::InterruptFrame;
use crate::interrupts::registry::HandlerContext;

pub const PIT_BASE_FREQUENCY: u32 = 1_193_182;

pub const PIT_CHANNEL0: u16 = 0x40;
pub const PIT_CHANNEL2: u16 = 0x42;
pub const PIT_COMMAND: u16 = 0x43;

/// Slowest rate whose rounded divisor still fits in 16 bits.
pub const MIN_TICK_HZ: u32 = 19;
pub const MAX_TICK_HZ: u32 = PIT_BASE_FREQUENCY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperatingMode {
    InterruptOnTerminalCount = 0b000,
    OneShot = 0b001,
    RateGenerator = 0b010,
    SquareWave = 0b011,
    SoftwareStrobe = 0b100,
    HardwareStrobe = 0b101,
}

impl OperatingMode {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        // 0b110 and 0b111 are hardware aliases of modes 2 and 3
        match value & 0b111 {
            0b000 => Self::InterruptOnTerminalCount,
            0b001 => Self::OneShot,
            0b010 | 0b110 => Self::RateGenerator,
            0b011 | 0b111 => Self::SquareWave,
            0b100 => Self::SoftwareStrobe,
            _ => Self::HardwareStrobe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessMode {
    LatchCount = 0b00,
    LowByte = 0b01,
    HighByte = 0b10,
    LowThenHigh = 0b11,
}

impl AccessMode {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::LatchCount,
            0b01 => Self::LowByte,
            0b10 => Self::HighByte,
            _ => Self::LowThenHigh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Channel {
    Zero = 0b00,
    One = 0b01,
    Two = 0b10,
    ReadBack = 0b11,
}

impl Channel {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Zero,
            0b01 => Self::One,
            0b10 => Self::Two,
            _ => Self::ReadBack,
        }
    }

    const fn data_port(self) -> u16 {
        PIT_CHANNEL0 + self as u16
    }
}

/// Byte written to the PIT command port.
#[bitfield(u8)]
pub struct ModeCommand {
    pub bcd: bool,
    #[bits(3)]
    pub mode: OperatingMode,
    #[bits(2)]
    pub access: AccessMode,
    #[bits(2)]
    pub channel: Channel,
}

impl ModeCommand {
    /// Binary, low-then-high, square wave on `channel`.
    pub const fn square_wave(channel: Channel) -> Self {
        Self::new()
            .with_bcd(false)
            .with_mode(OperatingMode::SquareWave)
            .with_access(AccessMode::LowThenHigh)
            .with_channel(channel)
    }
}

/// Rounded channel 0 divisor for a periodic rate.
pub fn channel0_divisor(frequency_hz: u32) -> Result<u16, KernelError> {
    if !(MIN_TICK_HZ..=MAX_TICK_HZ).contains(&frequency_hz) {
        return Err(KernelError::FrequencyOutOfRange(frequency_hz));
    }
    let divisor = (PIT_BASE_FREQUENCY + frequency_hz / 2) / frequency_hz;
    u16::try_from(divisor).map_err(|_| KernelError::FrequencyOutOfRange(frequency_hz))
}

/// Truncated channel 2 divisor for a tone, clamped to what the counter holds.
pub fn channel2_divisor(frequency_hz: u32) -> u16 {
    (PIT_BASE_FREQUENCY / frequency_hz.max(1)).clamp(1, u16::MAX as u32) as u16
}

/// Command/data port access to the PIT.
pub struct Pit<P: PortIo> {
    ports: P,
}

impl<P: PortIo> Pit<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    fn load(&self, command: ModeCommand, divisor: u16) {
        let [lo, hi] = divisor.to_le_bytes();
        let port = command.channel().data_port();
        self.ports.write_u8(PIT_COMMAND, command.into_bits());
        self.ports.write_u8(port, lo);
        self.ports.write_u8(port, hi);
    }

    /// Program channel 0 to fire IRQ0 at `frequency_hz`.
    pub fn start_periodic(&self, frequency_hz: u32) -> Result<u16, KernelError> {
        let divisor = channel0_divisor(frequency_hz)?;
        self.load(ModeCommand::square_wave(Channel::Zero), divisor);
        Ok(divisor)
    }

    /// Load a square-wave divisor into channel 2 (the speaker channel).
    pub fn load_channel2(&self, divisor: u16) {
        self.load(ModeCommand::square_wave(Channel::Two), divisor);
    }
}

/// Monotonic tick source fed by IRQ0.
pub struct Timer {
    ticks: AtomicU32,
    frequency_hz: AtomicU32,
}

impl Timer {
    pub const fn new(frequency_hz: u32) -> Self {
        Self {
            ticks: AtomicU32::new(0),
            frequency_hz: AtomicU32::new(frequency_hz),
        }
    }

    pub fn set_frequency(&self, frequency_hz: u32) {
        self.frequency_hz.store(frequency_hz, Ordering::Relaxed);
    }

    pub fn frequency(&self) -> u32 {
        self.frequency_hz.load(Ordering::Relaxed)
    }

    /// Called once per channel 0 period, from IRQ0 only.
    pub fn on_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Release);
    }

    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Ticks elapsed since `start`, correct across a counter wrap.
    pub fn elapsed_since(&self, start: u32) -> u32 {
        self.ticks().wrapping_sub(start)
    }

    /// Number of whole ticks covering `ms` milliseconds, rounded up.
    pub fn ms_to_ticks(&self, ms: u32) -> u32 {
        let hz = self.frequency().max(1) as u64;
        let ticks = (ms as u64 * hz).div_ceil(1000);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.ticks() as u64 * 1000 / self.frequency().max(1) as u64
    }

    /// Spin until `ms` worth of ticks have passed. Interrupts must be enabled.
    pub fn sleep_busy<C: Cpu + ?Sized>(&self, cpu: &C, ms: u32) {
        if ms == 0 {
            return;
        }
        let start = self.ticks();
        let target = self.ms_to_ticks(ms);
        while self.elapsed_since(start) < target {
            cpu.relax();
        }
    }

    /// Halt between interrupts until `ms` worth of ticks have passed.
    ///
    /// Any interrupt ends a `hlt`, so the tick count is rechecked after every
    /// wakeup. Leaves interrupts enabled.
    pub fn sleep_interrupt<C: Cpu + ?Sized>(&self, cpu: &C, ms: u32) {
        if ms == 0 {
            return;
        }
        let start = self.ticks();
        let target = self.ms_to_ticks(ms);
        while self.elapsed_since(start) < target {
            cpu.enable_interrupts_and_halt();
        }
    }

    #[cfg(test)]
    pub(crate) fn preset_ticks(&self, ticks: u32) {
        self.ticks.store(ticks, Ordering::Relaxed);
    }
}

/// IRQ0 consumer. `context` must point at a [`Timer`].
pub fn timer_interrupt_handler(_frame: &mut InterruptFrame, context: HandlerContext) {
    unsafe { context.get::<Timer>() }.on_tick();
}
