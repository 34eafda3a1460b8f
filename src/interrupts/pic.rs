//! # Programmable Interrupt Controller (8259 PIC)
//!
//! Configures the legacy 8259 PIC pair for interrupt routing.
//!
//! ## PIC Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   PIC 1     │     │   PIC 2     │
//! │  (Master)   │◀────│  (Slave)    │
//! │ IRQ 0-7     │IRQ2 │ IRQ 8-15    │
//! └─────────────┘     └─────────────┘
//!       │
//!       ▼
//!     CPU
//! ```
//!
//! ## Vector Remapping
//!
//! By default, IRQ 0-15 conflict with CPU exception vectors.
//! We remap them:
//! - PIC 1: vectors 32-39 (IRQ 0-7)
//! - PIC 2: vectors 40-47 (IRQ 8-15)
//!
//! ## Interrupt Assignments
//!
//! | IRQ | Vector | Device    |
//! |-----|--------|-----------|
//! | 0   | 32     | Timer     |
//! | 1   | 33     | Keyboard  |
//! | 2   | 34     | Cascade   |

use crate::arch::PortIo;
use crate::error::KernelError;

pub const PIC_1_OFFSET: u8 = 32; // Primary PIC handles IRQs 0-7
pub const PIC_2_OFFSET: u8 = 40; // Secondary PIC handles IRQs 8-15

pub const PIC1_COMMAND: u16 = 0x20;
pub const PIC1_DATA: u16 = 0x21;
pub const PIC2_COMMAND: u16 = 0xA0;
pub const PIC2_DATA: u16 = 0xA1;

const CMD_INIT: u8 = 0x11; // ICW1: edge triggered, cascade, ICW4 follows
const CMD_END_OF_INTERRUPT: u8 = 0x20;
const MODE_8086: u8 = 0x01;
const CASCADE_IRQ: u8 = 2;

/// Unused diagnostic port; a write gives the PIC time to settle between ICWs.
const IO_WAIT_PORT: u16 = 0x80;

// Interrupt indices - these are the actual vector numbers the CPU sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,        // 32 - IRQ0
    Keyboard = PIC_1_OFFSET + 1, // 33 - IRQ1
    Cascade = PIC_1_OFFSET + 2,  // 34 - IRQ2, never raised itself
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn irq(self) -> u8 {
        self.as_u8() - PIC_1_OFFSET
    }
}

/// The cascaded 8259A pair.
///
/// Holds no Rust-side state besides the vector offsets, so every operation
/// takes `&self` and the controller can live in a plain `static` that
/// interrupt handlers reach without a lock.
pub struct ChainedPics<P: PortIo> {
    ports: P,
    master_offset: u8,
    slave_offset: u8,
}

impl<P: PortIo> ChainedPics<P> {
    pub const fn new(ports: P, master_offset: u8, slave_offset: u8) -> Self {
        Self {
            ports,
            master_offset,
            slave_offset,
        }
    }

    fn io_wait(&self) {
        self.ports.write_u8(IO_WAIT_PORT, 0);
    }

    /// Run the ICW1..ICW4 sequence so IRQ 0-15 land on the configured
    /// offsets. The interrupt masks are preserved across the sequence.
    pub fn remap(&self) {
        let [master_mask, slave_mask] = self.read_masks();

        self.ports.write_u8(PIC1_COMMAND, CMD_INIT);
        self.io_wait();
        self.ports.write_u8(PIC2_COMMAND, CMD_INIT);
        self.io_wait();

        self.ports.write_u8(PIC1_DATA, self.master_offset);
        self.io_wait();
        self.ports.write_u8(PIC2_DATA, self.slave_offset);
        self.io_wait();

        // Master: slave sits on IRQ2 (bit mask). Slave: its cascade identity.
        self.ports.write_u8(PIC1_DATA, 1 << CASCADE_IRQ);
        self.io_wait();
        self.ports.write_u8(PIC2_DATA, CASCADE_IRQ);
        self.io_wait();

        self.ports.write_u8(PIC1_DATA, MODE_8086);
        self.io_wait();
        self.ports.write_u8(PIC2_DATA, MODE_8086);
        self.io_wait();

        self.write_masks(master_mask, slave_mask);
        log::debug!(
            "PIC remapped to {}/{} (masks {:#04x}/{:#04x})",
            self.master_offset,
            self.slave_offset,
            master_mask,
            slave_mask
        );
    }

    pub fn read_masks(&self) -> [u8; 2] {
        [self.ports.read_u8(PIC1_DATA), self.ports.read_u8(PIC2_DATA)]
    }

    pub fn write_masks(&self, master: u8, slave: u8) {
        self.ports.write_u8(PIC1_DATA, master);
        self.ports.write_u8(PIC2_DATA, slave);
    }

    fn mask_port(irq: u8) -> Result<(u16, u8), KernelError> {
        match irq {
            0..=7 => Ok((PIC1_DATA, 1 << irq)),
            8..=15 => Ok((PIC2_DATA, 1 << (irq - 8))),
            _ => Err(KernelError::IrqOutOfRange(irq)),
        }
    }

    /// Set (`masked = true`) or clear the mask bit of one IRQ line.
    pub fn set_mask(&self, irq: u8, masked: bool) -> Result<(), KernelError> {
        let (port, bit) = Self::mask_port(irq)?;
        let current = self.ports.read_u8(port);
        let next = if masked { current | bit } else { current & !bit };
        if next != current {
            self.ports.write_u8(port, next);
        }
        Ok(())
    }

    pub fn is_masked(&self, irq: u8) -> Result<bool, KernelError> {
        let (port, bit) = Self::mask_port(irq)?;
        Ok(self.ports.read_u8(port) & bit != 0)
    }

    /// Apply a full 16-bit mask set where bit `n` clear means IRQ `n` is live.
    pub fn apply_unmasked(&self, unmasked_irqs: u16) {
        let masks = !unmasked_irqs;
        self.write_masks(masks as u8, (masks >> 8) as u8);
    }

    fn handles_master(&self, vector: u8) -> bool {
        vector.wrapping_sub(self.master_offset) < 8
    }

    fn handles_slave(&self, vector: u8) -> bool {
        vector.wrapping_sub(self.slave_offset) < 8
    }

    /// Whether `vector` is one of the 16 remapped IRQ vectors.
    pub fn handles_vector(&self, vector: u8) -> bool {
        self.handles_master(vector) || self.handles_slave(vector)
    }

    /// Acknowledge `vector`: slave first when the line is on the slave chip,
    /// then always the master. Vectors outside the IRQ range are ignored.
    pub fn end_of_interrupt(&self, vector: u8) {
        if !self.handles_vector(vector) {
            return;
        }
        if self.handles_slave(vector) {
            self.ports.write_u8(PIC2_COMMAND, CMD_END_OF_INTERRUPT);
        }
        self.ports.write_u8(PIC1_COMMAND, CMD_END_OF_INTERRUPT);
    }
}
