//! 32-bit Interrupt Descriptor Table.

use bitfield_struct::bitfield;

pub const IDT_ENTRIES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GateType {
    Task = 0x5,
    Interrupt16 = 0x6,
    Trap16 = 0x7,
    Interrupt32 = 0xE,
    Trap32 = 0xF,
}

impl GateType {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        match value & 0xF {
            0x5 => Self::Task,
            0x6 => Self::Interrupt16,
            0x7 => Self::Trap16,
            0xF => Self::Trap32,
            _ => Self::Interrupt32,
        }
    }
}

/// Type/attribute byte of a gate descriptor.
#[bitfield(u8)]
pub struct GateOptions {
    #[bits(4)]
    pub gate_type: GateType,
    #[bits(1)]
    __: u8,
    #[bits(2)]
    pub dpl: u8,
    pub present: bool,
}

impl GateOptions {
    /// Present, DPL 0, 32-bit interrupt gate (IF cleared on entry).
    pub const fn kernel_interrupt() -> Self {
        Self::new()
            .with_gate_type(GateType::Interrupt32)
            .with_dpl(0)
            .with_present(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C, packed)]
pub struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    options: u8,
    offset_high: u16,
}

const _: () = assert!(core::mem::size_of::<IdtEntry>() == 8);

impl IdtEntry {
    pub const MISSING: Self = Self {
        offset_low: 0,
        selector: 0,
        zero: 0,
        options: 0,
        offset_high: 0,
    };

    pub const fn interrupt_gate(handler: u32, selector: u16) -> Self {
        Self {
            offset_low: handler as u16,
            selector,
            zero: 0,
            options: GateOptions::kernel_interrupt().into_bits(),
            offset_high: (handler >> 16) as u16,
        }
    }

    pub fn handler_address(&self) -> u32 {
        (self.offset_high as u32) << 16 | self.offset_low as u32
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn options(&self) -> GateOptions {
        GateOptions::from_bits(self.options)
    }

    pub fn is_present(&self) -> bool {
        self.options().present()
    }
}

#[repr(C, align(8))]
pub struct Idt {
    entries: [IdtEntry; IDT_ENTRIES],
}

impl Idt {
    /// Every entry not present.
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; IDT_ENTRIES],
        }
    }

    pub fn set_gate(&mut self, vector: u8, handler: u32, selector: u16) {
        self.entries[vector as usize] = IdtEntry::interrupt_gate(handler, selector);
    }

    pub fn entry(&self, vector: u8) -> &IdtEntry {
        &self.entries[vector as usize]
    }

    pub fn entries(&self) -> &[IdtEntry] {
        &self.entries
    }

    /// Publish the table to the CPU.
    #[cfg(target_arch = "x86")]
    pub fn load(&'static self) {
        use ::x86::dtables::{lidt, DescriptorTablePointer};

        let pointer = DescriptorTablePointer::new_from_slice(&self.entries);
        unsafe { lidt(&pointer) };
    }
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}
