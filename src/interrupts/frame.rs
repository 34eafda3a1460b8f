//! Register frame shared between the assembly stubs and Rust handlers.

use core::fmt;

/// Saved machine state of an in-flight interrupt.
///
/// Field order is the stack layout the stubs build, lowest address first.
/// `useresp`/`ss` are only pushed by the CPU on a privilege change, which this
/// kernel never performs, so they are not part of the frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct InterruptFrame {
    pub ds: u32,
    // pushad order
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    // pushed by the CPU
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

const _: () = assert!(core::mem::size_of::<InterruptFrame>() == 14 * 4);

impl InterruptFrame {
    /// A blank frame for `vector`, used for software-raised dispatches.
    pub const fn for_vector(vector: u8) -> Self {
        Self {
            ds: 0,
            edi: 0,
            esi: 0,
            ebp: 0,
            esp: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            vector: vector as u32,
            error_code: 0,
            eip: 0,
            cs: 0,
            eflags: 0,
        }
    }

    pub fn vector(&self) -> u8 {
        (self.vector & 0xFF) as u8
    }
}

impl fmt::Display for InterruptFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vector={:#04x} error={:#010x}", self.vector, self.error_code)?;
        writeln!(
            f,
            "EAX={:#010x} EBX={:#010x} ECX={:#010x} EDX={:#010x}",
            self.eax, self.ebx, self.ecx, self.edx
        )?;
        writeln!(
            f,
            "ESI={:#010x} EDI={:#010x} EBP={:#010x} ESP={:#010x}",
            self.esi, self.edi, self.ebp, self.esp
        )?;
        write!(
            f,
            "EIP={:#010x} CS={:#06x} DS={:#06x} EFLAGS={:#010x}",
            self.eip, self.cs, self.ds, self.eflags
        )
    }
}
