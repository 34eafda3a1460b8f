//! # Interrupt Entry Stubs
//!
//! The CPU does not tell a handler which vector fired, so each of the 48
//! installed vectors gets its own tiny stub that records the vector number and
//! jumps to one shared entry sequence.
//!
//! ## Stack Layout Built by the Stubs
//!
//! ```text
//! high  ┌──────────────┐
//!       │ EFLAGS       │  pushed by CPU
//!       │ CS           │  pushed by CPU
//!       │ EIP          │  pushed by CPU
//!       │ error code   │  CPU (8, 10-14, 17, 21, 29, 30) or `push 0`
//!       │ vector       │  stub
//!       │ EAX .. EDI   │  pushad
//!       │ DS           │  common entry
//! low   └──────────────┘  <- &mut InterruptFrame
//! ```
//!
//! The common entry calls [`interrupt_entry`] with a pointer to that frame on
//! a 16-byte aligned stack, then unwinds it in reverse and returns with
//! `iretd`. EBX holds the frame pointer across the call; it is callee-saved
//! and `popad` restores the interrupted value. The gates are interrupt gates,
//! so IF is clear for the whole sequence.

use core::arch::global_asm;

use seq_macro::seq;

use crate::interrupts::interrupts::interrupt_entry;
use crate::interrupts::registry::VECTOR_COUNT;

/// Vectors covered by a stub: 32 exceptions plus 16 remapped IRQ lines.
pub const STUB_COUNT: usize = VECTOR_COUNT;

global_asm!(
    r#"
    .section .text

    .macro CHIME_STUB_NOERR vec
    .global chime_isr_stub_\vec
    chime_isr_stub_\vec:
        push 0
        push \vec
        jmp chime_interrupt_common
    .endm

    .macro CHIME_STUB_ERR vec
    .global chime_isr_stub_\vec
    chime_isr_stub_\vec:
        push \vec
        jmp chime_interrupt_common
    .endm

    chime_interrupt_common:
        pushad
        xor eax, eax
        mov ax, ds
        push eax
        cld
        mov ebx, esp
        and esp, -16
        sub esp, 12
        push ebx
        call {entry}
        mov esp, ebx
        pop eax
        mov ds, ax
        mov es, ax
        popad
        add esp, 8
        iretd

    CHIME_STUB_NOERR 0
    CHIME_STUB_NOERR 1
    CHIME_STUB_NOERR 2
    CHIME_STUB_NOERR 3
    CHIME_STUB_NOERR 4
    CHIME_STUB_NOERR 5
    CHIME_STUB_NOERR 6
    CHIME_STUB_NOERR 7
    CHIME_STUB_ERR   8
    CHIME_STUB_NOERR 9
    CHIME_STUB_ERR   10
    CHIME_STUB_ERR   11
    CHIME_STUB_ERR   12
    CHIME_STUB_ERR   13
    CHIME_STUB_ERR   14
    CHIME_STUB_NOERR 15
    CHIME_STUB_NOERR 16
    CHIME_STUB_ERR   17
    CHIME_STUB_NOERR 18
    CHIME_STUB_NOERR 19
    CHIME_STUB_NOERR 20
    CHIME_STUB_ERR   21
    CHIME_STUB_NOERR 22
    CHIME_STUB_NOERR 23
    CHIME_STUB_NOERR 24
    CHIME_STUB_NOERR 25
    CHIME_STUB_NOERR 26
    CHIME_STUB_NOERR 27
    CHIME_STUB_NOERR 28
    CHIME_STUB_ERR   29
    CHIME_STUB_ERR   30
    CHIME_STUB_NOERR 31

    CHIME_STUB_NOERR 32
    CHIME_STUB_NOERR 33
    CHIME_STUB_NOERR 34
    CHIME_STUB_NOERR 35
    CHIME_STUB_NOERR 36
    CHIME_STUB_NOERR 37
    CHIME_STUB_NOERR 38
    CHIME_STUB_NOERR 39
    CHIME_STUB_NOERR 40
    CHIME_STUB_NOERR 41
    CHIME_STUB_NOERR 42
    CHIME_STUB_NOERR 43
    CHIME_STUB_NOERR 44
    CHIME_STUB_NOERR 45
    CHIME_STUB_NOERR 46
    CHIME_STUB_NOERR 47
    "#,
    entry = sym interrupt_entry,
);

seq!(N in 0..48 {
    extern "C" {
        #(
            fn chime_isr_stub_~N();
        )*
    }

    /// Entry addresses, indexed by vector.
    pub static STUBS: [unsafe extern "C" fn(); STUB_COUNT] = [
        #(
            chime_isr_stub_~N,
        )*
    ];
});
