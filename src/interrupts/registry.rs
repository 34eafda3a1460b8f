//! Vector-indexed handler table.
//!
//! Two views share one lock: a slot for each of the 48 vectors that have an
//! entry stub (exceptions 0-31, IRQs 32-47) and a 16-entry IRQ overlay that
//! mirrors vectors 32-47. `register_irq(n, ..)` is `register(32 + n, ..)`;
//! the overlay exists so the installed IRQ consumers can be enumerated.
//! Vectors without a gate cannot be registered.
//!
//! All writes run with interrupts disabled so the dispatcher can never observe
//! a handler and context from two different registrations. The dispatcher
//! itself never waits for the lock: NMIs and faults are not held off by `cli`,
//! and one arriving mid-update finds the table busy instead of spinning.

use spin::Mutex;

use crate::arch::{Cpu, InterruptGuard};
use crate::error::KernelError;
use crate::interrupts::frame::InterruptFrame;
use crate::interrupts::pic::PIC_1_OFFSET;

/// Vectors with an IDT gate, and therefore a slot.
pub const VECTOR_COUNT: usize = 48;
pub const IRQ_COUNT: usize = 16;

/// Signature every registered handler has.
pub type InterruptHandler = fn(&mut InterruptFrame, HandlerContext);

/// Opaque pointer handed back to a handler on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerContext(*const ());

// Only ever built from `&'static` references to `Sync` data.
unsafe impl Send for HandlerContext {}
unsafe impl Sync for HandlerContext {}

impl HandlerContext {
    pub const NONE: Self = Self(core::ptr::null());

    pub fn of<T: Sync>(value: &'static T) -> Self {
        Self(value as *const T as *const ())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_null()
    }

    /// # Safety
    ///
    /// The context must have been created by [`HandlerContext::of`] with a
    /// value of type `T`.
    pub unsafe fn get<T>(&self) -> &'static T {
        &*(self.0 as *const T)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerSlot {
    #[default]
    Empty,
    Installed {
        handler: InterruptHandler,
        context: HandlerContext,
    },
}

impl HandlerSlot {
    pub fn is_installed(&self) -> bool {
        matches!(self, HandlerSlot::Installed { .. })
    }
}

struct Tables {
    vectors: [HandlerSlot; VECTOR_COUNT],
    irqs: [HandlerSlot; IRQ_COUNT],
}

/// Set of IRQ lines, bit `n` for IRQ `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrqSet(u16);

impl IrqSet {
    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, irq: u8) -> bool {
        irq < 16 && self.0 & (1 << irq) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Iterator for IrqSet {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.0 == 0 {
            return None;
        }
        let irq = self.0.trailing_zeros() as u8;
        self.0 &= self.0 - 1;
        Some(irq)
    }
}

fn vector_for_irq(irq: u8) -> Result<u8, KernelError> {
    if irq as usize >= IRQ_COUNT {
        return Err(KernelError::IrqOutOfRange(irq));
    }
    Ok(PIC_1_OFFSET + irq)
}

fn irq_for_vector(vector: u8) -> Option<u8> {
    vector
        .checked_sub(PIC_1_OFFSET)
        .filter(|irq| (*irq as usize) < IRQ_COUNT)
}

pub struct HandlerRegistry<C: Cpu> {
    cpu: C,
    tables: Mutex<Tables>,
}

impl<C: Cpu> HandlerRegistry<C> {
    pub const fn new(cpu: C) -> Self {
        Self {
            cpu,
            tables: Mutex::new(Tables {
                vectors: [HandlerSlot::Empty; VECTOR_COUNT],
                irqs: [HandlerSlot::Empty; IRQ_COUNT],
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Tables)) {
        let _guard = InterruptGuard::new(&self.cpu);
        f(&mut self.tables.lock());
    }

    /// Foreground reads hold the lock with interrupts masked as well.
    fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let _guard = InterruptGuard::new(&self.cpu);
        f(&self.tables.lock())
    }

    fn store(&self, vector: u8, slot: HandlerSlot) -> Result<(), KernelError> {
        if vector as usize >= VECTOR_COUNT {
            return Err(KernelError::VectorUnavailable(vector));
        }
        self.update(|tables| {
            tables.vectors[vector as usize] = slot;
            if let Some(irq) = irq_for_vector(vector) {
                tables.irqs[irq as usize] = slot;
            }
        });
        Ok(())
    }

    /// Install `handler` for `vector`, replacing whatever was there.
    pub fn register(
        &self,
        vector: u8,
        handler: InterruptHandler,
        context: HandlerContext,
    ) -> Result<(), KernelError> {
        self.store(vector, HandlerSlot::Installed { handler, context })?;
        log::trace!("handler registered for vector {}", vector);
        Ok(())
    }

    /// Install `handler` for IRQ line `irq` (vector `32 + irq`).
    pub fn register_irq(
        &self,
        irq: u8,
        handler: InterruptHandler,
        context: HandlerContext,
    ) -> Result<(), KernelError> {
        self.register(vector_for_irq(irq)?, handler, context)
    }

    /// Clear `vector`; later deliveries take the unhandled path.
    pub fn unregister(&self, vector: u8) -> Result<(), KernelError> {
        self.store(vector, HandlerSlot::Empty)
    }

    pub fn unregister_irq(&self, irq: u8) -> Result<(), KernelError> {
        self.unregister(vector_for_irq(irq)?)
    }

    /// The slot for `vector`. Vectors without a gate are always empty.
    pub fn slot(&self, vector: u8) -> HandlerSlot {
        self.read(|tables| Self::lookup(tables, vector))
    }

    /// Interrupt-context lookup, copied out so the lock is not held while the
    /// handler runs. `None` when a foreground update holds the table.
    pub fn try_slot(&self, vector: u8) -> Option<HandlerSlot> {
        self.tables
            .try_lock()
            .map(|tables| Self::lookup(&tables, vector))
    }

    fn lookup(tables: &Tables, vector: u8) -> HandlerSlot {
        tables
            .vectors
            .get(vector as usize)
            .copied()
            .unwrap_or(HandlerSlot::Empty)
    }

    pub fn irq_slot(&self, irq: u8) -> Result<HandlerSlot, KernelError> {
        vector_for_irq(irq)?;
        Ok(self.read(|tables| tables.irqs[irq as usize]))
    }

    /// IRQ lines with an installed consumer.
    pub fn installed_irqs(&self) -> IrqSet {
        self.read(|tables| {
            let bits = (0..IRQ_COUNT)
                .filter(|irq| tables.irqs[*irq].is_installed())
                .fold(0u16, |bits, irq| bits | 1 << irq);
            IrqSet(bits)
        })
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    /// Hold the table lock as a foreground update would.
    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> impl Sized + '_ {
        self.tables.lock()
    }
}
