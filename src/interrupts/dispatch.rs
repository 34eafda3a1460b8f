//! # Common Interrupt Dispatch
//!
//! Every stub funnels into [`Dispatcher::dispatch`]:
//!
//! ```text
//! stub ─▶ dispatch(frame)
//!           ├─ exception while another vector is in flight? ─▶ FaultInHandler
//!           ├─ registry.try_slot(vector)
//!           │    ├─ Installed ─▶ handler(frame, context)
//!           │    ├─ Empty     ─▶ log once
//!           │    └─ busy      ─▶ RegistryBusy (NMI or fault during an update)
//!           └─ vector in 32..48 ─▶ PIC EOI (slave first, then master)
//! ```
//!
//! The handler always runs before the EOI so it can read device registers
//! without a second delivery of the same IRQ racing it. Nothing here sets IF.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch::{Cpu, PortIo};
use crate::interrupts::exceptions::{self, is_exception};
use crate::interrupts::frame::InterruptFrame;
use crate::interrupts::pic::ChainedPics;
use crate::interrupts::registry::{HandlerRegistry, HandlerSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled,
    /// No handler installed. IRQs were still acknowledged.
    Unhandled,
    /// An exception fired while a handler was running; the handler was not
    /// invoked and the caller must treat it as fatal.
    FaultInHandler,
    /// The registry was mid-update when the vector fired. Nothing ran; fatal
    /// for exceptions, IRQs were still acknowledged.
    RegistryBusy,
}

pub struct Dispatcher {
    reported: [AtomicU32; 8],
    depth: AtomicU32,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self {
            reported: [const { AtomicU32::new(0) }; 8],
            depth: AtomicU32::new(0),
        }
    }

    /// True on the first call for `vector`, false afterwards.
    fn first_report(&self, vector: u8) -> bool {
        let bit = 1 << (vector % 32);
        self.reported[vector as usize / 32].fetch_or(bit, Ordering::Relaxed) & bit == 0
    }

    /// Vectors currently being serviced (0 in the foreground).
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn dispatch<C: Cpu, P: PortIo>(
        &self,
        frame: &mut InterruptFrame,
        registry: &HandlerRegistry<C>,
        pics: &ChainedPics<P>,
    ) -> DispatchOutcome {
        let vector = frame.vector();
        let nested = self.depth.fetch_add(1, Ordering::Acquire) > 0;

        let outcome = if nested && is_exception(vector) {
            DispatchOutcome::FaultInHandler
        } else {
            match registry.try_slot(vector) {
                None => DispatchOutcome::RegistryBusy,
                Some(HandlerSlot::Installed { handler, context }) => {
                    handler(frame, context);
                    DispatchOutcome::Handled
                }
                Some(HandlerSlot::Empty) => {
                    if self.first_report(vector) {
                        log::warn!(
                            "unhandled vector {} ({})",
                            vector,
                            exceptions::describe(vector)
                        );
                    }
                    DispatchOutcome::Unhandled
                }
            }
        };

        pics.end_of_interrupt(vector);
        self.depth.fetch_sub(1, Ordering::Release);
        outcome
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
