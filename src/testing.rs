//! Host-side stand-ins for the hardware seams.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};

use crate::arch::{Cpu, PortIo};

const IO_WAIT_PORT: u16 = 0x80;
const SPEAKER_PORT: u16 = 0x61;
const PIC1_DATA: u16 = 0x21;

#[derive(Default)]
struct PortState {
    latched: BTreeMap<u16, u8>,
    queued: BTreeMap<u16, VecDeque<u8>>,
    replies: Vec<(u16, u8, u16, Vec<u8>)>,
    writes: Vec<(u16, u8)>,
    irq1_quirk: bool,
}

/// Port space where every written byte is latched and read back, plus
/// per-port input queues that take priority over the latch.
#[derive(Default)]
pub struct MockPorts {
    state: RefCell<PortState>,
}

impl MockPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value a port reads back without logging a write.
    pub fn preset(&self, port: u16, value: u8) {
        self.state.borrow_mut().latched.insert(port, value);
    }

    /// Bytes returned, in order, by subsequent reads of `port`.
    pub fn queue_input(&self, port: u16, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .queued
            .entry(port)
            .or_default()
            .extend(bytes.iter().copied());
    }

    /// When `value` is written to `port`, queue `reply` on `reply_port`.
    pub fn reply_to(&self, port: u16, value: u8, reply_port: u16, reply: &[u8]) {
        self.state
            .borrow_mut()
            .replies
            .push((port, value, reply_port, reply.to_vec()));
    }

    /// Emulate firmware that flips the IRQ1 mask bit whenever port 0x61 is
    /// written.
    pub fn enable_irq1_quirk(&self) {
        self.state.borrow_mut().irq1_quirk = true;
    }

    pub fn value(&self, port: u16) -> u8 {
        self.state.borrow().latched.get(&port).copied().unwrap_or(0)
    }

    /// Logged writes, without the `io_wait` pokes at port 0x80.
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.state
            .borrow()
            .writes
            .iter()
            .copied()
            .filter(|(port, _)| *port != IO_WAIT_PORT)
            .collect()
    }

    pub fn writes_to(&self, port: u16) -> Vec<u8> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(p, _)| *p == port)
            .map(|(_, value)| *value)
            .collect()
    }

    /// Divisor last loaded into PIT channel 2 (low byte, then high byte).
    pub fn channel2_divisor(&self) -> Option<u16> {
        let bytes = self.writes_to(0x42);
        match bytes.as_slice() {
            [.., lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().writes.clear();
    }
}

impl PortIo for MockPorts {
    fn read_u8(&self, port: u16) -> u8 {
        let mut state = self.state.borrow_mut();
        if let Some(byte) = state.queued.get_mut(&port).and_then(VecDeque::pop_front) {
            return byte;
        }
        state.latched.get(&port).copied().unwrap_or(0)
    }

    fn write_u8(&self, port: u16, value: u8) {
        let mut state = self.state.borrow_mut();
        state.writes.push((port, value));
        state.latched.insert(port, value);

        let replies: Vec<(u16, Vec<u8>)> = state
            .replies
            .iter()
            .filter(|(p, v, _, _)| *p == port && *v == value)
            .map(|(_, _, reply_port, bytes)| (*reply_port, bytes.clone()))
            .collect();
        for (reply_port, bytes) in replies {
            state.queued.entry(reply_port).or_default().extend(bytes);
        }

        if state.irq1_quirk && port == SPEAKER_PORT {
            let mask = state.latched.get(&PIC1_DATA).copied().unwrap_or(0);
            state.latched.insert(PIC1_DATA, mask ^ 0x02);
        }
    }
}

/// CPU model with an idle hook that runs on every `hlt` and `pause`,
/// standing in for interrupts that arrive while the foreground waits.
pub struct MockCpu<'a> {
    enabled: Cell<bool>,
    disables: Cell<u32>,
    enables: Cell<u32>,
    halts: Cell<u32>,
    relaxes: Cell<u32>,
    idle: RefCell<Option<Box<dyn FnMut() + 'a>>>,
}

impl<'a> MockCpu<'a> {
    pub fn new() -> Self {
        Self {
            enabled: Cell::new(true),
            disables: Cell::new(0),
            enables: Cell::new(0),
            halts: Cell::new(0),
            relaxes: Cell::new(0),
            idle: RefCell::new(None),
        }
    }

    pub fn set_interrupts(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn on_idle(&self, hook: impl FnMut() + 'a) {
        *self.idle.borrow_mut() = Some(Box::new(hook));
    }

    pub fn disable_count(&self) -> u32 {
        self.disables.get()
    }

    pub fn enable_count(&self) -> u32 {
        self.enables.get()
    }

    pub fn halt_count(&self) -> u32 {
        self.halts.get()
    }

    pub fn relax_count(&self) -> u32 {
        self.relaxes.get()
    }

    fn run_idle(&self) {
        if let Some(hook) = self.idle.borrow_mut().as_mut() {
            hook();
        }
    }
}

impl Cpu for MockCpu<'_> {
    fn interrupts_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn disable_interrupts(&self) {
        self.disables.set(self.disables.get() + 1);
        self.enabled.set(false);
    }

    fn enable_interrupts(&self) {
        self.enables.set(self.enables.get() + 1);
        self.enabled.set(true);
    }

    fn enable_interrupts_and_halt(&self) {
        self.enabled.set(true);
        self.halts.set(self.halts.get() + 1);
        self.run_idle();
    }

    fn relax(&self) {
        self.relaxes.set(self.relaxes.get() + 1);
        self.run_idle();
    }
}
