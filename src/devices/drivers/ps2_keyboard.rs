//! # PS/2 Keyboard Driver
//!
//! Handles PS/2 keyboard input via IRQ1 interrupt.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    IRQ1     ┌──────────────────┐      ┌──────────────┐
//! │  Keyboard   │────────────▶│ process_scancode │─────▶│  Ring Buffer │
//! │  (Port 60)  │             │ - 0xE0 prefix    │ char │  (256 slots) │
//! └─────────────┘             │ - modifiers      │      └──────┬───────┘
//!                             │ - 4 layout tables│             │
//!                             └──────────────────┘             ▼
//!                                                   try_read / read_blocking
//! ```
//!
//! ## Scancode Processing (set 1)
//!
//! 1. `0xE0` arms the extended prefix and produces nothing
//! 2. Bit 7 marks a release; only modifier releases matter
//! 3. With the prefix armed, arrows become [`Key::Arrow`] and `E0 38` is AltGr
//! 4. Shift and AltGr are held, Caps Lock toggles
//! 5. Everything else goes through the table picked by (shifted, AltGr),
//!    then Enter/Backspace/Space/Tab
//!
//! Decoding happens in the IRQ handler so the buffer holds characters, not
//! raw scancodes. Arrows are buffered as private-use code points and turned
//! back into keys by [`Key::from_char`].

use spin::Mutex;

use crate::arch::{Cpu, PortIo};
use crate::data_structures::RingBuffer;
use crate::error::KernelError;
use crate::interrupts::frame::InterruptFrame;
use crate::interrupts::registry::HandlerContext;

pub const DATA_PORT: u16 = 0x60;
pub const STATUS_PORT: u16 = 0x64;
pub const COMMAND_PORT: u16 = 0x64;

const STATUS_OUTPUT_FULL: u8 = 1 << 0;
const STATUS_INPUT_FULL: u8 = 1 << 1;

const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CONFIG_PORT1_IRQ: u8 = 1 << 0;

const SPIN_LIMIT: u32 = 100_000;
const DRAIN_LIMIT: u32 = 32;

const BUFFER_SIZE: usize = 256;

const EXTENDED_PREFIX: u8 = 0xE0;
const RELEASE_BIT: u8 = 0x80;

const SC_BACKSPACE: u8 = 0x0E;
const SC_TAB: u8 = 0x0F;
const SC_ENTER: u8 = 0x1C;
const SC_LSHIFT: u8 = 0x2A;
const SC_RSHIFT: u8 = 0x36;
const SC_ALT: u8 = 0x38;
const SC_SPACE: u8 = 0x39;
const SC_CAPSLOCK: u8 = 0x3A;

const SC_UP: u8 = 0x48;
const SC_LEFT: u8 = 0x4B;
const SC_RIGHT: u8 = 0x4D;
const SC_DOWN: u8 = 0x50;

/// First code point used for arrow tokens in the character buffer.
const ARROW_BASE: u32 = 0xF700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardState {
    pub shift_down: bool,
    pub caps_lock: bool,
    pub altgr_down: bool,
    pub extended_prefix_pending: bool,
}

impl KeyboardState {
    pub const fn new() -> Self {
        Self {
            shift_down: false,
            caps_lock: false,
            altgr_down: false,
            extended_prefix_pending: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Arrow {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Arrow(Arrow),
}

impl Key {
    /// Buffer representation; arrows map to U+F700..=U+F703.
    pub fn to_char(self) -> char {
        match self {
            Key::Char(c) => c,
            Key::Arrow(arrow) => char::from_u32(ARROW_BASE + arrow as u32).unwrap_or('\0'),
        }
    }

    pub fn from_char(c: char) -> Self {
        match (c as u32).wrapping_sub(ARROW_BASE) {
            0 => Key::Arrow(Arrow::Up),
            1 => Key::Arrow(Arrow::Down),
            2 => Key::Arrow(Arrow::Left),
            3 => Key::Arrow(Arrow::Right),
            _ => Key::Char(c),
        }
    }
}

const TABLE_LEN: usize = 0x3A;

// Index = scancode. '\0' means no character.
#[rustfmt::skip]
static NORMAL: [char; TABLE_LEN] = [
    '\0', '\0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', '-', '=', '\0', '\0',
    'q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', '[', ']', '\0', '\0', 'a', 's',
    'd', 'f', 'g', 'h', 'j', 'k', 'l', ';', '\'', '`', '\0', '\\', 'z', 'x', 'c', 'v',
    'b', 'n', 'm', ',', '.', '/', '\0', '*', '\0', '\0',
];

#[rustfmt::skip]
static SHIFTED: [char; TABLE_LEN] = [
    '\0', '\0', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '_', '+', '\0', '\0',
    'Q', 'W', 'E', 'R', 'T', 'Y', 'U', 'I', 'O', 'P', '{', '}', '\0', '\0', 'A', 'S',
    'D', 'F', 'G', 'H', 'J', 'K', 'L', ':', '"', '~', '\0', '|', 'Z', 'X', 'C', 'V',
    'B', 'N', 'M', '<', '>', '?', '\0', '*', '\0', '\0',
];

// US-International AltGr layer
#[rustfmt::skip]
static ALTGR: [char; TABLE_LEN] = [
    '\0', '\0', '¡', '²', '³', '¤', '€', '¼', '½', '¾', '‘', '’', '¥', '×', '\0', '\0',
    'ä', 'å', 'é', '®', 'þ', 'ü', 'ú', 'í', 'ó', 'ö', '«', '»', '\0', '\0', 'á', 'ß',
    'ð', '\0', '\0', '\0', '\0', '\0', 'ø', '¶', '´', '¬', '\0', '¬', 'æ', '\0', '©', '\0',
    '\0', 'ñ', 'µ', 'ç', '\0', '¿', '\0', '\0', '\0', '\0',
];

#[rustfmt::skip]
static ALTGR_SHIFTED: [char; TABLE_LEN] = [
    '\0', '\0', '¹', '\0', '\0', '£', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '÷', '\0', '\0',
    'Ä', 'Å', 'É', '\0', 'Þ', 'Ü', 'Ú', 'Í', 'Ó', 'Ö', '\0', '\0', '\0', '\0', 'Á', '§',
    'Ð', '\0', '\0', '\0', '\0', '\0', 'Ø', '°', '¨', '\0', '\0', '¦', 'Æ', '\0', '¢', '\0',
    '\0', 'Ñ', '\0', 'Ç', '\0', '\0', '\0', '\0', '\0', '\0',
];

fn is_letter_key(code: u8) -> bool {
    matches!(code, 0x10..=0x19 | 0x1E..=0x26 | 0x2C..=0x32)
}

fn lookup(state: &KeyboardState, code: u8) -> Option<char> {
    // Caps Lock only affects letters
    let shifted = if is_letter_key(code) {
        state.shift_down ^ state.caps_lock
    } else {
        state.shift_down
    };
    let table = match (shifted, state.altgr_down) {
        (false, false) => &NORMAL,
        (true, false) => &SHIFTED,
        (false, true) => &ALTGR,
        (true, true) => &ALTGR_SHIFTED,
    };
    table.get(code as usize).copied().filter(|c| *c != '\0')
}

fn special_key(code: u8) -> Option<char> {
    match code {
        SC_ENTER => Some('\n'),
        SC_BACKSPACE => Some('\x08'),
        SC_SPACE => Some(' '),
        SC_TAB => Some('\t'),
        _ => None,
    }
}

fn extended_key(state: &mut KeyboardState, code: u8, released: bool) -> Option<Key> {
    if code == SC_ALT {
        state.altgr_down = !released;
        return None;
    }
    if released {
        return None;
    }
    match code {
        SC_UP => Some(Key::Arrow(Arrow::Up)),
        SC_DOWN => Some(Key::Arrow(Arrow::Down)),
        SC_LEFT => Some(Key::Arrow(Arrow::Left)),
        SC_RIGHT => Some(Key::Arrow(Arrow::Right)),
        // includes the fake shifts some keyboards wrap around extended keys
        _ => None,
    }
}

/// Decode one set-1 scancode, updating modifier state.
pub fn process_scancode(state: &mut KeyboardState, scancode: u8) -> Option<Key> {
    if scancode == EXTENDED_PREFIX {
        state.extended_prefix_pending = true;
        return None;
    }

    let released = scancode & RELEASE_BIT != 0;
    let code = scancode & !RELEASE_BIT;

    if core::mem::take(&mut state.extended_prefix_pending) {
        return extended_key(state, code, released);
    }

    if released {
        if matches!(code, SC_LSHIFT | SC_RSHIFT) {
            state.shift_down = false;
        }
        return None;
    }

    match code {
        SC_LSHIFT | SC_RSHIFT => {
            state.shift_down = true;
            None
        }
        SC_CAPSLOCK => {
            state.caps_lock = !state.caps_lock;
            None
        }
        _ => lookup(state, code).or_else(|| special_key(code)).map(Key::Char),
    }
}

pub struct Keyboard<P: PortIo> {
    ports: P,
    state: Mutex<KeyboardState>,
    buffer: RingBuffer<char, BUFFER_SIZE>,
}

impl<P: PortIo> Keyboard<P> {
    pub const fn new(ports: P) -> Self {
        Self {
            ports,
            state: Mutex::new(KeyboardState::new()),
            buffer: RingBuffer::new('\0'),
        }
    }

    fn wait_until(&self, ready: impl Fn(u8) -> bool) -> Result<(), KernelError> {
        for _ in 0..SPIN_LIMIT {
            if ready(self.ports.read_u8(STATUS_PORT)) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(KernelError::ControllerTimeout)
    }

    fn send_command(&self, command: u8) -> Result<(), KernelError> {
        self.wait_until(|status| status & STATUS_INPUT_FULL == 0)?;
        self.ports.write_u8(COMMAND_PORT, command);
        Ok(())
    }

    /// Flush stale output and make sure the controller raises IRQ1.
    pub fn init_controller(&self) -> Result<(), KernelError> {
        for _ in 0..DRAIN_LIMIT {
            if self.ports.read_u8(STATUS_PORT) & STATUS_OUTPUT_FULL == 0 {
                break;
            }
            self.ports.read_u8(DATA_PORT);
        }

        self.send_command(CMD_READ_CONFIG)?;
        self.wait_until(|status| status & STATUS_OUTPUT_FULL != 0)?;
        let config = self.ports.read_u8(DATA_PORT);

        self.send_command(CMD_WRITE_CONFIG)?;
        self.wait_until(|status| status & STATUS_INPUT_FULL == 0)?;
        self.ports.write_u8(DATA_PORT, config | CONFIG_PORT1_IRQ);

        log::debug!("PS/2 config {:#04x} -> {:#04x}", config, config | CONFIG_PORT1_IRQ);
        Ok(())
    }

    /// IRQ1 body: read the pending scancode and buffer what it decodes to.
    pub fn handle_interrupt(&self) -> Option<Key> {
        let scancode = self.ports.read_u8(DATA_PORT);
        self.handle_scancode(scancode)
    }

    pub fn handle_scancode(&self, scancode: u8) -> Option<Key> {
        let key = process_scancode(&mut self.state.lock(), scancode)?;
        if !self.buffer.push(key.to_char()) {
            log::trace!("keyboard buffer full, dropped {:?}", key);
        }
        Some(key)
    }

    pub fn try_read(&self) -> Option<char> {
        self.buffer.pop()
    }

    pub fn try_read_key(&self) -> Option<Key> {
        self.try_read().map(Key::from_char)
    }

    /// Halt until a character arrives. Leaves interrupts enabled.
    pub fn read_blocking<C: Cpu + ?Sized>(&self, cpu: &C) -> char {
        loop {
            if let Some(c) = self.try_read() {
                return c;
            }
            cpu.enable_interrupts_and_halt();
        }
    }

    pub fn clear(&self) {
        self.buffer.clear();
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Modifier snapshot, unless IRQ1 is mid-update.
    pub fn modifiers(&self) -> Option<KeyboardState> {
        self.state.try_lock().map(|state| *state)
    }
}

/// IRQ1 consumer. `context` must point at a `Keyboard<P>`.
pub fn keyboard_interrupt_handler<P: PortIo + 'static>(
    _frame: &mut InterruptFrame,
    context: HandlerContext,
) {
    unsafe { context.get::<Keyboard<P>>() }.handle_interrupt();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCpu, MockPorts};
    use std::cell::Cell;

    fn feed(keyboard: &Keyboard<&MockPorts>, scancodes: &[u8]) {
        for scancode in scancodes {
            keyboard.handle_scancode(*scancode);
        }
    }

    fn drain(keyboard: &Keyboard<&MockPorts>) -> String {
        core::iter::from_fn(|| keyboard.try_read()).collect()
    }

    #[test]
    fn test_shift_then_release() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        feed(&keyboard, &[0x2A, 0x1E, 0xAA, 0x30]);
        assert_eq!(keyboard.try_read(), Some('A'));
        assert_eq!(keyboard.try_read(), Some('b'));
        assert_eq!(keyboard.try_read(), None);
    }

    #[test]
    fn test_arrow_token() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        feed(&keyboard, &[0xE0, 0x48, 0xE0, 0xC8, 0x1F, 0x9F]);

        assert_eq!(keyboard.pending(), 2);
        assert_eq!(keyboard.try_read_key(), Some(Key::Arrow(Arrow::Up)));
        assert_eq!(keyboard.try_read_key(), Some(Key::Char('s')));
        assert_eq!(keyboard.try_read_key(), None);

        feed(&keyboard, &[0xE0, 0x48]);
        assert!(!keyboard.try_read().unwrap().is_ascii());
        assert!(!keyboard.modifiers().unwrap().extended_prefix_pending);
    }

    #[test]
    fn test_all_arrows() {
        let mut state = KeyboardState::new();
        let decoded: Vec<Option<Key>> = [0x48, 0x50, 0x4B, 0x4D]
            .iter()
            .map(|code| {
                process_scancode(&mut state, 0xE0);
                process_scancode(&mut state, *code)
            })
            .collect();
        assert_eq!(
            decoded,
            vec![
                Some(Key::Arrow(Arrow::Up)),
                Some(Key::Arrow(Arrow::Down)),
                Some(Key::Arrow(Arrow::Left)),
                Some(Key::Arrow(Arrow::Right)),
            ]
        );
        // without the prefix, 0x48 is keypad 8 and not in the tables
        assert_eq!(process_scancode(&mut state, 0x48), None);
    }

    #[test]
    fn test_caps_lock_only_shifts_letters() {
        let mut state = KeyboardState::new();
        process_scancode(&mut state, 0x3A);
        assert!(state.caps_lock);
        assert_eq!(process_scancode(&mut state, 0x10), Some(Key::Char('Q')));
        assert_eq!(process_scancode(&mut state, 0x02), Some(Key::Char('1')));

        // shift cancels caps for letters
        process_scancode(&mut state, 0x36);
        assert_eq!(process_scancode(&mut state, 0x10), Some(Key::Char('q')));
        assert_eq!(process_scancode(&mut state, 0x02), Some(Key::Char('!')));
        process_scancode(&mut state, 0xB6);

        process_scancode(&mut state, 0x3A);
        process_scancode(&mut state, 0xBA);
        assert!(!state.caps_lock);
    }

    #[test]
    fn test_altgr_layer() {
        let mut state = KeyboardState::new();
        feed_state(&mut state, &[0xE0, 0x38]);
        assert!(state.altgr_down);
        assert_eq!(process_scancode(&mut state, 0x12), Some(Key::Char('é')));
        assert_eq!(process_scancode(&mut state, 0x06), Some(Key::Char('€')));

        process_scancode(&mut state, 0x2A);
        assert_eq!(process_scancode(&mut state, 0x12), Some(Key::Char('É')));
        // nothing on the shifted AltGr layer for 'x'
        assert_eq!(process_scancode(&mut state, 0x2D), None);
        process_scancode(&mut state, 0xAA);

        feed_state(&mut state, &[0xE0, 0xB8]);
        assert!(!state.altgr_down);
        assert_eq!(process_scancode(&mut state, 0x12), Some(Key::Char('e')));

        // left Alt is not AltGr
        process_scancode(&mut state, 0x38);
        assert!(!state.altgr_down);
    }

    fn feed_state(state: &mut KeyboardState, scancodes: &[u8]) {
        for scancode in scancodes {
            process_scancode(state, *scancode);
        }
    }

    #[test]
    fn test_special_keys() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        feed(&keyboard, &[0x23, 0x17, 0x39, 0x0F, 0x0E, 0x1C]);
        assert_eq!(drain(&keyboard), "hi \t\x08\n");
    }

    #[test]
    fn test_unknown_and_release_codes_are_ignored() {
        let mut state = KeyboardState::new();
        for scancode in [0x00, 0x01, 0x1D, 0x3B, 0x58, 0x7F, 0x9E, 0xFF] {
            assert_eq!(process_scancode(&mut state, scancode), None, "{:#04x}", scancode);
        }
        assert_eq!(state, KeyboardState::new());

        // fake shift inside an extended sequence does not latch shift
        feed_state(&mut state, &[0xE0, 0x2A]);
        assert!(!state.shift_down);
    }

    #[test]
    fn test_full_buffer_drops_newest() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        for _ in 0..300 {
            keyboard.handle_scancode(0x1E);
        }
        keyboard.handle_scancode(0x30);
        assert_eq!(keyboard.pending(), BUFFER_SIZE - 1);

        let text = drain(&keyboard);
        assert_eq!(text.len(), BUFFER_SIZE - 1);
        assert!(text.chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_interrupt_reads_data_port() {
        let ports = MockPorts::new();
        ports.queue_input(DATA_PORT, &[0x2A, 0x23, 0xAA, 0x17]);
        let keyboard = Keyboard::new(&ports);
        for _ in 0..4 {
            keyboard.handle_interrupt();
        }
        assert_eq!(drain(&keyboard), "Hi");
    }

    #[test]
    fn test_clear() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        feed(&keyboard, &[0x1E, 0x30]);
        keyboard.clear();
        assert_eq!(keyboard.try_read(), None);
    }

    #[test]
    fn test_read_blocking_halts_until_input() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        let halts = Cell::new(0);
        let cpu = MockCpu::new();
        cpu.on_idle(|| {
            halts.set(halts.get() + 1);
            if halts.get() == 3 {
                keyboard.handle_scancode(0x2E);
            }
        });

        assert_eq!(keyboard.read_blocking(&cpu), 'c');
        assert_eq!(cpu.halt_count(), 3);
        assert!(cpu.interrupts_enabled());
    }

    #[test]
    fn test_init_controller_enables_irq1() {
        let ports = MockPorts::new();
        ports.queue_input(STATUS_PORT, &[0x01, 0x01]);
        ports.queue_input(DATA_PORT, &[0xFA, 0xAA]);
        ports.reply_to(COMMAND_PORT, CMD_READ_CONFIG, STATUS_PORT, &[STATUS_OUTPUT_FULL]);
        ports.reply_to(COMMAND_PORT, CMD_READ_CONFIG, DATA_PORT, &[0b0110_0100]);

        let keyboard = Keyboard::new(&ports);
        keyboard.init_controller().unwrap();

        assert_eq!(ports.writes_to(COMMAND_PORT), vec![0x20, 0x60]);
        assert_eq!(ports.writes_to(DATA_PORT), vec![0b0110_0101]);
    }

    #[test]
    fn test_init_controller_times_out() {
        let ports = MockPorts::new();
        let keyboard = Keyboard::new(&ports);
        assert_eq!(keyboard.init_controller(), Err(KernelError::ControllerTimeout));
    }
}
