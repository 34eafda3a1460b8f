//! Device Drivers
//!
//! This module contains drivers for various hardware devices:
//! - PS/2 Keyboard (IRQ1)

pub mod ps2_keyboard;

pub use ps2_keyboard::{
    keyboard_interrupt_handler, process_scancode, Arrow, Key, Keyboard, KeyboardState,
};
