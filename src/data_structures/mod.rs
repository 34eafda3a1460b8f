//! # Data Structures Module
//!
//! Fixed-size containers usable without a heap.
//!
//! ## Modules
//!
//! - `ring_buffer`: lock-free SPSC queue shared between an IRQ handler and
//!   the foreground

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
