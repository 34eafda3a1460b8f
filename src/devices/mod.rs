//! Device Subsystem
//!
//! Hardware device drivers and abstractions:
//! - `drivers`: PS/2 keyboard
//! - `sound`: PC speaker and song player

pub mod drivers;
pub mod sound;

#[cfg(target_arch = "x86")]
pub use self::hardware::*;

#[cfg(target_arch = "x86")]
mod hardware {
    use core::sync::atomic::{AtomicU32, Ordering};

    use crate::arch::{HardwareCpu, HardwarePorts};
    use crate::devices::drivers::Keyboard;
    use crate::devices::sound::{Song, SongPlayer, Speaker};
    use crate::interrupts::interrupts::TIMER;

    pub static KEYBOARD: Keyboard<HardwarePorts> = Keyboard::new(unsafe { HardwarePorts::new() });

    pub static SPEAKER: Speaker<HardwarePorts, HardwareCpu> =
        Speaker::new(unsafe { HardwarePorts::new() }, HardwareCpu);

    static NOTE_GAP_MS: AtomicU32 = AtomicU32::new(2);

    pub fn set_note_gap(ms: u32) {
        NOTE_GAP_MS.store(ms, Ordering::Relaxed);
    }

    pub fn song_player() -> SongPlayer<'static, HardwarePorts, HardwareCpu> {
        SongPlayer::new(&SPEAKER, &TIMER, NOTE_GAP_MS.load(Ordering::Relaxed))
    }

    pub fn play_song(song: &Song<'_>) {
        song_player().play(song);
    }
}
