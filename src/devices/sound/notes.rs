//! Equal-tempered note frequencies (A4 = 440 Hz), rounded to whole hertz.

use super::song::{Note, Song};

pub const REST: u32 = 0;

pub const C3: u32 = 131;
pub const CS3: u32 = 139;
pub const D3: u32 = 147;
pub const DS3: u32 = 156;
pub const E3: u32 = 165;
pub const F3: u32 = 175;
pub const FS3: u32 = 185;
pub const G3: u32 = 196;
pub const GS3: u32 = 208;
pub const A3: u32 = 220;
pub const AS3: u32 = 233;
pub const B3: u32 = 247;

pub const C4: u32 = 262;
pub const CS4: u32 = 277;
pub const D4: u32 = 294;
pub const DS4: u32 = 311;
pub const E4: u32 = 330;
pub const F4: u32 = 349;
pub const FS4: u32 = 370;
pub const G4: u32 = 392;
pub const GS4: u32 = 415;
pub const A4: u32 = 440;
pub const AS4: u32 = 466;
pub const B4: u32 = 494;

pub const C5: u32 = 523;
pub const CS5: u32 = 554;
pub const D5: u32 = 587;
pub const DS5: u32 = 622;
pub const E5: u32 = 659;
pub const F5: u32 = 698;
pub const FS5: u32 = 740;
pub const G5: u32 = 784;
pub const GS5: u32 = 831;
pub const A5: u32 = 880;
pub const AS5: u32 = 932;
pub const B5: u32 = 988;

pub const C6: u32 = 1047;
pub const CS6: u32 = 1109;
pub const D6: u32 = 1175;
pub const DS6: u32 = 1245;
pub const E6: u32 = 1319;
pub const F6: u32 = 1397;
pub const FS6: u32 = 1480;
pub const G6: u32 = 1568;
pub const GS6: u32 = 1661;
pub const A6: u32 = 1760;
pub const AS6: u32 = 1865;
pub const B6: u32 = 1976;

pub const C7: u32 = 2093;

/// Frequency of MIDI note `note` (69 = A4).
pub fn midi_frequency(note: u8) -> u32 {
    let semitones = note as f64 - 69.0;
    libm::round(440.0 * libm::pow(2.0, semitones / 12.0)) as u32
}

const QUARTER: u32 = 250;

pub static BOOT_CHIME: Song<'static> = Song::new(
    "boot chime",
    &[
        Note::new(C5, 80),
        Note::new(E5, 80),
        Note::new(G5, 80),
        Note::new(C6, 160),
    ],
);

pub static ODE_TO_JOY: Song<'static> = Song::new(
    "Ode to Joy",
    &[
        Note::new(E4, QUARTER),
        Note::new(E4, QUARTER),
        Note::new(F4, QUARTER),
        Note::new(G4, QUARTER),
        Note::new(G4, QUARTER),
        Note::new(F4, QUARTER),
        Note::new(E4, QUARTER),
        Note::new(D4, QUARTER),
        Note::new(C4, QUARTER),
        Note::new(C4, QUARTER),
        Note::new(D4, QUARTER),
        Note::new(E4, QUARTER),
        Note::new(E4, QUARTER * 3 / 2),
        Note::new(D4, QUARTER / 2),
        Note::new(D4, QUARTER * 2),
        Note::rest(QUARTER),
    ],
);
