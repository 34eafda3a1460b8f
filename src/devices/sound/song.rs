//! Note/song data and the synchronous player.

use crate::arch::{Cpu, PortIo};
use crate::devices::sound::speaker::Speaker;
use crate::interrupts::timer::{Timer, PIT_BASE_FREQUENCY};

/// One tone, or a rest when `frequency_hz` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Note {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Note {
    pub const fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }

    pub const fn rest(duration_ms: u32) -> Self {
        Self::new(0, duration_ms)
    }

    pub const fn is_rest(&self) -> bool {
        self.frequency_hz == 0
    }

    /// Whether channel 2 can produce this pitch; anything else plays as a rest.
    pub const fn is_playable(&self) -> bool {
        self.frequency_hz > PIT_BASE_FREQUENCY / u16::MAX as u32
            && self.frequency_hz <= PIT_BASE_FREQUENCY
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Song<'a> {
    name: &'a str,
    notes: &'a [Note],
}

impl<'a> Song<'a> {
    pub const fn new(name: &'a str, notes: &'a [Note]) -> Self {
        Self { name, notes }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn notes(&self) -> &'a [Note] {
        self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Sum of note durations, without inter-note gaps.
    pub fn total_duration_ms(&self) -> u64 {
        self.notes.iter().map(|note| note.duration_ms as u64).sum()
    }
}

/// Plays songs through a [`Speaker`], timed by the tick counter.
pub struct SongPlayer<'a, P: PortIo, C: Cpu> {
    speaker: &'a Speaker<P, C>,
    timer: &'a Timer,
    gap_ms: u32,
}

impl<'a, P: PortIo, C: Cpu> SongPlayer<'a, P, C> {
    pub const fn new(speaker: &'a Speaker<P, C>, timer: &'a Timer, gap_ms: u32) -> Self {
        Self {
            speaker,
            timer,
            gap_ms,
        }
    }

    /// Play every note in order and return once the last one has finished.
    ///
    /// Blocks in `sti; hlt`, so interrupts must be live and IRQ0 unmasked.
    pub fn play(&self, song: &Song<'_>) {
        if song.is_empty() {
            return;
        }
        log::debug!("playing {} ({} ms)", song.name(), song.total_duration_ms());

        let cpu = self.speaker.cpu();
        for note in song.notes() {
            if note.is_playable() {
                self.speaker.play(note.frequency_hz);
            } else {
                self.speaker.silence();
            }
            self.timer.sleep_interrupt(cpu, note.duration_ms);

            self.speaker.silence();
            self.timer.sleep_interrupt(cpu, self.gap_ms);
        }
        self.speaker.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::sound::speaker::SPEAKER_PORT;
    use crate::testing::{MockCpu, MockPorts};
    use std::cell::RefCell;

    #[derive(Debug, Clone, Copy)]
    struct Sample {
        tick: u32,
        sounding: bool,
        divisor: Option<u16>,
    }

    #[test]
    fn test_song_timeline() {
        let timer = Timer::new(1000);
        let ports = MockPorts::new();
        let samples = RefCell::new(Vec::new());
        let speaker = Speaker::new(&ports, MockCpu::new());
        speaker.cpu().on_idle(|| {
            timer.on_tick();
            samples.borrow_mut().push(Sample {
                tick: timer.ticks(),
                sounding: ports.value(SPEAKER_PORT) & 0b10 != 0,
                divisor: ports.channel2_divisor(),
            });
        });

        let notes = [Note::new(440, 100), Note::rest(50), Note::new(880, 100)];
        let song = Song::new("test", &notes);
        SongPlayer::new(&speaker, &timer, 2).play(&song);

        // 250 ms of notes plus a 2 ms gap after each of the three
        assert_eq!(timer.ticks(), 256);
        assert!(timer.ticks() as u64 >= song.total_duration_ms());
        assert!(timer.ticks() as u64 <= song.total_duration_ms() + 2 * song.len() as u64);

        for sample in samples.borrow().iter() {
            match sample.tick {
                1..=100 => {
                    assert!(sample.sounding, "tick {}", sample.tick);
                    assert_eq!(sample.divisor, Some(2711));
                }
                101..=154 => assert!(!sample.sounding, "tick {}", sample.tick),
                155..=254 => {
                    assert!(sample.sounding, "tick {}", sample.tick);
                    assert_eq!(sample.divisor, Some(1355));
                }
                _ => assert!(!sample.sounding, "tick {}", sample.tick),
            }
        }
        assert_eq!(ports.value(SPEAKER_PORT) & 0b11, 0);
    }

    #[test]
    fn test_empty_song_returns_immediately() {
        let timer = Timer::new(1000);
        let ports = MockPorts::new();
        let speaker = Speaker::new(&ports, MockCpu::new());

        SongPlayer::new(&speaker, &timer, 2).play(&Song::new("silence", &[]));
        assert!(ports.writes().is_empty());
        assert_eq!(speaker.cpu().halt_count(), 0);
    }

    #[test]
    fn test_unplayable_note_is_silent() {
        let timer = Timer::new(1000);
        let ports = MockPorts::new();
        let speaker = Speaker::new(&ports, MockCpu::new());
        speaker.cpu().on_idle(|| timer.on_tick());

        let notes = [Note::new(5, 20), Note::new(5_000_000, 20)];
        SongPlayer::new(&speaker, &timer, 0).play(&Song::new("out of range", &notes));
        assert!(ports.writes_to(0x42).is_empty());
        assert_eq!(timer.ticks(), 40);
    }

    #[test]
    fn test_total_duration() {
        let notes = [Note::new(262, 300), Note::rest(200), Note::new(330, u32::MAX)];
        let song = Song::new("long", &notes);
        assert_eq!(song.total_duration_ms(), 500 + u32::MAX as u64);
        assert_eq!(song.name(), "long");
    }
}
