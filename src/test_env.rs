//! # Boot Self Tests
//!
//! Checks that only mean something on real (or emulated) hardware: the PIT
//! actually ticks, the sleeps line up with it, a software `int` reaches the
//! IRQ0 path, and the speaker leaves the keyboard line alone.
//!
//! Run after [`crate::init`] with interrupts enabled:
//!
//! ```text
//! let (passed, total) = chime::test_env::run_all();
//! ```

use core::arch::asm;

use crate::arch::{Cpu, HardwareCpu, InterruptGuard};
use crate::devices::sound::{Note, Song};
use crate::devices::{self, SPEAKER};
use crate::error::KernelError;
use crate::interrupts::interrupts::{PICS, TIMER};
use crate::interrupts::pic::InterruptIndex;
use crate::interrupts::{installed_irqs, sleep_busy};
use crate::println;

const FIRST_TICK_SPIN_LIMIT: u32 = 50_000_000;

type SelfTest = (&'static str, fn() -> Result<(), &'static str>);

const TESTS: [SelfTest; 5] = [
    ("timer ticks", test_timer_ticks),
    ("busy sleep accuracy", test_sleep_busy_accuracy),
    ("software timer vector", test_software_timer_vector),
    ("speaker keeps IRQ1 mask", test_speaker_preserves_keyboard_mask),
    ("IRQ consumers", test_installed_irqs),
];

/// Run every self test, print ✓/✗ per test, and return `(passed, total)`.
pub fn run_all() -> (usize, usize) {
    println!("Running boot self tests...");
    let mut passed = 0;
    for (name, test) in TESTS {
        match test() {
            Ok(()) => {
                passed += 1;
                println!("  ✓ {}", name);
            }
            Err(e) => println!("  ✗ {}: {}", name, e),
        }
    }
    println!("{}/{} self tests passed\n", passed, TESTS.len());
    (passed, TESTS.len())
}

fn test_timer_ticks() -> Result<(), &'static str> {
    let start = TIMER.ticks();
    for _ in 0..FIRST_TICK_SPIN_LIMIT {
        if TIMER.ticks() != start {
            return Ok(());
        }
        HardwareCpu.relax();
    }
    Err("tick counter never advanced")
}

fn test_sleep_busy_accuracy() -> Result<(), &'static str> {
    let expected = TIMER.ms_to_ticks(1000);
    let start = TIMER.ticks();
    sleep_busy(1000);
    let elapsed = TIMER.elapsed_since(start);

    if elapsed < expected {
        return Err("woke up early");
    }
    if elapsed > expected + 2 {
        return Err("overslept");
    }
    Ok(())
}

fn test_software_timer_vector() -> Result<(), &'static str> {
    let _guard = InterruptGuard::new(&HardwareCpu);
    let before = TIMER.ticks();
    // IRQ0 is masked by IF, so only the software interrupt can count
    unsafe { asm!("int 32") };
    let after = TIMER.ticks();

    if after.wrapping_sub(before) == 1 {
        Ok(())
    } else {
        Err("int 32 did not reach the timer handler")
    }
}

fn test_speaker_preserves_keyboard_mask() -> Result<(), &'static str> {
    const TONE: Song<'static> = Song::new("A4", &[Note::new(440, 100)]);

    let irq = InterruptIndex::Keyboard.irq();
    let was_masked = PICS.is_masked(irq).map_err(KernelError::as_str)?;
    PICS.set_mask(irq, true).map_err(KernelError::as_str)?;

    devices::play_song(&TONE);
    SPEAKER.silence();
    let still_masked = PICS.is_masked(irq).map_err(KernelError::as_str)?;

    PICS.set_mask(irq, was_masked).map_err(KernelError::as_str)?;
    if still_masked {
        Ok(())
    } else {
        Err("IRQ1 mask bit changed")
    }
}

fn test_installed_irqs() -> Result<(), &'static str> {
    let irqs = installed_irqs();
    if !irqs.contains(InterruptIndex::Timer.irq()) {
        return Err("no timer handler");
    }
    if !irqs.contains(InterruptIndex::Keyboard.irq()) {
        return Err("no keyboard handler");
    }
    Ok(())
}
