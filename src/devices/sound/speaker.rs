//! # PC Speaker
//!
//! PIT channel 2 produces the square wave; port 0x61 connects it to the
//! speaker cone.
//!
//! ```text
//! port 0x61 (system control port B)
//!   bit 0  timer 2 gate   1 = channel 2 counts
//!   bit 1  speaker data   1 = channel 2 output reaches the speaker
//!   bits 2-7              other board functions, preserved
//! ```
//!
//! Every read-modify-write of 0x61 runs inside [`Speaker::with_locked_ports`]:
//! interrupts are masked for the duration and the keyboard's IRQ1 mask bit in
//! the master PIC is put back if the access disturbed it, which some firmware
//! and emulators do.

use bitfield_struct::bitfield;

use crate::arch::{Cpu, InterruptGuard, PortIo};
use crate::interrupts::pic::PIC1_DATA;
use crate::interrupts::timer::{channel2_divisor, Pit};

pub const SPEAKER_PORT: u16 = 0x61;

const KEYBOARD_IRQ_BIT: u8 = 1 << 1;

#[bitfield(u8)]
pub struct SystemControl {
    pub timer2_gate: bool,
    pub speaker_data: bool,
    #[bits(6)]
    pub other: u8,
}

pub struct Speaker<P: PortIo, C: Cpu> {
    ports: P,
    cpu: C,
}

impl<P: PortIo, C: Cpu> Speaker<P, C> {
    pub const fn new(ports: P, cpu: C) -> Self {
        Self { ports, cpu }
    }

    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    /// Run `f` with interrupts masked, restoring the IRQ1 mask bit afterwards.
    pub fn with_locked_ports<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        let _guard = InterruptGuard::new(&self.cpu);
        let keyboard_mask = self.ports.read_u8(PIC1_DATA) & KEYBOARD_IRQ_BIT;

        let result = f(&self.ports);

        let mask = self.ports.read_u8(PIC1_DATA);
        if mask & KEYBOARD_IRQ_BIT != keyboard_mask {
            self.ports
                .write_u8(PIC1_DATA, (mask & !KEYBOARD_IRQ_BIT) | keyboard_mask);
        }
        result
    }

    fn update_control(&self, f: impl FnOnce(SystemControl) -> SystemControl) {
        self.with_locked_ports(|ports| {
            let control = SystemControl::from_bits(ports.read_u8(SPEAKER_PORT));
            ports.write_u8(SPEAKER_PORT, f(control).into_bits());
        });
    }

    pub fn control(&self) -> SystemControl {
        SystemControl::from_bits(self.ports.read_u8(SPEAKER_PORT))
    }

    /// Start a square wave at `frequency_hz`; 0 silences instead.
    pub fn play(&self, frequency_hz: u32) {
        if frequency_hz == 0 {
            self.silence();
            return;
        }
        let divisor = channel2_divisor(frequency_hz);
        self.with_locked_ports(|ports| {
            Pit::new(ports).load_channel2(divisor);
            let control = SystemControl::from_bits(ports.read_u8(SPEAKER_PORT))
                .with_timer2_gate(true)
                .with_speaker_data(true);
            ports.write_u8(SPEAKER_PORT, control.into_bits());
        });
    }

    /// Disconnect the speaker but keep channel 2 running.
    pub fn silence(&self) {
        self.update_control(|control| control.with_speaker_data(false));
    }

    /// Disconnect the speaker and stop channel 2.
    pub fn disable(&self) {
        self.update_control(|control| control.with_speaker_data(false).with_timer2_gate(false));
    }

    pub fn is_sounding(&self) -> bool {
        let control = self.control();
        control.timer2_gate() && control.speaker_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCpu, MockPorts};

    #[test]
    fn test_play_programs_channel2() {
        let ports = MockPorts::new();
        let speaker = Speaker::new(&ports, MockCpu::new());
        speaker.play(440);

        let writes = ports.writes();
        assert_eq!(&writes[..3], &[(0x43, 0xB6), (0x42, 0x97), (0x42, 0x0A)]);
        assert_eq!(ports.channel2_divisor(), Some(2711));
        assert_eq!(ports.value(SPEAKER_PORT) & 0b11, 0b11);
        assert!(speaker.is_sounding());
    }

    #[test]
    fn test_rest_clears_data_keeps_gate() {
        let ports = MockPorts::new();
        let speaker = Speaker::new(&ports, MockCpu::new());

        ports.preset(SPEAKER_PORT, 0b0000_0011);
        speaker.play(0);
        assert_eq!(ports.value(SPEAKER_PORT), 0b0000_0001);

        ports.preset(SPEAKER_PORT, 0b0000_0000);
        speaker.play(0);
        assert_eq!(ports.value(SPEAKER_PORT), 0b0000_0000);
        // a rest never touches the PIT
        assert!(ports.writes_to(0x43).is_empty());
    }

    #[test]
    fn test_other_control_bits_preserved() {
        let ports = MockPorts::new();
        ports.preset(SPEAKER_PORT, 0b1010_0100);
        let speaker = Speaker::new(&ports, MockCpu::new());

        speaker.play(1000);
        assert_eq!(ports.value(SPEAKER_PORT), 0b1010_0111);
        speaker.silence();
        assert_eq!(ports.value(SPEAKER_PORT), 0b1010_0101);
        speaker.disable();
        assert_eq!(ports.value(SPEAKER_PORT), 0b1010_0100);
    }

    #[test]
    fn test_keyboard_mask_survives_firmware_quirk() {
        let ports = MockPorts::new();
        ports.enable_irq1_quirk();
        ports.preset(PIC1_DATA, 0b1111_1010);

        // the quirk really does flip IRQ1 on a raw write
        ports.write_u8(SPEAKER_PORT, 0);
        assert_eq!(ports.value(PIC1_DATA), 0b1111_1000);
        ports.preset(PIC1_DATA, 0b1111_1010);

        let speaker = Speaker::new(&ports, MockCpu::new());
        speaker.play(523);
        assert_eq!(ports.value(PIC1_DATA), 0b1111_1010);
        speaker.silence();
        assert_eq!(ports.value(PIC1_DATA), 0b1111_1010);
        speaker.disable();
        assert_eq!(ports.value(PIC1_DATA), 0b1111_1010);
    }

    #[test]
    fn test_unmasked_keyboard_stays_unmasked() {
        let ports = MockPorts::new();
        ports.enable_irq1_quirk();
        ports.preset(PIC1_DATA, 0b1111_1000);

        let speaker = Speaker::new(&ports, MockCpu::new());
        speaker.play(880);
        speaker.disable();
        assert_eq!(ports.value(PIC1_DATA), 0b1111_1000);
    }

    #[test]
    fn test_port_access_masks_interrupts() {
        let ports = MockPorts::new();
        let speaker = Speaker::new(&ports, MockCpu::new());
        speaker.play(440);
        speaker.silence();

        assert_eq!(speaker.cpu().disable_count(), 2);
        assert_eq!(speaker.cpu().enable_count(), 2);
        assert!(speaker.cpu().interrupts_enabled());

        speaker.cpu().set_interrupts(false);
        speaker.disable();
        assert!(!speaker.cpu().interrupts_enabled());
    }
}
