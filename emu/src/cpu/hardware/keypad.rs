use logger::{error, warning};
use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// GBA button bit positions in KEYINPUT (active low: pressed = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GbaButton {
    A = 1 << 0,
    B = 1 << 1,
    Select = 1 << 2,
    Start = 1 << 3,
    Right = 1 << 4,
    Left = 1 << 5,
    Up = 1 << 6,
    Down = 1 << 7,
    R = 1 << 8,
    L = 1 << 9,
}

#[derive(Serialize, Deserialize)]
pub struct Keypad {
    /// KEYINPUT (0x04000130, read-only): 0 = pressed, 1 = released.
    pub key_input: u16,
    /// KEYCNT (0x04000132): selected buttons, IRQ enable (bit 14) and
    /// the AND/OR condition select (bit 15).
    pub key_interrupt_control: u16,
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Keypad {
    /// Create a new Keypad with all ten buttons released.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            key_input: 0x03FF,
            key_interrupt_control: 0,
        }
    }

    /// Set button state: pressed = true, released = false.
    pub fn set_button(&mut self, button: GbaButton, pressed: bool) {
        if pressed {
            self.key_input &= !(button as u16);
        } else {
            self.key_input |= button as u16;
        }
    }

    /// Evaluate the KEYCNT interrupt condition against the current key
    /// state. In OR mode any selected pressed button qualifies; in AND
    /// mode every selected button must be pressed.
    #[must_use]
    pub fn interrupt_requested(&self) -> bool {
        if !self.key_interrupt_control.get_bit(14) {
            return false;
        }

        let selected = self.key_interrupt_control.get_bits(0..=9);
        let pressed = !self.key_input & 0x03FF;

        if self.key_interrupt_control.get_bit(15) {
            // Logical AND
            selected != 0 && (pressed & selected) == selected
        } else {
            // Logical OR
            (pressed & selected) != 0
        }
    }

    pub fn read_register(&self, address: usize) -> u8 {
        match address {
            0x04000130 => self.key_input.get_byte(0),
            0x04000131 => self.key_input.get_byte(1),
            0x04000132 => self.key_interrupt_control.get_byte(0),
            0x04000133 => self.key_interrupt_control.get_byte(1),
            _ => {
                error(format!("read on unhandled keypad register {address:x}"));
                0
            }
        }
    }

    pub fn write_register(&mut self, address: usize, value: u8) {
        match address {
            0x04000130 | 0x04000131 => warning("tried to write KEYINPUT"),
            0x04000132 => self.key_interrupt_control.set_byte(0, value),
            // Bits 10-13 of KEYCNT are unused.
            0x04000133 => {
                self.key_interrupt_control =
                    (self.key_interrupt_control & 0x00FF) | (((value as u16) << 8) & 0xC300);
            }
            _ => error(format!(
                "write on unhandled keypad register {address:x} = {value:#04X}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_are_active_low() {
        let mut keypad = Keypad::new();
        assert_eq!(keypad.key_input, 0x03FF);

        keypad.set_button(GbaButton::A, true);
        assert_eq!(keypad.key_input, 0x03FE);

        keypad.set_button(GbaButton::A, false);
        assert_eq!(keypad.key_input, 0x03FF);
    }

    #[test]
    fn keyinput_is_read_only() {
        let mut keypad = Keypad::new();
        keypad.write_register(0x04000130, 0);
        assert_eq!(keypad.key_input, 0x03FF);
    }

    #[test]
    fn or_condition() {
        let mut keypad = Keypad::new();
        // Select A and B, enable the IRQ, OR mode.
        keypad.write_register(0x04000132, 0b11);
        keypad.write_register(0x04000133, 0x40);

        assert!(!keypad.interrupt_requested());

        keypad.set_button(GbaButton::B, true);
        assert!(keypad.interrupt_requested());
    }

    #[test]
    fn and_condition() {
        let mut keypad = Keypad::new();
        // Select A and B, enable the IRQ, AND mode.
        keypad.write_register(0x04000132, 0b11);
        keypad.write_register(0x04000133, 0xC0);

        keypad.set_button(GbaButton::A, true);
        assert!(!keypad.interrupt_requested());

        keypad.set_button(GbaButton::B, true);
        assert!(keypad.interrupt_requested());
    }

    #[test]
    fn irq_disable_masks_condition() {
        let mut keypad = Keypad::new();
        keypad.write_register(0x04000132, 0b11);

        keypad.set_button(GbaButton::A, true);
        assert!(!keypad.interrupt_requested());
    }
}
