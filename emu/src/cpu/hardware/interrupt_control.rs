//! IE/IF/IME registers, the CPU IRQ line and the halt latch.
//!
//! Every peripheral funnels its interrupt requests through
//! [`InterruptControl::request`]. The CPU IRQ line is
//! `(IF & IE) != 0 && IME`; a pending enabled interrupt also releases a
//! halted CPU regardless of IME, which is what makes the BIOS `HALT`
//! wakeup work.

use logger::{error, warning};
use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// The 14 interrupt sources, by IF/IE bit position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    HBlank = 1,
    VCount = 2,
    Timer0 = 3,
    Timer1 = 4,
    Timer2 = 5,
    Timer3 = 6,
    Serial = 7,
    Dma0 = 8,
    Dma1 = 9,
    Dma2 = 10,
    Dma3 = 11,
    Keypad = 12,
    GamePak = 13,
}

#[derive(Default, Serialize, Deserialize)]
pub struct InterruptControl {
    /// Interrupt Enable (IE), 0x04000200.
    pub interrupt_enable: u16,
    /// Interrupt Request / Acknowledge (IF), 0x04000202. Write-1-to-clear.
    pub interrupt_request: u16,
    /// Interrupt Master Enable (IME), 0x04000208. Only bit 0 matters.
    pub interrupt_master_enable: u16,
    /// Post Boot Flag (POSTFLG), 0x04000300.
    pub post_boot_flag: u8,

    halted: bool,
    irq_line: bool,
}

impl InterruptControl {
    /// Set IF\[line\] and recompute the IRQ line and halt release.
    pub fn request(&mut self, interrupt: Interrupt) {
        self.interrupt_request.set_bit_on(interrupt as u8);
        self.update();
    }

    /// The line the CPU samples before each instruction.
    #[must_use]
    pub const fn irq_line(&self) -> bool {
        self.irq_line
    }

    #[must_use]
    pub const fn halted(&self) -> bool {
        self.halted
    }

    fn update(&mut self) {
        let pending = (self.interrupt_request & self.interrupt_enable) != 0;
        if pending {
            // HALT wakes on any enabled pending interrupt, IME or not.
            self.halted = false;
        }
        self.irq_line = pending && self.interrupt_master_enable.get_bit(0);
    }

    pub fn read_register(&self, address: usize) -> u8 {
        match address {
            0x04000200 => self.interrupt_enable.get_byte(0),
            0x04000201 => self.interrupt_enable.get_byte(1),
            0x04000202 => self.interrupt_request.get_byte(0),
            0x04000203 => self.interrupt_request.get_byte(1),
            0x04000208 => self.interrupt_master_enable.get_byte(0),
            0x04000209 => self.interrupt_master_enable.get_byte(1),
            0x04000300 => self.post_boot_flag,
            // HALTCNT is write-only.
            0x04000301 => 0,
            _ => {
                error(format!("read on unhandled control register {address:x}"));
                0
            }
        }
    }

    pub fn write_register(&mut self, address: usize, value: u8) {
        match address {
            0x04000200 => self.interrupt_enable.set_byte(0, value),
            0x04000201 => self.interrupt_enable.set_byte(1, value),
            // IF is acknowledge-on-write: every 1 bit written clears that bit.
            0x04000202 => self.interrupt_request &= !(value as u16),
            0x04000203 => self.interrupt_request &= !((value as u16) << 8),
            0x04000208 => self.interrupt_master_enable.set_byte(0, value),
            0x04000209 => self.interrupt_master_enable.set_byte(1, value),
            0x04000300 => self.post_boot_flag = value,
            0x04000301 => {
                if value & 0x80 != 0 {
                    warning("tried to enter STOP mode, not implemented");
                } else {
                    self.halted = true;
                }
            }
            _ => error(format!(
                "write on unhandled control register {address:x} = {value:#04X}"
            )),
        }
        self.update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_sets_flag_and_line() {
        let mut ic = InterruptControl::default();
        ic.write_register(0x04000200, 0b1); // IE: VBlank
        ic.write_register(0x04000208, 1); // IME

        assert!(!ic.irq_line());

        ic.request(Interrupt::VBlank);
        assert!(ic.irq_line());
        assert_eq!(ic.interrupt_request, 0b1);
    }

    #[test]
    fn ime_gates_the_line() {
        let mut ic = InterruptControl::default();
        ic.write_register(0x04000200, 0b1);
        ic.request(Interrupt::VBlank);

        assert!(!ic.irq_line());

        ic.write_register(0x04000208, 1);
        assert!(ic.irq_line());
    }

    #[test]
    fn interrupt_flags_are_write_1_to_clear() {
        let mut ic = InterruptControl::default();
        ic.request(Interrupt::VBlank);
        ic.request(Interrupt::Dma0);
        assert_eq!(ic.interrupt_request, 0x0101);

        // Acknowledge only DMA0.
        ic.write_register(0x04000203, 0x01);
        assert_eq!(ic.interrupt_request, 0x0001);

        ic.write_register(0x04000202, 0x01);
        assert_eq!(ic.interrupt_request, 0x0000);
    }

    #[test]
    fn halt_released_without_ime() {
        let mut ic = InterruptControl::default();
        ic.write_register(0x04000301, 0);
        assert!(ic.halted());

        // A masked interrupt does not wake the CPU.
        ic.request(Interrupt::Timer0);
        assert!(ic.halted());

        // Enabling it in IE does, even with IME off.
        ic.write_register(0x04000200, 1 << Interrupt::Timer0 as u8);
        assert!(!ic.halted());
        assert!(!ic.irq_line());
    }

    #[test]
    fn stop_is_diagnosed_not_entered() {
        let mut ic = InterruptControl::default();
        ic.write_register(0x04000301, 0x80);
        assert!(!ic.halted());
    }
}
