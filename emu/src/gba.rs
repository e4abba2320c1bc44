//! The top-level GBA system.
//!
//! `Gba` owns the CPU and the bus and runs the single-threaded
//! cooperative loop: one CPU instruction, then the LCD, DMA and timers
//! advance by the same cycle budget. There is no parallelism anywhere in
//! the core; the bus is borrowed mutably by the CPU and by the
//! peripherals in turn, never concurrently.

use crate::bus::Bus;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::hardware::internal_memory::InternalMemory;
use crate::cpu::hardware::keypad::GbaButton;
use crate::cpu::hardware::lcd::Color;

pub struct Gba {
    pub cpu: Arm7tdmi,
    pub bus: Bus,
}

impl Gba {
    /// Build a system around a cartridge image. With a BIOS the CPU
    /// starts at the reset vector in Supervisor mode; without one it
    /// starts directly at the cartridge entry the way the BIOS would
    /// leave it.
    pub fn new(bios: Option<[u8; 0x0000_4000]>, cartridge: Vec<u8>) -> Self {
        let (cpu, memory) = match bios {
            Some(bios) => (Arm7tdmi::default(), InternalMemory::new(bios, cartridge)),
            None => (
                Arm7tdmi::direct_boot(),
                InternalMemory::new([0; 0x0000_4000], cartridge),
            ),
        };

        Self {
            cpu,
            bus: Bus::with_memory(memory),
        }
    }

    /// Run one CPU instruction and bring the peripherals up to date.
    /// While halted only time advances, until the interrupt controller
    /// releases the latch.
    pub fn step(&mut self) {
        if self.bus.interrupt_control.halted() {
            self.bus.step(1);
            return;
        }

        let cycles = self.cpu.step(&mut self.bus);
        self.bus.step(cycles);
    }

    /// Feed a host key event into the keypad.
    pub fn key_event(&mut self, button: GbaButton, pressed: bool) {
        self.bus.key_event(button, pressed);
    }

    /// The 240x160 RGB15 framebuffer, for the host to present at VBlank.
    #[must_use]
    pub fn framebuffer(&self) -> &[[Color; 240]; 160] {
        &self.bus.lcd.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwise::Bits;
    use crate::cpu::cpu_modes::Mode;

    fn rom_with(words: &[u32]) -> Vec<u8> {
        let mut rom = Vec::new();
        for word in words {
            rom.extend_from_slice(&word.to_le_bytes());
        }
        rom
    }

    #[test]
    fn direct_boot_runs_from_the_cartridge() {
        // B +0 forever.
        let mut gba = Gba::new(None, rom_with(&[0xEA00_0000]));

        assert_eq!(gba.cpu.registers.program_counter(), 0x08000000);
        assert_eq!(gba.cpu.cpsr.mode(), Mode::System);

        for _ in 0..3 {
            gba.step();
        }

        assert_eq!(gba.cpu.registers.program_counter(), 0x08000008);
    }

    #[test]
    fn halt_advances_time_until_an_interrupt() {
        // Enable the timer 0 interrupt, start a fast timer, halt.
        let mut gba = Gba::new(None, rom_with(&[0xEA00_0000]));

        gba.bus.write_half_word(0x04000200, 1 << 3);
        gba.bus.write_half_word(0x04000100, 0xFF00);
        gba.bus.write_byte(0x04000102, 0xC0);
        gba.bus.write_byte(0x04000301, 0);

        assert!(gba.bus.interrupt_control.halted());

        // 0x100 timer ticks until the overflow; while halted each step is
        // one cycle.
        for _ in 0..0x100 {
            gba.step();
        }

        assert!(!gba.bus.interrupt_control.halted());
        assert!(gba.bus.interrupt_control.interrupt_request.get_bit(3));
    }

    #[test]
    fn vblank_interrupt_reaches_the_cpu() {
        // Spin on B +0 with VBlank enabled everywhere.
        let mut gba = Gba::new(None, rom_with(&[0xEA00_0000]));
        gba.cpu.cpsr.set_irq_disable(false);

        gba.bus.write_half_word(0x04000200, 1);
        gba.bus.write_half_word(0x04000208, 1);
        gba.bus.write_byte(0x04000004, 0x08);

        // A frame's VDraw period is 160 * 1232 cycles; each step feeds the
        // bus one cycle.
        for _ in 0..160 * 1232 {
            gba.step();
        }

        assert!(gba.bus.interrupt_control.interrupt_request.get_bit(0));
        assert!(gba.bus.interrupt_control.irq_line());

        // The CPU samples the line before its next instruction.
        gba.step();

        assert_eq!(gba.cpu.cpsr.mode(), Mode::Irq);
        assert_eq!(gba.cpu.registers.program_counter(), 0x18);
    }

    #[test]
    fn framebuffer_is_exposed() {
        let gba = Gba::new(None, rom_with(&[0xEA00_0000]));
        assert_eq!(gba.framebuffer().len(), 160);
        assert_eq!(gba.framebuffer()[0].len(), 240);
    }
}
