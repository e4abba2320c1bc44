//! The 32-bit memory bus.
//!
//! The bus owns every peripheral and the internal memory, decodes the
//! high bits of each address and dispatches byte-granular accesses to
//! the owning module; halfword and word accesses are decomposed into
//! byte accesses so every handler only deals with bytes.
//!
//! [`Bus::step`] advances the peripherals after each CPU instruction by
//! the instruction's cycle budget. DMA transfers run to completion in
//! here, between CPU instructions: a channel never interleaves with the
//! CPU, but the cycles it spends on the bus are forwarded to the LCD and
//! the timers so time keeps passing for them.

use std::collections::HashMap;

use logger::warning;

use crate::bitwise::Bits;
use crate::cpu::hardware::dma::{AddressControl, Dma, StartTiming};
use crate::cpu::hardware::internal_memory::InternalMemory;
use crate::cpu::hardware::interrupt_control::{Interrupt, InterruptControl};
use crate::cpu::hardware::keypad::{GbaButton, Keypad};
use crate::cpu::hardware::lcd::Lcd;
use crate::cpu::hardware::timers::Timers;

const TIMER_INTERRUPTS: [Interrupt; 4] = [
    Interrupt::Timer0,
    Interrupt::Timer1,
    Interrupt::Timer2,
    Interrupt::Timer3,
];

const DMA_INTERRUPTS: [Interrupt; 4] = [
    Interrupt::Dma0,
    Interrupt::Dma1,
    Interrupt::Dma2,
    Interrupt::Dma3,
];

#[derive(Default)]
pub struct Bus {
    pub internal_memory: InternalMemory,
    pub lcd: Lcd,
    pub dma: Dma,
    pub timers: Timers,
    pub keypad: Keypad,
    pub interrupt_control: InterruptControl,

    cycles_count: u128,
    unused_region: HashMap<usize, u8>,
}

impl Bus {
    pub fn with_memory(memory: InternalMemory) -> Self {
        Self {
            internal_memory: memory,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn cycles(&self) -> u128 {
        self.cycles_count
    }

    fn read_unused(&self, address: usize) -> u8 {
        warning(format!("read on unused memory {address:x}"));
        self.unused_region.get(&address).map_or(0, |v| *v)
    }

    fn write_unused(&mut self, address: usize, value: u8) {
        warning(format!("write on unused memory {address:x}"));
        self.unused_region.insert(address, value);
    }

    fn read_raw(&self, address: usize) -> u8 {
        match address {
            0x04000000..=0x0400005F => self.lcd.read_register(address),
            // Sound is not part of this core.
            0x04000060..=0x040000AF => self.read_unused(address),
            0x040000B0..=0x040000DF => self.dma.read_register(address),
            0x04000100..=0x0400010F => self.timers.read_register(address),
            0x04000130..=0x04000133 => self.keypad.read_register(address),
            // Serial sits in 0x120..0x12F and 0x134..0x1FF.
            0x040000E0..=0x040000FF | 0x04000110..=0x0400012F | 0x04000134..=0x040001FF => {
                self.read_unused(address)
            }
            0x04000200..=0x04000209 | 0x04000300..=0x04000301 => {
                self.interrupt_control.read_register(address)
            }
            0x0400020A..=0x040002FF | 0x04000302..=0x040003FF => self.read_unused(address),
            0x04000400..=0x04FFFFFF => self.read_unused(address),
            0x05000000..=0x050003FF => self.lcd.palette_ram[address - 0x05000000],
            0x05000400..=0x05FFFFFF => self.read_unused(address),
            0x06000000..=0x06017FFF => self.lcd.video_ram[address - 0x06000000],
            0x06018000..=0x06FFFFFF => self.read_unused(address),
            0x07000000..=0x070003FF => self.lcd.obj_attributes[address - 0x07000000],
            0x07000400..=0x07FFFFFF => self.read_unused(address),
            _ => self.internal_memory.read_at(address),
        }
    }

    fn write_raw(&mut self, address: usize, value: u8) {
        match address {
            0x04000000..=0x0400005F => self.lcd.write_register(address, value),
            0x04000060..=0x040000AF => self.write_unused(address, value),
            0x040000B0..=0x040000DF => self.dma.write_register(address, value),
            0x04000100..=0x0400010F => self.timers.write_register(address, value),
            0x04000130..=0x04000133 => self.keypad.write_register(address, value),
            0x040000E0..=0x040000FF | 0x04000110..=0x0400012F | 0x04000134..=0x040001FF => {
                self.write_unused(address, value);
            }
            0x04000200..=0x04000209 | 0x04000300..=0x04000301 => {
                self.interrupt_control.write_register(address, value);
            }
            0x0400020A..=0x040002FF | 0x04000302..=0x040003FF => {
                self.write_unused(address, value);
            }
            0x04000400..=0x04FFFFFF => self.write_unused(address, value),
            0x05000000..=0x050003FF => self.lcd.palette_ram[address - 0x05000000] = value,
            0x05000400..=0x05FFFFFF => self.write_unused(address, value),
            0x06000000..=0x06017FFF => self.lcd.video_ram[address - 0x06000000] = value,
            0x06018000..=0x06FFFFFF => self.write_unused(address, value),
            0x07000000..=0x070003FF => self.lcd.obj_attributes[address - 0x07000000] = value,
            0x07000400..=0x07FFFFFF => self.write_unused(address, value),
            _ => self.internal_memory.write_at(address, value),
        }
    }

    pub fn read_byte(&self, address: usize) -> u8 {
        self.read_raw(address)
    }

    pub fn write_byte(&mut self, address: usize, value: u8) {
        self.write_raw(address, value);
    }

    /// Read a halfword. The access is forced to halfword alignment; the
    /// LDRH rotation of a misaligned load is applied by the CPU, which is
    /// the only client that sees it.
    pub fn read_half_word(&self, address: usize) -> u16 {
        if address & 1 != 0 {
            warning(format!("read_half_word on unaligned address {address:x}"));
        }
        let aligned = address & !1;

        let part_0 = self.read_raw(aligned) as u16;
        let part_1 = self.read_raw(aligned + 1) as u16;

        (part_1 << 8) | part_0
    }

    pub fn write_half_word(&mut self, address: usize, value: u16) {
        // STRH forces halfword alignment.
        let aligned = address & !1;

        self.write_raw(aligned, value.get_byte(0));
        self.write_raw(aligned + 1, value.get_byte(1));
    }

    /// Read a word. A misaligned address reads the aligned word rotated
    /// right by `8 * (address & 3)` bits, which is what an ARM7TDMI LDR
    /// makes visible.
    pub fn read_word(&self, address: usize) -> u32 {
        let aligned = address & !3;

        let part_0 = self.read_raw(aligned) as u32;
        let part_1 = self.read_raw(aligned + 1) as u32;
        let part_2 = self.read_raw(aligned + 2) as u32;
        let part_3 = self.read_raw(aligned + 3) as u32;

        let value = (part_3 << 24) | (part_2 << 16) | (part_1 << 8) | part_0;
        value.rotate_right(8 * (address as u32 & 3))
    }

    pub fn write_word(&mut self, address: usize, value: u32) {
        // STR forces word alignment.
        let aligned = address & !3;

        self.write_raw(aligned, value.get_byte(0));
        self.write_raw(aligned + 1, value.get_byte(1));
        self.write_raw(aligned + 2, value.get_byte(2));
        self.write_raw(aligned + 3, value.get_byte(3));
    }

    /// Feed a host key event into the keypad and evaluate the KEYCNT
    /// interrupt condition.
    pub fn key_event(&mut self, button: GbaButton, pressed: bool) {
        self.keypad.set_button(button, pressed);
        if self.keypad.interrupt_requested() {
            self.interrupt_control.request(Interrupt::Keypad);
        }
    }

    /// Advance LCD, DMA and timers by `cycles`. Called by the
    /// orchestrator after every CPU step (and while the CPU is halted).
    pub fn step(&mut self, cycles: u32) {
        self.cycles_count += cycles as u128;

        // Immediate DMA whose startup delay elapses runs first; the CPU
        // is stalled for the copy, so its bus time is part of the budget
        // the other peripherals see.
        let budget = cycles + self.step_dma_startup(cycles);

        let lcd_output = self.lcd.step(budget);
        if lcd_output.request_vblank_irq {
            self.interrupt_control.request(Interrupt::VBlank);
        }
        if lcd_output.request_hblank_irq {
            self.interrupt_control.request(Interrupt::HBlank);
        }
        if lcd_output.request_vcount_irq {
            self.interrupt_control.request(Interrupt::VCount);
        }

        let mut blank_cycles = 0;
        if lcd_output.vblank_dma_pulse {
            blank_cycles += self.run_blank_dma(StartTiming::VBlank);
        }
        if lcd_output.hblank_dma_pulse {
            blank_cycles += self.run_blank_dma(StartTiming::HBlank);
        }

        let timers_output = self.timers.step(budget + blank_cycles);
        for (idx, requested) in timers_output.request_irq.into_iter().enumerate() {
            if requested {
                self.interrupt_control.request(TIMER_INTERRUPTS[idx]);
            }
        }
    }

    /// Count down the post-enable delay of immediate transfers and run
    /// the ones that become due. Returns the cycles spent copying.
    fn step_dma_startup(&mut self, cycles: u32) -> u32 {
        let mut spent = 0;

        for idx in 0..4 {
            let channel = &mut self.dma.channels[idx];
            if !channel.enabled || channel.startup_delay <= 0 {
                continue;
            }

            channel.startup_delay -= cycles as i32;
            if channel.startup_delay > 0 {
                continue;
            }
            channel.startup_delay = 0;

            spent += self.run_dma_transfer(idx);
        }

        spent
    }

    /// Release every armed channel waiting on the given blank pulse, in
    /// priority order (channel 0 first).
    fn run_blank_dma(&mut self, timing: StartTiming) -> u32 {
        let mut spent = 0;

        for idx in 0..4 {
            let channel = &self.dma.channels[idx];
            if channel.enabled && channel.armed && channel.start_timing == timing {
                spent += self.run_dma_transfer(idx);
            }
        }

        spent
    }

    /// Run one channel to completion. The DMA is atomic with respect to
    /// the CPU: the copy happens entirely between two CPU instructions.
    /// Returns the bus cycles consumed (one read plus one write per
    /// transferred unit).
    fn run_dma_transfer(&mut self, idx: usize) -> u32 {
        let channel = &self.dma.channels[idx];
        let mut source = channel.current_source;
        let mut destination = channel.current_destination;
        let count = channel.remaining;
        let transfer_32bit = channel.transfer_32bit;
        let source_control = channel.source_control;
        let destination_control = channel.destination_control;

        let unit: u32 = if transfer_32bit { 4 } else { 2 };

        for _ in 0..count {
            if transfer_32bit {
                let value = self.read_word(source as usize);
                self.write_word(destination as usize, value);
            } else {
                let value = self.read_half_word(source as usize);
                self.write_half_word(destination as usize, value);
            }

            destination = match destination_control {
                AddressControl::Increment | AddressControl::IncrementReload => {
                    destination.wrapping_add(unit)
                }
                AddressControl::Decrement => destination.wrapping_sub(unit),
                AddressControl::Fixed => destination,
            };
            source = match source_control {
                AddressControl::Increment => source.wrapping_add(unit),
                AddressControl::Decrement => source.wrapping_sub(unit),
                // Increment-reload is reserved for the destination;
                // a source programmed with it stays fixed.
                AddressControl::Fixed | AddressControl::IncrementReload => source,
            };
        }

        let channel = &mut self.dma.channels[idx];
        channel.current_source = source;
        channel.current_destination = destination;
        channel.remaining = 0;

        let irq = channel.irq_on_finish;
        if channel.repeat && channel.start_timing != StartTiming::Immediate {
            channel.reload_for_repeat();
            channel.armed = true;
        } else {
            channel.enabled = false;
            channel.armed = false;
        }

        if irq {
            self.interrupt_control.request(DMA_INTERRUPTS[idx]);
        }

        count * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lcd_reg() {
        let mut bus = Bus::default();
        let address = 0x04000008; // BG0CNT lower byte

        bus.write_raw(address, 10);

        assert_eq!(bus.lcd.bg_control[0], 10);

        let address = 0x04000009; // BG0CNT higher byte

        bus.write_raw(address, 5);
        assert_eq!(bus.lcd.bg_control[0], (5 << 8) | 10);
    }

    #[test]
    fn test_read_lcd_reg() {
        let mut bus = Bus::default();
        let address = 0x04000008;

        bus.lcd.bg_control[0] = (5 << 8) | 10;

        assert_eq!(bus.read_raw(address), 10);

        let address = 0x04000009;

        assert_eq!(bus.read_raw(address), 5);
    }

    #[test]
    fn test_write_timer_register() {
        let mut bus = Bus::default();
        let address = 0x04000100;

        bus.write_raw(address, 10);
        assert_eq!(bus.timers.timers[0].reload, 10);
    }

    #[test]
    fn test_read_timer_register() {
        let mut bus = Bus::default();
        let address = 0x04000100;

        bus.timers.timers[0].counter = (5 << 8) | 10;

        assert_eq!(bus.read_raw(address), 10);
    }

    #[test]
    fn ram_word_roundtrip() {
        let mut bus = Bus::default();

        for address in [0x02000000_usize, 0x03000000, 0x03007FFC] {
            bus.write_word(address, 0xDEAD_BEEF);
            assert_eq!(bus.read_word(address), 0xDEAD_BEEF);
        }
    }

    #[test]
    fn half_words_compose_a_word() {
        let mut bus = Bus::default();

        bus.write_half_word(0x02000000, 0x5678);
        bus.write_half_word(0x02000002, 0x1234);

        assert_eq!(bus.read_word(0x02000000), 0x1234_5678);
    }

    #[test]
    fn vram_and_palette_are_routed_to_the_lcd() {
        let mut bus = Bus::default();

        bus.write_half_word(0x05000000, 0x7FFF);
        assert_eq!(bus.lcd.palette_ram[0], 0xFF);
        assert_eq!(bus.lcd.palette_ram[1], 0x7F);

        bus.write_word(0x06000000, 0x01020304);
        assert_eq!(bus.lcd.video_ram[0], 0x04);
        assert_eq!(bus.lcd.video_ram[3], 0x01);

        bus.write_byte(0x07000001, 0xAA);
        assert_eq!(bus.lcd.obj_attributes[1], 0xAA);
    }

    #[test]
    fn misaligned_word_read_rotates() {
        let mut bus = Bus::default();
        bus.write_word(0x02000000, 0x1122_3344);

        // LDR from address+1 sees the aligned word rotated right by 8.
        assert_eq!(bus.read_word(0x02000001), 0x4411_2233);
        assert_eq!(bus.read_word(0x02000002), 0x3344_1122);
    }

    #[test]
    fn misaligned_word_write_is_aligned() {
        let mut bus = Bus::default();
        bus.write_word(0x02000002, 0xCAFE_BABE);

        assert_eq!(bus.read_word(0x02000000), 0xCAFE_BABE);
    }

    #[test]
    fn unused_io_is_remembered_and_logged() {
        let mut bus = Bus::default();
        assert_eq!(bus.read_byte(0x04000060), 0);

        bus.write_byte(0x04000060, 0x12);
        assert_eq!(bus.read_byte(0x04000060), 0x12);
    }

    fn program_dma0(bus: &mut Bus, control_high: u8) {
        // src = 0x02000000, dst = 0x03000000, 16 units of 32 bits.
        bus.write_word(0x040000B0, 0x0200_0000);
        bus.write_word(0x040000B4, 0x0300_0000);
        bus.write_half_word(0x040000B8, 16);
        bus.write_byte(0x040000BA, 0);
        bus.write_byte(0x040000BB, control_high);
    }

    #[test]
    fn dma_immediate_copies_after_two_cycles() {
        let mut bus = Bus::default();

        for i in 0..16u32 {
            bus.write_word(0x02000000 + i as usize * 4, 0x1111_0000 + i);
        }

        // 32-bit, immediate, IRQ on finish, enabled.
        program_dma0(&mut bus, 0b1100_0100);

        assert!(bus.dma.channels[0].enabled);

        bus.step(1);
        assert_eq!(bus.read_word(0x03000000), 0);

        bus.step(1);
        for i in 0..16u32 {
            assert_eq!(bus.read_word(0x03000000 + i as usize * 4), 0x1111_0000 + i);
        }

        // The channel disabled itself and the end IRQ is pending (bit 8).
        assert!(!bus.dma.channels[0].enabled);
        assert!(bus.interrupt_control.interrupt_request.get_bit(8));
    }

    #[test]
    fn dma_end_irq_only_when_enabled() {
        let mut bus = Bus::default();
        // Same transfer without the IRQ bit.
        program_dma0(&mut bus, 0b1000_0100);

        bus.step(2);
        assert!(!bus.interrupt_control.interrupt_request.get_bit(8));
    }

    #[test]
    fn dma_16bit_units_and_fixed_destination() {
        let mut bus = Bus::default();
        bus.write_half_word(0x02000000, 0xAAAA);
        bus.write_half_word(0x02000002, 0xBBBB);

        bus.write_word(0x040000B0, 0x0200_0000);
        bus.write_word(0x040000B4, 0x0300_0000);
        bus.write_half_word(0x040000B8, 2);
        // Destination fixed.
        bus.write_byte(0x040000BA, 0b0100_0000);
        // 16-bit, immediate, enabled.
        bus.write_byte(0x040000BB, 0b1000_0000);

        bus.step(2);

        // Both units landed on the same halfword.
        assert_eq!(bus.read_half_word(0x03000000), 0xBBBB);
        assert_eq!(bus.read_half_word(0x03000002), 0);
    }

    #[test]
    fn hblank_dma_waits_for_the_pulse() {
        let mut bus = Bus::default();
        bus.write_word(0x02000000, 0x1234_5678);

        bus.write_word(0x040000B0, 0x0200_0000);
        bus.write_word(0x040000B4, 0x0300_0000);
        bus.write_half_word(0x040000B8, 1);
        // 32-bit, HBlank timing, enabled.
        bus.write_byte(0x040000BB, 0b1010_0100);

        // Well past the immediate startup delay but before HBlank.
        bus.step(100);
        assert_eq!(bus.read_word(0x03000000), 0);

        // Cross the HBlank edge of scanline 0.
        bus.step(900);
        assert_eq!(bus.read_word(0x03000000), 0x1234_5678);
        assert!(!bus.dma.channels[0].enabled);
    }

    #[test]
    fn repeating_blank_dma_rearms() {
        let mut bus = Bus::default();
        bus.write_word(0x02000000, 0x0BAD_F00D);

        bus.write_word(0x040000B0, 0x0200_0000);
        bus.write_word(0x040000B4, 0x0300_0000);
        bus.write_half_word(0x040000B8, 1);
        // 32-bit, HBlank timing, repeat, fixed source, enabled.
        bus.write_byte(0x040000BB, 0b1010_0111);

        bus.step(960);
        assert_eq!(bus.read_word(0x03000000), 0x0BAD_F00D);
        assert!(bus.dma.channels[0].enabled);
        assert!(bus.dma.channels[0].armed);

        // The next line's HBlank runs it again, at the next destination.
        bus.step(1232);
        assert_eq!(bus.read_word(0x03000004), 0x0BAD_F00D);
    }

    #[test]
    fn keypad_event_raises_interrupt() {
        let mut bus = Bus::default();
        // Select A, enable keypad IRQ (OR mode).
        bus.write_byte(0x04000132, 0b1);
        bus.write_byte(0x04000133, 0x40);

        bus.key_event(GbaButton::B, true);
        assert!(!bus.interrupt_control.interrupt_request.get_bit(12));

        bus.key_event(GbaButton::A, true);
        assert!(bus.interrupt_control.interrupt_request.get_bit(12));
    }
}
