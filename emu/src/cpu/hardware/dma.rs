//! The four DMA channels: register containers, enable-edge latching and
//! trigger bookkeeping.
//!
//! A channel holds both the programmed registers (what the game wrote)
//! and latched counters (what the running transfer consumes). The copy
//! loop itself lives in [`Bus`](crate::bus::Bus) since it has to drive
//! reads and writes across the whole address space; this module only
//! decides *when* a channel becomes runnable.

use logger::{error, important};
use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// Destination/source address adjustment (control bits 5-6 / 7-8).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressControl {
    Increment = 0,
    Decrement = 1,
    Fixed = 2,
    /// Increment during the transfer, reload on repeat. Destination only.
    IncrementReload = 3,
}

impl From<u16> for AddressControl {
    fn from(value: u16) -> Self {
        match value & 0b11 {
            0 => Self::Increment,
            1 => Self::Decrement,
            2 => Self::Fixed,
            3 => Self::IncrementReload,
            _ => unreachable!(),
        }
    }
}

/// Start timing (control bits 12-13).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartTiming {
    Immediate = 0,
    VBlank = 1,
    HBlank = 2,
    /// Sound FIFO on channels 1/2, video capture on channel 3.
    Special = 3,
}

impl From<u16> for StartTiming {
    fn from(value: u16) -> Self {
        match value & 0b11 {
            0 => Self::Immediate,
            1 => Self::VBlank,
            2 => Self::HBlank,
            3 => Self::Special,
            _ => unreachable!(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct DmaChannel {
    channel_num: usize,

    /// Programmed source address (write-only register).
    pub source_address: u32,
    /// Programmed destination address (write-only register).
    pub destination_address: u32,
    /// Programmed number of transfer units (write-only register).
    pub word_count: u16,

    pub destination_control: AddressControl,
    pub source_control: AddressControl,
    pub repeat: bool,
    /// false = 16-bit units, true = 32-bit units.
    pub transfer_32bit: bool,
    pub start_timing: StartTiming,
    pub irq_on_finish: bool,
    pub enabled: bool,

    /// Latched counters, loaded on the 0->1 edge of the enable bit.
    pub current_source: u32,
    pub current_destination: u32,
    pub remaining: u32,

    /// Cycles left before an immediate transfer starts.
    pub startup_delay: i32,
    /// An armed blank-triggered transfer waiting for its pulse.
    pub armed: bool,
}

impl DmaChannel {
    fn new(channel_num: usize) -> Self {
        Self {
            channel_num,
            source_address: 0,
            destination_address: 0,
            word_count: 0,
            destination_control: AddressControl::Increment,
            source_control: AddressControl::Increment,
            repeat: false,
            transfer_32bit: false,
            start_timing: StartTiming::Immediate,
            irq_on_finish: false,
            enabled: false,
            current_source: 0,
            current_destination: 0,
            remaining: 0,
            startup_delay: 0,
            armed: false,
        }
    }

    /// Channels 0-2 drive 27 address bits, channel 3 drives 28.
    const fn source_mask(&self) -> u32 {
        if self.channel_num == 3 {
            0x0FFF_FFFF
        } else {
            0x07FF_FFFF
        }
    }

    const fn destination_mask(&self) -> u32 {
        if self.channel_num == 3 {
            0x0FFF_FFFF
        } else {
            0x07FF_FFFF
        }
    }

    /// Channel 3 counts 16 bits worth of units, the others 14.
    const fn word_count_mask(&self) -> u16 {
        if self.channel_num == 3 {
            0xFFFF
        } else {
            0x3FFF
        }
    }

    /// Word count as latched: 0 selects the full range.
    pub const fn full_word_count(&self) -> u32 {
        if self.word_count == 0 {
            self.word_count_mask() as u32 + 1
        } else {
            self.word_count as u32
        }
    }

    /// Reload the latched counters from the programmed registers.
    fn latch(&mut self) {
        self.current_source = self.source_address;
        self.current_destination = self.destination_address;
        self.remaining = self.full_word_count();
    }

    /// Re-arm a repeating blank-triggered transfer after it completed.
    pub fn reload_for_repeat(&mut self) {
        self.remaining = self.full_word_count();
        if self.destination_control == AddressControl::IncrementReload {
            self.current_destination = self.destination_address;
        }
    }

    fn set_source_byte(&mut self, byte_nth: u8, value: u8) {
        self.source_address.set_byte(byte_nth, value);
        self.source_address &= self.source_mask();
    }

    fn set_destination_byte(&mut self, byte_nth: u8, value: u8) {
        self.destination_address.set_byte(byte_nth, value);
        self.destination_address &= self.destination_mask();
    }

    fn set_word_count_byte(&mut self, byte_nth: u8, value: u8) {
        self.word_count.set_byte(byte_nth, value);
        self.word_count &= self.word_count_mask();
    }

    fn set_control_low(&mut self, value: u8) {
        let value = value as u16;
        self.destination_control = ((value >> 5) & 0b11).into();
        let source_bits =
            ((self.source_control as u16) & 0b10) | ((value >> 7) & 0b1);
        self.source_control = source_bits.into();
    }

    fn set_control_high(&mut self, value: u8) {
        let value = value as u16;
        let was_enabled = self.enabled;

        let source_bits = ((self.source_control as u16) & 0b01) | ((value << 1) & 0b10);
        self.source_control = source_bits.into();
        self.repeat = value & 0x02 != 0;
        self.transfer_32bit = value & 0x04 != 0;
        self.start_timing = ((value >> 4) & 0b11).into();
        self.irq_on_finish = value & 0x40 != 0;
        self.enabled = value & 0x80 != 0;

        if self.source_control == AddressControl::IncrementReload {
            error(format!(
                "DMA {}: invalid source address control",
                self.channel_num
            ));
        }

        if !was_enabled && self.enabled {
            self.latch();

            match self.start_timing {
                StartTiming::Immediate => {
                    // The transfer starts 2 cycles after the enable edge.
                    self.startup_delay = 2;
                    self.armed = false;
                }
                StartTiming::VBlank | StartTiming::HBlank => {
                    self.startup_delay = 0;
                    self.armed = true;
                }
                StartTiming::Special => {
                    self.startup_delay = 0;
                    self.armed = false;
                    if self.channel_num == 1 || self.channel_num == 2 {
                        important(format!(
                            "DMA {}: sound FIFO timing not implemented",
                            self.channel_num
                        ));
                    } else {
                        important(format!(
                            "DMA {}: video capture timing not implemented",
                            self.channel_num
                        ));
                    }
                }
            }
        }

        if !self.enabled {
            self.startup_delay = 0;
            self.armed = false;
        }
    }

    fn control_low(&self) -> u8 {
        (((self.destination_control as u16) << 5) | (((self.source_control as u16) & 0b1) << 7))
            as u8
    }

    fn control_high(&self) -> u8 {
        ((((self.source_control as u16) >> 1) & 0b1)
            | (u16::from(self.repeat) << 1)
            | (u16::from(self.transfer_32bit) << 2)
            | ((self.start_timing as u16) << 4)
            | (u16::from(self.irq_on_finish) << 6)
            | (u16::from(self.enabled) << 7)) as u8
    }
}

#[derive(Serialize, Deserialize)]
pub struct Dma {
    pub channels: [DmaChannel; 4],
}

impl Default for Dma {
    fn default() -> Self {
        Self {
            channels: [
                DmaChannel::new(0),
                DmaChannel::new(1),
                DmaChannel::new(2),
                DmaChannel::new(3),
            ],
        }
    }
}

impl Dma {
    pub fn read_register(&self, address: usize) -> u8 {
        let offset = address - 0x0400_00B0;
        let channel = &self.channels[offset / 12];
        match offset % 12 {
            // Source, destination and word count are write-only.
            0..=9 => 0,
            10 => channel.control_low(),
            11 => channel.control_high(),
            _ => unreachable!(),
        }
    }

    pub fn write_register(&mut self, address: usize, value: u8) {
        let offset = address - 0x0400_00B0;
        let channel = &mut self.channels[offset / 12];
        match (offset % 12) as u8 {
            byte_nth @ 0..=3 => channel.set_source_byte(byte_nth, value),
            byte_nth @ 4..=7 => channel.set_destination_byte(byte_nth - 4, value),
            byte_nth @ 8..=9 => channel.set_word_count_byte(byte_nth - 8, value),
            10 => channel.set_control_low(value),
            11 => channel.set_control_high(value),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_edge_latches_counters() {
        let mut dma = Dma::default();
        // DMA0: src 0x02000000, dst 0x03000000, 16 units.
        dma.write_register(0x040000B2, 0x00);
        dma.write_register(0x040000B3, 0x02);
        dma.write_register(0x040000B6, 0x00);
        dma.write_register(0x040000B7, 0x03);
        dma.write_register(0x040000B8, 16);
        dma.write_register(0x040000BB, 0x80);

        let channel = &dma.channels[0];
        assert!(channel.enabled);
        assert_eq!(channel.current_source, 0x0200_0000);
        assert_eq!(channel.current_destination, 0x0300_0000);
        assert_eq!(channel.remaining, 16);
        assert_eq!(channel.startup_delay, 2);
    }

    #[test]
    fn source_is_masked_per_channel() {
        let mut dma = Dma::default();
        // Channel 0 masks the source to 27 bits.
        dma.write_register(0x040000B3, 0x08);
        assert_eq!(dma.channels[0].source_address, 0);

        // Channel 3 keeps 28 bits.
        dma.write_register(0x040000D7, 0x08);
        assert_eq!(dma.channels[3].source_address, 0x0800_0000);
    }

    #[test]
    fn word_count_zero_is_full_range() {
        let mut dma = Dma::default();
        assert_eq!(dma.channels[0].full_word_count(), 0x4000);
        assert_eq!(dma.channels[3].full_word_count(), 0x10000);

        dma.write_register(0x040000B8, 1);
        assert_eq!(dma.channels[0].full_word_count(), 1);
    }

    #[test]
    fn control_reads_back() {
        let mut dma = Dma::default();
        // dst control = decrement, src control = fixed, 32-bit, repeat,
        // irq, enabled, HBlank timing.
        dma.write_register(0x040000BA, 0b0010_0000);
        dma.write_register(0x040000BB, 0b1110_0111);

        assert_eq!(dma.channels[0].destination_control, AddressControl::Decrement);
        assert_eq!(dma.channels[0].source_control, AddressControl::Fixed);
        assert!(dma.channels[0].repeat);
        assert!(dma.channels[0].transfer_32bit);
        assert_eq!(dma.channels[0].start_timing, StartTiming::HBlank);
        assert!(dma.channels[0].irq_on_finish);
        assert!(dma.channels[0].enabled);
        assert!(dma.channels[0].armed);

        assert_eq!(dma.read_register(0x040000BA), 0b0010_0000);
        assert_eq!(dma.read_register(0x040000BB), 0b1110_0111);

        // Source/destination/count read as 0.
        assert_eq!(dma.read_register(0x040000B0), 0);
        assert_eq!(dma.read_register(0x040000B8), 0);
    }
}
