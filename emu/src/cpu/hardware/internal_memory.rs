//! Internal memory storage: BIOS, work RAM, cartridge ROM and SRAM.
//!
//! | Region | Address Range           | Size   | Notes                           |
//! |--------|-------------------------|--------|---------------------------------|
//! | BIOS   | `0x0000_0000-0000_3FFF` | 16 KB  | read-only                       |
//! | EWRAM  | `0x0200_0000-0203_FFFF` | 256 KB | mirrored every 256 KB           |
//! | IWRAM  | `0x0300_0000-0300_7FFF` | 32 KB  | mirrored every 32 KB            |
//! | ROM    | `0x0800_0000-0DFF_FFFF` | 32 MB  | three wait-state mirror windows |
//! | SRAM   | `0x0E00_0000-0E00_FFFF` | 64 KB  | cartridge save memory           |
//!
//! Reading past the end of the loaded ROM returns the low 16 bits of the
//! halfword address: the GamePak data and low address lines share the
//! same bus, and an absent cartridge leaves the address on it.
//!
//! Palette RAM, VRAM and OAM live in [`Lcd`](super::lcd::Lcd); the I/O
//! page is decoded in [`Bus`](crate::bus::Bus).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

use super::get_unmasked_address;

#[derive(Serialize, Deserialize)]
pub struct InternalMemory {
    /// From 0x00000000 to 0x00003FFF (16 KBytes).
    bios_system_rom: Vec<u8>,

    /// From 0x02000000 to 0x0203FFFF (256 KBytes).
    working_ram: Vec<u8>,

    /// From 0x03000000 to 0x03007FFF (32 KBytes).
    working_iram: Vec<u8>,

    /// From 0x08000000, mirrored at 0x0A000000 and 0x0C000000.
    pub rom: Vec<u8>,

    /// From 0x0E000000 to 0x0E00FFFF (64 KBytes).
    sram: Vec<u8>,

    /// From 0x00004000 to 0x01FFFFFF and from 0x10000000 up.
    unused_region: HashMap<usize, u8>,
}

impl InternalMemory {
    #[must_use]
    pub fn new(bios: [u8; 0x0000_4000], rom: Vec<u8>) -> Self {
        Self {
            bios_system_rom: bios.to_vec(),
            rom,
            ..Self::default()
        }
    }
}

impl Default for InternalMemory {
    fn default() -> Self {
        Self {
            bios_system_rom: vec![0; 0x0000_4000],
            working_ram: vec![0; 0x0004_0000],
            working_iram: vec![0; 0x0000_8000],
            rom: Vec::new(),
            sram: vec![0xFF; 0x0001_0000],
            unused_region: HashMap::new(),
        }
    }
}

impl InternalMemory {
    fn read_rom(&self, address: usize) -> u8 {
        if address < self.rom.len() {
            self.rom[address]
        } else {
            // The GamePak ROM is halfword addressed over a 16-bit bus that
            // also carries the low half of the address. A read from an
            // empty location leaves the address on the bus, so the CPU
            // sees the low 16 bits of the halfword address.
            (((address >> 1) & 0xFFFF) as u16).get_byte((address & 0b1) as u8)
        }
    }

    #[must_use]
    pub fn read_at(&self, address: usize) -> u8 {
        match address {
            0x0000_0000..=0x0000_3FFF => self.bios_system_rom[address],
            0x0200_0000..=0x02FF_FFFF => {
                self.working_ram
                    [get_unmasked_address(address, 0x00FF_0000, 0xFF00_FFFF, 16, 4) - 0x0200_0000]
            }
            0x0300_0000..=0x03FF_FFFF => {
                self.working_iram
                    [get_unmasked_address(address, 0x00FF_F000, 0xFF00_0FFF, 12, 8) - 0x0300_0000]
            }
            0x0800_0000..=0x09FF_FFFF => self.read_rom(address - 0x0800_0000),
            0x0A00_0000..=0x0BFF_FFFF => self.read_rom(address - 0x0A00_0000),
            0x0C00_0000..=0x0DFF_FFFF => self.read_rom(address - 0x0C00_0000),
            0x0E00_0000..=0x0E00_FFFF => self.sram[address - 0x0E00_0000],
            _ => {
                tracing::debug!("read on unused memory 0x{address:08X}");
                self.unused_region.get(&address).map_or(0, |v| *v)
            }
        }
    }

    pub fn write_at(&mut self, address: usize, value: u8) {
        match address {
            0x0000_0000..=0x0000_3FFF => {
                // BIOS is read-only; some games write here anyway.
                tracing::debug!("write on BIOS 0x{address:08X} = 0x{value:02X}");
            }
            0x0200_0000..=0x02FF_FFFF => {
                self.working_ram
                    [get_unmasked_address(address, 0x00FF_0000, 0xFF00_FFFF, 16, 4) - 0x0200_0000] =
                    value;
            }
            0x0300_0000..=0x03FF_FFFF => {
                self.working_iram
                    [get_unmasked_address(address, 0x00FF_F000, 0xFF00_0FFF, 12, 8) - 0x0300_0000] =
                    value;
            }
            0x0800_0000..=0x0DFF_FFFF => {
                tracing::debug!("write on cartridge ROM 0x{address:08X} = 0x{value:02X}");
            }
            0x0E00_0000..=0x0E00_FFFF => self.sram[address - 0x0E00_0000] = value,
            _ => {
                tracing::debug!("write on unused memory 0x{address:08X} = 0x{value:02X}");
                self.unused_region.insert(address, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_work_ram() {
        let mut im = InternalMemory::default();

        let address = 0x03000005;
        im.write_at(address, 5);

        assert_eq!(im.working_iram[5], 5);
    }

    #[test]
    fn test_last_byte_work_ram() {
        let mut im = InternalMemory::default();

        let address = 0x03007FFF;
        im.write_at(address, 5);

        assert_eq!(im.working_iram[0x7FFF], 5);
    }

    #[test]
    fn test_read_work_ram() {
        let mut im = InternalMemory::default();
        im.working_iram[5] = 10;

        let address = 0x03000005;
        assert_eq!(im.read_at(address), 10);
    }

    #[test]
    fn test_bios_is_read_only() {
        let mut im = InternalMemory::default();
        let original = im.read_at(0x000001EC);
        im.write_at(0x000001EC, 10);
        assert_eq!(im.read_at(0x000001EC), original);
    }

    #[test]
    fn test_read_rom() {
        let im = InternalMemory {
            rom: vec![1, 2, 3, 4],
            ..Default::default()
        };
        let address = 0x08000000;
        assert_eq!(im.read_at(address), 1);

        // Reading in empty rom returns the low bits of the halfword address.
        let address = 0x09FF_FFFF;
        assert_eq!(im.read_at(address), 0xFF);

        let address = 0x09FF_FFEE;
        assert_eq!(im.read_at(address), 0xF7);

        let address = 0x09FF_FFEF;
        assert_eq!(im.read_at(address), 0xFF);
    }

    #[test]
    fn test_rom_mirrors() {
        let im = InternalMemory {
            rom: vec![7, 8, 9],
            ..Default::default()
        };

        assert_eq!(im.read_at(0x0A000001), 8);
        assert_eq!(im.read_at(0x0C000002), 9);
    }

    #[test]
    fn test_sram() {
        let mut im = InternalMemory::default();
        assert_eq!(im.read_at(0x0E000000), 0xFF);

        im.write_at(0x0E000123, 0x42);
        assert_eq!(im.read_at(0x0E000123), 0x42);
    }

    #[test]
    fn test_mirror_wram() {
        let mut im = InternalMemory::default();
        im.working_ram[0x010003] = 5;

        assert_eq!(im.read_at(0x02010003), 5);
        assert_eq!(im.read_at(0x02050003), 5);
        assert_eq!(im.read_at(0x02350003), 5);
        assert_eq!(im.read_at(0x02F50003), 5);

        im.write_at(0x02010003, 2);
        assert_eq!(im.working_ram[0x010003], 2);

        im.write_at(0x02050003, 1);
        assert_eq!(im.working_ram[0x010003], 1);

        im.write_at(0x02F5003F, 1);
        assert_eq!(im.working_ram[0x01003F], 1);
    }

    #[test]
    fn test_mirror_iram() {
        let mut im = InternalMemory::default();
        im.working_iram[0x21FF] = 5;

        assert_eq!(im.read_at(0x030021FF), 5);
        assert_eq!(im.read_at(0x0300A1FF), 5);
        assert_eq!(im.read_at(0x030121FF), 5);
        assert_eq!(im.read_at(0x03FFA1FF), 5);

        im.write_at(0x030021FF, 2);
        assert_eq!(im.working_iram[0x21FF], 2);

        im.write_at(0x030171FF, 10);
        assert_eq!(im.working_iram[0x71FF], 10);

        im.write_at(0x03FFF1FF, 1);
        assert_eq!(im.working_iram[0x71FF], 1);
    }

    #[test]
    fn test_unused_region_remembers_writes() {
        let mut im = InternalMemory::default();
        assert_eq!(im.read_at(0x01000000), 0);

        im.write_at(0x01000000, 0xAB);
        assert_eq!(im.read_at(0x01000000), 0xAB);
    }
}
