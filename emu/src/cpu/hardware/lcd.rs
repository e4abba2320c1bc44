//! LCD controller: scanline state machine and scanline renderer.
//!
//! A scanline is 1232 cycles: HDraw (0..=959) followed by HBlank
//! (960..=1231). A frame is 228 scanlines: 160 visible (VDraw) plus 68
//! of VBlank, 280896 cycles in total. A visible scanline is rendered
//! into the framebuffer when its line completes, before the counters
//! move on.
//!
//! The renderer covers the text background mode 0 and the bitmap modes
//! 3/4/5. The affine modes 1/2 and sprites are diagnosed and the
//! backdrop is shown instead. Palette RAM, VRAM and OAM are owned here;
//! the bus routes the 0x05/0x06/0x07 pages to them.

use logger::{error, important, warning};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::bitwise::Bits;

/// GBA display width
pub const LCD_WIDTH: usize = 240;

/// GBA display height
pub const LCD_HEIGHT: usize = 160;

const CYCLES_PER_SCANLINE: u32 = 1232;
const HBLANK_START_CYCLE: u32 = 960;
const VDRAW_SCANLINES: u16 = 160;
const TOTAL_SCANLINES: u16 = 228;

/// A 15-bit BGR color as stored in palette RAM and bitmap VRAM.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u16);

impl Color {
    pub const fn from_palette_color(value: u16) -> Self {
        Self(value)
    }

    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let red: u16 = red.into();
        let green: u16 = green.into();
        let blue: u16 = blue.into();

        Self((blue << 10) + (green << 5) + red)
    }

    pub fn red(&self) -> u8 {
        self.0.get_bits(0..=4) as u8
    }

    pub fn green(&self) -> u8 {
        self.0.get_bits(5..=9) as u8
    }

    pub fn blue(&self) -> u8 {
        self.0.get_bits(10..=14) as u8
    }

    /// Widen the 5-bit channels to 8 bits for the host surface.
    pub fn to_rgb888(self) -> (u8, u8, u8) {
        (self.red() << 3, self.green() << 3, self.blue() << 3)
    }
}

/// What a single LCD step wants from the rest of the system.
#[derive(Default)]
pub struct LcdStepOutput {
    pub request_vblank_irq: bool,
    pub request_hblank_irq: bool,
    pub request_vcount_irq: bool,
    /// The VDraw -> VBlank transition happened: release armed VBlank DMA.
    pub vblank_dma_pulse: bool,
    /// A visible scanline entered HBlank: release armed HBlank DMA.
    pub hblank_dma_pulse: bool,
}

#[serde_as]
#[derive(Serialize, Deserialize)]
pub struct Lcd {
    /// LCD Control
    pub dispcnt: u16,
    /// General LCD Status (bits 0-2 read-only)
    pub dispstat: u16,
    /// Vertical Counter (read-only)
    pub vcount: u16,
    /// BG0-BG3 Control
    pub bg_control: [u16; 4],
    /// BG0-BG3 X-Offset (write-only, 9 bits)
    pub bg_x_offset: [u16; 4],
    /// BG0-BG3 Y-Offset (write-only, 9 bits)
    pub bg_y_offset: [u16; 4],

    /// From 0x05000000 to 0x050003FF (1 KByte, 256 BG + 256 OBJ colors).
    pub palette_ram: Vec<u8>,
    /// From 0x06000000 to 0x06017FFF (96 KBytes).
    pub video_ram: Vec<u8>,
    /// From 0x07000000 to 0x070003FF (1 KByte).
    pub obj_attributes: Vec<u8>,

    #[serde_as(as = "[[_; 240]; 160]")]
    pub buffer: [[Color; LCD_WIDTH]; LCD_HEIGHT],

    scanline_cycles: u32,
}

impl Default for Lcd {
    fn default() -> Self {
        Self {
            dispcnt: 0,
            dispstat: 0,
            vcount: 0,
            bg_control: [0; 4],
            bg_x_offset: [0; 4],
            bg_y_offset: [0; 4],
            palette_ram: vec![0; 0x400],
            video_ram: vec![0; 0x18000],
            obj_attributes: vec![0; 0x400],
            buffer: [[Color::default(); LCD_WIDTH]; LCD_HEIGHT],
            scanline_cycles: 0,
        }
    }
}

impl Lcd {
    /// Advance the scanline machine by `cycles`.
    pub fn step(&mut self, cycles: u32) -> LcdStepOutput {
        let mut output = LcdStepOutput::default();

        let mut remaining = cycles;
        while remaining > 0 {
            // The two interesting edges of a scanline are the HBlank
            // entry and the line wrap; jump from edge to edge.
            let target = if self.scanline_cycles < HBLANK_START_CYCLE {
                HBLANK_START_CYCLE
            } else {
                CYCLES_PER_SCANLINE
            };

            let chunk = (target - self.scanline_cycles).min(remaining);
            self.scanline_cycles += chunk;
            remaining -= chunk;

            if self.scanline_cycles == HBLANK_START_CYCLE {
                self.enter_hblank(&mut output);
            } else if self.scanline_cycles == CYCLES_PER_SCANLINE {
                self.scanline_cycles = 0;
                self.finish_scanline(&mut output);
            }
        }

        output
    }

    fn enter_hblank(&mut self, output: &mut LcdStepOutput) {
        self.set_hblank_flag(true);

        if self.hblank_irq_enabled() {
            output.request_hblank_irq = true;
        }

        // The HBlank DMA trigger only fires during the visible lines.
        if self.vcount < VDRAW_SCANLINES {
            output.hblank_dma_pulse = true;
        }
    }

    fn finish_scanline(&mut self, output: &mut LcdStepOutput) {
        // Render before the counters move so the line still sees its own
        // scroll and palette state.
        if self.vcount < VDRAW_SCANLINES {
            self.render_scanline();
        }

        self.set_hblank_flag(false);
        self.vcount += 1;

        if self.vcount == VDRAW_SCANLINES {
            self.set_vblank_flag(true);
            output.vblank_dma_pulse = true;

            if self.vblank_irq_enabled() {
                output.request_vblank_irq = true;
            }
        } else if self.vcount == TOTAL_SCANLINES {
            self.vcount = 0;
            self.set_vblank_flag(false);
        }

        let matches = self.vcount.get_byte(0) == self.vcount_setting();
        self.set_vcount_flag(matches);
        if matches && self.vcount_irq_enabled() {
            output.request_vcount_irq = true;
        }
    }

    /// The framebuffer sink used by the renderer. The host presents the
    /// buffer at VBlank.
    pub fn put_pixel(&mut self, x: usize, y: usize, color: Color) {
        self.buffer[y][x] = color;
    }

    fn render_scanline(&mut self) {
        let y = self.vcount as usize;

        match self.bg_mode() {
            0 => self.render_text_scanline(y),
            3 => self.render_bitmap_scanline_mode3(y),
            4 => self.render_bitmap_scanline_mode4(y),
            5 => self.render_bitmap_scanline_mode5(y),
            mode @ (1 | 2) => {
                important(format!("bg mode {mode} (affine) not implemented"));
                let backdrop = self.palette_color(0);
                for x in 0..LCD_WIDTH {
                    self.put_pixel(x, y, backdrop);
                }
            }
            mode => {
                error(format!("invalid bg mode {mode}"));
                let backdrop = self.palette_color(0);
                for x in 0..LCD_WIDTH {
                    self.put_pixel(x, y, backdrop);
                }
            }
        }
    }

    /// Mode 0: up to four text backgrounds composed by priority. Lower
    /// priority values win, ties break on the lower background index.
    fn render_text_scanline(&mut self, y: usize) {
        let backdrop = self.palette_color(0);

        for x in 0..LCD_WIDTH {
            let mut pixel = backdrop;
            let mut best_priority = u16::MAX;

            for bg in 0..4 {
                if !self.dispcnt.get_bit(8 + bg as u8) {
                    continue;
                }

                let priority = self.bg_control[bg].get_bits(0..=1);
                if priority as u16 >= best_priority {
                    continue;
                }

                if let Some(color) = self.text_bg_pixel(bg, x, y) {
                    pixel = color;
                    best_priority = priority as u16;
                }
            }

            self.put_pixel(x, y, pixel);
        }
    }

    /// Fetch one pixel of a text background. Returns `None` for
    /// transparent pixels (tile color index 0).
    fn text_bg_pixel(&self, bg: usize, x: usize, y: usize) -> Option<Color> {
        let control = self.bg_control[bg];
        let screen_size = control.get_bits(14..=15);

        let (map_width, map_height) = match screen_size {
            0 => (256, 256),
            1 => (512, 256),
            2 => (256, 512),
            3 => (512, 512),
            _ => unreachable!(),
        };

        let adj_x = (x + (self.bg_x_offset[bg] & 0x1FF) as usize) % map_width;
        let adj_y = (y + (self.bg_y_offset[bg] & 0x1FF) as usize) % map_height;

        // A screenblock covers 256x256; the larger sizes tile 2 or 4 of
        // them, in row-major order.
        let mut screen_block = control.get_bits(8..=12) as usize;
        if adj_x >= 256 {
            screen_block += 1;
        }
        if adj_y >= 256 {
            screen_block += if screen_size == 3 { 2 } else { 1 };
        }

        let tile_x = (adj_x % 256) / 8;
        let tile_y = (adj_y % 256) / 8;
        let entry_address = screen_block * 0x800 + (tile_y * 32 + tile_x) * 2;
        let entry = u16::from_le_bytes([
            self.video_ram[entry_address],
            self.video_ram[entry_address + 1],
        ]);

        let tile_number = entry.get_bits(0..=9) as usize;
        let mut row = adj_y % 8;
        let mut column = adj_x % 8;
        if entry.get_bit(10) {
            column = 7 - column;
        }
        if entry.get_bit(11) {
            row = 7 - row;
        }

        let char_base = control.get_bits(2..=3) as usize * 0x4000;
        let color_index = if control.get_bit(7) {
            // 8bpp: one byte per pixel, 64 bytes per tile.
            let address = char_base + tile_number * 64 + row * 8 + column;
            self.video_ram[address] as usize
        } else {
            // 4bpp: one nibble per pixel, 32 bytes per tile. Even columns
            // are the low nibble.
            let address = char_base + tile_number * 32 + row * 4 + column / 2;
            let pair = self.video_ram[address];
            if column % 2 == 0 {
                (pair & 0xF) as usize
            } else {
                (pair >> 4) as usize
            }
        };

        if color_index == 0 {
            return None;
        }

        let palette_index = if control.get_bit(7) {
            color_index
        } else {
            entry.get_bits(12..=15) as usize * 16 + color_index
        };

        Some(self.palette_color(palette_index))
    }

    /// Mode 3: 240x160, 16-bit color, single frame at the VRAM base.
    fn render_bitmap_scanline_mode3(&mut self, y: usize) {
        for x in 0..LCD_WIDTH {
            let address = (y * LCD_WIDTH + x) * 2;
            let color = Color(u16::from_le_bytes([
                self.video_ram[address],
                self.video_ram[address + 1],
            ]));
            self.put_pixel(x, y, color);
        }
    }

    /// Mode 4: 240x160 palette indices, two frames.
    fn render_bitmap_scanline_mode4(&mut self, y: usize) {
        let frame_base = self.bitmap_frame_base();
        for x in 0..LCD_WIDTH {
            let index = self.video_ram[frame_base + y * LCD_WIDTH + x] as usize;
            let color = self.palette_color(index);
            self.put_pixel(x, y, color);
        }
    }

    /// Mode 5: 160x128, 16-bit color, two frames. Pixels outside the
    /// small bitmap show the backdrop.
    fn render_bitmap_scanline_mode5(&mut self, y: usize) {
        const MODE5_WIDTH: usize = 160;
        const MODE5_HEIGHT: usize = 128;

        let frame_base = self.bitmap_frame_base();
        let backdrop = self.palette_color(0);

        for x in 0..LCD_WIDTH {
            let color = if x < MODE5_WIDTH && y < MODE5_HEIGHT {
                let address = frame_base + (y * MODE5_WIDTH + x) * 2;
                Color(u16::from_le_bytes([
                    self.video_ram[address],
                    self.video_ram[address + 1],
                ]))
            } else {
                backdrop
            };
            self.put_pixel(x, y, color);
        }
    }

    fn palette_color(&self, index: usize) -> Color {
        let low = self.palette_ram[index * 2] as u16;
        let high = self.palette_ram[index * 2 + 1] as u16;

        Color::from_palette_color((high << 8) | low)
    }

    const fn bitmap_frame_base(&self) -> usize {
        // DISPCNT bit 4 selects the displayed bitmap frame.
        if self.dispcnt & (1 << 4) != 0 {
            0xA000
        } else {
            0
        }
    }

    pub fn bg_mode(&self) -> u8 {
        self.dispcnt.get_bits(0..=2) as u8
    }

    fn vcount_setting(&self) -> u8 {
        self.dispstat.get_byte(1)
    }

    fn vblank_irq_enabled(&self) -> bool {
        self.dispstat.get_bit(3)
    }

    fn hblank_irq_enabled(&self) -> bool {
        self.dispstat.get_bit(4)
    }

    fn vcount_irq_enabled(&self) -> bool {
        self.dispstat.get_bit(5)
    }

    fn set_vblank_flag(&mut self, value: bool) {
        self.dispstat.set_bit(0, value);
    }

    fn set_hblank_flag(&mut self, value: bool) {
        self.dispstat.set_bit(1, value);
    }

    fn set_vcount_flag(&mut self, value: bool) {
        self.dispstat.set_bit(2, value);
    }

    pub fn read_register(&self, address: usize) -> u8 {
        match address {
            0x04000000 => self.dispcnt.get_byte(0),
            0x04000001 => self.dispcnt.get_byte(1),
            0x04000004 => self.dispstat.get_byte(0),
            0x04000005 => self.dispstat.get_byte(1),
            0x04000006 => self.vcount.get_byte(0),
            0x04000007 => self.vcount.get_byte(1),
            0x04000008..=0x0400000F => {
                let offset = address - 0x04000008;
                self.bg_control[offset / 2].get_byte((offset % 2) as u8)
            }
            // The scroll registers are write-only.
            0x04000010..=0x0400001F => 0,
            _ => {
                warning(format!("read on unhandled LCD register {address:x}"));
                0
            }
        }
    }

    pub fn write_register(&mut self, address: usize, value: u8) {
        match address {
            0x04000000 => self.dispcnt.set_byte(0, value),
            0x04000001 => self.dispcnt.set_byte(1, value),
            // Bits 0-2 of DISPSTAT are the live flags.
            0x04000004 => {
                self.dispstat = (self.dispstat & 0xFF07) | ((value as u16) & 0xF8);
            }
            0x04000005 => self.dispstat.set_byte(1, value),
            0x04000006 | 0x04000007 => warning("tried to write VCOUNT"),
            0x04000008..=0x0400000F => {
                let offset = address - 0x04000008;
                self.bg_control[offset / 2].set_byte((offset % 2) as u8, value);
            }
            0x04000010..=0x0400001F => {
                let offset = address - 0x04000010;
                let bg = offset / 4;
                let target = if offset % 4 < 2 {
                    &mut self.bg_x_offset[bg]
                } else {
                    &mut self.bg_y_offset[bg]
                };
                target.set_byte((offset % 2) as u8, value);
                *target &= 0x01FF;
            }
            _ => warning(format!(
                "write on unhandled LCD register {address:x} = {value:#04X}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hblank_edge_at_cycle_960() {
        let mut lcd = Lcd::default();

        lcd.step(959);
        assert!(!lcd.dispstat.get_bit(1));

        lcd.step(1);
        assert!(lcd.dispstat.get_bit(1));

        // The flag clears when the line wraps.
        lcd.step(272);
        assert!(!lcd.dispstat.get_bit(1));
        assert_eq!(lcd.vcount, 1);
    }

    #[test]
    fn frame_is_280896_cycles() {
        let mut lcd = Lcd::default();

        // 227 whole lines put us on the last line of the frame.
        lcd.step(1232 * 227);
        assert_eq!(lcd.vcount, 227);
        assert!(lcd.dispstat.get_bit(0));

        lcd.step(1231);
        assert_eq!(lcd.vcount, 227);

        lcd.step(1);
        assert_eq!(lcd.vcount, 0);
        assert!(!lcd.dispstat.get_bit(0));
    }

    #[test]
    fn vblank_spans_68_lines() {
        let mut lcd = Lcd::default();
        let mut vblank_lines = 0;

        for _ in 0..TOTAL_SCANLINES {
            lcd.step(1232);
            if lcd.dispstat.get_bit(0) {
                vblank_lines += 1;
            }
        }

        assert_eq!(vblank_lines, 68);
    }

    #[test]
    fn vblank_irq_and_dma_pulse_on_line_160() {
        let mut lcd = Lcd::default();
        // VBlank IRQ enable.
        lcd.write_register(0x04000004, 0x08);

        let output = lcd.step(1232 * 159);
        assert!(!output.request_vblank_irq);

        let output = lcd.step(1232);
        assert_eq!(lcd.vcount, 160);
        assert!(output.request_vblank_irq);
        assert!(output.vblank_dma_pulse);
        assert!(lcd.dispstat.get_bit(0));
    }

    #[test]
    fn hblank_dma_pulse_only_while_visible() {
        let mut lcd = Lcd::default();

        let output = lcd.step(960);
        assert!(output.hblank_dma_pulse);

        // Jump into the VBlank period.
        lcd.step(272 + 1232 * 170);
        assert!(lcd.vcount > 160);
        let output = lcd.step(1232);
        assert!(!output.hblank_dma_pulse);
    }

    #[test]
    fn vcount_match_raises_irq_on_entry() {
        let mut lcd = Lcd::default();
        // VCount setting = 3, VCount IRQ enable.
        lcd.write_register(0x04000005, 3);
        lcd.write_register(0x04000004, 0x20);

        let output = lcd.step(1232 * 2);
        assert!(!output.request_vcount_irq);
        assert!(!lcd.dispstat.get_bit(2));

        let output = lcd.step(1232);
        assert_eq!(lcd.vcount, 3);
        assert!(output.request_vcount_irq);
        assert!(lcd.dispstat.get_bit(2));
    }

    #[test]
    fn dispstat_flags_are_read_only() {
        let mut lcd = Lcd::default();
        lcd.step(960);
        assert!(lcd.dispstat.get_bit(1));

        lcd.write_register(0x04000004, 0x00);
        assert!(lcd.dispstat.get_bit(1));
    }

    #[test]
    fn scroll_registers_are_masked_to_9_bits() {
        let mut lcd = Lcd::default();
        lcd.write_register(0x04000010, 0xFF);
        lcd.write_register(0x04000011, 0xFF);

        assert_eq!(lcd.bg_x_offset[0], 0x1FF);
        assert_eq!(lcd.read_register(0x04000010), 0);
    }

    #[test]
    fn mode3_renders_vram_halfwords() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 3;

        // Pixel (1, 0) = red (0x001F).
        lcd.video_ram[2] = 0x1F;
        lcd.video_ram[3] = 0x00;

        lcd.step(1232);
        assert_eq!(lcd.buffer[0][1], Color::from_rgb(31, 0, 0));
        assert_eq!(lcd.buffer[0][0], Color(0));
    }

    #[test]
    fn mode4_uses_palette_and_frame_select() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 4;

        // Palette entry 1 = green.
        lcd.palette_ram[2] = 0xE0;
        lcd.palette_ram[3] = 0x03;

        lcd.video_ram[5] = 1; // frame 0, pixel (5, 0)
        lcd.video_ram[0xA000 + 5] = 0; // frame 1 clear

        lcd.step(1232);
        assert_eq!(lcd.buffer[0][5], Color::from_rgb(0, 31, 0));

        // Switch to frame 1 and re-render the first line.
        lcd.dispcnt |= 1 << 4;
        lcd.step(1232 * 227);
        lcd.step(1232);
        assert_eq!(lcd.buffer[0][5], Color(0));
    }

    #[test]
    fn mode0_tile_rendering_with_flip_and_palette_bank() {
        let mut lcd = Lcd::default();
        // Mode 0, BG0 enabled.
        lcd.dispcnt = 1 << 8;
        // BG0: priority 0, char base 0, 4bpp, screen base 8.
        lcd.bg_control[0] = 8 << 8;

        // Tile 1, 4bpp: first row = color 3 in column 0, 0 elsewhere.
        lcd.video_ram[0x20] = 0x03;

        // Map entry (0, 0) in screenblock 8: tile 1, H-flipped,
        // palette bank 2.
        let entry: u16 = 1 | (1 << 10) | (2 << 12);
        lcd.video_ram[8 * 0x800] = entry.get_byte(0);
        lcd.video_ram[8 * 0x800 + 1] = entry.get_byte(1);

        // Palette bank 2, entry 3 = blue. Backdrop = 0x7FFF.
        let palette_index = 2 * 16 + 3;
        lcd.palette_ram[palette_index * 2] = 0x00;
        lcd.palette_ram[palette_index * 2 + 1] = 0x7C;
        lcd.palette_ram[0] = 0xFF;
        lcd.palette_ram[1] = 0x7F;

        lcd.step(1232);

        // The H-flip moves column 0 of the tile to screen column 7.
        assert_eq!(lcd.buffer[0][7], Color::from_rgb(0, 0, 31));
        // Transparent pixels show the backdrop.
        assert_eq!(lcd.buffer[0][0], Color(0x7FFF));
    }

    #[test]
    fn mode0_scrolling_wraps_the_map() {
        let mut lcd = Lcd::default();
        lcd.dispcnt = 1 << 8;
        lcd.bg_control[0] = 8 << 8;

        // Tile 1: solid color 1 (both nibbles of every row byte).
        for i in 0..32 {
            lcd.video_ram[0x20 + i] = 0x11;
        }
        // Palette entry 1 = red.
        lcd.palette_ram[2] = 0x1F;

        // Map entry for tile coordinate (0, 1) -> tile 1.
        lcd.video_ram[8 * 0x800 + 32 * 2] = 1;

        // Scroll so screen row 0 samples map row 8 (tile row 1), with a
        // y offset that wraps the 256-pixel map.
        lcd.bg_y_offset[0] = 256 + 8;

        lcd.step(1232);
        assert_eq!(lcd.buffer[0][0], Color::from_rgb(31, 0, 0));
        assert_eq!(lcd.buffer[0][8], Color(0));
    }

    #[test]
    fn mode0_priority_composition() {
        let mut lcd = Lcd::default();
        // BG0 and BG1 enabled.
        lcd.dispcnt = 0b11 << 8;
        // BG0: priority 1, screen base 8. BG1: priority 0, screen base 9.
        lcd.bg_control[0] = (8 << 8) | 1;
        lcd.bg_control[1] = 9 << 8;

        // Both backgrounds show solid tile 1 at (0,0).
        for i in 0..32 {
            lcd.video_ram[0x20 + i] = 0x11;
        }
        lcd.video_ram[8 * 0x800] = 1;
        lcd.video_ram[9 * 0x800] = 1;

        // BG0 uses palette bank 0, BG1 palette bank 1.
        let entry: u16 = 1 | (1 << 12);
        lcd.video_ram[9 * 0x800] = entry.get_byte(0);
        lcd.video_ram[9 * 0x800 + 1] = entry.get_byte(1);

        // Bank 0 entry 1 = red, bank 1 entry 1 = green.
        lcd.palette_ram[2] = 0x1F;
        lcd.palette_ram[(16 + 1) * 2] = 0xE0;
        lcd.palette_ram[(16 + 1) * 2 + 1] = 0x03;

        lcd.step(1232);

        // BG1 has the lower priority value and wins.
        assert_eq!(lcd.buffer[0][0], Color::from_rgb(0, 31, 0));
    }
}
