//! Test doubles: a simulated display controller and an in-memory asset
//! store, plus builders for font and bitmap assets.

use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use sigil_hal::{AssetError, AssetStore, AssetType, BulkChannel, DisplayBus};

use crate::font::{GLYPH_DATA_NONE, GLYPH_INDEX_NONE, MAX_INTERVALS};
use crate::framebuffer::FrameBuffer;
use crate::{command, packed, BYTES_PER_ROW, HEIGHT};

/// Simulated SH1122-class controller.
///
/// Decodes the address commands the engine uses and maintains a model
/// of graphics RAM with the controller's write-pointer auto-advance, so
/// tests can compare what actually landed on the panel regardless of
/// which write strategy produced it.
pub struct SimPort {
    pub gddram: [u8; BYTES_PER_ROW * HEIGHT],
    row: usize,
    col: usize,
    awaiting_row: bool,
    in_data: bool,
    transfer_done: bool,
    /// Bulk transfers started (fast-path selection is observable here)
    pub bulk_transfers: usize,
    /// Data bytes written through any path
    pub data_bytes: usize,
    /// Every command byte, in order
    pub commands: Vec<u8>,
}

impl SimPort {
    pub fn new() -> Self {
        Self {
            gddram: [0; BYTES_PER_ROW * HEIGHT],
            row: 0,
            col: 0,
            awaiting_row: false,
            in_data: false,
            transfer_done: false,
            bulk_transfers: 0,
            data_bytes: 0,
            commands: Vec::new(),
        }
    }

    pub fn gddram_row(&self, y: usize) -> &[u8] {
        &self.gddram[y * BYTES_PER_ROW..(y + 1) * BYTES_PER_ROW]
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        packed::at(self.gddram_row(y), x)
    }

    /// Whether gddram matches a frame buffer exactly
    pub fn matches(&self, fb: &FrameBuffer) -> bool {
        self.gddram[..] == *fb.as_bytes()
    }

    fn write_byte(&mut self, byte: u8) {
        self.gddram[self.row * BYTES_PER_ROW + self.col] = byte;
        self.data_bytes += 1;
        self.col += 1;
        // Controller auto-advances to the next row at the end of a line
        if self.col == BYTES_PER_ROW {
            self.col = 0;
            self.row = (self.row + 1) % HEIGHT;
        }
    }
}

impl DisplayBus for SimPort {
    fn send_command(&mut self, command: u8) {
        self.commands.push(command);
        if self.awaiting_row {
            self.row = command as usize % HEIGHT;
            self.awaiting_row = false;
            return;
        }
        if command == command::SET_ROW_ADDR {
            self.awaiting_row = true;
        } else if command & 0xF0 == command::SET_HIGH_COLUMN_ADDR {
            self.col = (self.col & 0x0F) | (((command & 0x0F) as usize) << 4);
        } else if command & 0xF0 == command::SET_LOW_COLUMN_ADDR {
            self.col = (self.col & 0xF0) | (command & 0x0F) as usize;
        }
    }

    fn send_data(&mut self, byte: u8) {
        self.write_byte(byte);
    }

    fn begin_data(&mut self) {
        self.in_data = true;
    }

    fn push_data(&mut self, byte: u8) {
        assert!(self.in_data, "data pushed outside a data bracket");
        self.write_byte(byte);
    }

    fn wait_tx_complete(&mut self) {}

    fn end_data(&mut self) {
        self.in_data = false;
    }
}

impl BulkChannel for SimPort {
    fn start_transfer(&mut self, src: &[u8]) {
        self.bulk_transfers += 1;
        for &byte in src {
            self.write_byte(byte);
        }
        self.transfer_done = true;
    }

    fn poll_and_clear_complete(&mut self) -> bool {
        let done = self.transfer_done;
        self.transfer_done = false;
        done
    }
}

/// Delay provider that returns immediately
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Flat in-memory asset store with a file directory
pub struct MemAssets {
    blob: Vec<u8>,
    files: Vec<(u32, AssetType, u32)>,
}

impl MemAssets {
    pub fn new() -> Self {
        Self {
            blob: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Append raw bytes, returning their address
    pub fn add_blob(&mut self, bytes: &[u8]) -> u32 {
        let addr = self.blob.len() as u32;
        self.blob.extend_from_slice(bytes);
        addr
    }

    /// Append bytes and register them in the file directory
    pub fn add_file(&mut self, id: u32, kind: AssetType, bytes: &[u8]) -> u32 {
        let addr = self.add_blob(bytes);
        self.files.push((id, kind, addr));
        addr
    }
}

impl AssetStore for MemAssets {
    fn get_file_address(&mut self, file_id: u32, kind: AssetType) -> Result<u32, AssetError> {
        self.files
            .iter()
            .find(|&&(id, k, _)| id == file_id && k == kind)
            .map(|&(_, _, addr)| addr)
            .ok_or(AssetError::NotFound)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self
                .blob
                .get(addr as usize + i)
                .copied()
                .unwrap_or(0);
        }
    }
}

/// Pack a slice of 4-bit pixel values two per byte, zero-padded
pub fn pack_pixels(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks(2)
        .map(|pair| packed::pack(pair[0], *pair.get(1).unwrap_or(&0)))
        .collect()
}

/// Serialize a bitmap asset: 8-byte header plus packed pixels
pub fn build_bitmap(width: u16, height: u16, rec_x: u16, rec_y: u16, pixels: &[u8]) -> Vec<u8> {
    assert_eq!(pixels.len(), width as usize * height as usize);
    let mut out = Vec::new();
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&rec_x.to_le_bytes());
    out.extend_from_slice(&rec_y.to_le_bytes());
    out.extend_from_slice(&pack_pixels(pixels));
    out
}

/// One glyph for `FontImage`; `pixels` of `None` makes a space-like
/// glyph with no bitmap
pub struct GlyphSpec {
    pub width: u8,
    pub height: u8,
    pub x_offset: i8,
    pub y_offset: i8,
    pub pixels: Option<Vec<u8>>,
}

/// Builder for font assets in the flash layout the engine parses
pub struct FontImage {
    pub glyph_height: u8,
    pub intervals: Vec<(u16, u16)>,
    pub indices: Vec<u16>,
    pub glyphs: Vec<GlyphSpec>,
}

impl FontImage {
    pub fn new(glyph_height: u8) -> Self {
        Self {
            glyph_height,
            intervals: Vec::new(),
            indices: Vec::new(),
            glyphs: Vec::new(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        assert!(self.intervals.len() <= MAX_INTERVALS);
        let mut out = Vec::new();
        out.push(self.glyph_height);
        out.extend_from_slice(&(self.glyphs.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.indices.len() as u16).to_le_bytes());

        for i in 0..MAX_INTERVALS {
            let (start, end) = self
                .intervals
                .get(i)
                .copied()
                .unwrap_or((GLYPH_INDEX_NONE, GLYPH_INDEX_NONE));
            out.extend_from_slice(&start.to_le_bytes());
            out.extend_from_slice(&end.to_le_bytes());
        }

        for index in &self.indices {
            out.extend_from_slice(&index.to_le_bytes());
        }

        let mut data = Vec::new();
        for glyph in &self.glyphs {
            let offset = match &glyph.pixels {
                Some(pixels) => {
                    assert_eq!(pixels.len(), glyph.width as usize * glyph.height as usize);
                    let offset = data.len() as u32;
                    data.extend_from_slice(&pack_pixels(pixels));
                    offset
                }
                None => GLYPH_DATA_NONE,
            };
            out.push(glyph.width);
            out.push(glyph.height);
            out.push(glyph.x_offset as u8);
            out.push(glyph.y_offset as u8);
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.extend_from_slice(&data);
        out
    }
}
