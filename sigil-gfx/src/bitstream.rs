//! Sequential pixel streams over flash assets
//!
//! Bitmaps and glyphs live in external flash as a stream of 4-bit
//! pixels, two per byte, optionally run-length encoded. [`PixelStream`]
//! pulls them out one pixel at a time through a small chunk buffer so
//! drawing never needs the whole image in RAM, and never touches flash
//! twice for the same byte.

use sigil_hal::AssetStore;

use crate::packed;

/// Flash bytes fetched per refill
const CHUNK: usize = 32;

/// Fixed bitmap asset header, little-endian, preceding the pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitmapHeader {
    /// Width in pixels
    pub width: u16,
    /// Height in rows
    pub height: u16,
    /// Recommended display column
    pub recommended_x: u16,
    /// Recommended display row
    pub recommended_y: u16,
}

impl BitmapHeader {
    /// Serialized size in flash
    pub const SIZE: usize = 8;

    /// Decode the header from its flash bytes
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            width: u16::from_le_bytes([bytes[0], bytes[1]]),
            height: u16::from_le_bytes([bytes[2], bytes[3]]),
            recommended_x: u16::from_le_bytes([bytes[4], bytes[5]]),
            recommended_y: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// Read and decode a header at `addr`
    pub fn load<S: AssetStore>(store: &mut S, addr: u32) -> Self {
        let mut bytes = [0u8; Self::SIZE];
        store.read(addr, &mut bytes);
        Self::from_bytes(&bytes)
    }
}

/// Pixel data encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compression {
    /// Packed 4-bit pixels, two per byte
    None,
    /// One byte per run: run length minus one in the high nibble,
    /// color in the low nibble
    Rle,
}

/// An incremental reader of 4-bit pixels stored in flash.
///
/// The stream does not own the asset store; every read takes it as a
/// parameter so the caller can keep the store alongside other borrowed
/// state. Reading past the declared pixel count yields zeros.
pub struct PixelStream {
    addr: u32,
    bytes_left: u32,
    total_pixels: u32,
    produced: u32,
    compression: Compression,
    buf: [u8; CHUNK],
    buf_len: usize,
    /// Nibble cursor into `buf` (two nibbles per byte)
    nibble_pos: usize,
    run_left: u8,
    run_color: u8,
}

impl PixelStream {
    /// Stream `width * height` uncompressed pixels starting at `addr`
    pub fn raw(addr: u32, width: u16, height: u16) -> Self {
        Self::new(addr, width, height, Compression::None)
    }

    /// Stream `width * height` run-length-encoded pixels starting at `addr`
    pub fn rle(addr: u32, width: u16, height: u16) -> Self {
        Self::new(addr, width, height, Compression::Rle)
    }

    fn new(addr: u32, width: u16, height: u16, compression: Compression) -> Self {
        let total_pixels = width as u32 * height as u32;
        let bytes_left = match compression {
            Compression::None => total_pixels.div_ceil(2),
            // Worst case, one run byte per pixel
            Compression::Rle => total_pixels,
        };
        Self {
            addr,
            bytes_left,
            total_pixels,
            produced: 0,
            compression,
            buf: [0; CHUNK],
            buf_len: 0,
            nibble_pos: 0,
            run_left: 0,
            run_color: 0,
        }
    }

    /// Pixels this stream will produce in total
    pub fn total_pixels(&self) -> u32 {
        self.total_pixels
    }

    /// Pixels not yet produced
    pub fn pixels_left(&self) -> u32 {
        self.total_pixels - self.produced
    }

    fn refill<S: AssetStore>(&mut self, store: &mut S) {
        let n = (self.bytes_left as usize).min(CHUNK);
        store.read(self.addr, &mut self.buf[..n]);
        self.addr += n as u32;
        self.bytes_left -= n as u32;
        self.buf_len = n;
        self.nibble_pos = 0;
    }

    /// Produce the next pixel, or zero once the stream is exhausted
    pub fn next<S: AssetStore>(&mut self, store: &mut S) -> u8 {
        if self.produced >= self.total_pixels {
            return 0;
        }
        self.produced += 1;

        match self.compression {
            Compression::None => {
                if self.nibble_pos == 2 * self.buf_len {
                    if self.bytes_left == 0 {
                        return 0;
                    }
                    self.refill(store);
                }
                let pixel = packed::at(&self.buf, self.nibble_pos);
                self.nibble_pos += 1;
                pixel
            }
            Compression::Rle => {
                if self.run_left == 0 {
                    if self.nibble_pos == 2 * self.buf_len {
                        if self.bytes_left == 0 {
                            return 0;
                        }
                        self.refill(store);
                    }
                    let run = self.buf[self.nibble_pos / 2];
                    self.nibble_pos += 2;
                    self.run_left = packed::hi(run) + 1;
                    self.run_color = packed::lo(run);
                }
                self.run_left -= 1;
                self.run_color
            }
        }
    }

    /// Produce the next two pixels packed into one byte, the first in
    /// the high nibble
    pub fn read_pair<S: AssetStore>(&mut self, store: &mut S) -> u8 {
        let hi = self.next(store);
        let lo = self.next(store);
        packed::pack(hi, lo)
    }

    /// Produce `count` pixels packed two per byte into `dst`, the first
    /// pixel in the high nibble of `dst[0]`. Pixels past the end of the
    /// stream come out as zero.
    pub fn read_packed<S: AssetStore>(&mut self, store: &mut S, dst: &mut [u8], count: usize) {
        let bytes = count.div_ceil(2);
        for (k, slot) in dst.iter_mut().take(bytes).enumerate() {
            let hi = self.next(store);
            let lo = if 2 * k + 1 < count {
                self.next(store)
            } else {
                0
            };
            *slot = packed::pack(hi, lo);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MemAssets;
    use std::vec;

    #[test]
    fn test_bitmap_header_decodes_little_endian() {
        let h = BitmapHeader::from_bytes(&[0x00, 0x01, 0x40, 0x00, 0x10, 0x00, 0x08, 0x00]);
        assert_eq!(h.width, 256);
        assert_eq!(h.height, 64);
        assert_eq!(h.recommended_x, 16);
        assert_eq!(h.recommended_y, 8);
    }

    #[test]
    fn test_raw_stream_yields_nibbles_in_order() {
        let mut store = MemAssets::new();
        let addr = store.add_blob(&[0x12, 0x34, 0x56]);
        let mut stream = PixelStream::raw(addr, 6, 1);
        let mut out = vec![];
        for _ in 0..6 {
            out.push(stream.next(&mut store));
        }
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_raw_stream_crosses_chunk_boundary() {
        let mut store = MemAssets::new();
        let bytes: vec::Vec<u8> = (0..64u8).collect();
        let addr = store.add_blob(&bytes);
        let mut stream = PixelStream::raw(addr, 128, 1);
        for (i, byte) in bytes.iter().enumerate() {
            assert_eq!(stream.next(&mut store), byte >> 4, "pixel {}", 2 * i);
            assert_eq!(stream.next(&mut store), byte & 0x0F, "pixel {}", 2 * i + 1);
        }
    }

    #[test]
    fn test_exhausted_stream_yields_zeros() {
        let mut store = MemAssets::new();
        let addr = store.add_blob(&[0xFF]);
        let mut stream = PixelStream::raw(addr, 2, 1);
        assert_eq!(stream.next(&mut store), 0xF);
        assert_eq!(stream.next(&mut store), 0xF);
        assert_eq!(stream.pixels_left(), 0);
        assert_eq!(stream.next(&mut store), 0);
        assert_eq!(stream.next(&mut store), 0);
    }

    #[test]
    fn test_rle_stream_expands_runs() {
        let mut store = MemAssets::new();
        // 3x color 5, 1x color 0, 2x color F
        let addr = store.add_blob(&[0x25, 0x00, 0x1F]);
        let mut stream = PixelStream::rle(addr, 6, 1);
        let mut out = vec![];
        for _ in 0..6 {
            out.push(stream.next(&mut store));
        }
        assert_eq!(out, vec![5, 5, 5, 0, 0xF, 0xF]);
    }

    #[test]
    fn test_read_pair_packs_high_first() {
        let mut store = MemAssets::new();
        let addr = store.add_blob(&[0x9C]);
        let mut stream = PixelStream::raw(addr, 2, 1);
        assert_eq!(stream.read_pair(&mut store), 0x9C);
    }

    #[test]
    fn test_read_packed_fills_and_pads() {
        let mut store = MemAssets::new();
        let addr = store.add_blob(&[0x12, 0x34, 0x50]);
        let mut stream = PixelStream::raw(addr, 5, 1);
        let mut dst = [0xAAu8; 3];
        stream.read_packed(&mut store, &mut dst, 5);
        // Last pixel lands in a high nibble, low nibble padded with zero
        assert_eq!(dst, [0x12, 0x34, 0x50]);
    }

    #[test]
    fn test_read_packed_past_end_zero_fills() {
        let mut store = MemAssets::new();
        let addr = store.add_blob(&[0x12]);
        let mut stream = PixelStream::raw(addr, 2, 1);
        let mut dst = [0xAAu8; 2];
        stream.read_packed(&mut store, &mut dst, 4);
        assert_eq!(dst, [0x12, 0x00]);
    }
}
