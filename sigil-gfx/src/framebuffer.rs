//! Packed-pixel frame buffer
//!
//! A 256x64 grid of 4-bit pixels, two per byte, row-major, stored flat so
//! a full flush is a single contiguous transfer. The row blit handles the
//! alignment cases of the display format: odd start columns are written
//! by carrying nibbles across byte boundaries, and partial first/last
//! bytes merge with the existing contents instead of clobbering the
//! neighboring pixel.

use crate::packed;
use crate::{BYTES_PER_ROW, HEIGHT, WIDTH};

/// A window rectangle aligned to whole-byte columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedWindow {
    /// Start column, rounded down to even
    pub x: u16,
    /// Start row
    pub y: u16,
    /// Width in pixels, rounded up to even and clipped
    pub width: u16,
    /// Height in rows, clipped
    pub height: u16,
}

/// Round a window to even column boundaries and clip it to the screen.
///
/// Guarantees whole-byte granularity for bulk hardware writes: the
/// returned `x` is even and `width` is even (or zero when the window
/// lies entirely off screen).
pub fn align_window(x: u16, y: u16, width: u16, height: u16) -> AlignedWindow {
    let x = (x / 2) * 2;
    let width = width.div_ceil(2) * 2;

    if x >= WIDTH as u16 || y >= HEIGHT as u16 {
        return AlignedWindow {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    AlignedWindow {
        x,
        y,
        width: width.min(WIDTH as u16 - x),
        height: height.min(HEIGHT as u16 - y),
    }
}

/// The in-memory pixel grid
#[derive(Clone)]
pub struct FrameBuffer {
    bytes: [u8; BYTES_PER_ROW * HEIGHT],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Create a zeroed frame buffer
    pub fn new() -> Self {
        Self {
            bytes: [0; BYTES_PER_ROW * HEIGHT],
        }
    }

    /// Set every pixel to zero
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Set every pixel to `color`
    pub fn fill(&mut self, color: u8) {
        self.bytes.fill(packed::duplicate(color));
    }

    /// The whole buffer as one contiguous byte slice (flush source)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Packed bytes of one row
    pub fn row(&self, y: usize) -> &[u8] {
        &self.bytes[y * BYTES_PER_ROW..(y + 1) * BYTES_PER_ROW]
    }

    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.bytes[y * BYTES_PER_ROW..(y + 1) * BYTES_PER_ROW]
    }

    /// Read one pixel; columns/rows outside the screen read as zero
    pub fn get_pixel(&self, x: usize, y: usize) -> u8 {
        if x >= WIDTH || y >= HEIGHT {
            return 0;
        }
        packed::at(self.row(y), x)
    }

    /// Write one pixel, preserving its packed neighbor
    pub fn set_pixel(&mut self, x: usize, y: usize, color: u8) {
        if x >= WIDTH || y >= HEIGHT {
            return;
        }
        let byte = &mut self.row_mut(y)[x / 2];
        *byte = if x % 2 == 0 {
            packed::merge_hi(*byte, color)
        } else {
            packed::merge_lo(*byte, color)
        };
    }

    /// Blit `width` source pixels into row `y` starting at column `x`.
    ///
    /// `pixels` is packed source data whose first pixel sits in the high
    /// nibble of `pixels[0]`. Negative `x` drops the off-screen head, or
    /// wraps it to the right edge of the same row when `wrap` is set.
    /// Pixels past `max_x` are dropped; with `wrap` set, pixels past the
    /// screen edge continue at column 0 of the same row. Partial bytes at
    /// either end merge with existing contents.
    pub fn blit_row(&mut self, y: usize, x: i16, width: u16, pixels: &[u8], wrap: bool, max_x: u16) {
        if y >= HEIGHT || width == 0 {
            return;
        }
        let max_x = max_x.min(WIDTH as u16) as i16;
        let width = width as i16;

        // Off-screen head: dropped, or wrapped to the right edge
        if x < 0 {
            let head = (-x).min(width);
            if wrap {
                let dest = (x + WIDTH as i16) as usize;
                self.blit_span(y, dest, pixels, 0, head as usize);
            }
        }

        // On-screen body, truncated at the active right margin
        let start = x.max(0);
        let end = (x + width).min(max_x);
        if end > start {
            self.blit_span(
                y,
                start as usize,
                pixels,
                (start - x) as usize,
                (end - start) as usize,
            );
        }

        // Overflow past the screen edge continues at column 0
        if wrap {
            let over_start = x.max(WIDTH as i16);
            let over_end = (x + width).min(2 * WIDTH as i16);
            if over_end > over_start {
                self.blit_span(
                    y,
                    (over_start - WIDTH as i16) as usize,
                    pixels,
                    (over_start - x) as usize,
                    (over_end - over_start) as usize,
                );
            }
        }
    }

    /// Copy `count` source pixels (starting at pixel index `src_off` of
    /// `pixels`) to columns `dest_x..` of row `y`. All coordinates are
    /// already on screen.
    fn blit_span(&mut self, y: usize, dest_x: usize, pixels: &[u8], src_off: usize, count: usize) {
        let count = count.min(WIDTH - dest_x);
        let row = self.row_mut(y);
        let mut i = 0;
        let mut dx = dest_x;

        // Leading odd column: low nibble only
        if dx % 2 == 1 && i < count {
            row[dx / 2] = packed::merge_lo(row[dx / 2], packed::at(pixels, src_off + i));
            i += 1;
            dx += 1;
        }

        // Byte-aligned middle
        if (src_off + i) % 2 == 0 {
            // Source and destination agree on byte boundaries
            let full = (count - i) / 2;
            let src_byte = (src_off + i) / 2;
            row[dx / 2..dx / 2 + full].copy_from_slice(&pixels[src_byte..src_byte + full]);
            i += full * 2;
            dx += full * 2;
        } else {
            // Shifted: carry the low nibble of each source byte into the
            // high nibble of the next destination byte
            while i + 2 <= count {
                let b = packed::pack(
                    packed::at(pixels, src_off + i),
                    packed::at(pixels, src_off + i + 1),
                );
                row[dx / 2] = b;
                i += 2;
                dx += 2;
            }
        }

        // Trailing odd pixel: high nibble only
        if i < count {
            row[dx / 2] = packed::merge_hi(row[dx / 2], packed::at(pixels, src_off + i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Single-pixel reference for `blit_row`, applying the same
    /// clip/wrap rules one pixel at a time.
    fn blit_row_reference(
        fb: &mut FrameBuffer,
        y: usize,
        x: i16,
        width: u16,
        pixels: &[u8],
        wrap: bool,
        max_x: u16,
    ) {
        let max_x = max_x.min(WIDTH as u16) as i16;
        for i in 0..width as i16 {
            let px = x + i;
            let dest = if px < 0 {
                if !wrap {
                    continue;
                }
                px + WIDTH as i16
            } else if px >= max_x {
                if !(wrap && px >= WIDTH as i16) {
                    continue;
                }
                px - WIDTH as i16
            } else {
                px
            };
            if (0..WIDTH as i16).contains(&dest) {
                fb.set_pixel(dest as usize, y, packed::at(pixels, i as usize));
            }
        }
    }

    #[test]
    fn test_aligned_blit() {
        let mut fb = FrameBuffer::new();
        fb.blit_row(3, 10, 4, &[0x12, 0x34], false, WIDTH as u16);
        assert_eq!(fb.get_pixel(10, 3), 1);
        assert_eq!(fb.get_pixel(11, 3), 2);
        assert_eq!(fb.get_pixel(12, 3), 3);
        assert_eq!(fb.get_pixel(13, 3), 4);
    }

    #[test]
    fn test_odd_start_preserves_neighbor() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(10, 0, 0xA);
        fb.blit_row(0, 11, 2, &[0x12], false, WIDTH as u16);
        // Pixel 10 keeps its value, 11 and 12 come from the source
        assert_eq!(fb.get_pixel(10, 0), 0xA);
        assert_eq!(fb.get_pixel(11, 0), 1);
        assert_eq!(fb.get_pixel(12, 0), 2);
    }

    #[test]
    fn test_trailing_odd_pixel_preserves_neighbor() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(13, 0, 0xB);
        fb.blit_row(0, 10, 3, &[0x12, 0x30], false, WIDTH as u16);
        assert_eq!(fb.get_pixel(12, 0), 3);
        assert_eq!(fb.get_pixel(13, 0), 0xB);
    }

    #[test]
    fn test_negative_x_dropped_without_wrap() {
        let mut fb = FrameBuffer::new();
        fb.blit_row(0, -2, 4, &[0x12, 0x34], false, WIDTH as u16);
        assert_eq!(fb.get_pixel(0, 0), 3);
        assert_eq!(fb.get_pixel(1, 0), 4);
        assert_eq!(fb.get_pixel(2, 0), 0);
        // The wrapped columns stay untouched
        assert_eq!(fb.get_pixel(254, 0), 0);
    }

    #[test]
    fn test_negative_x_wraps_to_right_edge() {
        let mut fb = FrameBuffer::new();
        fb.blit_row(0, -2, 4, &[0x12, 0x34], true, WIDTH as u16);
        assert_eq!(fb.get_pixel(254, 0), 1);
        assert_eq!(fb.get_pixel(255, 0), 2);
        assert_eq!(fb.get_pixel(0, 0), 3);
        assert_eq!(fb.get_pixel(1, 0), 4);
    }

    #[test]
    fn test_right_margin_truncates() {
        let mut fb = FrameBuffer::new();
        fb.blit_row(0, 198, 8, &[0x11; 4], false, 200);
        assert_eq!(fb.get_pixel(198, 0), 1);
        assert_eq!(fb.get_pixel(199, 0), 1);
        assert_eq!(fb.get_pixel(200, 0), 0);
    }

    #[test]
    fn test_align_window_evens_bounds() {
        let w = align_window(3, 5, 7, 10);
        assert_eq!((w.x, w.y, w.width, w.height), (2, 5, 8, 10));

        let w = align_window(250, 60, 20, 20);
        assert_eq!((w.x, w.width, w.height), (250, 6, 4));

        let w = align_window(300, 0, 4, 4);
        assert_eq!(w.width, 0);
    }

    #[test]
    fn test_fill_and_clear() {
        let mut fb = FrameBuffer::new();
        fb.fill(0x7);
        assert!(fb.as_bytes().iter().all(|&b| b == 0x77));
        fb.clear();
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }

    proptest! {
        /// Any (x, width, alignment, wrap) combination must produce the
        /// same final bytes as single-pixel writes.
        #[test]
        fn blit_row_matches_single_pixel_writes(
            x in -64i16..320,
            width in 0u16..320,
            max_x in 1u16..=WIDTH as u16,
            wrap in proptest::bool::ANY,
            seed in proptest::collection::vec(0u8..=255, 160),
        ) {
            let mut fast = FrameBuffer::new();
            let mut slow = FrameBuffer::new();
            // Start both from the same nonzero background
            for col in 0..WIDTH {
                fast.set_pixel(col, 1, (col % 16) as u8);
                slow.set_pixel(col, 1, (col % 16) as u8);
            }

            fast.blit_row(1, x, width, &seed, wrap, max_x);
            blit_row_reference(&mut slow, 1, x, width, &seed, wrap, max_x);

            prop_assert_eq!(fast.row(1), slow.row(1));
        }
    }
}
