//! Raw panel drawing engine
//!
//! Owns the bus, the frame buffer and the per-row shadow cache, and
//! implements the drawing primitives common to text, bitmaps and
//! screens: horizontal pixel lines in both buffered and direct modes,
//! rectangles, full and windowed flushes, and the flush transitions.
//!
//! Direct writes go straight to the controller RAM. Because the bus
//! only ever writes whole bytes, a write that starts or ends on an odd
//! column would clobber the neighboring pixel; the shadow cache keeps
//! the last byte written to each row so adjacent direct writes (a glyph
//! following another glyph, a vertical line crossing a box edge) can
//! merge instead.

use embedded_hal::delay::DelayNs;
use sigil_hal::{BulkChannel, DisplayBus};

use crate::command;
use crate::framebuffer::{align_window, FrameBuffer};
use crate::packed;
use crate::{BYTES_PER_ROW, HEIGHT, TRANSITION_PIXEL, WIDTH};

/// Where a drawing primitive writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrawMode {
    /// Stage into the frame buffer, visible on the next flush
    Buffered,
    /// Write straight to controller RAM
    Direct,
}

/// Visual effect applied by the next frame buffer flush.
///
/// A loaded transition is consumed by exactly one flush; the flush
/// always resets it to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transition {
    #[default]
    None,
    /// Reveal the new frame column by column, left to right
    LeftToRight,
    /// Reveal the new frame column by column, right to left
    RightToLeft,
    /// Reveal the new frame row by row, downwards, paced per row
    TopToBottom,
    /// Reveal the new frame row by row, upwards, paced per row
    BottomToTop,
    /// Grow a window from the center outwards
    IrisOut,
    /// Shrink a window from the edges inwards
    IrisIn,
}

/// Pacing of the vertical wipe transitions
const TRANSITION_ROW_DELAY_MS: u32 = 2;

/// Last byte written directly to a row, and the column it went to
#[derive(Debug, Clone, Copy)]
struct ShadowByte {
    col: u16,
    packed: u8,
}

/// Column marker for "nothing cached for this row"
const SHADOW_EMPTY: u16 = u16::MAX;

/// The drawing engine over one panel
pub struct Panel<B, D> {
    pub(crate) bus: B,
    delay: D,
    pub(crate) fb: FrameBuffer,
    shadow: [ShadowByte; HEIGHT],
    /// Right clipping limit for drawing, in pixels
    pub(crate) max_disp_x: i16,
    /// First row drawing may touch
    pub(crate) min_disp_y: i16,
    /// One past the last row drawing may touch
    pub(crate) max_disp_y: i16,
    /// Whether content crossing the screen edge wraps around
    pub(crate) wrapping_allowed: bool,
    oled_on: bool,
    flush_in_progress: bool,
    pending_transition: Transition,
}

impl<B, D> Panel<B, D>
where
    B: DisplayBus + BulkChannel,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            fb: FrameBuffer::new(),
            shadow: [ShadowByte {
                col: SHADOW_EMPTY,
                packed: 0,
            }; HEIGHT],
            max_disp_x: WIDTH as i16,
            min_disp_y: 0,
            max_disp_y: HEIGHT as i16,
            wrapping_allowed: false,
            oled_on: false,
            flush_in_progress: false,
            pending_transition: Transition::None,
        }
    }

    /// Send the power-up sequence, clear the panel and switch it on
    pub fn power_up(&mut self) {
        for &(opcode, payload) in command::INIT_SEQUENCE {
            self.bus.send_command(opcode);
            for &byte in payload {
                self.bus.send_command(byte);
            }
        }
        self.clear_screen();
        self.fb.clear();
        self.flush_in_progress = false;
        self.oled_on();
        self.delay.delay_ms(command::POWER_UP_SETTLE_MS);
    }

    pub(crate) fn set_row_address(&mut self, row: u8) {
        self.bus.send_command(command::SET_ROW_ADDR);
        self.bus.send_command(row);
    }

    pub(crate) fn set_column_address(&mut self, col: u8) {
        self.bus.send_command(command::SET_HIGH_COLUMN_ADDR | (col >> 4));
        self.bus.send_command(command::SET_LOW_COLUMN_ADDR | (col & 0x0F));
    }

    /// Switch the panel on
    pub fn oled_on(&mut self) {
        self.bus.send_command(command::SET_DISPLAY_ON);
        self.oled_on = true;
    }

    /// Switch the panel off; controller RAM is retained
    pub fn oled_off(&mut self) {
        self.bus.send_command(command::SET_DISPLAY_OFF);
        self.oled_on = false;
    }

    pub fn is_oled_on(&self) -> bool {
        self.oled_on
    }

    pub fn set_contrast(&mut self, contrast: u8) {
        self.bus.send_command(command::SET_CONTRAST_CURRENT);
        self.bus.send_data(contrast);
    }

    /// Load the transition the next flush will use
    pub fn load_transition(&mut self, transition: Transition) {
        self.pending_transition = transition;
    }

    pub fn set_min_display_y(&mut self, y: u16) {
        self.min_disp_y = y.min(HEIGHT as u16) as i16;
    }

    pub fn set_max_display_y(&mut self, y: u16) {
        self.max_disp_y = y.min(HEIGHT as u16) as i16;
    }

    pub fn reset_display_y_limits(&mut self) {
        self.min_disp_y = 0;
        self.max_disp_y = HEIGHT as i16;
    }

    pub fn allow_screen_wrapping(&mut self) {
        self.wrapping_allowed = true;
    }

    pub fn prevent_screen_wrapping(&mut self) {
        self.wrapping_allowed = false;
    }

    /// The staged frame
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.fb
    }

    /// Mutable access to the staged frame; waits out any flush still
    /// reading from it
    pub fn frame_buffer_mut(&mut self) -> &mut FrameBuffer {
        self.check_flush_and_terminate();
        &mut self.fb
    }

    /// Zero the staged frame without touching the panel
    pub fn clear_frame_buffer(&mut self) {
        self.check_flush_and_terminate();
        self.fb.clear();
    }

    /// Set every panel pixel to `color` without touching the frame buffer
    pub fn fill_screen(&mut self, color: u8) {
        self.check_flush_and_terminate();
        self.set_row_address(0);
        self.set_column_address(0);
        self.bus.begin_data();
        for _ in 0..BYTES_PER_ROW * HEIGHT {
            self.bus.push_data(packed::duplicate(color));
        }
        self.bus.wait_tx_complete();
        self.bus.end_data();
    }

    /// Blank the panel and forget all cached row bytes
    pub fn clear_screen(&mut self) {
        self.fill_screen(0);
        self.shadow = [ShadowByte {
            col: SHADOW_EMPTY,
            packed: 0,
        }; HEIGHT];
    }

    /// Draw `width` pixels at `(x, y)`, packed two per byte with the
    /// first pixel in the high nibble of `pixels[0]`.
    ///
    /// Rows outside the display y window are dropped. Negative `x` and
    /// overflow past the right edge are clipped, or wrapped around the
    /// same row when wrapping is enabled.
    pub fn write_horizontal_line(
        &mut self,
        x: i16,
        y: i16,
        width: u16,
        pixels: &[u8],
        mode: DrawMode,
    ) {
        if y < self.min_disp_y || y >= self.max_disp_y {
            return;
        }
        match mode {
            DrawMode::Buffered => {
                self.check_flush_and_terminate();
                let max_x = self.max_disp_x.max(0) as u16;
                let wrap = self.wrapping_allowed;
                self.fb.blit_row(y as usize, x, width, pixels, wrap, max_x);
            }
            DrawMode::Direct => self.direct_line(x, y as usize, width, pixels),
        }
    }

    /// Direct-mode line: same head/body/overflow segmentation as the
    /// frame buffer blit, one addressed bus write per segment
    fn direct_line(&mut self, x: i16, y: usize, width: u16, pixels: &[u8]) {
        let max_x = self.max_disp_x.clamp(0, WIDTH as i16);
        let width = width as i16;
        if width == 0 {
            return;
        }

        if x < 0 && self.wrapping_allowed {
            let head = (-x).min(width);
            self.direct_span(y, (x + WIDTH as i16) as usize, pixels, 0, head as usize);
        }

        let start = x.max(0);
        let end = (x + width).min(max_x);
        if end > start {
            self.direct_span(
                y,
                start as usize,
                pixels,
                (start - x) as usize,
                (end - start) as usize,
            );
        }

        if self.wrapping_allowed {
            let over_start = x.max(WIDTH as i16);
            let over_end = (x + width).min(2 * WIDTH as i16);
            if over_end > over_start {
                self.direct_span(
                    y,
                    (over_start - WIDTH as i16) as usize,
                    pixels,
                    (over_start - x) as usize,
                    (over_end - over_start) as usize,
                );
            }
        }
    }

    /// One addressed direct write of `count` pixels to row `y` starting
    /// at column `dest_x`, merging partial end bytes with the shadow
    /// cache when it covers them
    fn direct_span(&mut self, y: usize, dest_x: usize, pixels: &[u8], src_off: usize, count: usize) {
        let count = count.min(WIDTH - dest_x);
        if count == 0 {
            return;
        }
        self.check_flush_and_terminate();
        let shadow = self.shadow[y];
        let first_col = dest_x / 2;

        self.set_row_address(y as u8);
        self.set_column_address(first_col as u8);
        self.bus.begin_data();

        let mut i = 0;
        let mut last_byte = 0u8;

        if dest_x % 2 == 1 {
            let pixel = packed::at(pixels, src_off);
            last_byte = if shadow.col == first_col as u16 {
                packed::merge_lo(shadow.packed, pixel)
            } else {
                pixel & 0x0F
            };
            self.bus.push_data(last_byte);
            i += 1;
        }

        while i + 2 <= count {
            last_byte = packed::pack(
                packed::at(pixels, src_off + i),
                packed::at(pixels, src_off + i + 1),
            );
            self.bus.push_data(last_byte);
            i += 2;
        }

        if i < count {
            let pixel = packed::at(pixels, src_off + i);
            let last_col = ((dest_x + count - 1) / 2) as u16;
            last_byte = if shadow.col == last_col {
                packed::merge_hi(shadow.packed, pixel)
            } else {
                pixel << 4
            };
            self.bus.push_data(last_byte);
        }

        self.bus.wait_tx_complete();
        self.bus.end_data();

        self.shadow[y] = ShadowByte {
            col: ((dest_x + count - 1) / 2) as u16,
            packed: last_byte,
        };
    }

    /// Fill a rectangle with one color
    pub fn draw_rectangle(
        &mut self,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        color: u8,
        mode: DrawMode,
    ) {
        let width = width.min(WIDTH as u16);
        let line = [packed::duplicate(color); BYTES_PER_ROW];
        for row in 0..height as i16 {
            self.write_horizontal_line(x, y + row, width, &line, mode);
        }
    }

    /// One-pixel-wide vertical line from `ystart` to `yend`, inclusive
    pub fn draw_vertical_line(&mut self, x: i16, ystart: i16, yend: i16, color: u8, mode: DrawMode) {
        let line = [packed::duplicate(color)];
        for y in ystart.max(0)..=yend {
            self.write_horizontal_line(x, y, 1, &line, mode);
        }
    }

    /// Finish a previously started frame buffer flush, if one is still
    /// in flight
    pub fn check_flush_and_terminate(&mut self) {
        if self.flush_in_progress {
            while !self.bus.poll_and_clear_complete() {}
            self.bus.wait_tx_complete();
            self.bus.end_data();
            self.flush_in_progress = false;
        }
    }

    /// Push the staged frame to the panel, applying the loaded
    /// transition (consumed; subsequent flushes are plain again).
    ///
    /// A plain flush only starts the bulk transfer and returns; it
    /// completes in the background and is reaped by the next operation
    /// that needs the bus or the frame buffer.
    pub fn flush_frame_buffer(&mut self) {
        self.check_flush_and_terminate();

        match core::mem::take(&mut self.pending_transition) {
            Transition::None => {
                self.set_row_address(0);
                self.set_column_address(0);
                self.bus.begin_data();
                self.bus.start_transfer(self.fb.as_bytes());
                self.flush_in_progress = true;
            }
            Transition::LeftToRight => {
                for xb in 0..BYTES_PER_ROW {
                    for y in 0..HEIGHT {
                        let data = [self.fb.row(y)[xb], TRANSITION_PIXEL];
                        if xb * 2 + 2 < WIDTH {
                            self.write_horizontal_line(
                                (xb * 2) as i16,
                                y as i16,
                                4,
                                &data,
                                DrawMode::Direct,
                            );
                        } else {
                            self.write_horizontal_line(
                                (xb * 2) as i16,
                                y as i16,
                                2,
                                &data,
                                DrawMode::Direct,
                            );
                        }
                    }
                }
            }
            Transition::RightToLeft => {
                for xb in (-1..=(BYTES_PER_ROW as i16) - 2).rev() {
                    for y in 0..HEIGHT {
                        let data = [
                            TRANSITION_PIXEL << 4,
                            self.fb.row(y)[(xb + 1) as usize],
                        ];
                        if xb > 0 {
                            self.write_horizontal_line(xb * 2, y as i16, 4, &data, DrawMode::Direct);
                        } else {
                            self.write_horizontal_line(
                                xb * 2 + 2,
                                y as i16,
                                2,
                                &data[1..],
                                DrawMode::Direct,
                            );
                        }
                    }
                }
            }
            Transition::TopToBottom => {
                for y in 0..HEIGHT {
                    self.direct_full_row(y);
                    if y + 2 < HEIGHT {
                        self.draw_rectangle(
                            0,
                            (y + 2) as i16,
                            WIDTH as u16,
                            1,
                            TRANSITION_PIXEL,
                            DrawMode::Direct,
                        );
                    }
                    self.delay.delay_ms(TRANSITION_ROW_DELAY_MS);
                }
            }
            Transition::BottomToTop => {
                for y in (0..HEIGHT).rev() {
                    self.direct_full_row(y);
                    if y >= 2 {
                        self.draw_rectangle(
                            0,
                            (y - 2) as i16,
                            WIDTH as u16,
                            1,
                            TRANSITION_PIXEL,
                            DrawMode::Direct,
                        );
                    }
                    self.delay.delay_ms(TRANSITION_ROW_DELAY_MS);
                }
            }
            Transition::IrisOut => self.iris_flush(true),
            Transition::IrisIn => self.iris_flush(false),
        }
    }

    /// Flush one frame row directly from the frame buffer
    fn direct_full_row(&mut self, y: usize) {
        let mut row = [0u8; BYTES_PER_ROW];
        row.copy_from_slice(self.fb.row(y));
        self.write_horizontal_line(0, y as i16, WIDTH as u16, &row, DrawMode::Direct);
    }

    /// Flush a frame buffer row segment starting at even column `x`
    fn direct_row_segment(&mut self, y: usize, x: usize, width: u16) {
        let mut buf = [0u8; BYTES_PER_ROW];
        let bytes = (width as usize).div_ceil(2);
        buf[..bytes].copy_from_slice(&self.fb.row(y)[x / 2..x / 2 + bytes]);
        self.write_horizontal_line(x as i16, y as i16, width, &buf[..bytes], DrawMode::Direct);
    }

    /// Iris transitions: grow (outward) or shrink (inward) a centered
    /// window, two columns per step, widening a row every other step
    fn iris_flush(&mut self, outward: bool) {
        let (mut low_y, mut high_y): (i16, i16) = if outward {
            (HEIGHT as i16 / 2 - 1, HEIGHT as i16 / 2)
        } else {
            (0, HEIGHT as i16 - 1)
        };

        let mut step = |panel: &mut Self, i: i16, low_y: i16, high_y: i16| {
            let x_pos = WIDTH as i16 / 2 - 2 * i;
            let x_pos2 = WIDTH as i16 / 2 + 2 * i - 2;
            for y in low_y..=high_y {
                panel.direct_row_segment(y as usize, x_pos as usize, 2);
                panel.direct_row_segment(y as usize, x_pos2 as usize, 2);
            }
            panel.direct_row_segment(low_y as usize, x_pos as usize, (x_pos2 - x_pos) as u16);
            panel.direct_row_segment(high_y as usize, x_pos as usize, (x_pos2 - x_pos) as u16);
        };

        if outward {
            for i in 1..=(WIDTH as i16 / 4) {
                step(self, i, low_y, high_y);
                if i % 2 == 0 {
                    low_y -= 1;
                    high_y += 1;
                }
            }
        } else {
            for i in (1..=(WIDTH as i16 / 4)).rev() {
                step(self, i, low_y, high_y);
                if i % 2 == 1 {
                    low_y += 1;
                    high_y -= 1;
                }
            }
        }
    }

    /// Flush only a window of the staged frame, forced to whole-byte
    /// column alignment
    pub fn flush_frame_buffer_window(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.check_flush_and_terminate();
        let win = align_window(x, y, width, height);
        for row in win.y..win.y + win.height {
            self.direct_row_segment(row as usize, win.x as usize, win.width);
        }
    }
}
