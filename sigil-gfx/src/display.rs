//! High-level display API
//!
//! [`Display`] combines the panel drawing engine with the flash asset
//! store: bitmap blitting with its three write strategies, font
//! selection and text layout. Text flows from a cursor with optional
//! line feed, carriage return and partial-glyph clipping, bounded by a
//! text window that can be narrower than the drawing window.

use embedded_hal::delay::DelayNs;
use sigil_hal::{AssetError, AssetStore, AssetType, BulkChannel, DisplayBus};

use crate::bitstream::{BitmapHeader, PixelStream};
use crate::font::{GlyphMetrics, SelectedFont};
use crate::panel::{DrawMode, Panel};
use crate::{BYTES_PER_ROW, HEIGHT, WIDTH};

/// File ID of the ASCII-only fallback font, always present in the
/// asset bundle
pub const EMERGENCY_FONT_FILE_ID: u32 = 0;

/// Chunk size (in pixels) of the full-screen streaming path; two
/// buffers of half this each
const FULL_SCREEN_CHUNK_PIXELS: usize = 64;

/// Drawing and text errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GfxError {
    /// The requested file is not in the asset store
    AssetNotFound,
    /// A text operation was attempted with no font selected
    NoFontSelected,
    /// The glyph does not fit the text window and partial drawing is
    /// not allowed
    TextDoesNotFit,
    /// The bitmap is wider than the line staging buffer
    BitmapTooWide,
}

impl From<AssetError> for GfxError {
    fn from(_: AssetError) -> Self {
        GfxError::AssetNotFound
    }
}

/// Horizontal placement of a string within the text window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Justify {
    Left,
    Center,
    Right,
}

/// The display: drawing engine, asset store and text state
pub struct Display<B, S, D> {
    panel: Panel<B, D>,
    assets: S,
    font: Option<SelectedFont>,
    cur_text_x: i16,
    cur_text_y: i16,
    /// Left text margin
    min_text_x: i16,
    /// Right text margin (exclusive)
    max_text_x: i16,
    line_feed_allowed: bool,
    carriage_return_allowed: bool,
    partial_x_allowed: bool,
    partial_y_allowed: bool,
}

/// Map a char to the 16-bit codepoints fonts are indexed by;
/// non-BMP characters become the sentinel and render as `?`
fn codepoint(ch: char) -> u16 {
    u16::try_from(ch as u32).unwrap_or(u16::MAX)
}

impl<B, S, D> Display<B, S, D>
where
    B: DisplayBus + BulkChannel,
    S: AssetStore,
    D: DelayNs,
{
    pub fn new(bus: B, assets: S, delay: D) -> Self {
        Self {
            panel: Panel::new(bus, delay),
            assets,
            font: None,
            cur_text_x: 0,
            cur_text_y: 0,
            min_text_x: 0,
            max_text_x: WIDTH as i16,
            line_feed_allowed: false,
            carriage_return_allowed: false,
            partial_x_allowed: false,
            partial_y_allowed: false,
        }
    }

    /// Power up the panel, reset all text state and select the
    /// emergency font.
    ///
    /// A device whose asset bundle lacks the emergency font still gets
    /// a working panel, just with no font selected.
    pub fn init(&mut self) {
        self.font = None;
        self.cur_text_x = 0;
        self.cur_text_y = 0;
        self.min_text_x = 0;
        self.max_text_x = WIDTH as i16;
        self.line_feed_allowed = false;
        self.carriage_return_allowed = false;
        self.partial_x_allowed = false;
        self.partial_y_allowed = false;
        self.panel.reset_display_y_limits();
        self.panel.prevent_screen_wrapping();
        self.panel.power_up();
        let _ = self.set_emergency_font();
    }

    /// The panel drawing engine, for primitives not involving assets
    pub fn panel(&mut self) -> &mut Panel<B, D> {
        &mut self.panel
    }

    /// Blank the panel and reset the text cursor
    pub fn clear_screen(&mut self) {
        self.panel.clear_screen();
        self.cur_text_x = 0;
        self.cur_text_y = 0;
    }

    // --- Text window and flow control ---

    pub fn set_xy(&mut self, x: i16, y: i16) {
        self.cur_text_x = x;
        self.cur_text_y = y;
    }

    pub fn set_min_text_x(&mut self, x: i16) {
        self.min_text_x = x;
    }

    pub fn set_max_text_x(&mut self, x: i16) {
        self.max_text_x = x;
    }

    pub fn reset_min_text_x(&mut self) {
        self.min_text_x = 0;
    }

    pub fn reset_max_text_x(&mut self) {
        self.max_text_x = WIDTH as i16;
    }

    pub fn allow_line_feed(&mut self) {
        self.line_feed_allowed = true;
    }

    pub fn prevent_line_feed(&mut self) {
        self.line_feed_allowed = false;
    }

    pub fn allow_carriage_return(&mut self) {
        self.carriage_return_allowed = true;
    }

    pub fn prevent_carriage_return(&mut self) {
        self.carriage_return_allowed = false;
    }

    pub fn allow_partial_x_draw(&mut self) {
        self.partial_x_allowed = true;
    }

    pub fn prevent_partial_x_draw(&mut self) {
        self.partial_x_allowed = false;
    }

    pub fn allow_partial_y_draw(&mut self) {
        self.partial_y_allowed = true;
    }

    pub fn prevent_partial_y_draw(&mut self) {
        self.partial_y_allowed = false;
    }

    // --- Fonts and text ---

    /// Select the font with the given file ID. On failure the display
    /// is left with no font selected.
    pub fn select_font(&mut self, font_id: u32) -> Result<(), GfxError> {
        match self.assets.get_file_address(font_id, AssetType::Font) {
            Ok(addr) => {
                self.font = Some(SelectedFont::load(&mut self.assets, addr));
                Ok(())
            }
            Err(err) => {
                self.font = None;
                Err(err.into())
            }
        }
    }

    /// Fall back to the ASCII-only emergency font
    pub fn set_emergency_font(&mut self) -> Result<(), GfxError> {
        self.select_font(EMERGENCY_FONT_FILE_ID)
    }

    fn glyph_metrics(&mut self, cp: u16) -> GlyphMetrics {
        match &self.font {
            Some(font) => font.metrics(&mut self.assets, cp),
            None => GlyphMetrics::default(),
        }
    }

    /// Advance width of one character in the current font; zero when
    /// it cannot be rendered
    pub fn glyph_width(&mut self, ch: char) -> u16 {
        self.glyph_metrics(codepoint(ch)).advance
    }

    /// Pixel width of a string in the current font, up to the first
    /// carriage return
    pub fn string_width(&mut self, text: &str) -> u16 {
        let mut width = 0u16;
        for ch in text.chars() {
            if ch == '\r' {
                break;
            }
            width += self.glyph_metrics(codepoint(ch)).advance;
        }
        width
    }

    /// Draw one glyph at `(x, y)` (top-left of its line box) and return
    /// the horizontal advance. Unrenderable characters draw nothing and
    /// advance by zero.
    pub fn draw_glyph(&mut self, x: i16, y: i16, ch: char, mode: DrawMode) -> u16 {
        let cp = codepoint(ch);
        let (glyph, data_addr) = match &self.font {
            None => return 0,
            Some(font) => match font.resolve(&mut self.assets, cp) {
                None => return 0,
                Some(glyph) => (glyph, font.data_addr()),
            },
        };

        if !glyph.is_space() {
            let mut stream = PixelStream::raw(
                data_addr + glyph.data_offset,
                glyph.width as u16,
                glyph.height as u16,
            );
            // A glyph is at most 255 pixels wide, it always fits the
            // line staging buffer
            let _ = self.draw_stream(
                x + glyph.x_offset as i16,
                y + glyph.y_offset as i16,
                glyph.width as u16,
                glyph.height as u16,
                &mut stream,
                mode,
            );
        }

        (glyph.width as i16 + glyph.x_offset as i16 + 1).max(0) as u16
    }

    /// Print one character at the text cursor, handling line feed,
    /// carriage return and window limits
    pub fn put_char(&mut self, ch: char, mode: DrawMode) -> Result<(), GfxError> {
        let glyph_height = match &self.font {
            Some(font) => font.glyph_height() as i16,
            None => return Err(GfxError::NoFontSelected),
        };

        if ch == '\n' && self.line_feed_allowed {
            self.cur_text_y += glyph_height;
            self.cur_text_x = 0;
            return Ok(());
        }
        if ch == '\r' && self.carriage_return_allowed {
            self.cur_text_x = 0;
            return Ok(());
        }

        let metrics = self.glyph_metrics(codepoint(ch));

        if metrics.advance as i16 + self.cur_text_x > self.max_text_x {
            if self.line_feed_allowed {
                self.cur_text_y += glyph_height;
                self.cur_text_x = 0;
                if self.cur_text_y >= self.panel.max_disp_y {
                    return Err(GfxError::TextDoesNotFit);
                }
            } else if self.cur_text_x < self.max_text_x && self.partial_x_allowed {
                // Partially visible glyph, clipped at the right margin
            } else {
                return Err(GfxError::TextDoesNotFit);
            }
        }

        if metrics.render_height as i16 + self.cur_text_y > self.panel.max_disp_y
            && !self.partial_y_allowed
        {
            return Err(GfxError::TextDoesNotFit);
        }

        // Glyphs clip at the text margin, not the drawing margin
        let max_disp_x_copy = self.panel.max_disp_x;
        self.panel.max_disp_x = self.max_text_x;
        let advance = self.draw_glyph(self.cur_text_x, self.cur_text_y, ch, mode);
        self.panel.max_disp_x = max_disp_x_copy;
        self.cur_text_x += advance as i16;

        Ok(())
    }

    /// Print a string at the text cursor; returns how many characters
    /// were printed before running out of room
    pub fn put_string(&mut self, text: &str, mode: DrawMode) -> usize {
        let mut printed = 0;
        for ch in text.chars() {
            if self.put_char(ch, mode).is_err() {
                return printed;
            }
            printed += 1;
        }
        printed
    }

    /// Print a string at `(x, y)` with the given justification;
    /// returns how many characters were printed
    pub fn put_string_xy(
        &mut self,
        x: i16,
        y: i16,
        justify: Justify,
        text: &str,
        mode: DrawMode,
    ) -> usize {
        let width = self.string_width(text) as i16;
        let max_text_x_copy = self.max_text_x;
        let mut x = x;

        match justify {
            Justify::Left => {}
            Justify::Center => {
                if x + self.min_text_x + width < self.max_text_x {
                    x = self.min_text_x + x + (self.max_text_x - self.min_text_x - width) / 2;
                } else {
                    x = self.min_text_x;
                }
            }
            Justify::Right => {
                if x < self.max_text_x {
                    self.max_text_x = x;
                }
                if x >= width + self.min_text_x {
                    x -= width;
                } else if width + self.min_text_x >= self.max_text_x {
                    x = self.min_text_x;
                } else {
                    x = self.max_text_x - width;
                }
            }
        }

        self.cur_text_x = x;
        self.cur_text_y = y;
        let printed = self.put_string(text, mode);
        self.max_text_x = max_text_x_copy;
        printed
    }

    /// Print a string centered within the text window at row `y`
    pub fn put_centered_string(&mut self, y: i16, text: &str, mode: DrawMode) -> usize {
        self.put_string_xy(0, y, Justify::Center, text, mode)
    }

    /// Print an error message centered at the top of the screen,
    /// straight to the panel
    pub fn put_error_string(&mut self, text: &str) -> usize {
        self.put_string_xy(0, 0, Justify::Center, text, DrawMode::Direct)
    }

    // --- Bitmaps ---

    /// Draw the bitmap asset `file_id` with its top-left corner at
    /// `(x, y)`
    pub fn display_bitmap_from_flash(
        &mut self,
        x: i16,
        y: i16,
        file_id: u32,
        mode: DrawMode,
    ) -> Result<(), GfxError> {
        let addr = self.assets.get_file_address(file_id, AssetType::Bitmap)?;
        let header = BitmapHeader::load(&mut self.assets, addr);
        let mut stream = PixelStream::raw(
            addr + BitmapHeader::SIZE as u32,
            header.width,
            header.height,
        );
        self.draw_stream(x, y, header.width, header.height, &mut stream, mode)
    }

    /// Draw the bitmap asset `file_id` at the position stored in its
    /// header
    pub fn display_bitmap_at_recommended_position(
        &mut self,
        file_id: u32,
        mode: DrawMode,
    ) -> Result<(), GfxError> {
        let addr = self.assets.get_file_address(file_id, AssetType::Bitmap)?;
        let header = BitmapHeader::load(&mut self.assets, addr);
        let mut stream = PixelStream::raw(
            addr + BitmapHeader::SIZE as u32,
            header.width,
            header.height,
        );
        self.draw_stream(
            header.recommended_x as i16,
            header.recommended_y as i16,
            header.width,
            header.height,
            &mut stream,
            mode,
        )
    }

    /// Draw `width * height` pixels from a stream at `(x, y)`.
    ///
    /// Three write strategies produce identical panel contents:
    /// a chunked streaming path for full-screen direct draws, a
    /// row-at-a-time bulk path for byte-aligned direct draws, and a
    /// generic per-row path for everything else. Off-window rows are
    /// skipped on the panel but still consumed from the stream.
    pub fn draw_stream(
        &mut self,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        stream: &mut PixelStream,
        mode: DrawMode,
    ) -> Result<(), GfxError> {
        let mut x = x;
        let wrap = self.panel.wrapping_allowed;

        // Entirely off screen on the left
        if (x < 0 && -x >= width as i16 && !wrap) || x < -(WIDTH as i16) {
            return Ok(());
        }

        // Past the right limit: wrap back once, or give up
        if x >= self.panel.max_disp_x && wrap {
            x -= self.panel.max_disp_x;
        }
        if x >= self.panel.max_disp_x {
            return Ok(());
        }

        if width as usize / 2 > BYTES_PER_ROW {
            return Err(GfxError::BitmapTooWide);
        }

        let full_screen = x == 0
            && y == 0
            && width as usize == WIDTH
            && height as usize == HEIGHT
            && self.panel.min_disp_y == 0
            && self.panel.max_disp_y == HEIGHT as i16
            && mode == DrawMode::Direct;

        if full_screen {
            self.draw_stream_full_screen(stream);
        } else if mode == DrawMode::Buffered {
            self.draw_stream_rows(x, y, width, height, stream, DrawMode::Buffered);
        } else if width % 2 == 0
            && x % 2 == 0
            && self.panel.max_disp_x % 2 == 0
            && !(x < 0 && wrap)
            && !(wrap && x + width as i16 > self.panel.max_disp_x)
        {
            self.draw_stream_aligned(x, y, width, height, stream);
        } else {
            self.draw_stream_rows(x, y, width, height, stream, DrawMode::Direct);
        }
        Ok(())
    }

    /// Full-screen fast path: the whole pixel stream goes out as one
    /// continuous byte sequence, decoded chunk by chunk into two
    /// ping-pong buffers so decoding overlaps transmission
    fn draw_stream_full_screen(&mut self, stream: &mut PixelStream) {
        self.panel.check_flush_and_terminate();
        self.panel.set_row_address(0);
        self.panel.set_column_address(0);
        self.panel.bus.begin_data();

        let mut bufs = [[0u8; FULL_SCREEN_CHUNK_PIXELS / 2]; 2];
        let mut sel = 0;

        stream.read_packed(&mut self.assets, &mut bufs[sel], FULL_SCREEN_CHUNK_PIXELS);
        self.panel.bus.start_transfer(&bufs[sel]);

        let mut sent = FULL_SCREEN_CHUNK_PIXELS;
        while sent < WIDTH * HEIGHT {
            stream.read_packed(&mut self.assets, &mut bufs[1 - sel], FULL_SCREEN_CHUNK_PIXELS);
            while !self.panel.bus.poll_and_clear_complete() {}
            sel = 1 - sel;
            self.panel.bus.start_transfer(&bufs[sel]);
            sent += FULL_SCREEN_CHUNK_PIXELS;
        }

        while !self.panel.bus.poll_and_clear_complete() {}
        self.panel.bus.wait_tx_complete();
        self.panel.bus.end_data();
    }

    /// Byte-aligned direct path: one bulk transfer per visible row,
    /// decoding the next row while the current one transmits
    fn draw_stream_aligned(
        &mut self,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        stream: &mut PixelStream,
    ) {
        let mut x = x;
        let mut offset = 0usize;
        let mut send_px = width as i16;

        // Clip the off-screen head by starting further into each
        // decoded row
        if x < 0 {
            offset = (-x / 2) as usize;
            send_px += x;
            x = 0;
        }
        if x + send_px > self.panel.max_disp_x {
            send_px = self.panel.max_disp_x - x;
        }
        if send_px <= 0 {
            return;
        }

        self.panel.check_flush_and_terminate();

        let mut bufs = [[0u8; BYTES_PER_ROW]; 2];
        let mut sel = 0;
        stream.read_packed(&mut self.assets, &mut bufs[sel], width as usize);

        for j in 0..height as i16 {
            let row = y + j;
            let visible = row >= self.panel.min_disp_y && row < self.panel.max_disp_y;
            if visible {
                self.panel.set_row_address(row as u8);
                self.panel.set_column_address((x / 2) as u8);
                self.panel.bus.begin_data();
                self.panel
                    .bus
                    .start_transfer(&bufs[sel][offset..offset + send_px as usize / 2]);
            }
            // Decode the next row while the transfer runs; off-screen
            // rows still consume their pixels
            if j != height as i16 - 1 {
                sel = 1 - sel;
                stream.read_packed(&mut self.assets, &mut bufs[sel], width as usize);
            }
            if visible {
                while !self.panel.bus.poll_and_clear_complete() {}
                self.panel.bus.wait_tx_complete();
                self.panel.bus.end_data();
            }
        }
    }

    /// Generic path: stage each row and hand it to the line primitive,
    /// which deals with clipping, wrapping and odd alignment
    fn draw_stream_rows(
        &mut self,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        stream: &mut PixelStream,
        mode: DrawMode,
    ) {
        if mode == DrawMode::Buffered {
            self.panel.check_flush_and_terminate();
        }
        let mut line = [0u8; BYTES_PER_ROW + 1];
        for j in 0..height as i16 {
            stream.read_packed(&mut self.assets, &mut line, width as usize);
            self.panel
                .write_horizontal_line(x, y + j, width, &line, mode);
        }
    }
}
