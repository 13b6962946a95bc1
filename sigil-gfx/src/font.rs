//! Flash-resident Unicode font format
//!
//! A font asset is laid out as: a fixed header, a fixed-size table of
//! Unicode support intervals, a dense table of glyph indices (one `u16`
//! per described codepoint), the glyph records, then the packed pixel
//! data. Only the header and the interval table are cached in RAM when
//! a font is selected; everything else is fetched per glyph.
//!
//! Codepoints the font does not cover are substituted with `?` when the
//! font describes one, so text with the occasional unsupported character
//! still renders legibly.

use sigil_hal::AssetStore;

/// Number of Unicode interval slots in every font, unused slots filled
/// with the sentinel
pub const MAX_INTERVALS: usize = 15;

/// Glyph index value marking a described but unsupported codepoint
pub const GLYPH_INDEX_NONE: u16 = 0xFFFF;

/// Data offset value marking a glyph with no pixels (the space)
pub const GLYPH_DATA_NONE: u32 = 0xFFFF_FFFF;

const SUBSTITUTION_CHAR: u16 = b'?' as u16;

/// Fixed font header, little-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FontHeader {
    /// Nominal line height in rows
    pub glyph_height: u8,
    /// Number of glyph records in the font
    pub glyph_count: u16,
    /// Number of codepoints covered by the intervals (entries in the
    /// glyph index table)
    pub described_count: u16,
}

impl FontHeader {
    /// Serialized size in flash
    pub const SIZE: usize = 5;

    fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            glyph_height: bytes[0],
            glyph_count: u16::from_le_bytes([bytes[1], bytes[2]]),
            described_count: u16::from_le_bytes([bytes[3], bytes[4]]),
        }
    }
}

/// One contiguous range of covered codepoints, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnicodeInterval {
    pub start: u16,
    pub end: u16,
}

impl UnicodeInterval {
    /// Serialized size in flash
    pub const SIZE: usize = 4;

    fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            start: u16::from_le_bytes([bytes[0], bytes[1]]),
            end: u16::from_le_bytes([bytes[2], bytes[3]]),
        }
    }

    /// An unused table slot (start is the sentinel)
    pub fn is_unused(&self) -> bool {
        self.start == GLYPH_INDEX_NONE
    }

    /// Whether `cp` falls inside this interval
    pub fn contains(&self, cp: u16) -> bool {
        !self.is_unused() && self.start <= cp && cp <= self.end
    }
}

/// Per-glyph record: metrics plus the offset of its pixel data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GlyphRecord {
    /// Bitmap width in pixels
    pub width: u8,
    /// Bitmap height in rows
    pub height: u8,
    /// Horizontal pen offset before the bitmap
    pub x_offset: i8,
    /// Vertical offset below the line top
    pub y_offset: i8,
    /// Offset of the pixel data within the font's data section
    pub data_offset: u32,
}

impl GlyphRecord {
    /// Serialized size in flash
    pub const SIZE: usize = 8;

    fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            width: bytes[0],
            height: bytes[1],
            x_offset: bytes[2] as i8,
            y_offset: bytes[3] as i8,
            data_offset: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Whether this glyph has no pixel data (rendered as blank advance)
    pub fn is_space(&self) -> bool {
        self.data_offset == GLYPH_DATA_NONE
    }
}

/// Horizontal advance and rendered height of one codepoint.
///
/// `advance` of zero means the codepoint cannot be rendered with the
/// current font and should be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GlyphMetrics {
    pub advance: u16,
    pub render_height: u16,
}

/// A font selected for rendering: its flash address plus the cached
/// header and interval table
#[derive(Debug, Clone)]
pub struct SelectedFont {
    address: u32,
    header: FontHeader,
    intervals: [UnicodeInterval; MAX_INTERVALS],
    /// Whether `?` lives in the first interval, making substitution of
    /// uncovered codepoints possible
    substitution_available: bool,
}

impl SelectedFont {
    /// Read the header and interval table of the font at `address`
    pub fn load<S: AssetStore>(store: &mut S, address: u32) -> Self {
        let mut header_bytes = [0u8; FontHeader::SIZE];
        store.read(address, &mut header_bytes);
        let header = FontHeader::from_bytes(&header_bytes);

        let mut intervals = [UnicodeInterval {
            start: GLYPH_INDEX_NONE,
            end: GLYPH_INDEX_NONE,
        }; MAX_INTERVALS];
        for (i, interval) in intervals.iter_mut().enumerate() {
            let mut bytes = [0u8; UnicodeInterval::SIZE];
            store.read(
                address + FontHeader::SIZE as u32 + (i * UnicodeInterval::SIZE) as u32,
                &mut bytes,
            );
            *interval = UnicodeInterval::from_bytes(&bytes);
        }

        let substitution_available = intervals[0].contains(SUBSTITUTION_CHAR);

        Self {
            address,
            header,
            intervals,
            substitution_available,
        }
    }

    /// Nominal line height of this font
    pub fn glyph_height(&self) -> u8 {
        self.header.glyph_height
    }

    fn index_table_addr(&self) -> u32 {
        self.address + FontHeader::SIZE as u32 + (MAX_INTERVALS * UnicodeInterval::SIZE) as u32
    }

    fn records_addr(&self) -> u32 {
        self.index_table_addr() + self.header.described_count as u32 * 2
    }

    /// Start of the font's packed pixel data section; add a record's
    /// `data_offset` to get a glyph's pixels
    pub fn data_addr(&self) -> u32 {
        self.records_addr() + self.header.glyph_count as u32 * GlyphRecord::SIZE as u32
    }

    fn read_index<S: AssetStore>(&self, store: &mut S, desc_offset: u16, position: u16) -> u16 {
        let mut bytes = [0u8; 2];
        store.read(
            self.index_table_addr() + (desc_offset as u32 + position as u32) * 2,
            &mut bytes,
        );
        u16::from_le_bytes(bytes)
    }

    /// Resolve a codepoint to its glyph record.
    ///
    /// Codepoints outside every interval, and covered codepoints whose
    /// index slot holds the sentinel, fall back to `?` when the first
    /// interval describes it. Returns `None` when no glyph can be found
    /// even after substitution.
    pub fn resolve<S: AssetStore>(&self, store: &mut S, cp: u16) -> Option<GlyphRecord> {
        let mut cp = cp;
        let mut desc_offset: u16 = 0;
        let mut interval_start: u16 = 0;
        let mut found = false;

        for interval in &self.intervals {
            if interval.contains(cp) {
                interval_start = interval.start;
                found = true;
                break;
            }
            desc_offset = desc_offset.wrapping_add(interval.end.wrapping_sub(interval.start) + 1);
        }

        if !found {
            if !self.substitution_available {
                return None;
            }
            interval_start = self.intervals[0].start;
            desc_offset = 0;
            cp = SUBSTITUTION_CHAR;
        }

        let mut index = self.read_index(store, desc_offset, cp.wrapping_sub(interval_start));

        if index == GLYPH_INDEX_NONE {
            // Covered but unsupported codepoint: retry the lookup as `?`
            // within the same interval
            if !self.substitution_available {
                return None;
            }
            cp = SUBSTITUTION_CHAR;
            index = self.read_index(store, desc_offset, cp.wrapping_sub(interval_start));
            if index == GLYPH_INDEX_NONE {
                return None;
            }
        }

        let mut bytes = [0u8; GlyphRecord::SIZE];
        store.read(
            self.records_addr() + index as u32 * GlyphRecord::SIZE as u32,
            &mut bytes,
        );
        Some(GlyphRecord::from_bytes(&bytes))
    }

    /// Advance width and rendered height of `cp`, zeroes when it cannot
    /// be rendered. The space advances by its width alone.
    pub fn metrics<S: AssetStore>(&self, store: &mut S, cp: u16) -> GlyphMetrics {
        match self.resolve(store, cp) {
            None => GlyphMetrics::default(),
            Some(glyph) if glyph.is_space() => GlyphMetrics {
                advance: glyph.width as u16,
                render_height: 0,
            },
            Some(glyph) => GlyphMetrics {
                advance: (glyph.width as i16 + glyph.x_offset as i16 + 1).max(0) as u16,
                render_height: (glyph.height as i16 + glyph.y_offset as i16).max(0) as u16,
            },
        }
    }
}
