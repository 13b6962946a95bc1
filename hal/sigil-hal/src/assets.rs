//! Asset store abstraction
//!
//! Random-access byte reads from the flash-backed asset filesystem that
//! holds fonts and bitmaps. Files are addressed by id and type; a lookup
//! yields the file's base address for subsequent reads.

/// Asset file categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssetType {
    /// Packed-pixel bitmap file
    Bitmap,
    /// Unicode font file
    Font,
}

/// Errors from asset lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssetError {
    /// No file with this id and type exists
    NotFound,
}

/// Flash asset filesystem.
///
/// Reads are infallible: the backing flash is memory-mapped or
/// CRC-checked below this layer, and reads past the end of storage
/// return zero bytes.
pub trait AssetStore {
    /// Resolve a file id to its base address in flash
    fn get_file_address(&mut self, file_id: u32, kind: AssetType) -> Result<u32, AssetError>;

    /// Read `buf.len()` bytes starting at `addr`
    fn read(&mut self, addr: u32, buf: &mut [u8]);
}
