//! Packed-pixel display/graphics engine for the Sigil token OLED
//!
//! Drives a 256x64 SH1122-class 4-bit grayscale controller. Two pixels
//! are packed per byte (high nibble = even column); drawing primitives
//! either stream straight to the bus or stage into an in-memory frame
//! buffer that is flushed wholesale, optionally through a visual
//! transition. Fonts and bitmaps are decoded incrementally from the
//! external flash asset store.
//!
//! # Architecture
//!
//! - `packed`: nibble pack/merge arithmetic, kept as pure functions so
//!   the alignment edge cases can be tested exhaustively
//! - `framebuffer`: the packed pixel grid and window alignment
//! - `bitstream`: sequential pixel-producing streams over flash assets
//! - `font`: flash font format parsing and glyph resolution
//! - `panel`: raw drawing engine (lines, rectangles, flushes, transitions)
//! - `display`: public API combining panel, fonts and asset decoding
//!
//! The engine is single-threaded and synchronous: one bulk transfer may
//! be in flight at a time, and double buffering only overlaps decoding
//! of the next chunk with transmission of the current one.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod bitstream;
pub mod command;
pub mod display;
pub mod font;
pub mod framebuffer;
pub mod packed;
pub mod panel;

#[cfg(test)]
mod sim;

// Re-export key types
pub use display::{Display, GfxError, Justify};
pub use framebuffer::FrameBuffer;
pub use panel::{DrawMode, Transition};

/// Panel width in pixels
pub const WIDTH: usize = 256;

/// Panel height in pixels
pub const HEIGHT: usize = 64;

/// Packed bytes per framebuffer row (two pixels per byte)
pub const BYTES_PER_ROW: usize = WIDTH / 2;

/// Grayscale level used for transition divider lines
pub const TRANSITION_PIXEL: u8 = 0x03;
