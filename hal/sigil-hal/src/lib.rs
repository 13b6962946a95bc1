//! Hardware abstraction traits for the Sigil token firmware
//!
//! This crate defines the seams between the portable graphics/logic code
//! and chip-specific HALs:
//!
//! - `DisplayBus` for synchronous command/data writes to the OLED controller
//! - `BulkChannel` for asynchronous DMA-style byte-stream transfers
//! - `AssetStore` for random-access reads from the flash asset filesystem
//!
//! Chip HALs implement these traits; the graphics engine never touches a
//! register directly.

#![no_std]
#![deny(unsafe_code)]

pub mod assets;
pub mod bulk;
pub mod bus;

// Re-export key types
pub use assets::{AssetError, AssetStore, AssetType};
pub use bulk::BulkChannel;
pub use bus::DisplayBus;
