//! Host communication protocol for the Sigil token
//!
//! Messages exchanged with the host over the HID link use a small
//! binary format:
//! ```text
//! ┌──────────┬────────────────┬─────────────┐
//! │ TYPE     │ PAYLOAD LENGTH │ PAYLOAD     │
//! │ 2B LE    │ 2B LE          │ 0–256B      │
//! └──────────┴────────────────┴─────────────┘
//! ```
//!
//! The transport (USB HID) provides integrity, so there is no
//! checksum at this layer.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod message;

pub use message::{Message, MessageError, MessageParser, MAX_PAYLOAD_SIZE, MSG_ID_PING};
