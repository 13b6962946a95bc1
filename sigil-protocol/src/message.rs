//! Message encoding and incremental decoding.
//!
//! Message format:
//! - TYPE (2 bytes, little-endian): message type identifier
//! - PAYLOAD LENGTH (2 bytes, little-endian): number of payload bytes
//! - PAYLOAD (0-256 bytes): type-specific data

use heapless::Vec;

/// Ping request: the reply echoes the message unchanged
pub const MSG_ID_PING: u16 = 0x0001;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 256;

/// Message header size (TYPE + PAYLOAD LENGTH)
pub const HEADER_SIZE: usize = 4;

/// Maximum complete message size
pub const MAX_MESSAGE_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Errors that can occur during message parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type identifier
    pub msg_type: u16,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Message {
    /// Create a new message with the given type and payload
    pub fn new(msg_type: u16, payload: &[u8]) -> Result<Self, MessageError> {
        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| MessageError::PayloadTooLarge)?;

        Ok(Self {
            msg_type,
            payload: payload_vec,
        })
    }

    /// Create a message with no payload
    pub fn empty(msg_type: u16) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Encode this message into a byte buffer.
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, MessageError> {
        let message_len = HEADER_SIZE + self.payload.len();
        if buffer.len() < message_len {
            return Err(MessageError::BufferTooSmall);
        }

        buffer[0..2].copy_from_slice(&self.msg_type.to_le_bytes());
        buffer[2..4].copy_from_slice(&(self.payload.len() as u16).to_le_bytes());
        buffer[4..4 + self.payload.len()].copy_from_slice(&self.payload);

        Ok(message_len)
    }

    /// Build the reply this message calls for, if any
    pub fn reply(&self) -> Option<Message> {
        match self.msg_type {
            // Ping echoes the full message back
            MSG_ID_PING => Some(self.clone()),
            _ => None,
        }
    }
}

/// State machine for parsing incoming message bytes
#[derive(Debug, Clone)]
pub struct MessageParser {
    header: [u8; HEADER_SIZE],
    header_len: usize,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    expected_length: u16,
    msg_type: u16,
    in_payload: bool,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageParser {
    /// Create a new message parser
    pub fn new() -> Self {
        Self {
            header: [0; HEADER_SIZE],
            header_len: 0,
            buffer: Vec::new(),
            expected_length: 0,
            msg_type: 0,
            in_payload: false,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.header_len = 0;
        self.buffer.clear();
        self.expected_length = 0;
        self.msg_type = 0;
        self.in_payload = false;
    }

    fn complete(&mut self) -> Message {
        let message = Message {
            msg_type: self.msg_type,
            payload: self.buffer.clone(),
        };
        self.reset();
        message
    }

    /// Feed a single byte to the parser.
    ///
    /// Returns `Ok(Some(message))` when a complete message is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` on a declared
    /// payload length beyond the maximum (the parser resets itself).
    pub fn feed(&mut self, byte: u8) -> Result<Option<Message>, MessageError> {
        if !self.in_payload {
            self.header[self.header_len] = byte;
            self.header_len += 1;
            if self.header_len < HEADER_SIZE {
                return Ok(None);
            }

            self.msg_type = u16::from_le_bytes([self.header[0], self.header[1]]);
            self.expected_length = u16::from_le_bytes([self.header[2], self.header[3]]);
            if self.expected_length as usize > MAX_PAYLOAD_SIZE {
                self.reset();
                return Err(MessageError::PayloadTooLarge);
            }
            if self.expected_length == 0 {
                return Ok(Some(self.complete()));
            }
            self.buffer.clear();
            self.in_payload = true;
            return Ok(None);
        }

        // Length already validated against the buffer capacity
        let _ = self.buffer.push(byte);
        if self.buffer.len() == self.expected_length as usize {
            return Ok(Some(self.complete()));
        }
        Ok(None)
    }

    /// Feed multiple bytes to the parser.
    ///
    /// Returns the first complete message found, if any. Remaining
    /// bytes after a complete message are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Message>, MessageError> {
        for &byte in bytes {
            if let Some(message) = self.feed(byte)? {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }
}
