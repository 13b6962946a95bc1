//! Display bus abstraction
//!
//! Models a write-only serial link to a display controller with a
//! command/data strobe and a chip-select line. All operations are
//! synchronous; hardware faults are handled below this layer, so the
//! methods are infallible from the engine's point of view.

/// Write-only bus to a display controller.
///
/// `send_command` and `send_data` are self-contained single-byte writes
/// (they assert and release chip-select themselves). Streaming writes are
/// bracketed by `begin_data` / `end_data`; inside a bracket, `push_data`
/// queues bytes without waiting for transmission, and `wait_tx_complete`
/// blocks until the transmit FIFO has drained.
pub trait DisplayBus {
    /// Write a single command byte (data strobe low)
    fn send_command(&mut self, opcode: u8);

    /// Write a single data byte (data strobe high)
    fn send_data(&mut self, byte: u8);

    /// Assert chip-select and the data strobe for a streaming write
    fn begin_data(&mut self);

    /// Queue one data byte inside a `begin_data` bracket, without
    /// waiting for it to be shifted out
    fn push_data(&mut self, byte: u8);

    /// Block until all queued bytes have been transmitted
    fn wait_tx_complete(&mut self);

    /// Release chip-select, ending a streaming write
    fn end_data(&mut self);

    /// Write a 16-bit word as two data bytes, most significant first
    fn send_data_word(&mut self, word: u16) {
        self.begin_data();
        self.push_data((word >> 8) as u8);
        self.push_data(word as u8);
        self.wait_tx_complete();
        self.end_data();
    }

    /// Write a buffer of data bytes as one bracketed stream
    fn send_data_buffer(&mut self, bytes: &[u8]) {
        self.begin_data();
        for &byte in bytes {
            self.push_data(byte);
        }
        self.wait_tx_complete();
        self.end_data();
    }
}
