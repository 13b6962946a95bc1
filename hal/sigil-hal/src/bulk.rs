//! Bulk transfer channel abstraction
//!
//! Fire-and-forget byte-stream transfers, DMA-backed on real hardware.
//! At most one transfer may be in flight per channel.

/// Asynchronous byte-stream transfer channel.
///
/// The destination is fixed by the channel itself (on hardware, the SPI
/// data register feeding the display). Callers must not start a new
/// transfer, nor mutate the source buffer, until a previous transfer has
/// been observed complete through `poll_and_clear_complete`. The
/// graphics engine upholds this with its own in-progress guard; the
/// double-buffered blit paths exist precisely so the *other* buffer can
/// be filled while one is in flight.
pub trait BulkChannel {
    /// Start transferring `src` to the channel's destination.
    ///
    /// Returns immediately. Implementations that cannot overlap the
    /// transfer (no DMA) may complete it synchronously before returning,
    /// as long as the next `poll_and_clear_complete` reports true.
    fn start_transfer(&mut self, src: &[u8]);

    /// Poll the completion flag, clearing it if set.
    ///
    /// Returns true exactly once per completed transfer.
    fn poll_and_clear_complete(&mut self) -> bool;
}
