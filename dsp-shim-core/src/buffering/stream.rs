//! Threshold-gated accumulation buffer between a push-style producer and a
//! decoder that only runs once enough bytes are present.
//!
//! ## Layout
//!
//! ```text
//! 0          consumed          filled          capacity
//! |-- stale --|--- pending ------|---- free -----|
//! ```
//!
//! Bytes before `consumed` are logically discarded. They are reclaimed by
//! compaction (a `copy_within` to offset 0) when an append would not fit in
//! the free tail.

use tracing::debug;

use crate::error::{DspError, Result};

/// Session-owned byte accumulator with an activation threshold.
#[derive(Debug)]
pub struct StreamBuffer {
    /// Backing bytes; `storage.len()` is the `filled` mark.
    storage: Vec<u8>,
    capacity: usize,
    consumed: usize,
    threshold: usize,
    end_of_stream: bool,
    compactions: u64,
}

impl StreamBuffer {
    /// Allocate a buffer holding at most `capacity` bytes.
    ///
    /// `threshold` is the minimum pending byte count before a decode is
    /// allowed outside drain mode.
    pub fn new(capacity: usize, threshold: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            capacity,
            consumed: 0,
            threshold,
            end_of_stream: false,
            compactions: 0,
        }
    }

    /// Like `new`, but reports an allocation failure instead of aborting.
    ///
    /// # Errors
    /// `AllocationFailed` if `capacity` bytes cannot be reserved.
    pub fn try_new(capacity: usize, threshold: usize) -> Result<Self> {
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| DspError::AllocationFailed { bytes: capacity })?;
        Ok(Self {
            storage,
            capacity,
            consumed: 0,
            threshold,
            end_of_stream: false,
            compactions: 0,
        })
    }

    /// Append a chunk of input.
    ///
    /// Compacts pending bytes to the front when the free tail is too small.
    /// Fails with `BufferOverflow` if the chunk cannot fit even after
    /// compaction; the chunk is not partially written in that case.
    pub fn append(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        if self.capacity - self.filled() < chunk.len() {
            self.compact();
            let available = self.capacity - self.filled();
            if available < chunk.len() {
                return Err(DspError::BufferOverflow {
                    requested: chunk.len(),
                    available,
                });
            }
        }

        self.storage.extend_from_slice(chunk);
        self.check_invariants();
        Ok(())
    }

    /// True iff a decode attempt is permitted right now.
    pub fn ready_for_decode(&self) -> bool {
        let pending = self.pending_len();
        pending >= self.threshold || (self.end_of_stream && pending > 0)
    }

    /// Mark `n` pending bytes as decoded.
    pub fn consume(&mut self, n: usize) -> Result<()> {
        let available = self.pending_len();
        if n > available {
            return Err(DspError::Underflow {
                requested: n,
                available,
            });
        }

        self.consumed += n;
        if self.consumed == self.filled() {
            self.storage.clear();
            self.consumed = 0;
        }
        self.check_invariants();
        Ok(())
    }

    /// Zero all counters and leave drain mode. Contents are discarded.
    pub fn reset(&mut self) {
        self.storage.clear();
        self.consumed = 0;
        self.end_of_stream = false;
        self.compactions = 0;
    }

    /// Signal that no further input will arrive, allowing a short final decode.
    pub fn mark_end_of_stream(&mut self) {
        self.end_of_stream = true;
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// The unconsumed window `[consumed, filled)`.
    pub fn pending(&self) -> &[u8] {
        &self.storage[self.consumed..]
    }

    pub fn pending_len(&self) -> usize {
        self.filled() - self.consumed
    }

    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0
    }

    pub fn filled(&self) -> usize {
        self.storage.len()
    }

    pub fn consumed_offset(&self) -> usize {
        self.consumed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    /// Number of compactions performed since construction.
    pub fn compactions(&self) -> u64 {
        self.compactions
    }

    /// Move the pending window to offset 0.
    fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        let pending = self.pending_len();
        self.storage.copy_within(self.consumed.., 0);
        self.storage.truncate(pending);
        debug!(
            discarded = self.consumed,
            pending, "compacted stream buffer"
        );
        self.consumed = 0;
        self.compactions += 1;
    }

    fn check_invariants(&self) {
        debug_assert!(self.consumed <= self.filled());
        debug_assert!(self.filled() <= self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_not_ready() {
        let mut buf = StreamBuffer::new(4096, 2048);
        buf.append(&[0u8; 1000]).unwrap();
        assert!(!buf.ready_for_decode());

        buf.append(&[0u8; 1100]).unwrap();
        assert!(buf.ready_for_decode());
    }

    #[test]
    fn end_of_stream_allows_short_tail() {
        let mut buf = StreamBuffer::new(4096, 2048);
        buf.append(&[1u8; 10]).unwrap();
        assert!(!buf.ready_for_decode());

        buf.mark_end_of_stream();
        assert!(buf.ready_for_decode());
    }

    #[test]
    fn end_of_stream_on_empty_buffer_is_not_ready() {
        let mut buf = StreamBuffer::new(64, 8);
        buf.mark_end_of_stream();
        assert!(!buf.ready_for_decode());
    }

    #[test]
    fn consume_past_pending_underflows() {
        let mut buf = StreamBuffer::new(64, 1);
        buf.append(&[1, 2, 3]).unwrap();
        let err = buf.consume(4).unwrap_err();
        assert!(matches!(
            err,
            DspError::Underflow {
                requested: 4,
                available: 3
            }
        ));
        assert_eq!(buf.pending(), &[1, 2, 3]);
    }

    #[test]
    fn draining_everything_rewinds_offsets() {
        let mut buf = StreamBuffer::new(64, 1);
        buf.append(&[7u8; 20]).unwrap();
        buf.consume(5).unwrap();
        assert_eq!(buf.consumed_offset(), 5);

        buf.consume(15).unwrap();
        assert_eq!(buf.consumed_offset(), 0);
        assert_eq!(buf.filled(), 0);
    }

    #[test]
    fn append_compacts_when_tail_is_full() {
        let mut buf = StreamBuffer::new(8, 1);
        buf.append(&[1, 2, 3, 4, 5, 6]).unwrap();
        buf.consume(4).unwrap();

        // 2 pending + 5 new only fits after moving the pending bytes to 0.
        buf.append(&[7, 8, 9, 10, 11]).unwrap();
        assert_eq!(buf.pending(), &[5, 6, 7, 8, 9, 10, 11]);
        assert_eq!(buf.consumed_offset(), 0);
        assert_eq!(buf.compactions(), 1);
    }

    #[test]
    fn overflow_keeps_pending_data() {
        let mut buf = StreamBuffer::new(8, 1);
        buf.append(&[1, 2, 3, 4, 5, 6]).unwrap();
        buf.consume(1).unwrap();

        let err = buf.append(&[0u8; 4]).unwrap_err();
        assert!(matches!(
            err,
            DspError::BufferOverflow {
                requested: 4,
                available: 3
            }
        ));
        assert_eq!(buf.pending(), &[2, 3, 4, 5, 6]);
    }

    #[test]
    fn reset_clears_counters_and_drain_mode() {
        let mut buf = StreamBuffer::new(32, 4);
        buf.append(&[1u8; 12]).unwrap();
        buf.consume(3).unwrap();
        buf.append(&[2u8; 22]).unwrap();
        assert_eq!(buf.compactions(), 1);
        buf.mark_end_of_stream();

        buf.reset();
        assert_eq!(buf.compactions(), 0);
        assert_eq!(buf.filled(), 0);
        assert_eq!(buf.consumed_offset(), 0);
        assert!(!buf.is_end_of_stream());
        assert!(buf.is_empty());
    }

    #[test]
    fn try_new_reports_unsatisfiable_capacity() {
        let err = StreamBuffer::try_new(usize::MAX, 1).unwrap_err();
        assert!(matches!(err, DspError::AllocationFailed { bytes } if bytes == usize::MAX));

        let buf = StreamBuffer::try_new(64, 8).unwrap();
        assert_eq!(buf.capacity(), 64);
        assert!(buf.is_empty());
    }
}
