//! Receive-side reorder buffer.
//!
//! Segments may arrive in any order and more than once. The receive buffer
//! keeps the ones it has not seen, sorted by sequence number, and releases
//! the contiguous prefix that starts right after the last delivered
//! sequence number.

use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;

use log::{debug, trace};

use crate::config::BufferConfig;
use crate::core::Segment;
use crate::reliable::{AckReport, RecvStats};

/// Receive buffer for one connection.
#[derive(Debug)]
pub struct RecvBuffer<P> {
    /// Undelivered segments, strictly ascending by sequence number.
    pending: VecDeque<Segment<P>>,

    /// Every sequence number accepted (minus compacted history).
    seen: BTreeSet<u64>,

    /// Number of segments released in order (delivered_through + 1).
    delivered: u64,

    /// Seen-history margin applied after each flush.
    seen_history: Option<u64>,

    /// Statistics.
    stats: RecvStats,
}

impl<P> RecvBuffer<P> {
    /// Creates an empty receive buffer with unbounded seen history.
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            seen: BTreeSet::new(),
            delivered: 0,
            seen_history: None,
            stats: RecvStats::new(),
        }
    }

    /// Creates a receive buffer from a configuration.
    pub fn with_config(config: &BufferConfig) -> Self {
        Self {
            seen_history: config.seen_history,
            ..Self::new()
        }
    }

    /// Takes in a segment.
    ///
    /// Returns `true` if the segment was new and is now buffered, `false` if
    /// it had already been accepted or delivered. Accepting the same
    /// sequence number twice leaves the buffer as after the first call.
    pub fn accept(&mut self, seq: u64, payload: P) -> bool {
        if seq < self.delivered || self.seen.contains(&seq) {
            self.stats.duplicates += 1;
            debug!("Dropping duplicate segment {}", seq);
            return false;
        }

        let index = match self.pending.binary_search_by_key(&seq, |s| s.seq) {
            // Unreachable while `seen` covers `pending`
            Ok(_) => return false,
            Err(index) => index,
        };

        self.pending.insert(index, Segment::new(seq, payload));
        self.seen.insert(seq);
        self.stats.segments_accepted += 1;
        trace!("Accepted segment {} ({} pending)", seq, self.pending.len());
        true
    }

    /// Releases the contiguous run that starts right after the last
    /// delivered sequence number.
    ///
    /// Stops at the first gap. Returns an empty list when the next expected
    /// segment has not arrived.
    pub fn flush(&mut self) -> Vec<Segment<P>> {
        let mut flushed = Vec::new();

        while let Some(segment) = self.pending.pop_front() {
            if segment.seq != self.delivered {
                self.pending.push_front(segment);
                break;
            }
            flushed.push(segment);
            self.delivered += 1;
        }

        if !flushed.is_empty() {
            self.stats.segments_delivered += flushed.len() as u64;
            trace!("Delivered {} segments through {}", flushed.len(), self.delivered - 1);

            if let Some(margin) = self.seen_history {
                self.compact(margin);
            }
        }

        debug_assert!(self.pending.front().is_none_or(|s| s.seq > self.delivered));
        flushed
    }

    /// Returns every sequence number accepted so far.
    ///
    /// Includes delivered ones, unless compaction has dropped them.
    pub fn received_sequence_numbers(&self) -> &BTreeSet<u64> {
        &self.seen
    }

    /// Builds an ack report: the delivery point plus up to `N` SACK blocks
    /// covering buffered segments above it.
    pub fn ack_report<const N: usize>(&self) -> AckReport<N> {
        AckReport::from_held(self.delivered_through(), self.pending.iter().map(|s| s.seq))
    }

    /// Drops seen history more than `margin` sequence numbers behind the
    /// delivery point.
    ///
    /// Delivered sequence numbers are still rejected by [`accept`](Self::accept)
    /// after being dropped. Returns how many entries were removed.
    pub fn compact(&mut self, margin: u64) -> usize {
        let floor = self.delivered.saturating_sub(margin);
        let before = self.seen.len();
        self.seen = self.seen.split_off(&floor);
        before - self.seen.len()
    }

    /// Returns the highest sequence number released in order.
    pub fn delivered_through(&self) -> Option<u64> {
        self.delivered.checked_sub(1)
    }

    /// Returns the number of buffered, undelivered segments.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if no segment is waiting for delivery.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the statistics.
    pub const fn stats(&self) -> &RecvStats {
        &self.stats
    }
}

impl<P> Default for RecvBuffer<P> {
    fn default() -> Self {
        Self::new()
    }
}
