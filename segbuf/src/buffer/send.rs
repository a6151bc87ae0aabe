//! Send-side segment buffer.
//!
//! The send buffer provides:
//! - An append-only queue where a payload's index is its sequence number
//! - Window-limited release of unsent segments
//! - Cumulative acknowledgment with buffering of out-of-order acks
//! - SACK-aware selection of retransmission candidates
//! - AIMD window adjustment
//!
//! # Sequence-number layout
//!
//! ```text
//!        cumulative_ack        last_sent
//!              │                   │
//!  ────────────┼───────────────────┼──────────────────▶ seq space
//!   acked      │ <── unacked ────▶ │ <── unsent ────▶
//! ```
//!
//! Timers, framing and sockets belong to the caller. The buffer only
//! answers "what may I send now" and "what would I retransmit".

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::cmp;

use log::{debug, trace, warn};

use crate::config::BufferConfig;
use crate::core::Segment;
use crate::error::{Error, ErrorKind, Result};
use crate::reliable::{AckReport, AimdWindow, SelectiveAck, SendStats};

/// Transmission state of an unacknowledged segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flight {
    /// Counted against the window.
    InFlight,

    /// Presumed lost after a timeout; not counted until retransmitted.
    Lost,
}

/// What an acknowledgment did to the send buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The cumulative point moved; it now sits at `cumulative`.
    Advanced {
        /// New cumulative acknowledgment.
        cumulative: u64,
    },

    /// The ack is ahead of a gap and was held until the gap closes.
    Buffered,

    /// The segment had already been acknowledged.
    Duplicate,
}

/// Send buffer for one connection.
///
/// Owns every payload the application queued, the congestion window and the
/// acknowledgment state. Sequence numbers start at 0 and follow submission
/// order.
#[derive(Debug)]
pub struct SendBuffer<P> {
    /// Every queued payload; index is the sequence number.
    queue: Vec<P>,

    /// Congestion window.
    window: AimdWindow,

    /// Number of segments transmitted so far (next new sequence number).
    sent: u64,

    /// Number of segments cumulatively acknowledged (cumulative ack + 1).
    acked: u64,

    /// Transmitted segments not yet acknowledged.
    unacked: BTreeMap<u64, Flight>,

    /// Entries of `unacked` currently in flight.
    in_flight: usize,

    /// Acknowledged sequence numbers waiting for a gap below them to close.
    pending_acks: BTreeSet<u64>,

    /// Statistics.
    stats: SendStats,
}

impl<P> SendBuffer<P> {
    /// Creates a send buffer with the given initial window.
    pub fn new(window_size: usize) -> Self {
        Self {
            queue: Vec::new(),
            window: AimdWindow::new(window_size),
            sent: 0,
            acked: 0,
            unacked: BTreeMap::new(),
            in_flight: 0,
            pending_acks: BTreeSet::new(),
            stats: SendStats::new(),
        }
    }

    /// Creates a send buffer from a configuration.
    pub fn with_config(config: &BufferConfig) -> Self {
        Self::new(config.window_size)
    }

    /// Appends a payload at the next sequence number.
    ///
    /// Nothing is transmitted until [`drain_sendable`](Self::drain_sendable).
    /// Returns the assigned sequence number.
    pub fn enqueue(&mut self, payload: P) -> u64 {
        let seq = self.queue.len() as u64;
        self.queue.push(payload);
        seq
    }

    /// Returns the payload queued at `seq`.
    ///
    /// An empty payload is a valid result; a sequence number past the end of
    /// the queue is [`ErrorKind::OutOfRange`].
    pub fn lookup(&self, seq: u64) -> Result<&P> {
        usize::try_from(seq)
            .ok()
            .and_then(|index| self.queue.get(index))
            .ok_or(Error::new(ErrorKind::OutOfRange, seq))
    }

    /// Processes an acknowledgment for `ack_num`.
    ///
    /// The next expected number advances the cumulative point and absorbs
    /// any buffered acks that have become contiguous. A number further ahead
    /// is buffered. A number already acknowledged changes nothing, so the
    /// in-flight count is only reduced once per segment.
    pub fn on_ack(&mut self, ack_num: u64) -> Result<AckOutcome> {
        if ack_num >= self.sent {
            warn!("Ack {} for unsent segment (sent {})", ack_num, self.sent);
            return Err(Error::new(ErrorKind::AckBeyondSent, ack_num));
        }

        self.stats.acks_received += 1;

        let Some(flight) = self.unacked.remove(&ack_num) else {
            self.stats.duplicate_acks += 1;
            debug!("Duplicate ack {}", ack_num);
            return Ok(AckOutcome::Duplicate);
        };

        if flight == Flight::InFlight {
            debug_assert!(self.in_flight > 0, "in-flight count underflow");
            self.in_flight -= 1;
        }

        if ack_num != self.acked {
            debug_assert!(ack_num > self.acked);
            self.pending_acks.insert(ack_num);
            trace!("Buffered out-of-order ack {}", ack_num);
            return Ok(AckOutcome::Buffered);
        }

        self.acked += 1;
        while self.pending_acks.first() == Some(&self.acked) {
            self.pending_acks.pop_first();
            self.acked += 1;
        }

        let cumulative = self.acked - 1;
        trace!("Cumulative ack now {}", cumulative);
        self.check_invariants();
        Ok(AckOutcome::Advanced { cumulative })
    }

    /// Absorbs a receiver's ack report.
    ///
    /// Every unacknowledged segment at or below the report's cumulative
    /// point, or inside one of its SACK blocks, is acknowledged.
    /// Returns how many segments became acknowledged.
    pub fn on_report<const N: usize>(&mut self, report: &AckReport<N>) -> Result<usize> {
        let held: Vec<u64> = self
            .unacked
            .keys()
            .copied()
            .filter(|&seq| report.holds(seq))
            .collect();

        for &seq in &held {
            self.on_ack(seq)?;
        }

        Ok(held.len())
    }

    /// Marks every in-flight segment the receiver does not hold as lost.
    ///
    /// Lost segments stay unacknowledged but stop counting against the
    /// window, which reopens room for retransmission after a timeout.
    /// Returns how many segments were marked.
    pub fn presume_lost<S>(&mut self, selective_ack: &S) -> usize
    where
        S: SelectiveAck + ?Sized,
    {
        let mut marked = 0;
        for (&seq, flight) in self.unacked.iter_mut() {
            if *flight == Flight::InFlight && !selective_ack.holds(seq) {
                *flight = Flight::Lost;
                marked += 1;
            }
        }

        self.in_flight -= marked;
        if marked > 0 {
            debug!("Presumed {} segments lost", marked);
        }
        marked
    }

    /// Records that a presumed-lost segment went back on the network.
    ///
    /// Returns `Ok(true)` if the segment counts as in flight again,
    /// `Ok(false)` if it was already in flight or has since been
    /// acknowledged.
    pub fn record_retransmit(&mut self, seq: u64) -> Result<bool> {
        if seq >= self.sent {
            return Err(Error::new(ErrorKind::OutOfRange, seq));
        }

        match self.unacked.get_mut(&seq) {
            Some(flight) if *flight == Flight::Lost => {
                *flight = Flight::InFlight;
                self.in_flight += 1;
                self.stats.retransmissions += 1;
                trace!("Retransmitted {}", seq);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Grows the window by one segment.
    pub fn additive_increase(&mut self) {
        self.window.increase();
        self.stats.window_increases += 1;
    }

    /// Shrinks the window to `window_size / 2 + 1`.
    pub fn multiplicative_decrease(&mut self) {
        self.window.decrease();
        self.stats.window_decreases += 1;
    }

    /// Returns true if every transmitted segment has been acknowledged.
    ///
    /// Acks still waiting in the out-of-order set count as outstanding gaps:
    /// the answer is only true once nothing transmitted is unacknowledged.
    pub fn all_acked(&self) -> bool {
        debug_assert_eq!(self.acked == self.sent, self.unacked.is_empty());
        self.unacked.is_empty()
    }

    /// Returns the current congestion window.
    pub const fn window_size(&self) -> usize {
        self.window.size()
    }

    /// Returns the number of segments counted against the window.
    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Returns the highest sequence number acknowledged in order.
    pub fn cumulative_ack(&self) -> Option<u64> {
        self.acked.checked_sub(1)
    }

    /// Returns the highest sequence number transmitted.
    pub fn last_sent(&self) -> Option<u64> {
        self.sent.checked_sub(1)
    }

    /// Iterates over buffered out-of-order acks in ascending order.
    pub fn pending_acks(&self) -> impl Iterator<Item = u64> + '_ {
        self.pending_acks.iter().copied()
    }

    /// Returns the number of payloads ever queued.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing was ever queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns true if queued payloads are waiting for window room.
    pub fn has_unsent(&self) -> bool {
        self.sent < self.queue.len() as u64
    }

    /// Returns the statistics.
    pub const fn stats(&self) -> &SendStats {
        &self.stats
    }

    fn check_invariants(&self) {
        debug_assert!(self.acked <= self.sent);
        debug_assert!(self.sent <= self.queue.len() as u64);
        debug_assert!(self.in_flight <= self.unacked.len());
        debug_assert!(self.pending_acks.iter().all(|&seq| seq >= self.acked));
    }
}

impl<P: Clone> SendBuffer<P> {
    /// Releases as many unsent segments as the window allows.
    ///
    /// The budget is `window_size - in_flight`. Each released segment counts
    /// as in flight. Returns an empty list when the window has no room or
    /// nothing is waiting.
    pub fn drain_sendable(&mut self) -> Vec<Segment<P>> {
        let budget = self.window.size().saturating_sub(self.in_flight) as u64;
        let end = cmp::min(self.sent + budget, self.queue.len() as u64);

        let released: Vec<Segment<P>> = (self.sent..end)
            .map(|seq| Segment::new(seq, self.queue[seq as usize].clone()))
            .collect();

        for segment in &released {
            self.unacked.insert(segment.seq, Flight::InFlight);
        }
        self.in_flight += released.len();
        self.stats.segments_sent += released.len() as u64;
        self.sent = end;

        if !released.is_empty() {
            trace!(
                "Released {} segments, in flight {}/{}",
                released.len(),
                self.in_flight,
                self.window.size()
            );
        }
        self.check_invariants();
        released
    }

    /// Selects segments to retransmit.
    ///
    /// With budget `window_size - in_flight + 1`, every sequence number in
    /// the open range `(ack, ack + budget)` that the receiver does not hold
    /// is returned with its payload. `ack` of `None` means nothing has been
    /// acknowledged. Only transmitted segments are candidates, so an `ack` at or
    /// past the last transmitted segment selects nothing.
    ///
    /// This is a query: call [`record_retransmit`](Self::record_retransmit)
    /// for each segment actually resent.
    pub fn retransmit_candidates<S>(
        &self,
        ack: Option<u64>,
        selective_ack: &S,
    ) -> Vec<Segment<P>>
    where
        S: SelectiveAck + ?Sized,
    {
        let budget = (self.window.size() + 1).saturating_sub(self.in_flight) as u64;
        let start = match ack {
            Some(a) if a >= self.sent => return Vec::new(),
            Some(a) => a + 1,
            None => 0,
        };
        let end = cmp::min((start + budget).saturating_sub(1), self.sent);

        (start..end)
            .filter(|&seq| !selective_ack.holds(seq))
            .map(|seq| Segment::new(seq, self.queue[seq as usize].clone()))
            .collect()
    }
}

impl<P> Default for SendBuffer<P> {
    fn default() -> Self {
        Self::new(crate::DEFAULT_WINDOW_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn abc(window: usize) -> SendBuffer<&'static str> {
        let mut buffer = SendBuffer::new(window);
        buffer.enqueue("a");
        buffer.enqueue("b");
        buffer.enqueue("c");
        buffer
    }

    #[test]
    fn test_enqueue_assigns_dense_sequence() {
        let mut buffer = SendBuffer::new(4);
        assert_eq!(buffer.enqueue("x"), 0);
        assert_eq!(buffer.enqueue("y"), 1);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.has_unsent());
        assert_eq!(buffer.last_sent(), None);
    }

    #[test]
    fn test_lookup_distinguishes_empty_from_missing() {
        let mut buffer: SendBuffer<&str> = SendBuffer::new(4);
        buffer.enqueue("");

        assert_eq!(buffer.lookup(0), Ok(&""));
        let err = buffer.lookup(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert_eq!(err.seq(), 1);
        assert!(buffer.lookup(u64::MAX).is_err());
    }

    #[test]
    fn test_drain_respects_window() {
        let mut buffer = abc(2);

        let sent = buffer.drain_sendable();
        assert_eq!(sent, vec![Segment::new(0, "a"), Segment::new(1, "b")]);
        assert_eq!(buffer.in_flight(), 2);
        assert_eq!(buffer.last_sent(), Some(1));

        // No room until something is acknowledged
        assert!(buffer.drain_sendable().is_empty());
    }

    #[test]
    fn test_acks_reopen_window() {
        let mut buffer = abc(2);
        buffer.drain_sendable();

        assert_eq!(buffer.on_ack(0), Ok(AckOutcome::Advanced { cumulative: 0 }));
        assert_eq!(buffer.on_ack(1), Ok(AckOutcome::Advanced { cumulative: 1 }));
        assert_eq!(buffer.cumulative_ack(), Some(1));
        assert!(buffer.all_acked());
        assert_eq!(buffer.in_flight(), 0);

        assert_eq!(buffer.drain_sendable(), vec![Segment::new(2, "c")]);
        assert!(!buffer.all_acked());
        assert!(!buffer.has_unsent());
    }

    #[test]
    fn test_out_of_order_ack_is_buffered() {
        let mut buffer = abc(4);
        buffer.drain_sendable();

        assert_eq!(buffer.on_ack(2), Ok(AckOutcome::Buffered));
        assert_eq!(buffer.pending_acks().collect::<Vec<_>>(), vec![2]);
        assert_eq!(buffer.cumulative_ack(), None);

        assert_eq!(buffer.on_ack(0), Ok(AckOutcome::Advanced { cumulative: 0 }));
        assert_eq!(buffer.on_ack(1), Ok(AckOutcome::Advanced { cumulative: 2 }));
        assert_eq!(buffer.cumulative_ack(), Some(2));
        assert_eq!(buffer.pending_acks().count(), 0);
        assert!(buffer.all_acked());
    }

    #[test]
    fn test_pending_acks_stay_sorted() {
        let mut buffer = SendBuffer::new(8);
        for i in 0..6u8 {
            buffer.enqueue(i);
        }
        buffer.drain_sendable();

        buffer.on_ack(4).unwrap();
        buffer.on_ack(2).unwrap();
        buffer.on_ack(5).unwrap();
        assert_eq!(buffer.pending_acks().collect::<Vec<_>>(), vec![2, 4, 5]);

        // 0 closes nothing beyond itself; 1 pulls in 2 but stops at the gap at 3
        buffer.on_ack(0).unwrap();
        assert_eq!(buffer.on_ack(1), Ok(AckOutcome::Advanced { cumulative: 2 }));
        assert_eq!(buffer.pending_acks().collect::<Vec<_>>(), vec![4, 5]);
        assert!(!buffer.all_acked());
    }

    #[test]
    fn test_all_acked_ignores_unabsorbed_pending() {
        let mut buffer = abc(4);
        buffer.drain_sendable();
        buffer.on_ack(0).unwrap();
        buffer.on_ack(2).unwrap();

        // Segment 1 is still a gap even though 2 was acked
        assert!(!buffer.all_acked());
        assert_eq!(buffer.in_flight(), 1);
    }

    #[test]
    fn test_duplicate_ack_does_not_underflow() {
        let mut buffer = abc(2);
        buffer.drain_sendable();

        buffer.on_ack(0).unwrap();
        assert_eq!(buffer.in_flight(), 1);
        assert_eq!(buffer.on_ack(0), Ok(AckOutcome::Duplicate));
        assert_eq!(buffer.on_ack(0), Ok(AckOutcome::Duplicate));
        assert_eq!(buffer.in_flight(), 1);
        assert_eq!(buffer.stats().duplicate_acks, 2);

        buffer.on_ack(1).unwrap();
        buffer.on_ack(1).unwrap();
        assert_eq!(buffer.in_flight(), 0);
        assert_eq!(buffer.cumulative_ack(), Some(1));
    }

    #[test]
    fn test_duplicate_of_buffered_ack() {
        let mut buffer = abc(4);
        buffer.drain_sendable();

        assert_eq!(buffer.on_ack(2), Ok(AckOutcome::Buffered));
        assert_eq!(buffer.on_ack(2), Ok(AckOutcome::Duplicate));
        assert_eq!(buffer.in_flight(), 2);
    }

    #[test]
    fn test_ack_beyond_sent_is_rejected() {
        let mut buffer = abc(1);
        buffer.drain_sendable();

        let err = buffer.on_ack(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AckBeyondSent);
        assert_eq!(buffer.in_flight(), 1);
        assert_eq!(buffer.cumulative_ack(), None);
        assert_eq!(buffer.stats().acks_received, 0);
    }

    #[test]
    fn test_cumulative_ack_is_monotonic() {
        let mut buffer = SendBuffer::new(16);
        for i in 0..10u32 {
            buffer.enqueue(i);
        }
        buffer.drain_sendable();

        let mut last = None;
        for ack in [3, 0, 0, 1, 5, 2, 9, 4, 3, 8, 6, 7] {
            buffer.on_ack(ack).unwrap();
            let now = buffer.cumulative_ack();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, Some(9));
        assert!(buffer.all_acked());
    }

    #[test]
    fn test_retransmit_candidates_skip_sacked() {
        let mut buffer = SendBuffer::new(4);
        for i in 0..6u32 {
            buffer.enqueue(i);
        }
        buffer.drain_sendable();
        buffer.on_ack(0).unwrap();
        buffer.on_ack(2).unwrap();
        assert_eq!(buffer.in_flight(), 2);

        // budget = 4 - 2 + 1 = 3, range (0, 3) = {1, 2}
        let sack = vec![2u64];
        let candidates = buffer.retransmit_candidates(Some(0), &sack);
        assert_eq!(candidates, vec![Segment::new(1, 1)]);
    }

    #[test]
    fn test_retransmit_candidates_before_any_ack() {
        let mut buffer = abc(3);
        buffer.drain_sendable();
        buffer.presume_lost(&[] as &[u64]);
        assert_eq!(buffer.in_flight(), 0);

        // budget = 3 - 0 + 1 = 4, range (-1, 3) = {0, 1, 2}
        let candidates = buffer.retransmit_candidates(None, &BTreeSet::<u64>::new());
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], Segment::new(0, "a"));
    }

    #[test]
    fn test_retransmit_candidates_only_transmitted() {
        let mut buffer = abc(1);
        buffer.drain_sendable();
        buffer.presume_lost(&[] as &[u64]);

        // budget = 1 - 0 + 1 = 2 would reach 1, but only 0 went out
        let candidates = buffer.retransmit_candidates(None, &[] as &[u64]);
        assert_eq!(candidates, vec![Segment::new(0, "a")]);
    }

    #[test]
    fn test_retransmit_candidates_past_sent_is_empty() {
        let mut buffer = SendBuffer::new(2);
        buffer.enqueue("a");
        buffer.drain_sendable();

        assert!(buffer.retransmit_candidates(Some(0), &[] as &[u64]).is_empty());
        assert!(buffer.retransmit_candidates(Some(u64::MAX - 1), &[] as &[u64]).is_empty());
        assert!(buffer.retransmit_candidates(Some(u64::MAX), &[] as &[u64]).is_empty());
    }

    #[test]
    fn test_retransmit_candidates_empty_when_window_full() {
        let mut buffer = abc(2);
        buffer.drain_sendable();

        // budget = 2 - 2 + 1 = 1, range (-1, 0) is empty
        assert!(buffer.retransmit_candidates(None, &[] as &[u64]).is_empty());
    }

    #[test]
    fn test_presume_lost_and_retransmit() {
        let mut buffer = abc(3);
        buffer.drain_sendable();

        let sack = vec![1u64];
        assert_eq!(buffer.presume_lost(&sack), 2);
        assert_eq!(buffer.in_flight(), 1);
        assert!(!buffer.all_acked());

        assert_eq!(buffer.record_retransmit(0), Ok(true));
        assert_eq!(buffer.record_retransmit(0), Ok(false));
        assert_eq!(buffer.in_flight(), 2);
        assert_eq!(buffer.stats().retransmissions, 1);

        // Acking a lost segment does not touch the in-flight count
        buffer.on_ack(2).unwrap();
        assert_eq!(buffer.in_flight(), 2);
        assert_eq!(buffer.record_retransmit(2), Ok(false));

        assert_eq!(
            buffer.record_retransmit(3).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_on_report_acks_held_segments() {
        let mut buffer = SendBuffer::new(8);
        for i in 0..6u32 {
            buffer.enqueue(i);
        }
        buffer.drain_sendable();

        let report: AckReport<4> = AckReport::from_held(Some(1), [3, 4]);
        assert_eq!(buffer.on_report(&report), Ok(4));
        assert_eq!(buffer.cumulative_ack(), Some(1));
        assert_eq!(buffer.pending_acks().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(buffer.in_flight(), 2);

        // Reapplying the same report is a no-op
        assert_eq!(buffer.on_report(&report), Ok(0));
    }

    #[test]
    fn test_window_bound_holds() {
        let mut buffer = SendBuffer::new(3);
        for i in 0..20u32 {
            buffer.enqueue(i);
        }

        let mut next_ack = 0;
        while buffer.has_unsent() || !buffer.all_acked() {
            buffer.drain_sendable();
            assert!(buffer.in_flight() <= buffer.window_size());
            buffer.on_ack(next_ack).unwrap();
            next_ack += 1;
        }
        assert_eq!(next_ack, 20);
    }

    #[test]
    fn test_aimd_through_buffer() {
        let mut buffer: SendBuffer<()> = SendBuffer::new(1);

        buffer.multiplicative_decrease();
        assert_eq!(buffer.window_size(), 1);

        buffer.additive_increase();
        buffer.additive_increase();
        assert_eq!(buffer.window_size(), 3);

        buffer.multiplicative_decrease();
        assert_eq!(buffer.window_size(), 2);
        assert_eq!(buffer.stats().window_increases, 2);
        assert_eq!(buffer.stats().window_decreases, 2);
    }

    #[test]
    fn test_shrunk_window_blocks_sending() {
        let mut buffer = SendBuffer::new(6);
        for i in 0..10u32 {
            buffer.enqueue(i);
        }
        assert_eq!(buffer.drain_sendable().len(), 6);

        buffer.multiplicative_decrease();
        assert_eq!(buffer.window_size(), 4);
        buffer.on_ack(0).unwrap();
        buffer.on_ack(1).unwrap();

        // 4 still in flight against a window of 4
        assert!(buffer.drain_sendable().is_empty());
    }
}
