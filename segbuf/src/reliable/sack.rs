//! Selective acknowledgment.
//!
//! A receiver reports which sequence numbers it already holds so the sender
//! can skip them when retransmitting. [`SelectiveAck`] is the query both
//! sides agree on; [`AckReport`] is the compact, fixed-capacity form a
//! receiver builds for the wire.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

/// A set of sequence numbers the receiver reports as held.
pub trait SelectiveAck {
    /// Returns true if the receiver holds `seq`.
    fn holds(&self, seq: u64) -> bool;
}

impl SelectiveAck for BTreeSet<u64> {
    fn holds(&self, seq: u64) -> bool {
        self.contains(&seq)
    }
}

impl SelectiveAck for [u64] {
    fn holds(&self, seq: u64) -> bool {
        self.contains(&seq)
    }
}

impl SelectiveAck for Vec<u64> {
    fn holds(&self, seq: u64) -> bool {
        self.as_slice().holds(seq)
    }
}

impl<T: SelectiveAck + ?Sized> SelectiveAck for &T {
    fn holds(&self, seq: u64) -> bool {
        (**self).holds(seq)
    }
}

/// An inclusive run of held sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SackBlock {
    /// First held sequence number.
    pub start: u64,

    /// Last held sequence number (inclusive).
    pub end: u64,
}

impl SackBlock {
    /// Creates a block covering `start..=end`.
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Returns true if `seq` falls inside the block.
    #[inline]
    pub const fn contains(&self, seq: u64) -> bool {
        self.start <= seq && seq <= self.end
    }

    /// Number of sequence numbers covered, at least 1.
    #[inline]
    pub const fn span(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Cumulative point plus up to `N` SACK blocks, lowest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AckReport<const N: usize> {
    /// Highest sequence number delivered in order, if any.
    pub cumulative: Option<u64>,

    /// Held runs above the cumulative point.
    pub blocks: heapless::Vec<SackBlock, N>,
}

impl<const N: usize> AckReport<N> {
    /// Creates a report with no SACK blocks.
    pub const fn new(cumulative: Option<u64>) -> Self {
        Self {
            cumulative,
            blocks: heapless::Vec::new(),
        }
    }

    /// Builds a report from held sequence numbers given in ascending order.
    ///
    /// Numbers at or below `cumulative` are skipped, as are numbers that do
    /// not ascend. Consecutive numbers are merged into one block. Once `N`
    /// blocks are full the remaining (higher) numbers are left out.
    pub fn from_held<I>(cumulative: Option<u64>, held: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut report = Self::new(cumulative);

        for seq in held {
            if cumulative.is_some_and(|c| seq <= c) {
                continue;
            }

            if let Some(block) = report.blocks.last_mut() {
                if block.end + 1 == seq {
                    block.end = seq;
                    continue;
                }
                if seq <= block.end {
                    continue;
                }
            }

            if report.blocks.push(SackBlock::new(seq, seq)).is_err() {
                break;
            }
        }

        report
    }

    /// Returns true if the report carries no SACK blocks.
    pub fn is_cumulative_only(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterates over every selectively acknowledged sequence number.
    pub fn selective(&self) -> impl Iterator<Item = u64> + '_ {
        self.blocks.iter().flat_map(|b| b.start..=b.end)
    }
}

impl<const N: usize> SelectiveAck for AckReport<N> {
    fn holds(&self, seq: u64) -> bool {
        self.cumulative.is_some_and(|c| seq <= c) || self.blocks.iter().any(|b| b.contains(seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_blocks_merge_consecutive() {
        let report: AckReport<4> = AckReport::from_held(Some(1), [0, 1, 3, 4, 5, 8, 10, 11]);

        assert_eq!(report.cumulative, Some(1));
        assert_eq!(
            report.blocks.as_slice(),
            &[
                SackBlock::new(3, 5),
                SackBlock::new(8, 8),
                SackBlock::new(10, 11)
            ]
        );
        assert_eq!(report.blocks[0].span(), 3);
    }

    #[test]
    fn test_blocks_capped_at_capacity() {
        let report: AckReport<2> = AckReport::from_held(None, [2, 4, 6, 8]);

        assert_eq!(report.blocks.len(), 2);
        assert!(report.holds(2));
        assert!(report.holds(4));
        // Dropped for lack of room
        assert!(!report.holds(6));
    }

    #[test]
    fn test_report_holds() {
        let report: AckReport<4> = AckReport::from_held(Some(2), [5, 6]);

        assert!(report.holds(0));
        assert!(report.holds(2));
        assert!(!report.holds(3));
        assert!(!report.holds(4));
        assert!(report.holds(5));
        assert!(report.holds(6));
        assert!(!report.holds(7));

        let seqs: heapless::Vec<u64, 8> = report.selective().collect();
        assert_eq!(seqs.as_slice(), &[5, 6]);
    }

    #[test]
    fn test_empty_report() {
        let report: AckReport<4> = AckReport::new(None);
        assert!(report.is_cumulative_only());
        assert!(!report.holds(0));
    }

    #[test]
    fn test_collection_impls() {
        let set: BTreeSet<u64> = [1, 3].into_iter().collect();
        assert!(set.holds(1));
        assert!(!set.holds(2));

        let list = vec![4u64, 9];
        assert!(list.holds(9));
        assert!(!list.holds(5));
        assert!(list.as_slice().holds(4));
        assert!((&set).holds(3));
    }
}
