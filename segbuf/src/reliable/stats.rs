//! Buffer statistics.

/// Statistics about send-side behavior.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendStats {
    /// Segments released for first transmission.
    pub segments_sent: u64,

    /// Segments handed back to the network after being presumed lost.
    pub retransmissions: u64,

    /// Acknowledgments processed, duplicates included.
    pub acks_received: u64,

    /// Acknowledgments for segments that were already acknowledged.
    pub duplicate_acks: u64,

    /// Additive window increases.
    pub window_increases: u64,

    /// Multiplicative window decreases.
    pub window_decreases: u64,
}

impl SendStats {
    /// Creates new empty statistics.
    pub const fn new() -> Self {
        Self {
            segments_sent: 0,
            retransmissions: 0,
            acks_received: 0,
            duplicate_acks: 0,
            window_increases: 0,
            window_decreases: 0,
        }
    }

    /// Returns the retransmission rate as a percentage.
    pub fn retransmit_rate(&self) -> f32 {
        if self.segments_sent == 0 {
            0.0
        } else {
            (self.retransmissions as f32 / self.segments_sent as f32) * 100.0
        }
    }

    /// Resets all statistics.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Statistics about receive-side behavior.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecvStats {
    /// Segments accepted into the reorder buffer.
    pub segments_accepted: u64,

    /// Segments dropped because they were already seen or delivered.
    pub duplicates: u64,

    /// Segments released to the application in order.
    pub segments_delivered: u64,
}

impl RecvStats {
    /// Creates new empty statistics.
    pub const fn new() -> Self {
        Self {
            segments_accepted: 0,
            duplicates: 0,
            segments_delivered: 0,
        }
    }

    /// Returns the share of arriving segments that were duplicates, as a percentage.
    pub fn duplicate_rate(&self) -> f32 {
        let total = self.segments_accepted + self.duplicates;
        if total == 0 {
            0.0
        } else {
            (self.duplicates as f32 / total as f32) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let mut stats = SendStats::new();
        assert_eq!(stats.retransmit_rate(), 0.0);

        stats.segments_sent = 20;
        stats.retransmissions = 5;
        assert_eq!(stats.retransmit_rate(), 25.0);

        stats.reset();
        assert_eq!(stats, SendStats::default());

        let recv = RecvStats {
            segments_accepted: 3,
            duplicates: 1,
            segments_delivered: 3,
        };
        assert_eq!(recv.duplicate_rate(), 25.0);
    }
}
