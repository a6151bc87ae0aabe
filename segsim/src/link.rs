//! Fault-injecting in-memory link.
//!
//! Real networks drop, reorder, and duplicate datagrams. [`LossyLink`] is
//! the sending half of a tokio channel that applies a seeded fault model to
//! every datagram before forwarding it:
//!
//! | Fault       | Description                                          |
//! |-------------|------------------------------------------------------|
//! | Loss        | Drop the datagram with probability `loss_rate`.      |
//! | Duplication | Forward it twice with probability `duplicate_rate`.  |
//! | Reordering  | Hold it back for `reorder_delay` so later datagrams  |
//! |             | overtake it, with probability `reorder_rate`.        |
//!
//! The same seed always produces the same fault decisions.

use std::time::Duration;

use anyhow::ensure;
use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use crate::datagram::Datagram;

/// Configuration for the fault model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Probability that a datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a datagram is delivered twice.
    pub duplicate_rate: f64,
    /// Probability that a datagram is delayed past its successors.
    pub reorder_rate: f64,
    /// Delay applied to reordered datagrams.
    pub reorder_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        // No faults by default; the link is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            reorder_rate: 0.0,
            reorder_delay: Duration::from_millis(2),
        }
    }
}

impl LinkConfig {
    /// Checks that every probability lies in `[0, 1]`.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, rate) in [
            ("loss rate", self.loss_rate),
            ("duplicate rate", self.duplicate_rate),
            ("reorder rate", self.reorder_rate),
        ] {
            ensure!(
                (0.0..=1.0).contains(&rate),
                "{} must be within [0, 1], got {}",
                name,
                rate
            );
        }
        Ok(())
    }
}

/// Counters for what the fault model did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    /// Datagrams handed to the link.
    pub sent: u64,
    /// Datagrams dropped.
    pub dropped: u64,
    /// Extra copies forwarded.
    pub duplicated: u64,
    /// Copies held back for reordering.
    pub reordered: u64,
}

/// Sending half of a faulty link.
pub struct LossyLink {
    tx: mpsc::UnboundedSender<Datagram>,
    config: LinkConfig,
    rng: StdRng,
    stats: LinkStats,
}

/// Creates a link whose faults are drawn from `seed`.
///
/// The receiving half closes once the [`LossyLink`] and every datagram it
/// is still holding back have been dropped.
pub fn channel(config: LinkConfig, seed: u64) -> (LossyLink, mpsc::UnboundedReceiver<Datagram>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let link = LossyLink {
        tx,
        config,
        rng: StdRng::seed_from_u64(seed),
        stats: LinkStats::default(),
    };
    (link, rx)
}

impl LossyLink {
    /// Sends a datagram through the fault model.
    ///
    /// Must be called from within a tokio runtime: reordered datagrams are
    /// delivered by a spawned task.
    pub fn send(&mut self, datagram: Datagram) {
        self.stats.sent += 1;

        if self.rng.gen_bool(self.config.loss_rate) {
            self.stats.dropped += 1;
            trace!("Link dropped {:?}", Self::describe(&datagram));
            return;
        }

        if self.rng.gen_bool(self.config.duplicate_rate) {
            self.stats.duplicated += 1;
            self.forward(datagram.clone());
        }
        self.forward(datagram);
    }

    /// Returns the fault counters.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    fn forward(&mut self, datagram: Datagram) {
        if self.rng.gen_bool(self.config.reorder_rate) {
            self.stats.reordered += 1;
            let tx = self.tx.clone();
            let delay = self.config.reorder_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // The peer may already be gone
                let _ = tx.send(datagram);
            });
        } else {
            let _ = self.tx.send(datagram);
        }
    }

    fn describe(datagram: &Datagram) -> (&'static str, u64) {
        match datagram {
            Datagram::Data { seq, .. } => ("data", *seq),
            Datagram::Ack { seq, .. } => ("ack", *seq),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(seq: u64) -> Datagram {
        Datagram::Data {
            seq,
            payload: vec![seq as u8],
        }
    }

    fn seq_of(datagram: &Datagram) -> u64 {
        match datagram {
            Datagram::Data { seq, .. } | Datagram::Ack { seq, .. } => *seq,
        }
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        assert!(LinkConfig::default().validate().is_ok());

        let config = LinkConfig {
            loss_rate: 1.5,
            ..LinkConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loss rate"));

        let config = LinkConfig {
            reorder_rate: -0.1,
            ..LinkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_clean_link_preserves_order() {
        let (mut link, mut rx) = channel(LinkConfig::default(), 1);
        for seq in 0..5 {
            link.send(data(seq));
        }
        drop(link);

        let mut seen = Vec::new();
        while let Some(datagram) = rx.recv().await {
            seen.push(seq_of(&datagram));
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_total_loss() {
        let config = LinkConfig {
            loss_rate: 1.0,
            ..LinkConfig::default()
        };
        let (mut link, mut rx) = channel(config, 1);
        for seq in 0..5 {
            link.send(data(seq));
        }
        assert_eq!(link.stats().dropped, 5);
        drop(link);

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_duplication_and_reordering() {
        let config = LinkConfig {
            duplicate_rate: 1.0,
            reorder_rate: 0.5,
            ..LinkConfig::default()
        };
        let (mut link, mut rx) = channel(config, 7);
        for seq in 0..10 {
            link.send(data(seq));
        }
        let stats = link.stats();
        drop(link);

        let mut seen = Vec::new();
        while let Some(datagram) = rx.recv().await {
            seen.push(seq_of(&datagram));
        }

        assert_eq!(stats.duplicated, 10);
        assert_eq!(seen.len(), 20);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }
}
