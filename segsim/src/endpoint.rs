//! The two sides of a simulated connection.
//!
//! Each side runs as its own tokio task and owns its buffer outright, so
//! every buffer call for a connection is serialized through one task. The
//! sender task also plays the timer and congestion-policy roles: a silent
//! retransmission timeout is the loss signal, a window's worth of new acks
//! is a successful round.

use std::time::Duration;

use anyhow::{bail, Result};
use log::{debug, info, warn};
use segbuf::reliable::{RecvStats, SendStats};
use segbuf::{AckOutcome, RecvBuffer, SendBuffer};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time;

use crate::datagram::{Datagram, Report};
use crate::link::{LinkStats, LossyLink};

/// What the sender task observed.
#[derive(Debug, Clone)]
pub struct SenderSummary {
    pub stats: SendStats,
    pub final_window: usize,
    pub timeouts: u64,
    pub link: LinkStats,
}

/// What the receiver task observed and delivered.
#[derive(Debug, Clone)]
pub struct ReceiverSummary {
    /// Payloads in delivery order.
    pub delivered: Vec<Vec<u8>>,
    pub stats: RecvStats,
    pub link: LinkStats,
}

/// Drives a send buffer until every queued segment is acknowledged.
pub async fn run_sender(
    mut buffer: SendBuffer<Vec<u8>>,
    mut link: LossyLink,
    mut acks: UnboundedReceiver<Datagram>,
    rto: Duration,
) -> Result<SenderSummary> {
    let mut latest = Report::default();
    let mut acked_this_round = 0usize;
    let mut timeouts = 0u64;

    loop {
        for segment in buffer.drain_sendable() {
            let (seq, payload) = segment.into_parts();
            link.send(Datagram::Data { seq, payload });
        }

        if buffer.all_acked() && !buffer.has_unsent() {
            break;
        }

        match time::timeout(rto, acks.recv()).await {
            Ok(Some(Datagram::Ack { seq, report })) => {
                let outcome = buffer.on_ack(seq)?;
                let mut newly = buffer.on_report(&report)?;
                if outcome != AckOutcome::Duplicate {
                    newly += 1;
                }

                // Reordered reports may be older than what we already have
                if report.cumulative >= latest.cumulative {
                    latest = report;
                }

                acked_this_round += newly;
                if acked_this_round >= buffer.window_size() {
                    acked_this_round = 0;
                    buffer.additive_increase();
                }
            }
            Ok(Some(Datagram::Data { seq, .. })) => {
                warn!("Sender received data segment {}, ignoring", seq);
            }
            Ok(None) => {
                bail!(
                    "Ack channel closed before segment {} was acknowledged",
                    buffer.cumulative_ack().map_or(0, |c| c + 1)
                );
            }
            Err(_) => {
                timeouts += 1;
                acked_this_round = 0;
                buffer.presume_lost(&latest);
                buffer.multiplicative_decrease();

                let resend = buffer.retransmit_candidates(buffer.cumulative_ack(), &latest);
                debug!("Timeout {}: retransmitting {} segments", timeouts, resend.len());
                for segment in resend {
                    buffer.record_retransmit(segment.seq)?;
                    let (seq, payload) = segment.into_parts();
                    link.send(Datagram::Data { seq, payload });
                }
            }
        }
    }

    info!(
        "Sender done: {} segments, {} retransmissions, window {}",
        buffer.len(),
        buffer.stats().retransmissions,
        buffer.window_size()
    );

    Ok(SenderSummary {
        stats: *buffer.stats(),
        final_window: buffer.window_size(),
        timeouts,
        link: link.stats(),
    })
}

/// Drives a receive buffer until the sender hangs up.
///
/// Every data segment, duplicate or not, is answered with an ack carrying
/// the current report.
pub async fn run_receiver(
    mut buffer: RecvBuffer<Vec<u8>>,
    mut link: LossyLink,
    mut segments: UnboundedReceiver<Datagram>,
) -> ReceiverSummary {
    let mut delivered = Vec::new();

    while let Some(datagram) = segments.recv().await {
        match datagram {
            Datagram::Data { seq, payload } => {
                buffer.accept(seq, payload);
                delivered.extend(buffer.flush().into_iter().map(|s| s.payload));
                link.send(Datagram::Ack {
                    seq,
                    report: buffer.ack_report(),
                });
            }
            Datagram::Ack { seq, .. } => {
                warn!("Receiver received ack {}, ignoring", seq);
            }
        }
    }

    info!(
        "Receiver done: {} segments delivered, {} duplicates dropped",
        delivered.len(),
        buffer.stats().duplicates
    );

    ReceiverSummary {
        delivered,
        stats: *buffer.stats(),
        link: link.stats(),
    }
}
