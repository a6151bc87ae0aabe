//! In-memory datagrams exchanged between the simulated endpoints.
//!
//! These never touch a socket, so there is no wire encoding.

use segbuf::{AckReport, DEFAULT_SACK_BLOCKS};

/// Ack report carried by every acknowledgment.
pub type Report = AckReport<DEFAULT_SACK_BLOCKS>;

/// A unit travelling over a [`LossyLink`](crate::link::LossyLink).
#[derive(Debug, Clone)]
pub enum Datagram {
    /// Application data from the sender.
    Data { seq: u64, payload: Vec<u8> },

    /// Acknowledgment of `seq` plus the receiver's current report.
    Ack { seq: u64, report: Report },
}
