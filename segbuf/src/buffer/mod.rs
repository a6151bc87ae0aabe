//! Buffer management for the transport core.
//!
//! This module provides the two per-connection buffers:
//! - SendBuffer: Queued data, send window, acknowledgment tracking and retransmit selection
//! - RecvBuffer: Out-of-order reassembly and in-order release

mod recv;
mod send;

pub use recv::RecvBuffer;
pub use send::{AckOutcome, SendBuffer};
