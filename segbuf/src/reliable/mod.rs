//! Reliability mechanisms.
//!
//! This module provides the pieces the buffers build on:
//! - AimdWindow: Additive-increase / multiplicative-decrease congestion window
//! - SelectiveAck / AckReport: Receiver-held sequence numbers for loss recovery
//! - SendStats / RecvStats: Counters describing buffer behavior

mod congestion;
mod sack;
mod stats;

pub use congestion::AimdWindow;
pub use sack::{AckReport, SackBlock, SelectiveAck};
pub use stats::{RecvStats, SendStats};
