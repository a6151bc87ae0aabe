//! # Segbuf - Segment Buffers for Reliable Transports
//!
//! Segbuf is a `no_std` (with `alloc`) implementation of the data-buffering
//! core of a reliable transport running over an unreliable, unordered
//! datagram network. It provides:
//!
//! - **Windowed sending**: Queued segments are released within a congestion window
//! - **Cumulative and selective acknowledgment**: Out-of-order acks are held until contiguous
//! - **SACK-aware retransmission**: Only segments the receiver does not hold are resent
//! - **AIMD**: Additive-increase / multiplicative-decrease window adaptation
//! - **Out-of-order reassembly**: Segments are reordered and released as an in-order stream
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Connection driver (caller)               │
//! │        timers · framing · sockets · AIMD policy          │
//! ├────────────────────────────┬────────────────────────────┤
//! │         SendBuffer         │         RecvBuffer          │
//! │  ┌──────────┐ ┌─────────┐  │  ┌──────────┐ ┌──────────┐  │
//! │  │  Queue   │ │  AIMD   │  │  │ Reorder  │ │ AckReport│  │
//! │  └──────────┘ └─────────┘  │  └──────────┘ └──────────┘  │
//! │  ┌──────────────────────┐  │  ┌──────────────────────┐   │
//! │  │ Outstanding / SACK   │  │  │   Seen history       │   │
//! │  └──────────────────────┘  │  └──────────────────────┘   │
//! └────────────────────────────┴────────────────────────────┘
//! ```
//!
//! The two buffers never talk to each other. Each one is owned by a single
//! connection driver that feeds it inbound acknowledgments or segments and
//! pulls out what can be sent or delivered.
//!
//! ## Example
//!
//! ```rust
//! use segbuf::{RecvBuffer, SendBuffer};
//!
//! let mut send = SendBuffer::new(2);
//! send.enqueue("a");
//! send.enqueue("b");
//! send.enqueue("c");
//!
//! let mut recv = RecvBuffer::new();
//! for segment in send.drain_sendable() {
//!     recv.accept(segment.seq, segment.payload);
//! }
//!
//! let delivered = recv.flush();
//! assert_eq!(delivered.len(), 2);
//! for segment in &delivered {
//!     send.on_ack(segment.seq).unwrap();
//! }
//! assert!(send.all_acked());
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod buffer;
pub mod config;
pub mod core;
pub mod error;
pub mod reliable;

// Re-export commonly used types
pub use buffer::{AckOutcome, RecvBuffer, SendBuffer};
pub use config::BufferConfig;
pub use crate::core::Segment;
pub use error::{Error, ErrorKind, Result};
pub use reliable::{AckReport, AimdWindow, SackBlock, SelectiveAck};

/// Default congestion window, in segments.
pub const DEFAULT_WINDOW_SIZE: usize = 4;

/// Default number of SACK blocks carried by an [`AckReport`].
pub const DEFAULT_SACK_BLOCKS: usize = 4;
