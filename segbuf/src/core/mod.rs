//! Core data structures shared by both buffers.
//!
//! - Segment: a payload tagged with its sequence number

mod segment;

pub use segment::Segment;
