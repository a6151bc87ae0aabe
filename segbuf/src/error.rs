//! Error types for the segment buffers.
//!
//! Duplicates are never errors here: a repeated segment or a repeated
//! acknowledgment is absorbed silently. The only failures are references to
//! sequence numbers the buffer cannot know about.

use core::fmt;

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The sequence number lies beyond the queued or transmitted data.
    OutOfRange,
    /// An acknowledgment arrived for a segment that was never transmitted.
    AckBeyondSent,
}

/// An error raised by a buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    seq: u64,
}

impl Error {
    /// Creates an error of the given kind for sequence number `seq`.
    pub fn new(kind: ErrorKind, seq: u64) -> Self {
        Error { kind, seq }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the sequence number that triggered the error.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::OutOfRange => write!(f, "Sequence number {} out of range", self.seq),
            ErrorKind::AckBeyondSent => {
                write!(f, "Acknowledgment for unsent sequence number {}", self.seq)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
