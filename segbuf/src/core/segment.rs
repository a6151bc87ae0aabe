//! Sequenced payloads.

/// An opaque payload paired with its sequence number.
///
/// On the send side sequence numbers are dense: segment `k` is the `k`-th
/// payload ever queued, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<P> {
    /// Position of this payload in the sender's emission order.
    pub seq: u64,

    /// Application data.
    pub payload: P,
}

impl<P> Segment<P> {
    /// Creates a segment.
    pub const fn new(seq: u64, payload: P) -> Self {
        Self { seq, payload }
    }

    /// Splits the segment into its parts.
    pub fn into_parts(self) -> (u64, P) {
        (self.seq, self.payload)
    }
}
