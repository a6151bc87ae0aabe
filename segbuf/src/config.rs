//! Buffer configuration.

use crate::DEFAULT_WINDOW_SIZE;

/// Settings shared by [`SendBuffer`](crate::SendBuffer) and
/// [`RecvBuffer`](crate::RecvBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Initial congestion window in segments. Never below 1.
    pub window_size: usize,

    /// How many delivered sequence numbers the receiver keeps in its seen
    /// history. `None` keeps everything.
    pub seen_history: Option<u64>,
}

impl BufferConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            seen_history: None,
        }
    }

    /// Sets the initial congestion window.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size.max(1);
        self
    }

    /// Bounds the receiver's seen history to `margin` sequence numbers
    /// behind the delivery point.
    pub fn with_seen_history(mut self, margin: u64) -> Self {
        self.seen_history = Some(margin);
        self
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::new()
    }
}
