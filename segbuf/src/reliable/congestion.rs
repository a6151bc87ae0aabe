//! AIMD congestion window.
//!
//! The window grows by one segment per successful round and is roughly
//! halved on loss. Deciding *when* a round succeeded or a loss happened is
//! left to the connection driver.

use log::info;

/// Congestion window adjusted by additive-increase / multiplicative-decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AimdWindow {
    /// Current window in segments. Always at least 1.
    size: usize,
}

impl AimdWindow {
    /// Creates a window of `initial` segments (raised to 1 if zero).
    pub const fn new(initial: usize) -> Self {
        Self {
            size: if initial == 0 { 1 } else { initial },
        }
    }

    /// Returns the current window size.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Grows the window by one segment.
    ///
    /// Returns the new size.
    pub fn increase(&mut self) -> usize {
        self.size = self.size.saturating_add(1);
        info!("Increasing window {}", self.size);
        self.size
    }

    /// Shrinks the window to `size / 2 + 1`.
    ///
    /// The `+ 1` keeps the window from ever collapsing to zero.
    /// Returns the new size.
    pub fn decrease(&mut self) -> usize {
        self.size = self.size / 2 + 1;
        info!("Decreasing window: {}", self.size);
        self.size
    }
}

impl Default for AimdWindow {
    fn default() -> Self {
        Self::new(crate::DEFAULT_WINDOW_SIZE)
    }
}
