//! Per-identifier attempt state.

/// Attempt state for a single identifier.
///
/// The block expiry doubles as the blocked flag, so an entry can never be
/// blocked without knowing when the block lifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Attempts observed in the current window
    count: u32,
    /// When the current window started (epoch ms)
    first_attempt: i64,
    /// When the block lifts, present only while blocked
    block_expiry: Option<i64>,
}

impl RateLimitEntry {
    /// Start a new window with a single attempt at `now`.
    pub fn fresh(now: i64) -> Self {
        Self {
            count: 1,
            first_attempt: now,
            block_expiry: None,
        }
    }

    /// Attempts observed in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// When the current window started.
    pub fn first_attempt(&self) -> i64 {
        self.first_attempt
    }

    /// Whether the entry has exceeded its attempt threshold.
    pub fn is_blocked(&self) -> bool {
        self.block_expiry.is_some()
    }

    /// When the block lifts, if blocked.
    pub fn block_expiry(&self) -> Option<i64> {
        self.block_expiry
    }

    /// Whether a block is still in force at `now`.
    pub fn is_block_active(&self, now: i64) -> bool {
        matches!(self.block_expiry, Some(expiry) if now < expiry)
    }

    /// Whether more than `window_ms` has elapsed since the window started.
    ///
    /// An attempt landing exactly on the boundary stays in the old window.
    pub fn window_expired(&self, now: i64, window_ms: i64) -> bool {
        now.saturating_sub(self.first_attempt) > window_ms
    }

    /// Whether the sweep may evict this entry at `now`.
    pub fn is_stale(&self, now: i64, window_ms: i64) -> bool {
        match self.block_expiry {
            Some(expiry) => now > expiry,
            None => self.window_expired(now, window_ms),
        }
    }

    /// Count one more attempt in the current window.
    ///
    /// Returns the new count.
    pub(crate) fn increment(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Lock the identifier out until `expiry`.
    pub(crate) fn block_until(&mut self, expiry: i64) {
        self.block_expiry = Some(expiry);
    }
}
