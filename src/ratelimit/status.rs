//! Results reported by a limiter.

use serde::Serialize;

/// The outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The caller may proceed.
    Admitted,
    /// The identifier is locked out until `expiry` (epoch ms).
    Blocked { expiry: i64 },
}

impl Outcome {
    /// Whether the caller may proceed.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Outcome::Admitted)
    }
}

/// A read-only snapshot of an identifier's standing with a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Attempts left before the identifier is blocked
    pub attempts_remaining: u32,
    /// Whether the identifier is currently blocked
    pub is_blocked: bool,
    /// When the block lifts (epoch ms)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_expiry: Option<i64>,
}

impl RateLimitStatus {
    /// The standing of an identifier with no recorded attempts.
    pub fn fresh(max_attempts: u32) -> Self {
        Self {
            attempts_remaining: max_attempts,
            is_blocked: false,
            block_expiry: None,
        }
    }
}
