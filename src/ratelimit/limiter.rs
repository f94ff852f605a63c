//! Core rate limiter implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::entry::RateLimitEntry;
use super::status::{Outcome, RateLimitStatus};
use crate::error::{FloodgateError, Result};

/// Limits applied by a single limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    max_attempts: u32,
    window_ms: i64,
    block_duration_ms: i64,
}

impl LimitConfig {
    /// Create a limit configuration.
    ///
    /// Every value must be positive.
    pub fn new(max_attempts: u32, window: Duration, block_duration: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(FloodgateError::Config(
                "max_attempts must be greater than zero".to_string(),
            ));
        }

        let window_ms = positive_millis("window", window)?;
        let block_duration_ms = positive_millis("block duration", block_duration)?;

        Ok(Self {
            max_attempts,
            window_ms,
            block_duration_ms,
        })
    }

    /// Build a configuration from values already known to be positive.
    pub(crate) const fn from_millis(max_attempts: u32, window_ms: i64, block_duration_ms: i64) -> Self {
        Self {
            max_attempts,
            window_ms,
            block_duration_ms,
        }
    }

    /// Attempts allowed per window before the identifier is blocked.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Window length in milliseconds.
    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Block length in milliseconds.
    pub fn block_duration_ms(&self) -> i64 {
        self.block_duration_ms
    }
}

fn positive_millis(name: &str, duration: Duration) -> Result<i64> {
    let millis = i64::try_from(duration.as_millis())
        .map_err(|_| FloodgateError::Config(format!("{} is too large", name)))?;
    if millis <= 0 {
        return Err(FloodgateError::Config(format!(
            "{} must be at least one millisecond",
            name
        )));
    }
    Ok(millis)
}

/// An in-memory sliding-window attempt limiter with temporary lockout.
///
/// Each identifier gets its own window. Exceeding `max_attempts` inside a
/// window blocks the identifier for `block_duration`. This struct is
/// thread-safe and can be shared across tasks behind an `Arc`.
pub struct RateLimiter {
    /// Attempt state indexed by identifier
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    config: LimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter that reads the system clock.
    pub fn new(config: LimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a limiter with an explicit time source.
    pub fn with_clock(config: LimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
            clock,
        }
    }

    /// Count an attempt for `identifier` and decide whether it may proceed.
    pub fn check(&self, identifier: &str) -> Outcome {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock();

        trace!(identifier = %identifier, now = now, "Checking rate limit");

        let entry = match entries.get_mut(identifier) {
            Some(entry) => entry,
            None => {
                debug!(identifier = %identifier, "Creating new rate limit entry");
                entries.insert(identifier.to_string(), RateLimitEntry::fresh(now));
                return Outcome::Admitted;
            }
        };

        if let Some(expiry) = entry.block_expiry() {
            if now < expiry {
                return Outcome::Blocked { expiry };
            }
            debug!(identifier = %identifier, "Block expired, starting new window");
            *entry = RateLimitEntry::fresh(now);
            return Outcome::Admitted;
        }

        if entry.window_expired(now, self.config.window_ms) {
            *entry = RateLimitEntry::fresh(now);
            return Outcome::Admitted;
        }

        let count = entry.increment();
        if count > self.config.max_attempts {
            let expiry = now.saturating_add(self.config.block_duration_ms);
            entry.block_until(expiry);
            debug!(
                identifier = %identifier,
                count = count,
                limit = self.config.max_attempts,
                expiry = expiry,
                "Rate limit exceeded, blocking identifier"
            );
            return Outcome::Blocked { expiry };
        }

        Outcome::Admitted
    }

    /// Count an attempt for `identifier`, returning `true` if it may proceed.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        self.check(identifier).is_admitted()
    }

    /// Register an attempt (typically a failed one) against `identifier`.
    ///
    /// This counts exactly like [`RateLimiter::is_allowed`]; calling both for
    /// one logical attempt counts it twice.
    pub fn record_attempt(&self, identifier: &str) {
        let _ = self.check(identifier);
    }

    /// Report the standing of `identifier` without changing any state.
    pub fn status(&self, identifier: &str) -> RateLimitStatus {
        let now = self.clock.now_millis();
        let entries = self.entries.lock();

        let Some(entry) = entries.get(identifier) else {
            return RateLimitStatus::fresh(self.config.max_attempts);
        };

        if entry.is_block_active(now) {
            return RateLimitStatus {
                attempts_remaining: 0,
                is_blocked: true,
                block_expiry: entry.block_expiry(),
            };
        }

        if entry.window_expired(now, self.config.window_ms) {
            return RateLimitStatus::fresh(self.config.max_attempts);
        }

        RateLimitStatus {
            attempts_remaining: self.config.max_attempts.saturating_sub(entry.count()),
            is_blocked: entry.is_blocked(),
            block_expiry: entry.block_expiry(),
        }
    }

    /// Forget everything recorded for `identifier`.
    pub fn reset(&self, identifier: &str) {
        if self.entries.lock().remove(identifier).is_some() {
            debug!(identifier = %identifier, "Rate limit entry reset");
        }
    }

    /// Evict entries whose window or block has fully expired.
    ///
    /// Returns the number of evicted entries.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let window_ms = self.config.window_ms;
        let mut entries = self.entries.lock();

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now, window_ms));
        let evicted = before - entries.len();

        if evicted > 0 {
            debug!(evicted = evicted, remaining = entries.len(), "Swept stale rate limit entries");
        }
        evicted
    }

    /// Get a copy of the stored entry for `identifier`.
    pub fn entry(&self, identifier: &str) -> Option<RateLimitEntry> {
        self.entries.lock().get(identifier).copied()
    }

    /// Get the number of tracked identifiers.
    pub fn tracked_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Get the limits applied by this limiter.
    pub fn config(&self) -> LimitConfig {
        self.config
    }

    /// Get the time source used by this limiter.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
