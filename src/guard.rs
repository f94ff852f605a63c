//! Running actions behind a limiter.
//!
//! The guard applies the usual flow for an abuse-prone action: count the
//! attempt, refuse it while the caller is locked out, and forget the
//! caller's history once the action succeeds. A failed action stays counted.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::ratelimit::{format_block_time, Outcome, RateLimiter};

/// Why a guarded action did not produce a value.
#[derive(Error, Debug)]
pub enum GuardError<E> {
    /// The caller is locked out.
    #[error("Too many attempts, try again in {retry_in}")]
    Blocked {
        /// When the block lifts (epoch ms)
        expiry: i64,
        /// Remaining lockout, formatted for display
        retry_in: String,
    },

    /// The action ran and failed.
    #[error("{0}")]
    Action(E),
}

impl<E> GuardError<E> {
    /// Whether the action was refused without running.
    pub fn is_blocked(&self) -> bool {
        matches!(self, GuardError::Blocked { .. })
    }
}

/// Runs actions on behalf of identifiers, subject to a limiter.
#[derive(Clone)]
pub struct Guard {
    limiter: Arc<RateLimiter>,
}

impl Guard {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run `action` for `identifier` if the limiter admits it.
    ///
    /// The admission check counts the attempt, so a failing action is not
    /// recorded a second time. A successful action resets the identifier.
    pub async fn run<F, Fut, T, E>(&self, identifier: &str, action: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Outcome::Blocked { expiry } = self.limiter.check(identifier) {
            let now = self.limiter.clock().now_millis();
            warn!(identifier = %identifier, expiry = expiry, "Guarded action refused");
            return Err(GuardError::Blocked {
                expiry,
                retry_in: format_block_time(expiry, now),
            });
        }

        match action().await {
            Ok(value) => {
                self.limiter.reset(identifier);
                Ok(value)
            }
            Err(e) => {
                debug!(
                    identifier = %identifier,
                    remaining = self.limiter.status(identifier).attempts_remaining,
                    "Guarded action failed"
                );
                Err(GuardError::Action(e))
            }
        }
    }
}
