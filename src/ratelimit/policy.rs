//! Per-action limiter policies and their composition.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::clock::Clock;
use super::limiter::{LimitConfig, RateLimiter};
use super::sweeper::{spawn_sweeper, SweepHandle, DEFAULT_SWEEP_INTERVAL};
use crate::config::FloodgateConfig;
use crate::error::{FloodgateError, Result};

const MINUTE_MS: i64 = 60_000;

/// A user-facing action guarded by its own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Sign-in attempts
    Login,
    /// Account creation
    Registration,
    /// Contact form submissions
    ContactForm,
    /// Generic API calls
    Api,
}

impl Policy {
    /// Every policy, in a stable order.
    pub const ALL: [Policy; 4] = [
        Policy::Login,
        Policy::Registration,
        Policy::ContactForm,
        Policy::Api,
    ];

    /// The policy name used in configuration and commands.
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Login => "login",
            Policy::Registration => "registration",
            Policy::ContactForm => "contact_form",
            Policy::Api => "api",
        }
    }

    /// The built-in limits for this policy.
    pub const fn default_config(&self) -> LimitConfig {
        match self {
            Policy::Login => LimitConfig::from_millis(5, 15 * MINUTE_MS, 30 * MINUTE_MS),
            Policy::Registration => LimitConfig::from_millis(3, 10 * MINUTE_MS, 60 * MINUTE_MS),
            Policy::ContactForm => LimitConfig::from_millis(5, 10 * MINUTE_MS, 20 * MINUTE_MS),
            Policy::Api => LimitConfig::from_millis(30, MINUTE_MS, 5 * MINUTE_MS),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Policy {
    type Err = FloodgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "login" => Ok(Policy::Login),
            "registration" => Ok(Policy::Registration),
            "contact_form" | "contact" => Ok(Policy::ContactForm),
            "api" => Ok(Policy::Api),
            other => Err(FloodgateError::UnknownPolicy(other.to_string())),
        }
    }
}

/// One independent limiter per policy.
///
/// Built explicitly by whatever composes the application. All limiters share
/// one clock but never share state: exhausting one policy leaves the others
/// untouched for the same identifier.
pub struct Limiters {
    login: Arc<RateLimiter>,
    registration: Arc<RateLimiter>,
    contact_form: Arc<RateLimiter>,
    api: Arc<RateLimiter>,
    sweep_interval: Duration,
    sweepers: Vec<SweepHandle>,
}

impl Limiters {
    /// Create limiters with the built-in policy limits.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let build = |policy: Policy| {
            Arc::new(RateLimiter::with_clock(policy.default_config(), Arc::clone(&clock)))
        };

        Self {
            login: build(Policy::Login),
            registration: build(Policy::Registration),
            contact_form: build(Policy::ContactForm),
            api: build(Policy::Api),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            sweepers: Vec::new(),
        }
    }

    /// Create limiters from loaded configuration.
    pub fn from_config(config: &FloodgateConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let policies = &config.policies;
        let build = |config: LimitConfig| Arc::new(RateLimiter::with_clock(config, Arc::clone(&clock)));

        Ok(Self {
            login: build(policies.login.limit_config()?),
            registration: build(policies.registration.limit_config()?),
            contact_form: build(policies.contact_form.limit_config()?),
            api: build(policies.api.limit_config()?),
            sweep_interval: config.sweep.interval(),
            sweepers: Vec::new(),
        })
    }

    /// Get the limiter guarding `policy`.
    pub fn get(&self, policy: Policy) -> &Arc<RateLimiter> {
        match policy {
            Policy::Login => &self.login,
            Policy::Registration => &self.registration,
            Policy::ContactForm => &self.contact_form,
            Policy::Api => &self.api,
        }
    }

    /// Start background sweeps for every limiter.
    ///
    /// Does nothing if the sweeps are already running. Must be called from
    /// within a tokio runtime.
    pub fn start_sweepers(&mut self) -> Result<()> {
        if !self.sweepers.is_empty() {
            return Ok(());
        }

        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Starting sweepers for all policies"
        );
        self.sweepers = Policy::ALL
            .iter()
            .map(|policy| spawn_sweeper(self.get(*policy), self.sweep_interval))
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// Stop all background sweeps.
    pub fn stop_sweepers(&mut self) {
        for handle in self.sweepers.drain(..) {
            handle.shutdown();
        }
    }

    /// Whether background sweeps are running.
    pub fn sweeping(&self) -> bool {
        !self.sweepers.is_empty()
    }

    /// Sweep every limiter now, returning the total number of evicted entries.
    pub fn sweep_all(&self) -> usize {
        Policy::ALL.iter().map(|policy| self.get(*policy).cleanup()).sum()
    }

    /// The interval used by background sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}
