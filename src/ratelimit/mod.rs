//! Rate limiting logic and state management.

mod clock;
mod entry;
mod format;
mod limiter;
mod policy;
mod status;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::RateLimitEntry;
pub use format::{blocked_message, format_block_time, format_block_time_with};
pub use limiter::{LimitConfig, RateLimiter};
pub use policy::{Limiters, Policy};
pub use status::{Outcome, RateLimitStatus};
pub use sweeper::{spawn_sweeper, SweepHandle, DEFAULT_SWEEP_INTERVAL};
