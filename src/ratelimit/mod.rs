//! Fixed-window admission control.

mod limiter;
mod middleware;

pub use limiter::{CheckOutcome, FixedWindowLimiter, RateLimitDecision, RateLimitPolicy};
pub use middleware::{enforce, RateLimitContext};
