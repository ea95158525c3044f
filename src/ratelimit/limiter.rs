//! Core fixed-window limiter implementation.
//!
//! All coordination happens through the external counter store; the limiter
//! itself keeps no mutable state and any number of process replicas sharing
//! one store enforce a single budget. Atomicity is delegated entirely to the
//! store's INCR; the EXPIRE and TTL calls that follow are not atomic with
//! it, and the rare race where two requests both observe a count of 1 is
//! tolerated because EXPIRE is idempotent.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::store::{CounterStore, StoreError};

/// A (limit, window) pair bound to one route/operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum admitted requests per window
    pub limit: u32,
    /// Fixed window length
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Create a new policy.
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Outcome of a single admission check. Never persisted; recomputed for
/// every request.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    /// Whether the request may proceed to its handler
    pub allowed: bool,
    /// The configured limit, echoed for response headers
    pub limit: u32,
    /// Requests left in the current window, never negative
    pub remaining: u32,
    /// When the current window expires
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, clamped at zero.
    pub fn retry_after(&self, now: DateTime<Utc>) -> u64 {
        (self.reset_at - now).num_seconds().max(0) as u64
    }

    /// The decision handed out when the store cannot be consulted: admit,
    /// report a full quota, and assume a nominal window.
    fn fail_open(policy: &RateLimitPolicy, now: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            limit: policy.limit,
            remaining: policy.limit,
            reset_at: now + chrono::Duration::seconds(policy.window.as_secs() as i64),
        }
    }
}

/// A decision plus any store failure absorbed while producing it.
///
/// The limiter never logs or drops store errors itself; the caller decides
/// what to do with the warning. Infrastructure trouble never rejects a
/// request.
#[derive(Debug)]
pub struct CheckOutcome {
    pub decision: RateLimitDecision,
    pub warning: Option<StoreError>,
}

impl CheckOutcome {
    fn open(policy: &RateLimitPolicy, now: DateTime<Utc>, warning: StoreError) -> Self {
        Self {
            decision: RateLimitDecision::fail_open(policy, now),
            warning: Some(warning),
        }
    }
}

/// Fixed-window rate limiter backed by an external counter store.
pub struct FixedWindowLimiter {
    store: Arc<dyn CounterStore>,
}

impl FixedWindowLimiter {
    /// Create a limiter over the given store.
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Run the fixed-window check for one identifier under one policy.
    ///
    /// The post-increment count decides admission: the limit-th request is
    /// admitted, the one after it is not. The expiry is attached only on
    /// the request that created the counter, so the window never slides.
    pub async fn check(
        &self,
        scope: &str,
        identifier: &str,
        policy: &RateLimitPolicy,
    ) -> CheckOutcome {
        let key = counter_key(scope, identifier);
        let now = Utc::now();

        trace!(key = %key, limit = policy.limit, "checking rate limit");

        let count = match self.store.incr(&key).await {
            Ok(count) => count,
            Err(e) => return CheckOutcome::open(policy, now, e),
        };

        // First hit of a new window: attach the expiry exactly once. The
        // increment is not retried on failure.
        if count == 1 {
            if let Err(e) = self.store.expire(&key, policy.window.as_secs()).await {
                return CheckOutcome::open(policy, now, e);
            }
        }

        let remaining = (policy.limit as i64 - count).max(0) as u32;

        let mut warning = None;
        let ttl_secs = match self.store.ttl(&key).await {
            // A non-positive TTL means the expiry was lost or the key raced
            // away; assume a full window rather than a reset in the past.
            Ok(ttl) if ttl > 0 => ttl as u64,
            Ok(_) => policy.window.as_secs(),
            Err(e) => {
                warning = Some(e);
                policy.window.as_secs()
            }
        };
        let reset_at = now + chrono::Duration::seconds(ttl_secs as i64);

        let allowed = count <= policy.limit as i64;
        if !allowed {
            debug!(key = %key, count, limit = policy.limit, "rate limit exceeded");
        }

        CheckOutcome {
            decision: RateLimitDecision {
                allowed,
                limit: policy.limit,
                remaining,
                reset_at,
            },
            warning,
        }
    }
}

/// Key layout: `ratelimit:<scope>:<identifier>`.
///
/// Scoping by route keeps budgets independent when several policies apply
/// to the same identifier in one deployment.
fn counter_key(scope: &str, identifier: &str) -> String {
    format!("ratelimit:{scope}:{identifier}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{FailingCounterStore, MemoryCounterStore};

    const WINDOW: Duration = Duration::from_secs(20);

    fn limiter_over(store: Arc<MemoryCounterStore>) -> FixedWindowLimiter {
        FixedWindowLimiter::new(store)
    }

    #[test]
    fn test_counter_key_layout() {
        assert_eq!(
            counter_key("notes:create", "203.0.113.7"),
            "ratelimit:notes:create:203.0.113.7"
        );
    }

    #[tokio::test]
    async fn test_admits_up_to_limit_then_rejects() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = limiter_over(store);
        let policy = RateLimitPolicy::new(5, WINDOW);

        for expected_remaining in [4, 3, 2, 1, 0] {
            let outcome = limiter.check("notes:create", "A", &policy).await;
            assert!(outcome.decision.allowed);
            assert_eq!(outcome.decision.remaining, expected_remaining);
            assert!(outcome.warning.is_none());
        }

        let outcome = limiter.check("notes:create", "A", &policy).await;
        assert!(!outcome.decision.allowed);
        assert_eq!(outcome.decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_remaining_never_negative() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = limiter_over(store);
        let policy = RateLimitPolicy::new(2, WINDOW);

        let mut previous = policy.limit;
        for _ in 0..5 {
            let outcome = limiter.check("s", "A", &policy).await;
            assert!(outcome.decision.remaining <= previous);
            previous = outcome.decision.remaining;
        }

        assert_eq!(previous, 0);
    }

    #[tokio::test]
    async fn test_expiry_set_exactly_once_per_window() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = FixedWindowLimiter::new(store.clone());
        let policy = RateLimitPolicy::new(5, WINDOW);

        for _ in 0..3 {
            limiter.check("s", "A", &policy).await;
        }

        assert_eq!(store.expire_calls(), 1);
    }

    #[tokio::test]
    async fn test_new_window_after_store_expiry() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = FixedWindowLimiter::new(store.clone());
        let policy = RateLimitPolicy::new(5, WINDOW);

        limiter.check("s", "B", &policy).await;
        assert_eq!(store.count("ratelimit:s:B"), Some(1));

        // Simulate the store-side expiry firing.
        store.evict("ratelimit:s:B");

        let outcome = limiter.check("s", "B", &policy).await;
        assert!(outcome.decision.allowed);
        assert_eq!(outcome.decision.remaining, 4);
        assert_eq!(store.expire_calls(), 2);
    }

    #[tokio::test]
    async fn test_fail_open_when_store_unreachable() {
        let limiter = FixedWindowLimiter::new(Arc::new(FailingCounterStore));
        let policy = RateLimitPolicy::new(5, WINDOW);
        let before = Utc::now();

        let outcome = limiter.check("s", "A", &policy).await;

        assert!(outcome.decision.allowed);
        assert_eq!(outcome.decision.remaining, 5);
        assert!(outcome.warning.is_some());
        assert!(outcome.decision.reset_at >= before);
        assert!(outcome.decision.reset_at <= Utc::now() + chrono::Duration::seconds(21));
    }

    #[tokio::test]
    async fn test_scopes_do_not_share_budget() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = FixedWindowLimiter::new(store);
        let strict = RateLimitPolicy::new(1, WINDOW);
        let lenient = RateLimitPolicy::new(10, WINDOW);

        assert!(limiter.check("notes:create", "A", &strict).await.decision.allowed);
        assert!(!limiter.check("notes:create", "A", &strict).await.decision.allowed);

        // The same identifier is still fresh under the other scope.
        let outcome = limiter.check("notes:list", "A", &lenient).await;
        assert!(outcome.decision.allowed);
        assert_eq!(outcome.decision.remaining, 9);
    }

    #[tokio::test]
    async fn test_reset_at_follows_store_ttl() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = FixedWindowLimiter::new(store);
        let policy = RateLimitPolicy::new(5, WINDOW);
        let before = Utc::now();

        let outcome = limiter.check("s", "A", &policy).await;

        let reset = outcome.decision.reset_at;
        assert!(reset >= before + chrono::Duration::seconds(19));
        assert!(reset <= Utc::now() + chrono::Duration::seconds(21));
    }

    #[tokio::test]
    async fn test_retry_after_clamped_at_zero() {
        let decision = RateLimitDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_at: Utc::now() - chrono::Duration::seconds(5),
        };

        assert_eq!(decision.retry_after(Utc::now()), 0);
    }
}
