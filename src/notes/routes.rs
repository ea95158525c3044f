//! Route table for the notes resource.
//!
//! Each operation carries its own admission policy and scope, so budgets
//! never bleed across routes that share a client identifier.

use std::sync::Arc;
use std::time::Duration;

use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

use crate::ratelimit::{enforce, FixedWindowLimiter, RateLimitContext, RateLimitPolicy};

use super::handlers::{self, AppState};

const WINDOW: Duration = Duration::from_secs(20);

const LIST_POLICY: RateLimitPolicy = RateLimitPolicy::new(20, WINDOW);
const READ_POLICY: RateLimitPolicy = RateLimitPolicy::new(10, WINDOW);
const WRITE_POLICY: RateLimitPolicy = RateLimitPolicy::new(5, WINDOW);

/// Build the `/api/notes` router with per-operation rate limits.
pub fn notes_router(state: AppState, limiter: Arc<FixedWindowLimiter>) -> Router {
    let limit = |scope: &'static str, policy: RateLimitPolicy| {
        from_fn_with_state(
            RateLimitContext::new(Arc::clone(&limiter), scope, policy),
            enforce,
        )
    };

    Router::new()
        .route(
            "/",
            get(handlers::list_notes.layer(limit("notes:list", LIST_POLICY)))
                .post(handlers::create_note.layer(limit("notes:create", WRITE_POLICY))),
        )
        .route(
            "/{id}",
            get(handlers::get_note.layer(limit("notes:get", READ_POLICY)))
                .put(handlers::update_note.layer(limit("notes:update", WRITE_POLICY)))
                .delete(handlers::delete_note.layer(limit("notes:delete", WRITE_POLICY))),
        )
        .with_state(state)
}
