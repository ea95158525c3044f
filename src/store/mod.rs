//! Counter store access.
//!
//! The external key-value store owns every rate limit counter and expiry;
//! this module is the only way the rest of the service reaches it.

mod client;

pub use client::{CounterStore, RestCounterStore, StoreError};
