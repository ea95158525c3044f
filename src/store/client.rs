//! REST client for the counter store.
//!
//! The store speaks a Redis-flavored REST protocol: every command is POSTed
//! to a single endpoint as a JSON array (command name followed by its
//! arguments) with bearer-token auth, and the reply is a JSON object
//! carrying either a `result` field or an `error` field. There is no
//! persistent connection and no pipelining; one command, one round-trip.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::trace;

use crate::config::StoreConfig;

/// Errors from talking to the counter store.
///
/// Every variant is recoverable from the limiter's point of view: admission
/// fails open and the error surfaces only as a logged warning.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection, TLS, or timeout failure before a reply arrived
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with a non-2xx status and no command error
    #[error("store responded with status {0}")]
    Status(StatusCode),

    /// The store reported a command failure in the reply envelope
    #[error("store command failed: {0}")]
    Command(String),

    /// The reply did not decode to the expected envelope or result type
    #[error("malformed store response: {0}")]
    Protocol(String),
}

/// The three primitives the fixed-window limiter needs from a counter store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the integer at `key`, creating it at 1 when
    /// absent, and return the post-increment value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Attach a time-to-live to `key`. No-op when the key does not exist.
    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    /// Remaining seconds-to-live for `key`: `-1` when the key has no
    /// expiry, `-2` when it does not exist.
    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;
}

/// Reply envelope used by the store for every command.
#[derive(Debug, Deserialize)]
struct StoreReply {
    result: Option<Value>,
    error: Option<String>,
}

/// Counter store client over HTTP.
///
/// Cheap to clone; the underlying connection pool is shared. The endpoint
/// and token are fixed at construction and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RestCounterStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RestCounterStore {
    /// Build a client from the store configuration.
    ///
    /// The per-command timeout lives on the HTTP client itself, so a hung
    /// store surfaces as a `Transport` error rather than stalling requests.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }

    /// Send one command and unwrap the `result`/`error` envelope.
    ///
    /// A present `error` field wins over the transport status: the store
    /// reports command failures with non-2xx codes too, and those are
    /// command errors, not protocol ones.
    async fn execute(&self, command: Value) -> Result<Value, StoreError> {
        trace!(command = %command, "sending store command");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<StoreReply>(&body) {
            Ok(reply) => {
                if let Some(error) = reply.error {
                    return Err(StoreError::Command(error));
                }
                if !status.is_success() {
                    return Err(StoreError::Status(status));
                }
                reply.result.ok_or_else(|| {
                    StoreError::Protocol("reply carries neither result nor error".to_string())
                })
            }
            Err(_) if !status.is_success() => Err(StoreError::Status(status)),
            Err(e) => Err(StoreError::Protocol(e.to_string())),
        }
    }

    async fn execute_integer(&self, command: Value) -> Result<i64, StoreError> {
        let result = self.execute(command).await?;
        result
            .as_i64()
            .ok_or_else(|| StoreError::Protocol(format!("expected integer result, got {result}")))
    }
}

#[async_trait]
impl CounterStore for RestCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.execute_integer(json!(["INCR", key])).await
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        self.execute(json!(["EXPIRE", key, seconds])).await.map(|_| ())
    }

    async fn ttl(&self, key: &str) -> Result<i64, StoreError> {
        self.execute_integer(json!(["TTL", key])).await
    }
}
