//! Noteguard - Notes API behind a distributed rate limiter
//!
//! This crate implements a CRUD HTTP API for a notes collection, with every
//! endpoint protected by a fixed-window rate limiter. Limiter counters live
//! in an external Redis-compatible key-value store reached over a REST
//! protocol, so any number of stateless replicas enforce one shared budget.

pub mod config;
pub mod error;
pub mod notes;
pub mod ratelimit;
pub mod server;
pub mod store;
