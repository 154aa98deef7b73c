//! Turnstile - HTTP Admission Control
//!
//! This crate implements an admission-control layer for an HTTP service:
//! each connecting client is admitted or rejected by a token-bucket rate
//! limit keyed on client identity. State is in-memory and single-process;
//! there is no cross-instance coordination.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
