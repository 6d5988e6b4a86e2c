//! REST API client module for the trading-signal webhook service.
//!
//! This module provides the `ApiClient` for talking to the service and the
//! authenticated fetch policy used by every listing that shows more rows to
//! logged-in callers.
//!
//! The service uses bearer token authentication obtained from its `login`
//! endpoint.

pub mod client;
pub mod error;
pub mod fetch;

pub use client::ApiClient;
pub use error::ApiError;
pub use fetch::{Access, FetchOutcome};
