//! Core library for signaldesk, a client for a trading-signal webhook service.
//!
//! - [`auth`]: the access-token session, its durable storage and the expiry
//!   countdown
//! - [`api`]: the REST client and the authenticated-fetch-with-fallback
//!   policy used by listings
//! - [`webhook`]: building webhook bodies from form input
//! - [`models`], [`utils`], [`config`]: wire types, list helpers, settings

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
pub mod webhook;

pub use api::{Access, ApiClient, ApiError, FetchOutcome};
pub use auth::{Countdown, CountdownDisplay, FileStore, KeyValueStore, MemoryStore, Session, SessionError, SessionStore};
pub use config::Config;
