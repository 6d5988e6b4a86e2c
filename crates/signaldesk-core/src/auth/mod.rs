//! Authentication module for managing the access token session.
//!
//! This module provides:
//! - `SessionStore`: the held token and its expiry, persisted to a durable store
//! - `KeyValueStore`: the durable store seam (`FileStore`, `MemoryStore`)
//! - `Countdown`: the one-second expiry countdown shown to the user
//!
//! Freshness is purely local: a token is fresh until the expiry computed at
//! login passes. Nothing here ever clears the session on its own.

pub mod countdown;
pub mod session;
pub mod store;

pub use countdown::{format_remaining, Countdown, CountdownDisplay};
pub use session::{Session, SessionError, SessionStore, ACCESS_TOKEN_KEY, ACCESS_TOKEN_VALIDITY_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageError};
