use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::{KeyValueStore, StorageError};

/// Storage key for the bearer token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the token expiry instant (RFC 3339)
pub const ACCESS_TOKEN_VALIDITY_KEY: &str = "access_token_validity";

#[derive(Error, Debug)]
pub enum SessionError {
    /// The token lifetime cannot be represented as an expiry instant.
    #[error("Token lifetime of {0} minutes is out of range")]
    InvalidExpire(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The token currently held by the client, if any.
///
/// `expires_at` only means something while `access_token` is set. A session
/// without a token is never fresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            expires_at: Some(expires_at),
        }
    }

    /// True iff a token is held and its expiry is strictly after `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            _ => false,
        }
    }

    /// Time left until expiry, negative once it has passed.
    /// `None` means there is no session to count down.
    pub fn remaining_duration(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.access_token.as_ref()?;
        self.expires_at.map(|expires_at| expires_at - now)
    }

    /// Bearer token, only while fresh
    pub fn token_if_fresh(&self, now: DateTime<Utc>) -> Option<&str> {
        if self.is_fresh(now) {
            self.access_token.as_deref()
        } else {
            None
        }
    }

    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Single source of truth for the held token, written through to a durable
/// key-value store so it survives a restart.
///
/// Only `login*`, `logout` and `invalidate` mutate the session, and always as
/// a whole.
pub struct SessionStore<S: KeyValueStore> {
    store: S,
    session: Session,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Load any persisted session from `store`.
    pub fn open(store: S) -> Result<Self, StorageError> {
        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        let expires_at = match store.get(ACCESS_TOKEN_VALIDITY_KEY)? {
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    warn!(error = %e, "Ignoring unparseable token validity");
                    None
                }
            },
            None => None,
        };
        let session = Session {
            access_token,
            expires_at,
        };
        debug!(
            has_token = session.has_token(),
            expires_at = ?session.expires_at,
            "Session loaded"
        );
        Ok(Self { store, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Record a freshly issued token valid for `expires_in_minutes` from now.
    pub fn login(&mut self, access_token: &str, expires_in_minutes: i64) -> Result<(), SessionError> {
        self.login_at(access_token, expires_in_minutes, Utc::now())
    }

    /// `login` against an explicit clock reading.
    pub fn login_at(
        &mut self,
        access_token: &str,
        expires_in_minutes: i64,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        // the lifetime comes from the server; nothing is stored if it overflows
        let expires_at = Duration::try_minutes(expires_in_minutes)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or(SessionError::InvalidExpire(expires_in_minutes))?;

        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Err(e) = self.store.set(ACCESS_TOKEN_VALIDITY_KEY, &expires_at.to_rfc3339()) {
            // don't leave a token behind without its validity
            let _ = self.store.remove(ACCESS_TOKEN_KEY);
            return Err(e.into());
        }

        self.session = Session::new(access_token, expires_at);
        info!(%expires_at, "Session stored");
        Ok(())
    }

    /// Drop the session locally. Memory is always cleared; both keys are
    /// attempted and the first storage failure is reported.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.session = Session::default();
        let token = self.store.remove(ACCESS_TOKEN_KEY);
        let validity = self.store.remove(ACCESS_TOKEN_VALIDITY_KEY);
        info!("Session cleared");
        token.and(validity)
    }

    /// Explicit reset after the caller decided the token is no longer usable.
    pub fn invalidate(&mut self) -> Result<(), StorageError> {
        self.logout()
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.session.is_fresh(now)
    }

    pub fn remaining_duration(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.session.remaining_duration(now)
    }

    pub fn token_if_fresh(&self, now: DateTime<Utc>) -> Option<&str> {
        self.session.token_if_fresh(now)
    }

    /// Stored token regardless of freshness
    pub fn token(&self) -> Option<&str> {
        self.session.access_token.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> S {
        self.store
    }
}

// ============================================================================
// Tests
// ============================================================================
