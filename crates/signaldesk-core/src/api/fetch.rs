//! Authenticated fetch with anonymous fallback.
//!
//! Listing endpoints answer everyone, but cap anonymous callers at a smaller
//! result set. A listing therefore tries the bearer token first (only when it
//! is fresh) and, on a 401 or with no usable token, asks again without one.
//! The outcome says honestly whether that happened, so callers know the list
//! may be truncated.
//!
//! Per call:
//!
//! ```text
//! AttemptAuthenticated --2xx--> done (used_auth)
//!        |   \--other status / transport error--> RequestError
//!       401 (or no fresh token)
//!        v
//! AttemptAnonymous --2xx--> done (was_downgraded)
//!            \--anything else--> RequestError
//! ```
//!
//! There is never more than one fallback, and a 401 never clears the session.

use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::auth::Session;

use super::{ApiClient, ApiError};

/// Which credentials a fetch may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Use the bearer token when fresh, fall back to anonymous on 401.
    PreferAuth,
    /// Never send a token.
    Anonymous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T = serde_json::Value> {
    pub payload: T,
    /// The successful response came from the authenticated attempt.
    pub used_auth: bool,
    /// Auth was wanted but the answer came from the anonymous attempt,
    /// so the payload may be limited.
    pub was_downgraded: bool,
}

impl ApiClient {
    /// GET `segments` under the policy for `access`, reading the clock now.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        session: &Session,
        access: Access,
    ) -> Result<FetchOutcome<T>, ApiError> {
        self.fetch_at(segments, session, access, Utc::now()).await
    }

    /// `fetch` with an explicit clock reading for the freshness check.
    pub async fn fetch_at<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        session: &Session,
        access: Access,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome<T>, ApiError> {
        let url = self.endpoint(segments);

        if access == Access::PreferAuth {
            match session.token_if_fresh(now) {
                Some(token) => {
                    let response = self.send::<()>(Method::GET, &url, Some(token), None).await?;
                    let status = response.status();

                    if status.is_success() {
                        let payload = Self::read_json(response).await?;
                        return Ok(FetchOutcome {
                            payload,
                            used_auth: true,
                            was_downgraded: false,
                        });
                    }
                    if status != StatusCode::UNAUTHORIZED {
                        // only a 401 has an anonymous fallback
                        let body = response.text().await.unwrap_or_default();
                        return Err(ApiError::from_status(status, &body));
                    }
                    info!(url = %url, "Token rejected, retrying without credentials");
                }
                None => debug!(url = %url, "No fresh token, fetching anonymously"),
            }
        }

        let response = self.send::<()>(Method::GET, &url, None, None).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Request {
                status,
                message: ApiError::reason_from_body(status, &body),
            });
        }

        let payload = Self::read_json(response).await?;
        Ok(FetchOutcome {
            payload,
            used_auth: false,
            was_downgraded: access == Access::PreferAuth,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
