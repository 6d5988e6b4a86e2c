use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::StorageError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 from the server. The listing policy downgrades on this; every
    /// other call surfaces it as "re-login".
    #[error("Credentials rejected: {0}")]
    AuthRejected(String),

    #[error("Request failed with status {status}: {message}")]
    Request { status: StatusCode, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Access token cannot be sent as a header")]
    InvalidToken,

    #[error("Not logged in - an access token is required")]
    NotLoggedIn,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct MessageBody {
    message: String,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut cut = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// The server's `message` field when the body carries one, else the
    /// (truncated) raw body, else the status reason.
    pub fn reason_from_body(status: StatusCode, body: &str) -> String {
        if let Ok(parsed) = serde_json::from_str::<MessageBody>(body) {
            return Self::truncate_body(&parsed.message);
        }
        if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            Self::truncate_body(body)
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::reason_from_body(status, body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::AuthRejected(message),
            _ => ApiError::Request { status, message },
        }
    }

    /// Failures that are surfaced to the user as-is and never retried.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ApiError::Request { .. } | ApiError::Network(_) | ApiError::InvalidResponse(_)
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::AuthRejected(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_uses_server_message() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message": "The token has expired.", "error": "token_expired"}"#,
        );
        match err {
            ApiError::AuthRejected(msg) => assert_eq!(msg, "The token has expired."),
            other => panic!("unexpected {other:?}"),
        }

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message": "Passphrase incorrect."}"#);
        assert!(err.is_request_error());
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert!(err.to_string().contains("Passphrase incorrect."));
    }

    #[test]
    fn test_from_status_falls_back_to_body_or_reason() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated, 510 total bytes"));

        // never splits a multi-byte character
        let wide = "é".repeat(MAX_ERROR_BODY_LENGTH);
        assert!(ApiError::truncate_body(&wide).contains("truncated"));
    }

    #[test]
    fn test_auth_rejected_is_not_a_request_error() {
        assert!(!ApiError::AuthRejected("nope".into()).is_request_error());
        assert!(!ApiError::NotLoggedIn.is_request_error());
    }
}
