use serde::{Deserialize, Serialize};

/// Body of `POST login`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Requested token lifetime in minutes
    pub expire: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in minutes from now
    pub expire: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// The `{"message": ...}` envelope most endpoints answer with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
