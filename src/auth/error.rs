use std::path::PathBuf;

use thiserror::Error;

/// Failures while configuring or obtaining Mix API credentials
#[derive(Debug, Error)]
pub enum AuthError {
    /// Zero or several auth sources were supplied
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The client credentials grant was rejected or returned garbage
    #[error("Mix OAuth client credential authorization failed: {0}")]
    AuthFailure(String),

    #[error("{0}")]
    TokenExpired(String),

    #[error("Failed to read {}: {message}", path.display())]
    CredentialFile { path: PathBuf, message: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-auth HTTP failure while probing a token
    #[error("{url} returned {status}: {body}")]
    Http { url: String, status: u16, body: String },

    #[error("Response from {url} is not valid JSON: {message}")]
    InvalidResponse { url: String, message: String },
}

impl AuthError {
    pub fn is_token_expired(&self) -> bool {
        matches!(self, AuthError::TokenExpired(_))
    }
}
