//! Errors raised by Mix API requests

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable token could be obtained
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{method} {url} failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Still unauthorized after the token was renewed
    #[error("{method} {url} is unauthorized")]
    Unauthorized { method: String, url: String },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("{method} {url} returned invalid JSON: {message}")]
    InvalidJson {
        method: String,
        url: String,
        message: String,
    },

    /// 200 response whose payload reports an error
    #[error("{method} {url} reported an error: {detail}")]
    ErrorPayload {
        method: String,
        url: String,
        detail: String,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::Auth(e) if e.is_token_expired())
    }
}
