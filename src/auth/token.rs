//! Bearer tokens used to authorize Mix API requests

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Lifetime stamped on issued tokens. The platform keeps them valid for
/// 15 minutes; one minute is held back as a safety margin.
pub const TOKEN_LIFETIME_MINUTES: i64 = 14;

pub const EXPECTED_SCOPE: &str = "mix-api";
pub const EXPECTED_TOKEN_TYPE: &str = "bearer";

/// Source of the current time, injectable so expiry can be tested
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Raw payload returned by the authorization endpoint on a successful grant
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Token produced by the client credentials flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub scope: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Validate a grant and stamp its issuance and expiration times.
    pub fn from_grant(grant: TokenGrant, issued_at: DateTime<Utc>) -> Result<Self, AuthError> {
        if grant.access_token.trim().is_empty() {
            return Err(AuthError::AuthFailure(
                "token response carries an empty access_token".to_string(),
            ));
        }

        let scope = grant.scope.unwrap_or_default();
        if scope != EXPECTED_SCOPE {
            return Err(AuthError::AuthFailure(format!(
                "unexpected token scope '{}', expected '{}'",
                scope, EXPECTED_SCOPE
            )));
        }

        let token_type = grant.token_type.unwrap_or_default();
        if !token_type.eq_ignore_ascii_case(EXPECTED_TOKEN_TYPE) {
            return Err(AuthError::AuthFailure(format!(
                "unexpected token type '{}', expected '{}'",
                token_type, EXPECTED_TOKEN_TYPE
            )));
        }

        Ok(Self {
            access_token: grant.access_token,
            scope,
            token_type,
            issued_at,
            expires_at: issued_at + Duration::minutes(TOKEN_LIFETIME_MINUTES),
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A usable bearer token, either handed over by the user or issued by the
/// client credentials flow
#[derive(Debug, Clone, PartialEq)]
pub enum AuthToken {
    Literal(String),
    Issued(IssuedToken),
}

impl AuthToken {
    pub fn as_str(&self) -> &str {
        match self {
            AuthToken::Literal(token) => token,
            AuthToken::Issued(issued) => &issued.access_token,
        }
    }

    /// Literal tokens carry no expiration metadata.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AuthToken::Literal(_) => None,
            AuthToken::Issued(issued) => Some(issued.expires_at),
        }
    }
}

/// Trim a token read from a file and drop one pair of enclosing double quotes.
pub fn strip_enclosing_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
