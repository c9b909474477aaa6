use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::credentials::ClientCredential;
use super::error::AuthError;
use super::token::{Clock, IssuedToken, SystemClock, TokenGrant};
use crate::api::constants::{self, headers};
use crate::api::response;
use crate::config::ApiConfig;

pub const CLIENT_CREDENTIALS_FORM: [(&str, &str); 2] =
    [("grant_type", "client_credentials"), ("scope", "mix-api")];

const TOKEN_EXPIRED_MESSAGE: &str = "Mix API auth token has expired";

/// Authorization operations the token store relies on
#[async_trait]
pub trait AuthFlow: Send + Sync {
    /// Run the client credentials grant and return a freshly stamped token.
    async fn exchange_client_credentials(
        &self,
        credential: &ClientCredential,
    ) -> Result<IssuedToken, AuthError>;

    /// Call a cheap authenticated endpoint to check whether `token` is still accepted.
    async fn probe(&self, token: &str) -> Result<Value, AuthError>;
}

/// `AuthFlow` against the Mix authorization server and API
pub struct MixAuthClient {
    client: Client,
    token_url: String,
    probe_url: String,
    clock: Arc<dyn Clock>,
}

impl MixAuthClient {
    pub fn new(config: &ApiConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(|source| AuthError::Transport {
                url: config.auth_url.clone(),
                source,
            })?;

        Ok(Self::with_custom_client(
            client,
            config.auth_url.clone(),
            constants::join_url(&config.host, &config.path_prefix, constants::VERSION_ENDPOINT),
        ))
    }

    pub fn with_custom_client(client: Client, token_url: String, probe_url: String) -> Self {
        Self {
            client,
            token_url,
            probe_url,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn transport(&self, url: &str) -> impl FnOnce(reqwest::Error) -> AuthError {
        let url = url.to_string();
        move |source| AuthError::Transport { url, source }
    }
}

#[async_trait]
impl AuthFlow for MixAuthClient {
    async fn exchange_client_credentials(
        &self,
        credential: &ClientCredential,
    ) -> Result<IssuedToken, AuthError> {
        debug!(
            "Requesting Mix API token from {} for client {}",
            self.token_url, credential.client_id
        );

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                urlencoding::encode(&credential.client_id),
                Some(urlencoding::encode(&credential.service_secret)),
            )
            .form(&CLIENT_CREDENTIALS_FORM)
            .send()
            .await
            .map_err(self.transport(&self.token_url))?;

        let status = response.status();
        debug!("Token request status: {}", status);

        let body = response.text().await.map_err(self.transport(&self.token_url))?;
        if status != StatusCode::OK {
            return Err(AuthError::AuthFailure(format!(
                "authorization endpoint returned {}: {}",
                status, body
            )));
        }
        if body.trim().is_empty() {
            return Err(AuthError::AuthFailure(
                "authorization endpoint returned an empty payload".to_string(),
            ));
        }

        let grant: TokenGrant = serde_json::from_str(&body)
            .map_err(|e| AuthError::AuthFailure(format!("invalid token payload: {}", e)))?;

        let token = IssuedToken::from_grant(grant, self.clock.now())?;
        debug!("Mix API token issued, expires at {}", token.expires_at);
        Ok(token)
    }

    async fn probe(&self, token: &str) -> Result<Value, AuthError> {
        debug!("Probing {} to validate token", self.probe_url);

        let response = self
            .client
            .get(&self.probe_url)
            .header(ACCEPT, headers::ACCEPT_JSON)
            .bearer_auth(token)
            .send()
            .await
            .map_err(self.transport(&self.probe_url))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::TokenExpired(TOKEN_EXPIRED_MESSAGE.to_string()));
        }

        let body = response.text().await.map_err(self.transport(&self.probe_url))?;
        if !status.is_success() {
            return Err(AuthError::Http {
                url: self.probe_url.clone(),
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let payload: Value =
            serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse {
                url: self.probe_url.clone(),
                message: e.to_string(),
            })?;

        if response::signals_unauthorized(&payload) {
            return Err(AuthError::TokenExpired(TOKEN_EXPIRED_MESSAGE.to_string()));
        }
        Ok(payload)
    }
}
