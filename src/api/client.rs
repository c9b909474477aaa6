use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use reqwest::header::{ACCEPT, CONNECTION};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use super::constants::{self, headers};
use super::error::ApiError;
use super::response;
use crate::auth::TokenStore;
use crate::config::ApiConfig;

/// Payload of a Mix API request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// File upload, re-read on every attempt so the request can be replayed
    Multipart {
        field: String,
        file_path: PathBuf,
        mime: &'static str,
    },
}

/// Mix REST API client with connection pooling.
/// Every request asks the token store for a bearer token first.
pub struct MixClient {
    http_client: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl MixClient {
    pub fn new(config: &ApiConfig, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(ApiError::Client)?;

        let base_url = constants::join_url(&config.host, &config.path_prefix, "");
        Ok(Self::with_custom_client(http_client, base_url, tokens))
    }

    /// Create a new client with custom HTTP client configuration
    pub fn with_custom_client(
        http_client: reqwest::Client,
        base_url: String,
        tokens: Arc<TokenStore>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// GET an endpoint, failing on error payloads.
    pub async fn get_json(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, endpoint, &RequestBody::Empty, true)
            .await
    }

    /// Send one request and return the parsed JSON payload (`Null` for an
    /// empty body).
    ///
    /// With `check_errors`, a successful response whose payload reports an
    /// error becomes `ErrorPayload`.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: &RequestBody,
        check_errors: bool,
    ) -> Result<Value, ApiError> {
        let url = self.url(endpoint);
        let text = self.send(&method, &url, body).await?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| ApiError::InvalidJson {
            method: method.to_string(),
            url: url.clone(),
            message: e.to_string(),
        })?;

        if check_errors {
            if let Some(detail) = response::error_detail(&payload) {
                return Err(ApiError::ErrorPayload {
                    method: method.to_string(),
                    url,
                    detail,
                });
            }
        }
        Ok(payload)
    }

    /// GET an endpoint answering with a non-JSON artifact, such as a TRSX export.
    pub async fn get_text(&self, endpoint: &str) -> Result<String, ApiError> {
        let url = self.url(endpoint);
        self.send(&Method::GET, &url, &RequestBody::Empty).await
    }

    /// Send with a bearer token and return the raw body of a successful response.
    ///
    /// An unauthorized answer (HTTP 401 or the in-band signal) is handed to the
    /// token store and the request is replayed once with a fresh token.
    async fn send(&self, method: &Method, url: &str, body: &RequestBody) -> Result<String, ApiError> {
        let mut retried = false;

        loop {
            let token = self.tokens.current_token().await?;
            debug!("{} {}", method, url);

            let response = self
                .build(method, url, body)
                .await?
                .bearer_auth(token.as_str())
                .send()
                .await
                .map_err(|source| transport(method, url, source))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|source| transport(method, url, source))?;
            debug!("{} {} returned {}", method, url, status);

            let unauthorized = status == StatusCode::UNAUTHORIZED
                || (status.is_success()
                    && serde_json::from_str::<Value>(&text)
                        .is_ok_and(|payload| response::signals_unauthorized(&payload)));

            if unauthorized {
                if retried {
                    return Err(ApiError::Unauthorized {
                        method: method.to_string(),
                        url: url.to_string(),
                    });
                }
                info!("{} {} was unauthorized, renewing token", method, url);
                self.tokens.handle_unauthorized(token.as_str()).await?;
                retried = true;
                continue;
            }

            if !status.is_success() {
                return Err(ApiError::Status {
                    method: method.to_string(),
                    url: url.to_string(),
                    status: status.as_u16(),
                    body: text,
                });
            }
            return Ok(text);
        }
    }

    async fn build(
        &self,
        method: &Method,
        url: &str,
        body: &RequestBody,
    ) -> Result<RequestBuilder, ApiError> {
        let builder = self
            .http_client
            .request(method.clone(), url)
            .header(ACCEPT, headers::ACCEPT_JSON)
            .header(CONNECTION, headers::CONNECTION_KEEP_ALIVE);

        match body {
            RequestBody::Empty => Ok(builder),
            RequestBody::Json(value) => Ok(builder.json(value)),
            RequestBody::Multipart {
                field,
                file_path,
                mime,
            } => {
                let bytes = tokio::fs::read(file_path)
                    .await
                    .map_err(|source| ApiError::Io {
                        path: file_path.clone(),
                        source,
                    })?;
                let file_name = file_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());

                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(mime)
                    .map_err(ApiError::Client)?;
                Ok(builder.multipart(Form::new().part(field.clone(), part)))
            }
        }
    }
}

fn transport(method: &Method, url: &str, source: reqwest::Error) -> ApiError {
    ApiError::Transport {
        method: method.to_string(),
        url: url.to_string(),
        source,
    }
}
