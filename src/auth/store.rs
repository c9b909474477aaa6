//! Session-wide holder of the active authorization strategy

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::Mutex;

use super::client::AuthFlow;
use super::credentials::ClientCredential;
use super::error::AuthError;
use super::sources::{self, AuthSources};
use super::token::{AuthToken, Clock, IssuedToken, SystemClock, strip_enclosing_quotes};

enum Strategy {
    /// Fixed bearer token, from the command line or read from `origin`
    Literal { token: String, origin: Option<PathBuf> },
    /// Tokens issued by the client credentials flow. The mutex is held across
    /// an exchange so concurrent callers wait for a single refresh.
    ClientCredential {
        credential: ClientCredential,
        cached: Mutex<Option<IssuedToken>>,
    },
}

pub struct TokenStore {
    strategy: Strategy,
    auth: Arc<dyn AuthFlow>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    /// Configure the store from the supplied sources. Exactly one must be set.
    pub fn configure(sources: AuthSources, auth: Arc<dyn AuthFlow>) -> Result<Self, AuthError> {
        let supplied = sources.count();
        if supplied > 1 {
            return Err(AuthError::Configuration(format!(
                "exactly one of token, token file or client credentials must be supplied, got {}",
                supplied
            )));
        }

        let strategy = match sources {
            AuthSources { token: Some(token), .. } => {
                info!("Using Mix API token supplied on the command line");
                Strategy::Literal {
                    token: strip_enclosing_quotes(&token).to_string(),
                    origin: None,
                }
            }
            AuthSources { token_file: Some(path), .. } => Strategy::Literal {
                token: read_token_file(&path)?,
                origin: Some(path),
            },
            AuthSources { client_cred_file: Some(path), .. } => {
                Self::credential_strategy(ClientCredential::from_json_file(&path)?)
            }
            AuthSources { client_credential: Some(credential), .. } => {
                Self::credential_strategy(credential)
            }
            _ => {
                return Err(AuthError::Configuration(
                    "no Mix API token, token file or client credentials were supplied".to_string(),
                ));
            }
        };

        Ok(Self {
            strategy,
            auth,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn from_client_credential(credential: ClientCredential, auth: Arc<dyn AuthFlow>) -> Self {
        Self {
            strategy: Self::credential_strategy(credential),
            auth,
            clock: Arc::new(SystemClock),
        }
    }

    /// Configure from the default credential/token files, then the environment.
    pub fn from_default_sources(auth: Arc<dyn AuthFlow>) -> Result<Self, AuthError> {
        let sources = AuthSources::default()
            .or_default_files(&sources::default_search_dirs())
            .or_env_credential();
        Self::configure(sources, auth)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn credential_strategy(credential: ClientCredential) -> Strategy {
        Strategy::ClientCredential {
            credential,
            cached: Mutex::new(None),
        }
    }

    /// Whether the store can obtain a new token by itself
    pub fn is_refreshable(&self) -> bool {
        matches!(self.strategy, Strategy::ClientCredential { .. })
    }

    /// Return a token usable for the next request.
    ///
    /// Literal tokens are probed against the service first and fail with
    /// `TokenExpired` once rejected. Credential-backed tokens are reused until
    /// their expiration and then transparently re-issued.
    pub async fn current_token(&self) -> Result<AuthToken, AuthError> {
        match &self.strategy {
            Strategy::Literal { token, origin } => {
                if let Err(e) = self.auth.probe(token).await {
                    return Err(if e.is_token_expired() {
                        literal_expired(origin.as_deref())
                    } else {
                        e
                    });
                }
                Ok(AuthToken::Literal(token.clone()))
            }
            Strategy::ClientCredential { credential, cached } => {
                let mut cached = cached.lock().await;
                let now = self.clock.now();

                if let Some(token) = cached.as_ref() {
                    if !token.is_expired_at(now) {
                        return Ok(AuthToken::Issued(token.clone()));
                    }
                    debug!("Cached Mix API token expired at {}, refreshing", token.expires_at);
                }

                let issued = self.auth.exchange_client_credentials(credential).await?;
                *cached = Some(issued.clone());
                Ok(AuthToken::Issued(issued))
            }
        }
    }

    /// React to a request rejected as unauthorized while using `rejected`.
    ///
    /// Credential-backed stores drop the cached token (unless another caller
    /// already replaced it) so the request can be retried once. Literal tokens
    /// cannot be renewed and fail with `TokenExpired`.
    pub async fn handle_unauthorized(&self, rejected: &str) -> Result<(), AuthError> {
        match &self.strategy {
            Strategy::Literal { origin, .. } => Err(literal_expired(origin.as_deref())),
            Strategy::ClientCredential { cached, .. } => {
                let mut cached = cached.lock().await;
                if cached.as_ref().is_some_and(|t| t.access_token == rejected) {
                    info!("Mix API token was rejected, dropping it");
                    *cached = None;
                }
                Ok(())
            }
        }
    }
}

fn read_token_file(path: &Path) -> Result<String, AuthError> {
    info!("Reading Mix API token from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| AuthError::CredentialFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let token = strip_enclosing_quotes(&content);
    if token.is_empty() {
        return Err(AuthError::CredentialFile {
            path: path.to_path_buf(),
            message: "token file is empty".to_string(),
        });
    }
    Ok(token.to_string())
}

fn literal_expired(origin: Option<&Path>) -> AuthError {
    match origin {
        Some(path) => AuthError::TokenExpired(format!(
            "Mix API auth token from {} has expired, please renew it",
            path.display()
        )),
        None => AuthError::TokenExpired(
            "Mix API auth token has expired, please supply a fresh one".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::auth::token::TokenGrant;

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(now)))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Issues `token-N` stamped by the shared clock, and accepts only `valid` on probes.
    struct CountingAuth {
        clock: Arc<ManualClock>,
        exchanges: AtomicUsize,
        probes: AtomicUsize,
        valid: &'static str,
    }

    impl CountingAuth {
        fn new(clock: Arc<ManualClock>) -> Arc<Self> {
            Arc::new(Self {
                clock,
                exchanges: AtomicUsize::new(0),
                probes: AtomicUsize::new(0),
                valid: "good-token",
            })
        }
    }

    #[async_trait]
    impl AuthFlow for CountingAuth {
        async fn exchange_client_credentials(
            &self,
            _credential: &ClientCredential,
        ) -> Result<IssuedToken, AuthError> {
            let n = self.exchanges.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            IssuedToken::from_grant(
                TokenGrant {
                    access_token: format!("token-{}", n),
                    scope: Some("mix-api".to_string()),
                    token_type: Some("bearer".to_string()),
                },
                self.clock.now(),
            )
        }

        async fn probe(&self, token: &str) -> Result<Value, AuthError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if token == self.valid {
                Ok(json!({"mix.version": "test"}))
            } else {
                Err(AuthError::TokenExpired("rejected".to_string()))
            }
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn credential() -> ClientCredential {
        ClientCredential::from_command_line("id".to_string(), "secret".to_string())
    }

    fn credential_store(auth: Arc<CountingAuth>, clock: Arc<ManualClock>) -> TokenStore {
        TokenStore::from_client_credential(credential(), auth).with_clock(clock)
    }

    #[test]
    fn test_exactly_one_source_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("token");
        let cred_file = dir.path().join("creds.json");
        fs::write(&token_file, "\"file-token\"\n").unwrap();
        fs::write(&cred_file, r#"{"client-id": "id", "service-secret": "secret"}"#).unwrap();

        let auth = CountingAuth::new(ManualClock::at(start()));

        for mask in 0u8..16 {
            let sources = AuthSources {
                token: (mask & 1 != 0).then(|| "literal".to_string()),
                token_file: (mask & 2 != 0).then(|| token_file.clone()),
                client_cred_file: (mask & 4 != 0).then(|| cred_file.clone()),
                client_credential: (mask & 8 != 0).then(credential),
            };
            let supplied = sources.count();
            let result = TokenStore::configure(sources, auth.clone());

            if supplied == 1 {
                assert!(result.is_ok(), "mask {:#06b} should configure", mask);
            } else {
                assert!(
                    matches!(result, Err(AuthError::Configuration(_))),
                    "mask {:#06b} should be a configuration error",
                    mask
                );
            }
        }
    }

    #[tokio::test]
    async fn test_token_file_is_unquoted_and_probed() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("mix-api-token");
        fs::write(&token_file, "  \"good-token\"\n").unwrap();

        let auth = CountingAuth::new(ManualClock::at(start()));
        let sources = AuthSources {
            token_file: Some(token_file),
            ..Default::default()
        };
        let store = TokenStore::configure(sources, auth.clone()).unwrap();

        let token = store.current_token().await.unwrap();
        assert_eq!(token, AuthToken::Literal("good-token".to_string()));
        assert_eq!(auth.probes.load(Ordering::SeqCst), 1);
        assert!(!store.is_refreshable());
    }

    #[tokio::test]
    async fn test_expired_file_token_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("stale-token");
        fs::write(&token_file, "stale").unwrap();

        let auth = CountingAuth::new(ManualClock::at(start()));
        let sources = AuthSources {
            token_file: Some(token_file.clone()),
            ..Default::default()
        };
        let store = TokenStore::configure(sources, auth.clone()).unwrap();

        match store.current_token().await.unwrap_err() {
            AuthError::TokenExpired(message) => {
                assert!(message.contains(&token_file.display().to_string()))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(auth.exchanges.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_only_after_expiration() {
        let clock = ManualClock::at(start());
        let auth = CountingAuth::new(clock.clone());
        let store = credential_store(auth.clone(), clock.clone());

        let first = store.current_token().await.unwrap();
        assert_eq!(first.as_str(), "token-1");

        clock.advance(Duration::minutes(14));
        assert_eq!(store.current_token().await.unwrap().as_str(), "token-1");
        assert_eq!(auth.exchanges.load(Ordering::SeqCst), 1);

        clock.advance(Duration::seconds(1));
        assert_eq!(store.current_token().await.unwrap().as_str(), "token-2");
        assert_eq!(auth.exchanges.load(Ordering::SeqCst), 2);
        assert_eq!(auth.probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_exchange() {
        let clock = ManualClock::at(start());
        let auth = CountingAuth::new(clock.clone());
        let store = Arc::new(credential_store(auth.clone(), clock));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.current_token().await.unwrap() })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().as_str(), "token-1");
        }
        assert_eq!(auth.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_drops_matching_cached_token() {
        let clock = ManualClock::at(start());
        let auth = CountingAuth::new(clock.clone());
        let store = credential_store(auth.clone(), clock);

        store.current_token().await.unwrap();
        store.handle_unauthorized("some-other-token").await.unwrap();
        assert_eq!(store.current_token().await.unwrap().as_str(), "token-1");

        store.handle_unauthorized("token-1").await.unwrap();
        assert_eq!(store.current_token().await.unwrap().as_str(), "token-2");
    }

    #[tokio::test]
    async fn test_unauthorized_literal_token_is_expired() {
        let auth = CountingAuth::new(ManualClock::at(start()));
        let sources = AuthSources {
            token: Some("good-token".to_string()),
            ..Default::default()
        };
        let store = TokenStore::configure(sources, auth).unwrap();

        let err = store.handle_unauthorized("good-token").await.unwrap_err();
        assert!(err.is_token_expired());
    }
}
