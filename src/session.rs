use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::api::MixClient;
use crate::auth::{AuthSources, MixAuthClient, TokenStore};
use crate::config::Config;
use crate::job::{ApiJobPoller, JobWaiter};

/// Everything one CLI invocation needs to talk to Mix: a token store, the
/// API client built on it, and a job waiter polling through that client
pub struct Session {
    config: Config,
    client: Arc<MixClient>,
    poller: Arc<ApiJobPoller>,
    waiter: JobWaiter,
}

impl Session {
    /// Configure the token store from `sources`, falling back to the default
    /// credential files and environment when none were given.
    pub fn new(config: Config, sources: AuthSources) -> Result<Self> {
        let auth = Arc::new(
            MixAuthClient::new(&config.api).context("Failed to set up Mix authorization client")?,
        );

        let tokens = if sources.is_empty() {
            debug!("No auth source given, looking up defaults");
            TokenStore::from_default_sources(auth)
        } else {
            TokenStore::configure(sources, auth)
        }
        .context("Failed to configure Mix API authorization")?;

        Self::with_tokens(config, Arc::new(tokens))
    }

    pub fn with_tokens(config: Config, tokens: Arc<TokenStore>) -> Result<Self> {
        let client = Arc::new(
            MixClient::new(&config.api, tokens).context("Failed to create Mix API client")?,
        );
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: Arc<MixClient>) -> Self {
        let poller = Arc::new(ApiJobPoller::new(client.clone()));
        let waiter = JobWaiter::from_settings(poller.clone(), &config.jobs);
        info!(
            "Session ready for {} (poll every {}s)",
            config.api.host, config.jobs.poll_interval_secs
        );

        Self {
            config,
            client,
            poller,
            waiter,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &Arc<MixClient> {
        &self.client
    }

    pub fn poller(&self) -> &ApiJobPoller {
        &self.poller
    }

    pub fn waiter(&self) -> &JobWaiter {
        &self.waiter
    }

    /// Replace the waiter, e.g. to poll faster in tests.
    pub fn with_waiter(mut self, waiter: JobWaiter) -> Self {
        self.waiter = waiter;
        self
    }
}
