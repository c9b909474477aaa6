use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::constants;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub jobs: JobSettings,
}

/// Where and how to reach the Mix platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobSettings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_wait_timeout_secs")]
    pub default_timeout_secs: u64,
}

fn default_host() -> String {
    constants::DEFAULT_API_HOST.to_string()
}

fn default_path_prefix() -> String {
    constants::DEFAULT_PATH_PREFIX.to_string()
}

fn default_auth_url() -> String {
    constants::DEFAULT_AUTH_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_wait_timeout_secs() -> u64 {
    600
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            path_prefix: default_path_prefix(),
            auth_url: default_auth_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            default_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            // Use XDG config directory on Linux
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("mix-cli")
        } else {
            // Use home directory with dot prefix on Windows/Mac
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".mix-cli")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Load the config from the default location; a missing file means defaults.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            debug!("Config file {:?} doesn't exist, using defaults", config_path);
            return Ok(Self::default());
        }
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", config_path);

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        config.validate()?;
        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs.poll_interval_secs == 0 {
            anyhow::bail!("jobs.poll_interval_secs must be at least 1");
        }
        if self.api.host.trim().is_empty() {
            anyhow::bail!("api.host must not be empty");
        }
        Ok(())
    }

    /// Override the API host, e.g. from `--api-host`.
    pub fn with_api_host(mut self, host: Option<String>) -> Self {
        if let Some(host) = host {
            info!("Using Mix API host {}", host);
            self.api.host = host;
        }
        self
    }
}
