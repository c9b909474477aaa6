use std::fmt;
use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use super::error::AuthError;

pub const ENV_CLIENT_ID: &str = "MIX_CLIENT_ID";
pub const ENV_SERVICE_SECRET: &str = "MIX_SERVICE_SECRET";

/// Mix user client credentials used for the client credentials grant
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientCredential {
    #[serde(rename = "client-id")]
    pub client_id: String,
    #[serde(rename = "service-secret")]
    pub service_secret: String,
}

impl fmt::Debug for ClientCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredential")
            .field("client_id", &self.client_id)
            .field("service_secret", &"<redacted>")
            .finish()
    }
}

impl ClientCredential {
    /// Read credentials from a JSON file with top-level `client-id` and
    /// `service-secret` string fields, as downloaded from the Mix dashboard.
    pub fn from_json_file(path: &Path) -> Result<ClientCredential, AuthError> {
        info!("Reading Mix client credentials from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| AuthError::CredentialFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let credential: ClientCredential =
            serde_json::from_str(&content).map_err(|e| AuthError::CredentialFile {
                path: path.to_path_buf(),
                message: format!("invalid client credential JSON: {}", e),
            })?;

        if credential.client_id.is_empty() || credential.service_secret.is_empty() {
            return Err(AuthError::CredentialFile {
                path: path.to_path_buf(),
                message: "client-id and service-secret must not be empty".to_string(),
            });
        }

        Ok(credential)
    }

    /// Credentials from `MIX_CLIENT_ID` / `MIX_SERVICE_SECRET`, if both are set.
    pub fn from_env() -> Option<ClientCredential> {
        let client_id = std::env::var(ENV_CLIENT_ID).ok()?;
        let service_secret = std::env::var(ENV_SERVICE_SECRET).ok()?;
        if client_id.is_empty() || service_secret.is_empty() {
            return None;
        }

        info!("Using Mix client credentials from environment variables");
        Some(ClientCredential {
            client_id,
            service_secret,
        })
    }

    pub fn from_command_line(client_id: String, service_secret: String) -> ClientCredential {
        info!("Using Mix client credentials from command line parameters");
        ClientCredential {
            client_id,
            service_secret,
        }
    }
}
