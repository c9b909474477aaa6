use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde_json::Value;

use crate::auth::sources;
use crate::auth::{AuthFlow, AuthSources, AuthToken, ClientCredential, TokenStore};

/// How an issued token is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TokenFormat {
    /// The bare access token
    #[default]
    Str,
    /// Token with scope, type and expiration metadata
    Json,
}

/// Pick the client credentials for `auth client`: a credentials file or an
/// id/secret pair, never both. With neither, the default files in
/// `search_dirs` are tried before the environment, as for every other command.
pub fn resolve_client_credential(
    cred_file: Option<&Path>,
    client_id: Option<String>,
    service_secret: Option<String>,
    search_dirs: &[PathBuf],
) -> Result<ClientCredential> {
    match (cred_file, client_id, service_secret) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            anyhow::bail!("Use either --client-cred or --client-id/--service-secret, not both")
        }
        (Some(path), None, None) => Ok(ClientCredential::from_json_file(path)?),
        (None, Some(id), Some(secret)) => Ok(ClientCredential::from_command_line(id, secret)),
        (None, Some(_), None) | (None, None, Some(_)) => {
            anyhow::bail!("Both --client-id and --service-secret must be given")
        }
        (None, None, None) => {
            let found = AuthSources::default()
                .or_default_files(search_dirs)
                .or_env_credential();
            match found {
                AuthSources {
                    client_cred_file: Some(path),
                    ..
                } => Ok(ClientCredential::from_json_file(&path)?),
                AuthSources {
                    client_credential: Some(credential),
                    ..
                } => Ok(credential),
                AuthSources {
                    token_file: Some(path),
                    ..
                } => anyhow::bail!(
                    "Found default token file {} but generating a token needs client credentials",
                    path.display()
                ),
                _ => anyhow::bail!(
                    "No client credentials given and no {} found",
                    sources::DEFAULT_CLIENT_CRED_FILE
                ),
            }
        }
    }
}

/// Run the client credentials grant and render the issued token.
pub async fn issue_token(
    auth: Arc<dyn AuthFlow>,
    credential: ClientCredential,
    format: TokenFormat,
) -> Result<Value> {
    let store = TokenStore::from_client_credential(credential, auth);
    let token = store
        .current_token()
        .await
        .context("Failed to generate Mix auth token")?;

    let AuthToken::Issued(issued) = token else {
        anyhow::bail!("Client credentials did not produce an issued token");
    };

    Ok(match format {
        TokenFormat::Str => Value::String(issued.access_token),
        TokenFormat::Json => serde_json::to_value(&issued)?,
    })
}
