use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::credentials::ClientCredential;

/// Directory holding default credential and token files
pub const ENV_USERHOME: &str = "MIXCLI_USERHOME";

pub const DEFAULT_CLIENT_CRED_FILE: &str = "mix-client-credentials.json";
pub const DEFAULT_TOKEN_FILE: &str = "mix-api-token";

/// Authorization sources supplied for one session.
/// Exactly one of them must be set when the token store is configured.
#[derive(Debug, Clone, Default)]
pub struct AuthSources {
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub client_cred_file: Option<PathBuf>,
    pub client_credential: Option<ClientCredential>,
}

impl AuthSources {
    pub fn count(&self) -> usize {
        [
            self.token.is_some(),
            self.token_file.is_some(),
            self.client_cred_file.is_some(),
            self.client_credential.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// When nothing was supplied explicitly, fall back to the first default
    /// file found in `search_dirs`. Explicit sources are left untouched.
    pub fn or_default_files(mut self, search_dirs: &[PathBuf]) -> Self {
        if !self.is_empty() {
            return self;
        }

        match find_default_source(search_dirs) {
            Some(DefaultSource::ClientCredentialFile(path)) => {
                info!("Using default client credentials file {}", path.display());
                self.client_cred_file = Some(path);
            }
            Some(DefaultSource::TokenFile(path)) => {
                info!("Using default token file {}", path.display());
                self.token_file = Some(path);
            }
            None => debug!("No default auth file found in {:?}", search_dirs),
        }
        self
    }

    /// When nothing was supplied explicitly, use `MIX_CLIENT_ID` / `MIX_SERVICE_SECRET`.
    pub fn or_env_credential(mut self) -> Self {
        if self.is_empty() {
            self.client_credential = ClientCredential::from_env();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultSource {
    ClientCredentialFile(PathBuf),
    TokenFile(PathBuf),
}

/// Current directory first, then `MIXCLI_USERHOME` when it is set.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(home) = env::var_os(ENV_USERHOME).filter(|v| !v.is_empty()) {
        dirs.push(PathBuf::from(home));
    }
    dirs
}

/// Look for the default files, directory by directory.
/// Within a directory the client credentials file wins over the token file.
pub fn find_default_source(search_dirs: &[PathBuf]) -> Option<DefaultSource> {
    search_dirs.iter().find_map(|dir| lookup_dir(dir))
}

fn lookup_dir(dir: &Path) -> Option<DefaultSource> {
    let cred = dir.join(DEFAULT_CLIENT_CRED_FILE);
    if cred.is_file() {
        return Some(DefaultSource::ClientCredentialFile(cred));
    }
    let token = dir.join(DEFAULT_TOKEN_FILE);
    if token.is_file() {
        return Some(DefaultSource::TokenFile(token));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_credentials_preferred_over_token_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_TOKEN_FILE), "tok").unwrap();
        fs::write(dir.path().join(DEFAULT_CLIENT_CRED_FILE), "{}").unwrap();

        let found = find_default_source(&[dir.path().to_path_buf()]);
        assert_eq!(
            found,
            Some(DefaultSource::ClientCredentialFile(dir.path().join(DEFAULT_CLIENT_CRED_FILE)))
        );
    }

    #[test]
    fn test_earlier_directory_wins() {
        let cwd = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        fs::write(cwd.path().join(DEFAULT_TOKEN_FILE), "tok").unwrap();
        fs::write(home.path().join(DEFAULT_CLIENT_CRED_FILE), "{}").unwrap();

        let found = find_default_source(&[cwd.path().to_path_buf(), home.path().to_path_buf()]);
        assert_eq!(found, Some(DefaultSource::TokenFile(cwd.path().join(DEFAULT_TOKEN_FILE))));
    }

    #[test]
    fn test_explicit_source_skips_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_TOKEN_FILE), "tok").unwrap();

        let sources = AuthSources {
            token: Some("explicit".to_string()),
            ..Default::default()
        }
        .or_default_files(&[dir.path().to_path_buf()]);

        assert_eq!(sources.count(), 1);
        assert!(sources.token_file.is_none());
    }

    #[test]
    fn test_nothing_found_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let sources = AuthSources::default().or_default_files(&[dir.path().to_path_buf()]);
        assert!(sources.is_empty());
    }
}
