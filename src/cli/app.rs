use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::commands::{
    AuthCommands, DlgCommands, JobCommands, NluCommands, ProjectCommands, SysCommands,
};
use mix_cli::auth::{AuthSources, ClientCredential};
use mix_cli::config::Config;
use mix_cli::session::Session;

#[derive(Parser)]
#[command(name = "mix-cli")]
#[command(version, about = "A CLI tool for the Mix conversational AI platform API")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Mix API bearer token
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// File holding a Mix API bearer token
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Client credentials JSON with client-id and service-secret
    #[arg(long, global = true)]
    pub client_cred: Option<PathBuf>,

    /// Mix client id, used together with --service-secret
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Mix service secret, used together with --client-id
    #[arg(long, global = true)]
    pub service_secret: Option<String>,

    /// Mix API host, e.g. https://mix.nuance.com
    #[arg(long, global = true)]
    pub api_host: Option<String>,

    /// Config file instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write the log to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate Mix auth tokens
    Auth(AuthCommands),
    /// Platform information
    Sys(SysCommands),
    /// Inspect and wait for project jobs
    Job(JobCommands),
    /// Project model builds and copies
    Project(ProjectCommands),
    /// NLU model export, import and training
    Nlu(NluCommands),
    /// Dialog model export and import
    Dlg(DlgCommands),
}

impl GlobalArgs {
    pub fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        Ok(config.with_api_host(self.api_host.clone()))
    }

    /// Auth sources given on the command line
    pub fn auth_sources(&self) -> Result<AuthSources> {
        let client_credential = match (&self.client_id, &self.service_secret) {
            (Some(id), Some(secret)) => Some(ClientCredential::from_command_line(
                id.clone(),
                secret.clone(),
            )),
            (None, None) => None,
            _ => anyhow::bail!("Both --client-id and --service-secret must be given"),
        };

        Ok(AuthSources {
            token: self.token.clone(),
            token_file: self.token_file.clone(),
            client_cred_file: self.client_cred.clone(),
            client_credential,
        })
    }

    pub fn session(&self) -> Result<Session> {
        Session::new(self.load_config()?, self.auth_sources()?)
    }
}
