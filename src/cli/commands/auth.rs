use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::app::GlobalArgs;
use crate::cli::output::{self, OutputArgs};
use mix_cli::auth::{AuthFlow, MixAuthClient, sources};
use mix_cli::commands::auth::{self, TokenFormat};

#[derive(Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommands,
}

#[derive(Subcommand)]
pub enum AuthSubcommands {
    /// Generate a Mix auth token from client credentials
    /// (--client-cred, or --client-id with --service-secret)
    Client {
        /// Print the bare token or JSON with expiration metadata
        #[arg(long, value_enum, default_value_t = TokenFormat::Str)]
        out_type: TokenFormat,
        #[command(flatten)]
        out: OutputArgs,
    },
}

pub async fn handle_auth_command(args: AuthCommands, global: &GlobalArgs) -> Result<()> {
    match args.command {
        AuthSubcommands::Client { out_type, out } => {
            let config = global.load_config()?;
            let credential = auth::resolve_client_credential(
                global.client_cred.as_deref(),
                global.client_id.clone(),
                global.service_secret.clone(),
                &sources::default_search_dirs(),
            )?;
            let flow: Arc<dyn AuthFlow> = Arc::new(MixAuthClient::new(&config.api)?);

            let token = auth::issue_token(flow, credential, out_type).await?;
            output::write_result(&token, &out)
        }
    }
}
