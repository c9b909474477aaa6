use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::app::GlobalArgs;
use crate::cli::output::{self, OutputArgs};
use mix_cli::commands::sys;

#[derive(Args)]
pub struct SysCommands {
    #[command(subcommand)]
    pub command: SysSubcommands,
}

#[derive(Subcommand)]
pub enum SysSubcommands {
    /// Show the Mix platform version
    Version {
        #[command(flatten)]
        out: OutputArgs,
    },
}

pub async fn handle_sys_command(args: SysCommands, global: &GlobalArgs) -> Result<()> {
    let session = global.session()?;
    match args.command {
        SysSubcommands::Version { out } => {
            let version = sys::version(session.client()).await?;
            output::write_result(&version, &out)
        }
    }
}
