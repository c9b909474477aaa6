use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::json;

use crate::cli::app::GlobalArgs;
use crate::cli::output::{self, OutputArgs};
use crate::cli::ui::with_spinner;
use mix_cli::commands::dlg;

#[derive(Args)]
pub struct DlgCommands {
    #[command(subcommand)]
    pub command: DlgSubcommands,
}

#[derive(Subcommand)]
pub enum DlgSubcommands {
    /// Export the project's dialog model as JSON
    Export {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Output JSON file
        #[arg(short = 'o', long)]
        out_json: PathBuf,
    },
    /// Import a dialog JSON artifact, replacing the project's dialog model
    Import {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Dialog JSON to import
        #[arg(short, long)]
        src: PathBuf,
        /// Return right after submitting the import
        #[arg(long)]
        no_wait: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
}

pub async fn handle_dlg_command(args: DlgCommands, global: &GlobalArgs) -> Result<()> {
    let session = global.session()?;

    match args.command {
        DlgSubcommands::Export {
            project_id,
            out_json,
        } => {
            dlg::export_json(&session, project_id, &out_json).await?;
            eprintln!("{} {}", "✓ Dialog model exported to".green(), out_json.display());
            Ok(())
        }
        DlgSubcommands::Import {
            project_id,
            src,
            no_wait,
            out,
        } => {
            let result = with_spinner(
                format!("Importing {}", src.display()),
                dlg::import_json(&session, project_id, &src, !no_wait),
            )
            .await?;
            let result = if result.is_null() { json!({}) } else { result };
            output::write_result(&result, &out)
        }
    }
}
