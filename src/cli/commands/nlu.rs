use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::cli::app::GlobalArgs;
use crate::cli::output::{self, OutputArgs};
use crate::cli::ui::with_spinner;
use mix_cli::commands::nlu;

#[derive(Args)]
pub struct NluCommands {
    #[command(subcommand)]
    pub command: NluSubcommands,
}

#[derive(Subcommand)]
pub enum NluSubcommands {
    /// Export one locale's NLU model to a TRSX file
    Export {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Locale of the NLU model
        #[arg(short, long)]
        locale: String,
        /// Output TRSX file
        #[arg(short = 'o', long)]
        out_trsx: PathBuf,
    },
    /// Import a TRSX file into the project's NLU model
    Import {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// TRSX file to import
        #[arg(short, long)]
        src: PathBuf,
        /// Locale of the import
        #[arg(short, long)]
        locale: Option<String>,
        /// Return right after submitting the import
        #[arg(long)]
        no_wait: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Train the run-time NLU model used to try annotations
    TryTrain {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Locale of the NLU model
        #[arg(short, long)]
        locale: String,
        /// Return right after launching training
        #[arg(long)]
        no_wait: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
}

pub async fn handle_nlu_command(args: NluCommands, global: &GlobalArgs) -> Result<()> {
    let session = global.session()?;

    match args.command {
        NluSubcommands::Export {
            project_id,
            locale,
            out_trsx,
        } => {
            nlu::export_trsx(&session, project_id, &locale, &out_trsx).await?;
            eprintln!("{} {}", "✓ NLU model exported to".green(), out_trsx.display());
            Ok(())
        }
        NluSubcommands::Import {
            project_id,
            src,
            locale,
            no_wait,
            out,
        } => {
            let result = with_spinner(
                format!("Importing {}", src.display()),
                nlu::import_trsx(&session, project_id, &src, locale.as_deref(), !no_wait),
            )
            .await?;
            output::write_result(&result, &out)
        }
        NluSubcommands::TryTrain {
            project_id,
            locale,
            no_wait,
            out,
        } => {
            let result = with_spinner(
                format!("Training project {} {}", project_id, locale),
                nlu::try_train(&session, project_id, &locale, !no_wait),
            )
            .await?;
            output::write_result(&result, &out)
        }
    }
}
