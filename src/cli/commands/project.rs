use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::app::GlobalArgs;
use crate::cli::output::{self, OutputArgs};
use crate::cli::ui::with_spinner;
use mix_cli::commands::project::{self, BuildRequest, CopyRequest, Model, NluModelMode};

#[derive(Args)]
pub struct ProjectCommands {
    #[command(subcommand)]
    pub command: ProjectSubcommands,
}

#[derive(Subcommand)]
pub enum ProjectSubcommands {
    /// Launch model builds and wait for them
    Build {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Models to build
        #[arg(short, long, value_enum, num_args = 1.., default_values_t = [Model::Asr, Model::Nlu, Model::Dialog])]
        models: Vec<Model>,
        /// Locale of the NLU model, required when building NLU
        #[arg(short, long)]
        locale: Option<String>,
        /// NLU training mode
        #[arg(long, value_enum, ignore_case = true, default_value_t = NluModelMode::Fast)]
        nlu_mode: NluModelMode,
        /// Build note
        #[arg(short, long)]
        note: Option<String>,
        /// Return right after launching the builds
        #[arg(long)]
        no_wait: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Copy NLU and/or dialog models into another project
    Copy {
        /// Project to copy models from
        #[arg(long)]
        src_project_id: u64,
        /// Project to import the models into
        #[arg(long)]
        dst_project_id: u64,
        /// NLU locales to copy, every source locale by default
        #[arg(short, long, num_args = 1..)]
        locales: Vec<String>,
        /// Copy the NLU models
        #[arg(long)]
        copy_nlu: bool,
        /// Copy the dialog model
        #[arg(long)]
        copy_dlg: bool,
        /// Copy all models
        #[arg(long, conflicts_with_all = ["copy_nlu", "copy_dlg"])]
        copy_models: bool,
        /// Directory for the exported artifacts
        #[arg(long)]
        workdir: Option<PathBuf>,
        #[command(flatten)]
        out: OutputArgs,
    },
}

pub async fn handle_project_command(args: ProjectCommands, global: &GlobalArgs) -> Result<()> {
    let session = global.session()?;

    match args.command {
        ProjectSubcommands::Build {
            project_id,
            models,
            locale,
            nlu_mode,
            note,
            no_wait,
            out,
        } => {
            let request = BuildRequest {
                project_id,
                models,
                locale,
                nlu_mode,
                note,
                wait: !no_wait,
            };
            let result = with_spinner(
                format!("Building project {}", project_id),
                project::build(&session, &request),
            )
            .await?;
            output::write_result(&result, &out)
        }
        ProjectSubcommands::Copy {
            src_project_id,
            dst_project_id,
            locales,
            copy_nlu,
            copy_dlg,
            copy_models,
            workdir,
            out,
        } => {
            let request = CopyRequest {
                src_project_id,
                dst_project_id,
                locales,
                copy_nlu: copy_nlu || copy_models,
                copy_dialog: copy_dlg || copy_models,
                workdir,
            };
            let result = with_spinner(
                format!("Copying project {} to {}", src_project_id, dst_project_id),
                project::copy_models(&session, &request),
            )
            .await?;
            output::write_result(&result, &out)
        }
    }
}
