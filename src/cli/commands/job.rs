use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use crate::cli::app::GlobalArgs;
use crate::cli::output::{self, OutputArgs};
use crate::cli::ui::with_spinner;
use mix_cli::commands::job;
use mix_cli::job::JobDescriptor;

#[derive(Args)]
pub struct JobCommands {
    #[command(subcommand)]
    pub command: JobSubcommands,
}

#[derive(Subcommand)]
pub enum JobSubcommands {
    /// Show the current status of a job
    Status {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Job id
        #[arg(short, long)]
        job_id: String,
        /// Print only the status label
        #[arg(long)]
        status_only: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// List the jobs of a project
    List {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Wait until a job completes or fails
    Wait {
        /// Mix project id
        #[arg(short, long)]
        project_id: u64,
        /// Job id
        #[arg(short, long)]
        job_id: String,
        /// Give up after this many seconds (0 uses the configured default)
        #[arg(short, long, conflicts_with = "infinite")]
        timeout: Option<u64>,
        /// Wait without any time limit
        #[arg(long)]
        infinite: bool,
        /// Fail immediately with the job metadata when the job fails
        #[arg(long)]
        err_on_failed: bool,
        #[command(flatten)]
        out: OutputArgs,
    },
}

pub async fn handle_job_command(args: JobCommands, global: &GlobalArgs) -> Result<()> {
    let session = global.session()?;

    match args.command {
        JobSubcommands::Status {
            project_id,
            job_id,
            status_only,
            out,
        } => {
            let job = JobDescriptor::new(project_id, job_id);
            let status = job::status(&session, &job, status_only).await?;
            output::write_result(&status, &out)
        }
        JobSubcommands::List { project_id, out } => {
            let jobs = job::list(&session, project_id).await?;
            output::write_result(&jobs, &out)
        }
        JobSubcommands::Wait {
            project_id,
            job_id,
            timeout,
            infinite,
            err_on_failed,
            out,
        } => {
            let job = JobDescriptor::new(project_id, job_id);
            let options = job::wait_options(timeout, infinite, err_on_failed);

            let outcome =
                with_spinner(format!("Waiting for {}", job), job::wait(&session, &job, &options))
                    .await?;

            if let Some(snapshot) = outcome.snapshot() {
                output::write_result(&snapshot.body, &out)?;
            }
            if !outcome.is_success() {
                anyhow::bail!("{} {}", job, outcome.label());
            }
            eprintln!("{} {} completed", "✓".green(), job);
            Ok(())
        }
    }
}
