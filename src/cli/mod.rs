pub mod app;
pub mod commands;
pub mod output;
pub mod ui;

use anyhow::Result;

pub use app::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    let global = &cli.global;
    match cli.command {
        Commands::Auth(args) => commands::handle_auth_command(args, global).await,
        Commands::Sys(args) => commands::handle_sys_command(args, global).await,
        Commands::Job(args) => commands::handle_job_command(args, global).await,
        Commands::Project(args) => commands::handle_project_command(args, global).await,
        Commands::Nlu(args) => commands::handle_nlu_command(args, global).await,
        Commands::Dlg(args) => commands::handle_dlg_command(args, global).await,
    }
}
