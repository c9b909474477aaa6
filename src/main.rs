use std::fs::OpenOptions;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

mod cli;

use cli::Cli;
use cli::app::GlobalArgs;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.global)?;
    info!("Starting mix-cli {}", env!("CARGO_PKG_VERSION"));

    let result = cli::run(cli).await;
    if let Err(e) = &result {
        debug!("Command failed: {:?}", e);
    }
    result
}

/// `warn` by default, `-v` for info, `-vv` for debug; `RUST_LOG` wins.
fn init_logging(global: &GlobalArgs) -> Result<()> {
    let level = match global.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if let Some(path) = &global.log_file {
        // Truncate on each run
        let log_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}
