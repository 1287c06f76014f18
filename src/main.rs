use clap::Parser;
use hockey_calendar::error::Error;
use hockey_calendar::startup::{self, RunOptions};
use std::path::PathBuf;
use tracing::info;

/// Publish hockey calendar reports and email what changed since the last run
#[derive(Parser, Debug)]
#[command(name = "hockey-calendar", version, about)]
struct Cli {
    /// Report catalogue (defaults to REPORTS_CONFIG or config/reports.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write every file but only log the notifications
    #[arg(long)]
    dry_run: bool,

    /// Run a single component: reports, availability or league_stats
    #[arg(long)]
    only: Option<String>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = startup::load_config(cli.config.as_deref())?;

    // Initialize logging
    startup::init_logging(config.log_file.as_deref())?;

    info!("Starting hockey calendar reader");

    let options = RunOptions {
        dry_run: cli.dry_run,
        only: cli.only,
    };
    let failures = startup::run(config, &options).await?;
    if failures > 0 {
        return Err(Error::Component(format!("{} component(s) failed", failures)).into());
    }

    Ok(())
}
