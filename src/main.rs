use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use tempo::presentation::cli::commands::RunDemoCommand;
use tempo::presentation::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("tempo=debug,info")
    } else {
        EnvFilter::new("tempo=info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::RunDemo { duration_secs, job_count } => {
            RunDemoCommand::execute(duration_secs, job_count).await?;
        }
    }

    Ok(())
}
