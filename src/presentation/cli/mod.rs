pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tempo-cli")]
#[command(author = "Tempo Scheduler Team")]
#[command(version = "0.1.0")]
#[command(about = "Tempo job scheduler core: a run-demo harness over the in-process engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run a short in-process demonstration schedule and print a summary")]
    RunDemo {
        #[arg(long, default_value_t = 5, value_name = "SECONDS", help = "How long to let the demo scheduler run")]
        duration_secs: u64,

        #[arg(long, default_value_t = 2, value_name = "COUNT", help = "Number of demo jobs to schedule")]
        job_count: u32,
    },
}
