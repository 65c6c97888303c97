mod commands;
mod samples;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mentionbot-cli")]
#[command(about = "One-shot mention monitoring commands")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full monitoring pipeline once: fetch, filter, store and report
    Run,
    /// Run the urgent check once
    Urgent,
    /// List the configured sources and whether they are enabled
    Sources {
        /// Also fetch from each enabled source and print how many mentions it found
        #[arg(long)]
        check: bool,

        /// Deadline for the check, in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Build a report from a mention file (or built-in samples) without fetching
    SampleReport {
        /// JSON array of mentions to report on
        #[arg(long)]
        input: Option<PathBuf>,

        /// Print the report as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Also deliver the report through the configured notifier
        #[arg(long)]
        send: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("mentionbot-cli: no command given, see --help");
        return Ok(());
    };

    let config = mentionbot_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Run => commands::run_once(&config).await,
        Commands::Urgent => commands::urgent_once(&config).await,
        Commands::Sources {
            check,
            timeout_secs,
        } => commands::list_sources(&config, check, timeout_secs).await,
        Commands::SampleReport { input, json, send } => {
            commands::sample_report(&config, input.as_deref(), json, send).await
        }
    }
}
