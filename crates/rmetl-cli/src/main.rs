//! rmetl - Rick and Morty character ETL
//!
//! Pages through the public character API, flattens each character into a
//! fixed six-column record and writes the records to DuckDB, JSON and CSV.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "rmetl")]
#[command(about = "Extract Rick and Morty characters into DuckDB, JSON and CSV")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./rmetl.toml or ~/.config/rmetl/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Milliseconds to wait between page requests
    #[arg(long, global = true)]
    page_delay_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every character page and write all sinks
    Run(cmd::run::RunArgs),
    /// Check that the database can be opened and queried
    Check,
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(rmetl_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    rmetl_core::init_logging(quiet, cli.debug, multi)?;

    // Load configuration
    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(url) = cli.base_url {
        config.api.base_url = url;
    }
    if let Some(secs) = cli.timeout {
        config.api.timeout_secs = secs;
    }
    if let Some(ms) = cli.page_delay_ms {
        config.api.page_delay_ms = ms;
    }

    match cli.command {
        Command::Run(args) => cmd::run::run(args, &config, &progress),
        Command::Check => cmd::check::run(&config),
        Command::Config => {
            cmd::print_summary(
                "Setting",
                &[
                    ("API base URL", config.api.base_url.clone()),
                    ("Resource", config.api.resource.clone()),
                    ("Timeout", format!("{}s", config.api.timeout_secs)),
                    ("Page delay", format!("{}ms", config.api.page_delay_ms)),
                    ("Database", config.database.path.display().to_string()),
                    ("JSON output", config.output.json_path.display().to_string()),
                    ("CSV output", config.output.csv_path.display().to_string()),
                    (
                        "Clean records",
                        if config.pipeline.clean { "yes" } else { "no" }.to_string(),
                    ),
                ],
            );
            Ok(())
        }
    }
}
