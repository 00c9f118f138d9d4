//! Run subcommand - fetch all characters and write every sink

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rmetl_characters::FlatRecord;
use rmetl_core::{CsvSink, JsonSink, SharedProgress, Sink, fmt_num};
use rmetl_db::DuckDbSink;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip the database check and the database sink
    #[arg(long)]
    pub skip_db: bool,

    /// Database file (overrides config)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// JSON output path (overrides config)
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// CSV output path (overrides config)
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Trim names and title-case species before writing
    #[arg(long)]
    pub clean: bool,
}

pub fn run(args: RunArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let db_path = args.db.unwrap_or_else(|| config.database.path.clone());
    let json_path = args.json.unwrap_or_else(|| config.output.json_path.clone());
    let csv_path = args.csv.unwrap_or_else(|| config.output.csv_path.clone());

    let mut pipeline = config.characters();
    pipeline.clean |= args.clean;

    log::info!("Fetching {} from {}", pipeline.resource, pipeline.base_url);
    log::info!("  JSON: {}", json_path.display());
    log::info!("  CSV: {}", csv_path.display());

    let mut sinks: Vec<Box<dyn Sink<FlatRecord>>> = Vec::with_capacity(3);
    if args.skip_db {
        log::info!("  Database: skipped");
    } else {
        let info = rmetl_db::check_connection(&db_path)
            .with_context(|| format!("Database check failed for {}", db_path.display()))?;
        log::info!(
            "  Database: {} (DuckDB {})",
            db_path.display(),
            info.version
        );
        sinks.push(Box::new(DuckDbSink::new(&db_path)));
    }
    sinks.push(Box::new(JsonSink::new(&json_path)));
    sinks.push(Box::new(CsvSink::new(&csv_path)));

    let summary = rmetl_characters::run(&pipeline, &mut sinks, progress);

    let mut rows = vec![
        ("Total pages", summary.total_pages.to_string()),
        ("Requests", summary.requests.to_string()),
        (
            "Pages fetched",
            format!("{}/{}", summary.pages_ok, summary.total_pages),
        ),
        ("Pages failed", summary.failures.len().to_string()),
        ("Characters", fmt_num(summary.records)),
    ];
    for outcome in &summary.sinks {
        let status = match &outcome.result {
            Ok(report) if report.skipped > 0 => {
                format!("{} written, {} skipped", report.written, report.skipped)
            }
            Ok(report) => format!("{} written", report.written),
            Err(e) => format!("FAILED: {e}"),
        };
        rows.push((outcome.name.as_str(), status));
    }
    rows.push(("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())));
    super::print_summary("Characters", &rows);

    if summary.records == 0 {
        anyhow::bail!("No characters collected");
    }
    let failed: Vec<&str> = summary.failed_sinks().map(|o| o.name.as_str()).collect();
    if !failed.is_empty() {
        anyhow::bail!("{} sink(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}
