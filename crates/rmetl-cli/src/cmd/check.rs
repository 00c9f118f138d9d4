//! Check subcommand - database connectivity

use anyhow::{Context, Result};

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let path = &config.database.path;
    let info = rmetl_db::check_connection(path)
        .with_context(|| format!("Database check failed for {}", path.display()))?;

    log::info!("Connected to DuckDB {} ({})", info.version, info.database);

    super::print_summary(
        "Database",
        &[
            ("Path", path.display().to_string()),
            ("Engine", format!("DuckDB {}", info.version)),
            ("Database", info.database),
            (
                "Stored characters",
                info.stored_rows
                    .map_or_else(|| "no table yet".to_string(), |n| n.to_string()),
            ),
        ],
    );
    Ok(())
}
