//! rmetl-db: DuckDB sink for character records
//!
//! Every operation opens the database file, does its work and lets the
//! connection drop before returning. Saves run in a single transaction that
//! rolls back on drop if it was not committed.

mod sql;

use std::path::{Path, PathBuf};

use duckdb::{Connection, params};
use rmetl_characters::FlatRecord;
use rmetl_core::{Sink, SinkError, SinkReport};

/// Error from a database operation.
#[derive(Debug)]
pub enum DbError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    DuckDb(duckdb::Error),
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO on {}: {source}", path.display()),
            Self::DuckDb(e) => write!(f, "DuckDB: {e}"),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::DuckDb(e) => Some(e),
        }
    }
}

impl From<duckdb::Error> for DbError {
    fn from(e: duckdb::Error) -> Self {
        Self::DuckDb(e)
    }
}

impl From<DbError> for SinkError {
    fn from(e: DbError) -> Self {
        SinkError::Database(Box::new(e))
    }
}

/// Open (creating if needed) the database file and its parent directory.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DbError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let conn = Connection::open(path)?;
    log::debug!("Connected to {}", path.display());
    Ok(conn)
}

/// What the connectivity check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub version: String,
    pub database: String,
    /// Row count of `characters`, `None` before the first save
    pub stored_rows: Option<u64>,
}

/// Open the database and ask it who it is. Read-only apart from creating
/// an empty file on first use.
pub fn check_connection(path: &Path) -> Result<ConnectionInfo, DbError> {
    let conn = open(path)?;
    let (version, database) = conn.query_row(sql::server_info(), [], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let tables: i64 = conn.query_row(sql::characters_table_exists(), [], |row| row.get(0))?;
    let stored_rows = if tables > 0 {
        let n: i64 = conn.query_row(sql::count_characters(), [], |row| row.get(0))?;
        Some(n as u64)
    } else {
        None
    };

    Ok(ConnectionInfo {
        version,
        database,
        stored_rows,
    })
}

/// All stored characters, ordered by id.
pub fn load_characters(path: &Path) -> Result<Vec<FlatRecord>, DbError> {
    let conn = open(path)?;
    let mut stmt = conn.prepare(sql::select_characters())?;
    let rows = stmt.query_map([], |row| {
        Ok(FlatRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            status: row.get(2)?,
            species: row.get(3)?,
            episode_count: row.get::<_, i64>(4)?.max(0) as usize,
            location: row.get(5)?,
        })
    })?;
    let records = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Upserts characters into the `characters` table, keyed by id.
#[derive(Debug)]
pub struct DuckDbSink {
    path: PathBuf,
}

impl DuckDbSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert new ids, overwrite existing ones. Records without an id have
    /// no key and are skipped. All-or-nothing.
    ///
    /// `written` counts upserts, not distinct rows: an id repeated within
    /// one batch counts once per occurrence and the last one is stored.
    pub fn upsert(&self, records: &[FlatRecord]) -> Result<SinkReport, DbError> {
        let mut conn = open(&self.path)?;
        let tx = conn.transaction()?;
        tx.execute_batch(sql::create_characters_table())?;

        let mut report = SinkReport::default();
        {
            let mut stmt = tx.prepare(sql::upsert_character())?;
            for rec in records {
                let Some(id) = rec.id else {
                    report.skipped += 1;
                    continue;
                };
                let episode_count = i64::try_from(rec.episode_count).unwrap_or(i64::MAX);
                stmt.execute(params![
                    id,
                    rec.name,
                    rec.status,
                    rec.species,
                    episode_count,
                    rec.location
                ])?;
                report.written += 1;
            }
        }
        tx.commit()?;

        log::info!(
            "Saved {} characters to {}",
            report.written,
            self.path.display()
        );
        Ok(report)
    }
}

impl Sink<FlatRecord> for DuckDbSink {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn save(&mut self, rows: &[FlatRecord]) -> Result<SinkReport, SinkError> {
        Ok(self.upsert(rows)?)
    }
}
