//! Output sinks: the `Sink` contract plus JSON and CSV file writers

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Rows that flatten to a fixed set of named text cells.
pub trait Tabular {
    /// Column names, in output order.
    const COLUMNS: &'static [&'static str];

    /// One cell per column, same order as `COLUMNS`. Absent values are empty.
    fn cells(&self) -> Vec<String>;
}

/// What a sink did with a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Rows handed to storage; keyed sinks count each upsert
    pub written: usize,
    /// Rows the sink could not store (e.g. no primary key)
    pub skipped: usize,
}

/// Error from a single sink write.
#[derive(Debug)]
pub enum SinkError {
    Io { path: PathBuf, source: io::Error },
    Serialize(serde_json::Error),
    Database(Box<dyn std::error::Error + Send + Sync>),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO on {}: {source}", path.display()),
            Self::Serialize(e) => write!(f, "JSON encoding: {e}"),
            Self::Database(e) => write!(f, "database: {e}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(e) => Some(e),
            Self::Database(e) => Some(e.as_ref()),
        }
    }
}

impl SinkError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A persistence target that accepts a whole record collection.
///
/// Implementations own their resources for the duration of one `save` only.
pub trait Sink<T> {
    /// Short label for logs and summaries
    fn name(&self) -> &str;

    fn save(&mut self, rows: &[T]) -> Result<SinkReport, SinkError>;
}

/// Sibling `.tmp` path used for write-then-rename
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write through `fill` into a tmp file, then atomically rename over `path`
fn write_atomic(
    path: &Path,
    fill: impl FnOnce(&mut BufWriter<File>) -> Result<(), SinkError>,
) -> Result<(), SinkError> {
    let tmp = tmp_path(path);
    let file = File::create(&tmp).map_err(|e| SinkError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);

    let result = fill(&mut writer)
        .and_then(|()| writer.flush().map_err(|e| SinkError::io(&tmp, e)));
    drop(writer);
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|e| SinkError::io(path, e))
}

/// Whole collection as one pretty-printed JSON array.
///
/// Non-ASCII text is written as-is, not `\u` escaped.
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Serialize> Sink<T> for JsonSink {
    fn name(&self) -> &str {
        "json"
    }

    fn save(&mut self, rows: &[T]) -> Result<SinkReport, SinkError> {
        write_atomic(&self.path, |w| {
            serde_json::to_writer_pretty(&mut *w, rows).map_err(SinkError::Serialize)?;
            w.write_all(b"\n").map_err(|e| SinkError::io(&self.path, e))
        })?;
        log::info!("Saved {} ({} rows)", self.path.display(), rows.len());
        Ok(SinkReport {
            written: rows.len(),
            skipped: 0,
        })
    }
}

/// Read back a JSON array written by [`JsonSink`].
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, SinkError> {
    let file = File::open(path).map_err(|e| SinkError::io(path, e))?;
    serde_json::from_reader(io::BufReader::new(file)).map_err(SinkError::Serialize)
}

/// Quote a CSV field if it contains a delimiter, quote, or line break.
fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(cells: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    let mut line = cells
        .into_iter()
        .map(|c| csv_escape(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

/// CSV file with a header row from [`Tabular::COLUMNS`].
///
/// An empty collection writes nothing: an existing file is left untouched
/// and a missing one is not created.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Tabular> Sink<T> for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn save(&mut self, rows: &[T]) -> Result<SinkReport, SinkError> {
        if rows.is_empty() {
            log::warn!("No rows, skipping {}", self.path.display());
            return Ok(SinkReport::default());
        }

        write_atomic(&self.path, |w| {
            let mut put = |line: String| {
                w.write_all(line.as_bytes())
                    .map_err(|e| SinkError::io(&self.path, e))
            };
            put(csv_line(T::COLUMNS))?;
            for row in rows {
                put(csv_line(row.cells()))?;
            }
            Ok(())
        })?;
        log::info!("Saved {} ({} rows)", self.path.display(), rows.len());
        Ok(SinkReport {
            written: rows.len(),
            skipped: 0,
        })
    }
}
