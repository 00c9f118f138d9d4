//! rmetl core - shared plumbing for REST-to-table pipelines
//!
//! Provides the blocking HTTP bridge, logging, progress reporting and the
//! file sinks that every source crate writes its records through.

pub mod logging;
pub mod progress;
pub mod sink;
pub mod stream;

// Re-exports for convenience
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use sink::{CsvSink, JsonSink, Sink, SinkError, SinkReport, Tabular, read_json};
pub use stream::{BROWSER_USER_AGENT, SHARED_RUNTIME, http_client};
