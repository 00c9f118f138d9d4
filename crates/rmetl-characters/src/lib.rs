//! rmetl characters - Rick & Morty character pipeline
//!
//! Walks the paginated `/character` endpoint, flattens every character
//! into a [`FlatRecord`] and hands the collection to the configured sinks.
//!
//! # Example
//!
//! ```ignore
//! use rmetl_characters::{Config, run};
//! use rmetl_core::{JsonSink, ProgressContext, Sink};
//!
//! let mut sinks: Vec<Box<dyn Sink<_>>> = vec![Box::new(JsonSink::new("characters.json"))];
//! let summary = run(&Config::default(), &mut sinks, &ProgressContext::new());
//! println!("Collected {} characters", summary.records);
//! ```

pub mod api;
pub mod config;
pub mod runner;
pub mod schema;
pub mod transform;

// Re-exports
pub use api::{FetchError, HttpPageSource, PageSource};
pub use config::Config;
pub use runner::{Harvest, SinkOutcome, Summary, collect_all, run, run_with};
pub use schema::{FlatRecord, Page, RawCharacter};
pub use transform::{clean_records, map_page};
