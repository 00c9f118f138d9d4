//! Pagination driver and pipeline runner

use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use rmetl_core::{ProgressContext, Sink, SinkError, SinkReport, fmt_num};

use crate::api::{FetchError, HttpPageSource, PageSource};
use crate::config::Config;
use crate::schema::FlatRecord;
use crate::transform::{clean_records, map_page};

/// Everything one pagination pass produced.
#[derive(Debug, Default)]
pub struct Harvest {
    /// Page order, then source order within a page
    pub records: Vec<FlatRecord>,
    /// `info.pages` from the first page (0 if it never arrived)
    pub total_pages: u32,
    /// Fetch calls issued, including the first-page probe
    pub requests: u32,
    /// Loop pages that returned data
    pub pages_ok: u32,
    /// Pages that yielded no data, in the order they failed
    pub failures: Vec<FetchError>,
}

/// Walk every page the first page announces and flatten all characters.
///
/// Page 1 is fetched once as a probe and again as part of the loop. A failed
/// page contributes nothing and the loop moves on; only the page count ends
/// it. If the probe has no data, nothing else is fetched.
pub fn collect_all<S: PageSource + ?Sized>(
    source: &S,
    page_delay: Duration,
    pb: &ProgressBar,
) -> Harvest {
    let mut harvest = Harvest::default();

    harvest.requests += 1;
    let first = match source.fetch(1) {
        Ok(page) if page.results.is_some() => page,
        Ok(_) => {
            log::error!("First page has no results, nothing to collect");
            return harvest;
        }
        Err(e) => {
            log::error!("First page unavailable, nothing to collect");
            harvest.failures.push(e);
            return harvest;
        }
    };

    let total_pages = first.total_pages();
    harvest.total_pages = total_pages;
    log::info!("{total_pages} total pages");
    pb.set_length(u64::from(total_pages));

    for page in 1..=total_pages {
        log::debug!("Getting page {page} of {total_pages}");
        harvest.requests += 1;
        match source.fetch(page) {
            Ok(data) => {
                harvest.pages_ok += 1;
                harvest.records.extend(map_page(Some(&data)));
            }
            Err(e) => {
                pb.set_message(format!("page {page} failed"));
                harvest.failures.push(e);
            }
        }
        pb.inc(1);
        if !page_delay.is_zero() {
            std::thread::sleep(page_delay);
        }
    }

    harvest
}

/// Result of handing the collection to one sink.
#[derive(Debug)]
pub struct SinkOutcome {
    pub name: String,
    pub result: Result<SinkReport, SinkError>,
}

/// Pipeline execution summary
#[derive(Debug)]
pub struct Summary {
    pub total_pages: u32,
    pub requests: u32,
    pub pages_ok: u32,
    pub failures: Vec<FetchError>,
    pub records: usize,
    pub sinks: Vec<SinkOutcome>,
    pub elapsed: Duration,
}

impl Summary {
    pub fn failed_sinks(&self) -> impl Iterator<Item = &SinkOutcome> {
        self.sinks.iter().filter(|s| s.result.is_err())
    }

    pub fn all_sinks_ok(&self) -> bool {
        self.failed_sinks().next().is_none()
    }
}

/// Run the pipeline against the live API.
pub fn run(
    config: &Config,
    sinks: &mut [Box<dyn Sink<FlatRecord>>],
    progress: &ProgressContext,
) -> Summary {
    run_with(&HttpPageSource::from_config(config), config, sinks, progress)
}

/// Run the pipeline against any page source.
///
/// Every sink is attempted, in order, even after an earlier one failed.
pub fn run_with<S: PageSource + ?Sized>(
    source: &S,
    config: &Config,
    sinks: &mut [Box<dyn Sink<FlatRecord>>],
    progress: &ProgressContext,
) -> Summary {
    let start = Instant::now();

    let pb = progress.page_bar(&config.resource);
    let harvest = collect_all(source, config.page_delay, &pb);
    pb.finish_and_clear();

    let records = if config.clean {
        clean_records(harvest.records)
    } else {
        harvest.records
    };
    if records.is_empty() {
        log::warn!("No characters collected");
    } else {
        log::info!("Collected {} characters", fmt_num(records.len()));
    }
    for failure in &harvest.failures {
        log::debug!("missing page {}: {}", failure.page(), failure.kind());
    }

    let mut outcomes = Vec::with_capacity(sinks.len());
    for sink in sinks.iter_mut() {
        let name = sink.name().to_string();
        let line = progress.stage_line(&name);
        line.set_message(format!("writing {} rows", records.len()));

        let result = sink.save(&records);
        match &result {
            Ok(report) if report.skipped > 0 => log::warn!(
                "{name}: {} written, {} skipped",
                report.written,
                report.skipped
            ),
            Ok(report) => log::debug!("{name}: {} written", report.written),
            Err(e) => log::error!("{name}: {e}"),
        }
        line.finish_and_clear();
        outcomes.push(SinkOutcome { name, result });
    }

    let summary = Summary {
        total_pages: harvest.total_pages,
        requests: harvest.requests,
        pages_ok: harvest.pages_ok,
        failures: harvest.failures,
        records: records.len(),
        sinks: outcomes,
        elapsed: start.elapsed(),
    };

    log::info!("=== Character Pipeline Summary ===");
    log::info!(
        "Pages: {}/{} fetched ({} failed)",
        summary.pages_ok,
        summary.total_pages,
        summary.failures.len()
    );
    log::info!("Characters: {}", fmt_num(summary.records));
    log::info!("Time: {:.1}s", summary.elapsed.as_secs_f64());

    summary
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use rmetl_core::{CsvSink, JsonSink, read_json};
    use tempfile::TempDir;

    use super::*;
    use crate::schema::{Location, Page, PageInfo, RawCharacter};

    /// In-memory pages keyed by number; anything else is a connection error.
    struct FakeSource {
        pages: HashMap<u32, Page>,
        calls: RefCell<Vec<u32>>,
    }

    impl FakeSource {
        fn new(pages: impl IntoIterator<Item = (u32, Page)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.borrow().clone()
        }
    }

    impl PageSource for FakeSource {
        fn fetch(&self, page: u32) -> Result<Page, FetchError> {
            self.calls.borrow_mut().push(page);
            self.pages
                .get(&page)
                .cloned()
                .ok_or_else(|| FetchError::Connection {
                    page,
                    message: "connection refused".to_string(),
                })
        }
    }

    fn character(id: i64, name: &str) -> RawCharacter {
        RawCharacter {
            id: Some(id),
            name: Some(name.to_string()),
            status: Some("Alive".to_string()),
            species: Some("Human".to_string()),
            episode: Some(vec![1.into(), 2.into()]),
            location: Some(Location {
                name: Some("Earth".to_string()),
                url: None,
            }),
        }
    }

    fn page(total: u32, results: Vec<RawCharacter>) -> Page {
        Page {
            info: Some(PageInfo {
                pages: Some(total),
                ..PageInfo::default()
            }),
            results: Some(results),
        }
    }

    fn collect(source: &FakeSource) -> Harvest {
        collect_all(source, Duration::ZERO, &ProgressBar::hidden())
    }

    fn quiet_config() -> Config {
        Config {
            page_delay: Duration::ZERO,
            ..Config::default()
        }
    }

    #[test]
    fn fetches_every_page_plus_probe() {
        let source = FakeSource::new([
            (1, page(3, vec![character(1, "Rick")])),
            (3, page(3, vec![character(3, "Summer")])),
        ]);
        let harvest = collect(&source);

        assert_eq!(source.calls(), vec![1, 1, 2, 3]);
        assert_eq!(harvest.requests, 4);
        assert_eq!(harvest.pages_ok, 2);
        assert_eq!(harvest.total_pages, 3);
        assert_eq!(harvest.failures.len(), 1);
        assert_eq!(harvest.failures[0].page(), 2);
    }

    #[test]
    fn failed_probe_stops_everything() {
        let source = FakeSource::new([]);
        let harvest = collect(&source);

        assert_eq!(source.calls(), vec![1]);
        assert!(harvest.records.is_empty());
        assert_eq!(harvest.total_pages, 0);
        assert_eq!(harvest.failures.len(), 1);
    }

    #[test]
    fn probe_without_results_stops_everything() {
        let source = FakeSource::new([(
            1,
            Page {
                info: Some(PageInfo {
                    pages: Some(5),
                    ..PageInfo::default()
                }),
                results: None,
            },
        )]);
        let harvest = collect(&source);

        assert_eq!(source.calls(), vec![1]);
        assert!(harvest.records.is_empty());
        assert!(harvest.failures.is_empty());
    }

    #[test]
    fn missing_page_count_means_no_loop() {
        let source = FakeSource::new([(
            1,
            Page {
                info: None,
                results: Some(vec![character(1, "Rick")]),
            },
        )]);
        let harvest = collect(&source);

        assert_eq!(source.calls(), vec![1]);
        assert!(harvest.records.is_empty());
    }

    #[test]
    fn second_page_failure_keeps_first_page() {
        let source = FakeSource::new([(1, page(2, vec![character(1, "Rick")]))]);
        let harvest = collect(&source);

        assert_eq!(
            harvest.records,
            vec![FlatRecord {
                id: Some(1),
                name: "Rick".to_string(),
                status: "Alive".to_string(),
                species: "Human".to_string(),
                episode_count: 2,
                location: "Earth".to_string(),
            }]
        );
        assert_eq!(harvest.failures.len(), 1);
        assert!(!harvest.failures[0].is_exhausted());
    }

    #[test]
    fn records_concatenate_in_page_order_without_dedup() {
        let source = FakeSource::new([
            (1, page(2, vec![character(2, "Morty"), character(1, "Rick")])),
            (2, page(2, vec![character(1, "Rick"), character(4, "Beth")])),
        ]);
        let ids: Vec<_> = collect(&source).records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(2), Some(1), Some(1), Some(4)]);
    }

    #[test]
    fn run_with_writes_every_sink() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("characters.json");
        let csv = dir.path().join("characters.csv");
        let source = FakeSource::new([
            (1, page(2, vec![character(1, "Rick")])),
            (2, page(2, vec![character(2, "Morty")])),
        ]);
        let mut sinks: Vec<Box<dyn Sink<FlatRecord>>> = vec![
            Box::new(JsonSink::new(&json)),
            Box::new(CsvSink::new(&csv)),
        ];

        let summary = run_with(&source, &quiet_config(), &mut sinks, &ProgressContext::hidden());

        assert_eq!(summary.records, 2);
        assert!(summary.all_sinks_ok());
        let back: Vec<FlatRecord> = read_json(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].name, "Morty");
        let text = std::fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("id,name,status,species,episode_count,location\r\n"));
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("characters.csv");
        let source = FakeSource::new([(1, page(1, vec![character(1, "Rick")]))]);
        let mut sinks: Vec<Box<dyn Sink<FlatRecord>>> = vec![
            Box::new(JsonSink::new(dir.path().join("no/such/dir/out.json"))),
            Box::new(CsvSink::new(&csv)),
        ];

        let summary = run_with(&source, &quiet_config(), &mut sinks, &ProgressContext::hidden());

        assert!(!summary.all_sinks_ok());
        let failed: Vec<_> = summary.failed_sinks().map(|s| s.name.as_str()).collect();
        assert_eq!(failed, vec!["json"]);
        assert!(csv.exists());
    }

    #[test]
    fn run_with_clean_normalizes() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("characters.json");
        let mut raw = character(1, "  Rick  ");
        raw.species = Some("human".to_string());
        let source = FakeSource::new([(1, page(1, vec![raw]))]);
        let mut sinks: Vec<Box<dyn Sink<FlatRecord>>> = vec![Box::new(JsonSink::new(&json))];
        let config = Config {
            clean: true,
            ..quiet_config()
        };

        run_with(&source, &config, &mut sinks, &ProgressContext::hidden());

        let back: Vec<FlatRecord> = read_json(&json).unwrap();
        assert_eq!(back[0].name, "Rick");
        assert_eq!(back[0].species, "Human");
    }

    #[test]
    fn empty_harvest_still_reaches_sinks() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("characters.json");
        let csv = dir.path().join("characters.csv");
        let source = FakeSource::new([]);
        let mut sinks: Vec<Box<dyn Sink<FlatRecord>>> = vec![
            Box::new(JsonSink::new(&json)),
            Box::new(CsvSink::new(&csv)),
        ];

        let summary = run_with(&source, &quiet_config(), &mut sinks, &ProgressContext::hidden());

        assert_eq!(summary.records, 0);
        assert_eq!(summary.sinks.len(), 2);
        assert!(json.exists());
        assert!(!csv.exists());
    }
}
