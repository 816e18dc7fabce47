//! Bulk loading of triple files.
//!
//! Triples are written through [`Graph::write_indexed_triples`] in batches.
//! A batch the engine rejects is counted as one problem and its triples are
//! logged so they can be found in the source; loading carries on with the
//! next batch.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::ingest::nquads::{ParseOptions, QuadReader, ReadError};
use crate::storage::{Graph, KvEngine};
use crate::types::Triple;

/// Default number of triples per write batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of triples between progress reports.
pub const DEFAULT_REPORT_INTERVAL: u64 = 100_000;

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Triples per write batch (at least 1).
    pub batch_size: usize,
    /// Triples between progress reports (at least 1).
    pub report_interval: u64,
    /// Also log engine counters with each report.
    pub engine_stats: bool,
    pub parse: ParseOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            report_interval: DEFAULT_REPORT_INTERVAL,
            engine_stats: false,
            parse: ParseOptions::default(),
        }
    }
}

/// Totals for one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Triples parsed.
    pub read: u64,
    /// Triples committed.
    pub written: u64,
    /// Rejected batches plus unparseable lines.
    pub problems: u64,
    pub elapsed: Duration,
}

/// Load every triple in the file at `path`.
pub fn load_file<E: KvEngine>(
    graph: &Graph<E>,
    path: &Path,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_reader(graph, &path.display().to_string(), BufReader::new(file), options)
}

/// Load every triple from `reader`. `name` labels progress reports.
pub fn load_reader<E: KvEngine, R: BufRead>(
    graph: &Graph<E>,
    name: &str,
    reader: R,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let batch_size = options.batch_size.max(1);
    let interval = options.report_interval.max(1);
    let mut progress = Progress::new(name, graph, options.engine_stats);
    let mut batch = Vec::with_capacity(batch_size);

    for result in QuadReader::new(reader, options.parse.clone()) {
        let triple = match result {
            Ok(triple) => triple,
            Err(ReadError::Io(e)) => return Err(LoadError::Io(e)),
            Err(e @ ReadError::Parse { .. }) => {
                progress.report.problems += 1;
                tracing::warn!("{}: {}", name, e);
                continue;
            }
        };

        progress.report.read += 1;
        batch.push(triple);
        if batch.len() == batch_size {
            progress.flush(&mut batch);
        }
        if progress.report.read % interval == 0 {
            progress.log(interval);
        }
    }
    progress.flush(&mut batch);
    let remainder = progress.report.read % interval;
    if remainder > 0 {
        progress.log(remainder);
    }

    progress.report.elapsed = progress.started.elapsed();
    tracing::info!(
        "loaded {}: read={} written={} problems={} in {:.3}s",
        name,
        progress.report.read,
        progress.report.written,
        progress.report.problems,
        progress.report.elapsed.as_secs_f64()
    );
    Ok(progress.report)
}

struct Progress<'a, E: KvEngine> {
    name: &'a str,
    graph: &'a Graph<E>,
    engine_stats: bool,
    report: LoadReport,
    started: Instant,
    last_report: Instant,
}

impl<'a, E: KvEngine> Progress<'a, E> {
    fn new(name: &'a str, graph: &'a Graph<E>, engine_stats: bool) -> Self {
        let now = Instant::now();
        Self {
            name,
            graph,
            engine_stats,
            report: LoadReport::default(),
            started: now,
            last_report: now,
        }
    }

    fn flush(&mut self, batch: &mut Vec<Triple>) {
        if batch.is_empty() {
            return;
        }
        match self.graph.write_indexed_triples(batch) {
            Ok(()) => self.report.written += batch.len() as u64,
            Err(e) => {
                self.report.problems += 1;
                tracing::warn!(
                    "{}: batch of {} failed at triple {} (problem {}): {}",
                    self.name,
                    batch.len(),
                    self.report.read,
                    self.report.problems,
                    e
                );
                for (i, bad) in batch.iter().enumerate() {
                    let [s, p, o, _] = bad.strings();
                    tracing::warn!("problem {} '{}' '{}' '{}'", i, s, p, o);
                }
            }
        }
        batch.clear();
    }

    /// Log progress; `since_last` is the number of triples read since the
    /// previous report.
    #[allow(clippy::cast_precision_loss)] // rate is approximate
    fn log(&mut self, since_last: u64) {
        let now = Instant::now();
        let secs = now.duration_since(self.last_report).as_secs_f64();
        self.last_report = now;
        let rate = if secs > 0.0 {
            since_last as f64 / secs
        } else {
            0.0
        };
        tracing::info!(
            "load {} count={} rate={:.0}/s written={} problems={} writes={}",
            self.name,
            self.report.read,
            rate,
            self.report.written,
            self.report.problems,
            self.graph.writes()
        );
        if self.engine_stats {
            tracing::info!("load {} stats: {}", self.name, self.graph.stats());
        }
    }
}

/// Errors that end a load early.
#[derive(Debug)]
pub enum LoadError {
    /// The source file could not be opened.
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Reading the source failed partway.
    Io(std::io::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "failed to open {}: {source}", path.display())
            }
            Self::Io(e) => write!(f, "read error: {e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
