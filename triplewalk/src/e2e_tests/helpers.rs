//! Common helpers for end-to-end tests.

use std::sync::Arc;

use tempfile::TempDir;

use crate::query::Path;
use crate::storage::{EngineOptions, Graph, LogEngine};
use crate::testing::triples;

/// A durable graph in a temporary directory, removed on drop.
pub struct TestStore {
    pub graph: Arc<Graph<LogEngine>>,
    dir: TempDir,
}

impl TestStore {
    /// A fresh, empty store.
    #[must_use]
    pub fn new() -> Self {
        #[allow(clippy::expect_used)]
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let graph = Arc::new(Graph::new(open(&dir, EngineOptions::default())));
        Self { graph, dir }
    }

    /// A fresh store holding `edges`.
    #[must_use]
    pub fn with_edges(edges: &[[&str; 3]]) -> Self {
        let store = Self::new();
        #[allow(clippy::expect_used)]
        store
            .graph
            .write_indexed_triples(&triples(edges))
            .expect("Failed to write edges");
        store
    }

    /// Close the engine and open the same directory again.
    #[must_use]
    pub fn reopen(self, options: EngineOptions) -> Self {
        let Self { graph, dir } = self;
        drop(graph);
        let graph = Arc::new(Graph::new(open(&dir, options)));
        Self { graph, dir }
    }

    #[must_use]
    pub fn log_path(&self) -> std::path::PathBuf {
        self.dir.path().join(crate::storage::LOG_FILE_NAME)
    }
}

fn open(dir: &TempDir, options: EngineOptions) -> LogEngine {
    #[allow(clippy::expect_used)]
    LogEngine::open(dir.path(), options).expect("Failed to open store")
}

/// The object of each path's `step`th triple.
#[must_use]
pub fn objects(paths: &[Path], step: usize) -> Vec<String> {
    paths
        .iter()
        .map(|p| String::from_utf8_lossy(&p[step].o).into_owned())
        .collect()
}
