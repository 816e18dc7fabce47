//! Shared fixtures for unit and scenario tests.

use std::sync::Arc;

use crate::storage::{Graph, MemoryEngine};
use crate::types::Triple;

/// Edges of the sample graph used across tests:
///
/// ```text
/// a -p1-> b -p2-> c <-p4- g -p1-> h
/// a -p1-> f                g -p1-> i
/// a -p5-> j
/// ```
pub const SAMPLE_EDGES: [[&str; 3]; 7] = [
    ["a", "p1", "b"],
    ["a", "p1", "f"],
    ["a", "p5", "j"],
    ["b", "p2", "c"],
    ["g", "p4", "c"],
    ["g", "p1", "h"],
    ["g", "p1", "i"],
];

#[must_use]
pub fn triples(edges: &[[&str; 3]]) -> Vec<Triple> {
    edges.iter().map(|e| Triple::from_strs(e)).collect()
}

/// An in-memory graph holding `edges`, written through all three indexes.
#[must_use]
pub fn graph_with(edges: &[[&str; 3]]) -> Arc<Graph<MemoryEngine>> {
    let graph = Graph::new(MemoryEngine::new());
    graph
        .write_indexed_triples(&triples(edges))
        .unwrap_or_else(|e| panic!("failed to write fixture: {e}"));
    Arc::new(graph)
}

/// [`graph_with`] over [`SAMPLE_EDGES`].
#[must_use]
pub fn sample_graph() -> Arc<Graph<MemoryEngine>> {
    graph_with(&SAMPLE_EDGES)
}

/// A graph where `hub` has `fanout` outbound `p` edges to `n0000`, `n0001`, ...
#[must_use]
pub fn hub_graph(hub: &str, fanout: usize, walk_buffer: usize) -> Arc<Graph<MemoryEngine>> {
    let graph = Graph::new(MemoryEngine::new()).with_walk_buffer(walk_buffer);
    let edges: Vec<Triple> = (0..fanout)
        .map(|i| Triple::from_strs(&[hub, "p", &format!("n{i:04}")]))
        .collect();
    graph
        .write_indexed_triples(&edges)
        .unwrap_or_else(|e| panic!("failed to write fixture: {e}"));
    Arc::new(graph)
}
