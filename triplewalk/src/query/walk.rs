//! Walk execution.
//!
//! A walk is a depth-first backtracking search over the step pipeline. One
//! blocking producer task per walk runs the whole search and sends each
//! complete path into a bounded channel; the [`Walk`] handle is the
//! receiving end.
//!
//! # Cancellation
//!
//! Closing the receiver (`cancel`, or dropping the handle) is the stop
//! signal. The producer checks it before each emission and before each
//! sibling branch, so at most the paths already buffered are delivered
//! after a cancel. End of results is the channel closing.

use std::fmt;
use std::ops::Deref;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::query::steps::Stepper;
use crate::storage::{Graph, KvEngine};
use crate::types::{Triple, Vertex};

/// The triples matched by one walk, one per scanning step, in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Triple>);

impl Path {
    #[must_use]
    pub const fn new(triples: Vec<Triple>) -> Self {
        Self(triples)
    }

    #[must_use]
    pub fn into_triples(self) -> Vec<Triple> {
        self.0
    }

    /// Every triple's fields as (lossy) UTF-8 strings.
    #[must_use]
    pub fn strings(&self) -> Vec<[String; 4]> {
        self.0.iter().map(Triple::strings).collect()
    }
}

impl Deref for Path {
    type Target = [Triple];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for triple in &self.0 {
            write!(f, "\"{triple}\"")?;
        }
        write!(f, "]")
    }
}

/// How a walk's producer finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Paths delivered into the channel.
    pub emitted: u64,
    /// False if the search was cut short by cancellation.
    pub completed: bool,
}

/// Start a walk from `vertex` through `steps`, in order.
///
/// Must be called from within a Tokio runtime.
#[must_use]
pub fn walk<E: KvEngine>(
    graph: &Arc<Graph<E>>,
    vertex: impl Into<Vertex>,
    steps: Vec<Stepper>,
) -> Walk {
    Walk::start(Arc::clone(graph), vertex.into(), steps)
}

impl Stepper {
    /// Start a walk through the pipeline ending at this step.
    #[must_use]
    pub fn walk<E: KvEngine>(self, graph: &Arc<Graph<E>>, vertex: impl Into<Vertex>) -> Walk {
        walk(graph, vertex, self.pipeline())
    }
}

/// Receiving end of a running walk.
#[derive(Debug)]
pub struct Walk {
    rx: mpsc::Receiver<Path>,
    producer: JoinHandle<WalkOutcome>,
}

impl Walk {
    fn start<E: KvEngine>(graph: Arc<Graph<E>>, vertex: Vertex, steps: Vec<Stepper>) -> Self {
        let (tx, rx) = mpsc::channel(graph.walk_buffer());
        let producer = tokio::task::spawn_blocking(move || {
            tracing::debug!(
                "walk from '{}' with {} steps started",
                String::from_utf8_lossy(&vertex),
                steps.len()
            );
            let seed = Triple {
                o: vertex,
                ..Triple::default()
            };
            let mut walker = Walker {
                graph: &graph,
                tx: &tx,
                emitted: 0,
            };
            let completed = walker.step(&[seed], &steps);
            tracing::debug!(
                "walk finished: {} paths emitted{}",
                walker.emitted,
                if completed { "" } else { " (cancelled)" }
            );
            WalkOutcome {
                emitted: walker.emitted,
                completed,
            }
        });
        Self { rx, producer }
    }

    /// Wait for the next path. `None` once the walk is exhausted or cancelled.
    pub async fn next_path(&mut self) -> Option<Path> {
        self.rx.recv().await
    }

    /// Ask the producer to stop. Already buffered paths can still be read.
    pub fn cancel(&mut self) {
        self.rx.close();
    }

    /// Cancel, then wait for the producer to stop.
    pub async fn finish(mut self) -> WalkOutcome {
        self.cancel();
        match (&mut self.producer).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("walk producer failed: {e}");
                WalkOutcome::default()
            }
        }
    }

    /// Every remaining path.
    pub async fn collect(self) -> Vec<Path> {
        let mut paths = Vec::new();
        self.for_each(|path| paths.push(path)).await;
        paths
    }

    /// At most `limit` paths, then cancel.
    pub async fn collect_up_to(self, limit: usize) -> Vec<Path> {
        let mut paths = Vec::new();
        self.for_each_up_to(limit, |path| paths.push(path)).await;
        paths
    }

    /// Call `f` on every remaining path.
    pub async fn for_each<F: FnMut(Path)>(mut self, mut f: F) {
        while let Some(path) = self.next_path().await {
            f(path);
        }
    }

    /// Call `f` on at most `limit` paths, then cancel.
    pub async fn for_each_up_to<F: FnMut(Path)>(mut self, limit: usize, mut f: F) {
        let mut seen = 0;
        while seen < limit {
            let Some(path) = self.next_path().await else {
                break;
            };
            f(path);
            seen += 1;
        }
        self.cancel();
    }
}

impl Stream for Walk {
    type Item = Path;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Producer-side search state.
struct Walker<'a, E: KvEngine> {
    graph: &'a Graph<E>,
    tx: &'a mpsc::Sender<Path>,
    emitted: u64,
}

impl<E: KvEngine> Walker<'_, E> {
    /// Explore `steps` from `path`, whose first element is the seed.
    ///
    /// Returns `false` once the consumer has gone away.
    fn step(&mut self, path: &[Triple], steps: &[Stepper]) -> bool {
        let Some((step, rest)) = steps.split_first() else {
            return self.emit(path);
        };
        let Some(last) = path.last() else {
            return true;
        };

        if let Some(predicate) = &step.has {
            if !predicate(last) {
                return true;
            }
            step.run_inspectors(&path[1..]);
            return self.step(path, rest);
        }

        let mut pattern = last.clone().permute(step.input);
        if !step.pattern.s.is_empty() {
            pattern.s.clone_from(&step.pattern.s);
        }
        pattern.p.clone_from(&step.pattern.p);
        pattern.o.clear();

        let matches = match self.graph.index_iter(step.index, Some(&pattern)) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::debug!("branch truncated: {e}");
                return true;
            }
        };
        for found in matches {
            if self.tx.is_closed() {
                return false;
            }
            let mut extended = Vec::with_capacity(path.len() + 1);
            extended.extend_from_slice(path);
            extended.push(found.permute(step.output));
            step.run_inspectors(&extended[1..]);
            if !self.step(&extended, rest) {
                return false;
            }
        }
        true
    }

    fn emit(&mut self, path: &[Triple]) -> bool {
        if self.tx.is_closed() {
            return false;
        }
        let path = Path::new(path.get(1..).unwrap_or_default().to_vec());
        if self.tx.blocking_send(path).is_err() {
            return false;
        }
        self.emitted += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::steps::{all_out, has, inbound, out};
    use crate::storage::{FaultConfig, MemoryEngine};
    use futures::StreamExt;

    fn sample() -> Arc<Graph<MemoryEngine>> {
        let g = Graph::new(MemoryEngine::new());
        let triples: Vec<Triple> = [
            ["a", "p1", "b"],
            ["a", "p1", "f"],
            ["a", "p5", "j"],
            ["b", "p2", "c"],
            ["g", "p4", "c"],
            ["g", "p1", "h"],
            ["g", "p1", "i"],
        ]
        .iter()
        .map(|f| Triple::from_strs(f))
        .collect();
        g.write_indexed_triples(&triples).unwrap();
        Arc::new(g)
    }

    #[tokio::test]
    async fn test_all_out_from_vertex() {
        let g = sample();
        let paths = walk(&g, "a", vec![all_out()]).collect().await;
        let objects: Vec<Vec<u8>> = paths.iter().map(|p| p[0].o.clone()).collect();
        assert_eq!(objects, vec![b"b".to_vec(), b"f".to_vec(), b"j".to_vec()]);
        assert!(paths.iter().all(|p| p.len() == 1));
    }

    #[tokio::test]
    async fn test_inbound_orients_source_as_object() {
        let g = sample();
        let paths = walk(&g, "c", vec![inbound("p4")]).collect().await;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0][0], Triple::from_strs(&["c", "p4", "g"]));
    }

    #[tokio::test]
    async fn test_filter_prunes_and_adds_nothing() {
        let g = sample();
        let paths = out("p1")
            .has(|t| t.o == b"f")
            .walk(&g, "a")
            .collect()
            .await;
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 1);
        assert_eq!(paths[0][0].o, b"f");
    }

    #[tokio::test]
    async fn test_no_steps_emits_empty_path() {
        let g = sample();
        let paths = walk(&g, "a", Vec::new()).collect().await;
        assert_eq!(paths, vec![Path::default()]);
    }

    #[tokio::test]
    async fn test_unknown_vertex_yields_nothing() {
        let g = sample();
        assert!(walk(&g, "zzz", vec![all_out()]).collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_vertex_follows_only_its_own_edges() {
        let g = sample();
        assert!(walk(&g, "", vec![out("p1")]).collect().await.is_empty());
        assert!(walk(&g, "", vec![all_out()]).collect().await.is_empty());
    }

    #[tokio::test]
    async fn test_collect_up_to() {
        let g = sample();
        let paths = walk(&g, "a", vec![all_out()]).collect_up_to(2).await;
        assert_eq!(paths.len(), 2);
    }

    #[tokio::test]
    async fn test_stream_impl() {
        let g = sample();
        let paths: Vec<Path> = StreamExt::collect(walk(&g, "a", vec![out("p1")])).await;
        assert_eq!(paths.len(), 2);

        let mut stream = walk(&g, "a", vec![all_out()]);
        let first = StreamExt::next(&mut stream).await.unwrap();
        assert_eq!(first[0].o, b"b");
    }

    #[tokio::test]
    async fn test_finish_reports_outcome() {
        let g = sample();
        let mut w = walk(&g, "a", vec![all_out()]);
        let mut received = 0;
        while w.next_path().await.is_some() {
            received += 1;
        }
        let outcome = w.finish().await;
        assert_eq!(outcome.emitted, received);
        assert!(outcome.completed);
    }

    #[tokio::test]
    async fn test_has_as_first_step_sees_seed() {
        let g = sample();
        let paths = has(|t| t.o == b"a")
            .all_out()
            .walk(&g, "a")
            .collect()
            .await;
        assert_eq!(paths.len(), 3);
    }

    #[tokio::test]
    async fn test_read_faults_truncate_branches() {
        let faulty = MemoryEngine::with_faults(
            FaultConfig {
                read_error_rate: 1.0,
                ..FaultConfig::no_faults()
            },
            1,
        );
        let g = Graph::new(faulty);
        g.write_indexed_triple(&Triple::from_strs(&["a", "p1", "b"]))
            .unwrap();
        let g = Arc::new(g);

        let mut w = walk(&g, "a", vec![all_out()]);
        assert!(w.next_path().await.is_none());
        assert!(w.finish().await.completed);
    }

    #[test]
    fn test_path_display() {
        let path = Path::new(vec![
            Triple::from_strs(&["a", "p1", "b", "today"]),
            Triple::from_strs(&["b", "p2", "c"]),
        ]);
        assert_eq!(path.to_string(), "[\"<'a','p1','b','today'>\"\"<'b','p2','c',''>\"]");
        assert_eq!(path.strings()[1][2], "c");
    }
}
