//! Index store: triples replicated across the three permuted sub-keyspaces.
//!
//! # Physical Layout
//!
//! ```text
//! tag(index) | key(permute(t, index))  ->  t.v
//! ```
//!
//! An indexed write stages one put per [`Index`] into a single
//! [`WriteBatch`], so all three copies land together or not at all.
//! Raw (unindexed) writes store `key(t)` without a tag byte and share the
//! same flat key space.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::storage::engine::{EngineError, KvCursor, KvEngine, WriteBatch};
use crate::types::{Index, Triple};

/// Default capacity of a walk's result channel.
pub const DEFAULT_WALK_BUFFER: usize = 16;

/// Counters reported by [`Graph::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Physical puts committed through this handle.
    pub writes: u64,
    /// Live keys in the engine.
    pub keys: u64,
    /// On-disk log size.
    pub log_bytes: u64,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "writes={} keys={} log_bytes={}",
            self.writes, self.keys, self.log_bytes
        )
    }
}

/// A triple store over an ordered key/value engine.
#[derive(Debug)]
pub struct Graph<E: KvEngine> {
    engine: E,
    writes: AtomicU64,
    walk_buffer: usize,
}

impl<E: KvEngine> Graph<E> {
    #[must_use]
    pub const fn new(engine: E) -> Self {
        Self {
            engine,
            writes: AtomicU64::new(0),
            walk_buffer: DEFAULT_WALK_BUFFER,
        }
    }

    /// Set the result channel capacity for walks. Clamped to at least 1.
    #[must_use]
    pub fn with_walk_buffer(mut self, walk_buffer: usize) -> Self {
        self.walk_buffer = walk_buffer.max(1);
        self
    }

    #[must_use]
    pub const fn walk_buffer(&self) -> usize {
        self.walk_buffer
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Physical puts committed so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn inc_writes(&self, n: u64) {
        self.writes.fetch_add(n, Ordering::Relaxed);
    }

    /// Put `key(t) -> t.v` with no index tag.
    pub fn write_triple(&self, triple: &Triple) -> Result<(), GraphError> {
        self.engine.put(&triple.key(), triple.val())?;
        self.inc_writes(1);
        Ok(())
    }

    /// Put every triple raw, in one atomic batch.
    pub fn write_batch(&self, triples: &[Triple]) -> Result<(), GraphError> {
        let mut batch = WriteBatch::with_capacity(triples.len());
        for triple in triples {
            batch.put(triple.key(), triple.val().to_vec());
        }
        self.engine.write(batch)?;
        self.inc_writes(triples.len() as u64);
        Ok(())
    }

    /// Put an already-permuted triple into one index.
    pub fn index_triple(&self, index: Index, triple: &Triple) -> Result<(), GraphError> {
        self.engine.put(&index.tagged(&triple.key()), triple.val())?;
        self.inc_writes(1);
        Ok(())
    }

    /// Write `triple` into all three indexes atomically.
    pub fn write_indexed_triple(&self, triple: &Triple) -> Result<(), GraphError> {
        self.write_indexed_triples(std::slice::from_ref(triple))
    }

    /// Write every triple into all three indexes in one atomic batch.
    ///
    /// The write counter advances by three per triple, and only on success.
    pub fn write_indexed_triples(&self, triples: &[Triple]) -> Result<(), GraphError> {
        let mut batch = WriteBatch::with_capacity(triples.len() * Index::ALL.len());
        for triple in triples {
            for index in Index::ALL {
                let permuted = triple.clone().permute(index);
                batch.put(index.tagged(&permuted.key()), permuted.v);
            }
        }
        let puts = batch.len() as u64;
        self.engine.write(batch)?;
        self.inc_writes(puts);
        Ok(())
    }

    /// Open a prefix-bounded iterator over one index.
    ///
    /// `pattern` is given in the index's own orientation: its `s` is matched
    /// against the leading field of the physical key, and an empty `s` matches
    /// only keys whose leading field is empty. `None` scans the whole
    /// sub-keyspace.
    pub fn index_iter(
        &self,
        index: Index,
        pattern: Option<&Triple>,
    ) -> Result<IndexIterator<E::Cursor>, GraphError> {
        let (from, to) = match pattern {
            Some(pattern) => {
                let prefix = pattern.key_prefix();
                let start = pattern.start_key();
                let from = if start.is_empty() { &prefix } else { &start };
                (index.tagged(from), index.tagged(&prefix))
            }
            None => (vec![index.tag()], vec![index.tag()]),
        };
        Ok(IndexIterator::new(self.engine.cursor()?, index, from, to))
    }

    /// Collect every match, permuted back to S, P, O orientation.
    pub fn scan(&self, index: Index, pattern: Option<&Triple>) -> Result<Vec<Triple>, GraphError> {
        Ok(self.index_iter(index, pattern)?.collect())
    }

    /// Call `visitor` on each match until it returns `false`.
    pub fn visit<F>(
        &self,
        index: Index,
        pattern: Option<&Triple>,
        mut visitor: F,
    ) -> Result<(), GraphError>
    where
        F: FnMut(Triple) -> bool,
    {
        for triple in self.index_iter(index, pattern)? {
            if !visitor(triple) {
                break;
            }
        }
        Ok(())
    }

    /// Visit at most `limit` triples of the `SPO` index.
    pub fn do_all<F>(&self, limit: usize, mut visitor: F) -> Result<(), GraphError>
    where
        F: FnMut(Triple) -> bool,
    {
        for triple in self.index_iter(Index::Spo, None)?.take(limit) {
            if !visitor(triple) {
                break;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let engine = self.engine.stats();
        GraphStats {
            writes: self.writes(),
            keys: engine.keys,
            log_bytes: engine.log_bytes,
        }
    }

    pub fn compact(&self) -> Result<(), GraphError> {
        tracing::info!("starting compaction");
        self.engine.compact()?;
        tracing::info!("completed compaction ({})", self.stats());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Init,
    Active,
    Done,
}

/// Range scan over one index, bounded by a key prefix.
///
/// The scan starts at `from` and ends at the first key that does not begin
/// with `to`; there is no separate end key.
#[derive(Debug)]
pub struct IndexIterator<C: KvCursor> {
    cursor: C,
    index: Index,
    from: Vec<u8>,
    to: Vec<u8>,
    state: IterState,
}

impl<C: KvCursor> IndexIterator<C> {
    const fn new(cursor: C, index: Index, from: Vec<u8>, to: Vec<u8>) -> Self {
        Self {
            cursor,
            index,
            from,
            to,
            state: IterState::Init,
        }
    }

    /// Move to the next entry in range. Returns `false` once exhausted.
    pub fn advance(&mut self) -> bool {
        match self.state {
            IterState::Done => return false,
            IterState::Init => {
                self.cursor.seek(&self.from);
                self.state = IterState::Active;
            }
            IterState::Active => self.cursor.next(),
        }
        if !self.cursor.valid() || !self.cursor.key().starts_with(&self.to) {
            self.state = IterState::Done;
            return false;
        }
        true
    }

    /// Raw key of the current entry, including the tag byte.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.cursor.key()
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        self.cursor.value()
    }

    #[must_use]
    pub const fn index(&self) -> Index {
        self.index
    }

    /// The current entry decoded and permuted back to S, P, O orientation.
    #[must_use]
    pub fn triple(&self) -> Triple {
        let key = self.cursor.key();
        Triple::decode(key.get(1..).unwrap_or_default(), self.cursor.value()).permute(self.index)
    }
}

impl<C: KvCursor> Iterator for IndexIterator<C> {
    type Item = Triple;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().then(|| self.triple())
    }
}

/// Errors that can occur in the index store.
#[derive(Debug)]
pub enum GraphError {
    /// The engine rejected an operation.
    Engine(EngineError),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(e) => write!(f, "storage engine error: {e}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(e) => Some(e),
        }
    }
}

impl From<EngineError> for GraphError {
    fn from(e: EngineError) -> Self {
        Self::Engine(e)
    }
}
