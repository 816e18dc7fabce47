//! Triple storage.
//!
//! Layers, bottom up:
//!
//! - [`engine`]: the ordered key/value contract (`put`, atomic batch, seek/next cursor)
//! - [`memory`] / [`log_engine`]: in-memory and durable engines
//! - [`graph`]: the three-index triple store on top of an engine
//! - [`vertex`]: distinct-subject enumeration
//!
//! # Usage
//!
//! ```ignore
//! use triplewalk::storage::{EngineOptions, Graph, LogEngine};
//! use triplewalk::types::{Index, Triple};
//!
//! let engine = LogEngine::open(path, EngineOptions::default())?;
//! let graph = Graph::new(engine);
//!
//! graph.write_indexed_triple(&Triple::from_strs(&["a", "p1", "b"]))?;
//! let out = graph.scan(Index::Spo, Some(&Triple::pattern("a")))?;
//! ```

pub mod engine;
pub mod graph;
pub mod log_engine;
pub mod memory;
pub mod vertex;
pub mod wal;

pub use engine::{EngineError, EngineStats, KvCursor, KvEngine, WriteBatch};
pub use graph::{DEFAULT_WALK_BUFFER, Graph, GraphError, GraphStats, IndexIterator};
pub use log_engine::{EngineOptions, LOG_FILE_NAME, LogEngine};
pub use memory::{FaultConfig, MemoryEngine, SnapshotCursor};
pub use vertex::{VertexIterator, successor};
pub use wal::WalError;
