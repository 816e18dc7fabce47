//! Ordered key/value engine abstraction.
//!
//! The index store only needs a small contract from the engine underneath it:
//! single puts, atomic multi-put batches, and a seek/next cursor over keys in
//! byte order. This module defines that contract so the graph layer can run
//! over the durable log engine in production and the in-memory engine (with
//! fault injection) in tests.
//!
//! # Contract
//!
//! Implementations must ensure:
//! - A [`WriteBatch`] is applied all-or-nothing; readers never observe part of one
//! - A cursor observes a stable view as of its creation
//! - Cursors visit keys in ascending lexicographic byte order

use std::path::PathBuf;

use crate::storage::wal::WalError;

/// A group of puts applied atomically by [`KvEngine::write`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl WriteBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Stage a put.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.push((key, value));
    }

    /// Number of staged puts.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec::len() is not const-stable
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Staged puts in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(Vec<u8>, Vec<u8>)] {
        &self.entries
    }

    /// Consume the batch, yielding its puts in insertion order.
    #[must_use]
    pub fn into_entries(self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
    }
}

/// Engine-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Number of live keys.
    pub keys: u64,
    /// Size of the on-disk log in bytes (0 for in-memory engines).
    pub log_bytes: u64,
}

/// An ordered key/value store.
pub trait KvEngine: Send + Sync + 'static {
    /// Cursor type returned by [`KvEngine::cursor`].
    type Cursor: KvCursor;

    /// Write a single key/value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError>;

    /// Apply every put in `batch` atomically.
    fn write(&self, batch: WriteBatch) -> Result<(), EngineError>;

    /// Open a cursor over a snapshot of the current contents.
    ///
    /// The cursor is unpositioned until the first [`KvCursor::seek`].
    fn cursor(&self) -> Result<Self::Cursor, EngineError>;

    /// Current engine counters.
    fn stats(&self) -> EngineStats;

    /// Reclaim space. Engines without anything to reclaim return `Ok(())`.
    fn compact(&self) -> Result<(), EngineError>;
}

/// A positioned reader over an engine snapshot.
///
/// Once a cursor becomes invalid it stays invalid until the next `seek`.
/// Closing a cursor is dropping it.
pub trait KvCursor: Send {
    /// Position at the first key `>= key`.
    fn seek(&mut self, key: &[u8]);

    /// Advance to the next key.
    fn next(&mut self);

    /// True while the cursor is positioned on an entry.
    fn valid(&self) -> bool;

    /// Current key. Empty when invalid.
    fn key(&self) -> &[u8];

    /// Current value. Empty when invalid.
    fn value(&self) -> &[u8];
}

/// Errors that can occur in an engine.
#[derive(Debug)]
pub enum EngineError {
    /// I/O error.
    Io(std::io::Error),
    /// A lock guarding engine state was poisoned by a panicking writer.
    LockPoisoned,
    /// The engine was opened read-only.
    ReadOnly,
    /// The store does not exist and creation was not requested.
    NotFound(PathBuf),
    /// The on-disk log is damaged and cannot be repaired in this mode.
    Corrupt { offset: u64, reason: String },
    /// Log append failed.
    Wal(WalError),
    /// Injected fault for simulation.
    InjectedFault(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::LockPoisoned => write!(f, "engine lock poisoned"),
            Self::ReadOnly => write!(f, "engine is read-only"),
            Self::NotFound(path) => write!(f, "store not found: {}", path.display()),
            Self::Corrupt { offset, reason } => {
                write!(f, "corrupt log at offset {offset}: {reason}")
            }
            Self::Wal(e) => write!(f, "{e}"),
            Self::InjectedFault(msg) => write!(f, "injected fault: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Wal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<WalError> for EngineError {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Io(e) => Self::Io(e),
            other => Self::Wal(other),
        }
    }
}
