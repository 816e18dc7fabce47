//! Durable engine: an append-only checksummed log in front of an in-memory
//! ordered table.
//!
//! Every put or batch is appended to `<dir>/triples.log` as one record before
//! it becomes visible to cursors. Opening a store replays the log; a torn or
//! damaged tail is cut off at the last good record.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::storage::engine::{EngineError, EngineStats, KvEngine, WriteBatch};
use crate::storage::memory::{SharedTable, SnapshotCursor};
use crate::storage::wal::{self, LogRecord, LogRecordType, Wal};

/// Name of the log file inside the store directory.
pub const LOG_FILE_NAME: &str = "triples.log";

/// Scratch file used while compacting.
const COMPACT_FILE_NAME: &str = "triples.log.compact";

/// Options for [`LogEngine::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Create the directory and log if they do not exist.
    pub create_if_missing: bool,
    /// Reject writes and leave the log untouched.
    pub read_only: bool,
    /// `fsync` after every append.
    pub sync_writes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            read_only: false,
            sync_writes: false,
        }
    }
}

/// Log-backed engine.
#[derive(Debug)]
pub struct LogEngine {
    dir: PathBuf,
    options: EngineOptions,
    table: SharedTable,
    /// `None` when opened read-only. Held across append + apply so the table
    /// sees batches in log order.
    wal: Mutex<Option<Wal<File>>>,
    log_len: AtomicU64,
}

impl LogEngine {
    /// Open (or create) the store in `dir`.
    pub fn open(dir: &Path, options: EngineOptions) -> Result<Self, EngineError> {
        let path = dir.join(LOG_FILE_NAME);
        if !path.exists() {
            if options.read_only || !options.create_if_missing {
                return Err(EngineError::NotFound(path));
            }
            fs::create_dir_all(dir)?;
            File::create(&path)?.sync_all()?;
            tracing::info!("created store at {}", dir.display());
        }

        let bytes = fs::read(&path)?;
        let replay = wal::replay(&bytes);
        if let Some(e) = &replay.stopped_by {
            let discarded = bytes.len() as u64 - replay.valid_len;
            if options.read_only {
                return Err(EngineError::Corrupt {
                    offset: replay.valid_len,
                    reason: e.to_string(),
                });
            }
            tracing::warn!(
                "discarding {} bytes of log after offset {}: {}",
                discarded,
                replay.valid_len,
                e
            );
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(replay.valid_len)?;
            file.sync_all()?;
        }

        let table = SharedTable::new();
        let records = replay.records.len();
        for record in replay.records {
            table.apply(record.entries)?;
        }
        tracing::info!(
            "recovered {} log records ({} keys, {} bytes) from {}",
            records,
            table.len(),
            replay.valid_len,
            path.display()
        );

        let wal = if options.read_only {
            None
        } else {
            let file = OpenOptions::new().append(true).open(&path)?;
            Some(Wal::new(file, replay.valid_len))
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            options,
            table,
            wal: Mutex::new(wal),
            log_len: AtomicU64::new(replay.valid_len),
        })
    }

    /// Directory holding the log.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn options(&self) -> EngineOptions {
        self.options
    }

    fn append(&self, entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<(), EngineError> {
        let mut guard = self.wal.lock().map_err(|_| EngineError::LockPoisoned)?;
        let wal = guard.as_mut().ok_or(EngineError::ReadOnly)?;

        let record = LogRecord::new(LogRecordType::Batch, entries);
        if let Err(e) = wal.append(&record) {
            // Cut any partial record so later appends stay replayable.
            if let Err(trunc) = wal.get_ref().set_len(wal.len()) {
                tracing::warn!("failed to roll back partial log record: {trunc}");
            }
            return Err(e.into());
        }
        if self.options.sync_writes {
            wal.get_ref().sync_data()?;
        }
        self.log_len.store(wal.len(), Ordering::Relaxed);

        self.table.apply(record.entries)
    }
}

impl KvEngine for LogEngine {
    type Cursor = SnapshotCursor;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        self.append(vec![(key.to_vec(), value.to_vec())])
    }

    fn write(&self, batch: WriteBatch) -> Result<(), EngineError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.append(batch.into_entries())
    }

    fn cursor(&self) -> Result<Self::Cursor, EngineError> {
        Ok(SnapshotCursor::new(self.table.snapshot()?))
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            keys: self.table.len(),
            log_bytes: self.log_len.load(Ordering::Relaxed),
        }
    }

    /// Rewrite the log as a single snapshot record.
    fn compact(&self) -> Result<(), EngineError> {
        let mut guard = self.wal.lock().map_err(|_| EngineError::LockPoisoned)?;
        let wal = guard.as_mut().ok_or(EngineError::ReadOnly)?;
        let before = wal.len();

        let snapshot = self.table.snapshot()?;
        let record = LogRecord::new(
            LogRecordType::Snapshot,
            snapshot
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );

        let scratch = self.dir.join(COMPACT_FILE_NAME);
        let mut compacted = Wal::new(File::create(&scratch)?, 0);
        compacted.append(&record)?;
        compacted.get_ref().sync_all()?;
        let after = compacted.len();
        drop(compacted);

        let path = self.dir.join(LOG_FILE_NAME);
        fs::rename(&scratch, &path)?;
        *wal = Wal::new(OpenOptions::new().append(true).open(&path)?, after);
        self.log_len.store(after, Ordering::Relaxed);

        tracing::info!("compacted log from {} to {} bytes", before, after);
        Ok(())
    }
}
