//! In-memory ordered engine.
//!
//! Keys live in a `BTreeMap` behind an `RwLock<Arc<..>>`. Cursors hold a clone
//! of the `Arc`, so they keep reading the snapshot they were opened on while
//! writers copy the map on their next batch (copy-on-write via
//! `Arc::make_mut`). The same table backs the durable [`LogEngine`].
//!
//! A write made while any cursor is open copies the whole map, so writes
//! that overlap running walks or scans cost O(store size). Bulk loads should
//! run before queries start rather than alongside them.
//!
//! Fault injection mirrors the simulated storage used for deterministic
//! testing: a seeded RNG decides whether a batch write or a cursor step fails.
//!
//! [`LogEngine`]: crate::storage::LogEngine

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::engine::{EngineError, EngineStats, KvCursor, KvEngine, WriteBatch};

pub(crate) type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// An ordered table shared between writers and snapshot cursors.
#[derive(Debug, Default)]
pub struct SharedTable {
    table: RwLock<Arc<Table>>,
}

impl SharedTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply puts under a single write lock.
    pub fn apply<I>(&self, entries: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        let mut guard = self.table.write().map_err(|_| EngineError::LockPoisoned)?;
        let table = Arc::make_mut(&mut guard);
        for (key, value) in entries {
            table.insert(key, value);
        }
        Ok(())
    }

    /// The current contents. Later writes do not affect the returned map.
    pub fn snapshot(&self) -> Result<Arc<Table>, EngineError> {
        let guard = self.table.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Number of keys, or 0 if the lock is poisoned.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.table
            .read()
            .map(|table| table.len() as u64)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Configuration for fault injection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    /// Probability that a put or batch write is rejected (0.0 - 1.0).
    pub write_error_rate: f64,
    /// Probability that a cursor seek/next invalidates the cursor (0.0 - 1.0).
    pub read_error_rate: f64,
}

impl FaultConfig {
    /// No faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Every write fails.
    #[must_use]
    pub const fn failing_writes() -> Self {
        Self {
            write_error_rate: 1.0,
            read_error_rate: 0.0,
        }
    }
}

#[derive(Debug)]
struct Faults {
    config: FaultConfig,
    rng: Mutex<StdRng>,
}

impl Faults {
    fn roll(&self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        // A poisoned RNG counts as a fault.
        match self.rng.lock() {
            Ok(mut rng) => rng.random_bool(rate.min(1.0)),
            Err(_) => true,
        }
    }
}

/// In-memory engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    table: SharedTable,
    faults: Option<Arc<Faults>>,
}

impl MemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that injects faults at the configured rates.
    ///
    /// The same `seed` always yields the same fault sequence.
    #[must_use]
    pub fn with_faults(config: FaultConfig, seed: u64) -> Self {
        Self {
            table: SharedTable::new(),
            faults: Some(Arc::new(Faults {
                config,
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            })),
        }
    }

    fn check_write_fault(&self) -> Result<(), EngineError> {
        match &self.faults {
            Some(faults) if faults.roll(faults.config.write_error_rate) => Err(
                EngineError::InjectedFault("write rejected".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

impl KvEngine for MemoryEngine {
    type Cursor = SnapshotCursor;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        self.check_write_fault()?;
        self.table.apply([(key.to_vec(), value.to_vec())])
    }

    fn write(&self, batch: WriteBatch) -> Result<(), EngineError> {
        self.check_write_fault()?;
        self.table.apply(batch.into_entries())
    }

    fn cursor(&self) -> Result<Self::Cursor, EngineError> {
        Ok(SnapshotCursor {
            faults: self.faults.as_ref().map(Arc::clone),
            ..SnapshotCursor::new(self.table.snapshot()?)
        })
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            keys: self.table.len(),
            log_bytes: 0,
        }
    }

    fn compact(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Cursor over an immutable table snapshot.
#[derive(Debug)]
pub struct SnapshotCursor {
    table: Arc<Table>,
    current: Option<(Vec<u8>, Vec<u8>)>,
    faults: Option<Arc<Faults>>,
}

impl SnapshotCursor {
    pub(crate) const fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            current: None,
            faults: None,
        }
    }

    fn read_fault(&self) -> bool {
        let Some(faults) = &self.faults else {
            return false;
        };
        let fault = faults.roll(faults.config.read_error_rate);
        if fault {
            tracing::debug!("injected read fault, invalidating cursor");
        }
        fault
    }

    fn first_after(&self, bound: Bound<&[u8]>) -> Option<(Vec<u8>, Vec<u8>)> {
        self.table
            .range::<[u8], _>((bound, Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone()))
    }
}

impl KvCursor for SnapshotCursor {
    fn seek(&mut self, key: &[u8]) {
        self.current = if self.read_fault() {
            None
        } else {
            self.first_after(Bound::Included(key))
        };
    }

    fn next(&mut self) {
        if self.read_fault() {
            self.current = None;
            return;
        }
        let next = match &self.current {
            Some((key, _)) => self.first_after(Bound::Excluded(key.as_slice())),
            None => None,
        };
        self.current = next;
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> &[u8] {
        self.current.as_ref().map(|(k, _)| k.as_slice()).unwrap_or_default()
    }

    fn value(&self) -> &[u8] {
        self.current.as_ref().map(|(_, v)| v.as_slice()).unwrap_or_default()
    }
}
