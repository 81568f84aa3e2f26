//! Bounded, newest-first event log persisted as one backend record.
//!
//! Every mutation is a read-modify-write of the whole log. Those cycles are
//! serialized by a single async mutex so concurrent callers cannot lose each
//! other's updates. A write that overruns the backend timeout is settled,
//! or rolled back, before the lock is released. Reads take no lock: the
//! backend is atomic per key.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::{LifeLogError, LifeLogResult};
use crate::event_record::EventRecord;
use crate::storage_backend::{run_bounded, write_bounded, StorageBackend, LOG_KEY};

/// Newest layout understood by this build.
pub const LOG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistedLogRef<'a> {
    schema_version: u32,
    entries: &'a [EventRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedLog {
    schema_version: u32,
    entries: Vec<EventRecord>,
}

/// Accepts the versioned envelope and the bare array written by the
/// browser extension.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLog {
    Versioned(PersistedLog),
    Bare(Vec<EventRecord>),
}

/// Result of an append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { evicted: usize, len: usize },
    /// The caller's predicate rejected the record; nothing was written.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetainOutcome {
    pub removed: usize,
    pub retained: usize,
}

pub struct BoundedLogStore {
    backend: Arc<dyn StorageBackend>,
    capacity: usize,
    timeout: Duration,
    write_lock: Mutex<()>,
}

impl BoundedLogStore {
    pub fn new(backend: Arc<dyn StorageBackend>, capacity: usize, timeout: Duration) -> Self {
        Self {
            backend,
            capacity: capacity.max(1),
            timeout,
            write_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Full log, newest first.
    pub async fn load_all(&self) -> LifeLogResult<Vec<EventRecord>> {
        self.read_log().await
    }

    pub async fn len(&self) -> LifeLogResult<usize> {
        Ok(self.read_log().await?.len())
    }

    pub async fn is_empty(&self) -> LifeLogResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Insert `record` at the head and evict from the tail past capacity.
    pub async fn append(&self, record: EventRecord) -> LifeLogResult<AppendOutcome> {
        self.append_unless(record, |_| false).await
    }

    /// Like [`append`](Self::append), but first shows the current log to
    /// `reject`; when it returns true the record is dropped. The check and the
    /// write happen inside the same locked cycle.
    pub async fn append_unless<F>(&self, record: EventRecord, reject: F) -> LifeLogResult<AppendOutcome>
    where
        F: FnOnce(&[EventRecord]) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let previous = self.read_raw().await?;
        let mut entries = decode_stored(previous.as_deref())?;
        if reject(&entries) {
            return Ok(AppendOutcome::Skipped);
        }

        entries.insert(0, record);
        let evicted = entries.len().saturating_sub(self.capacity);
        entries.truncate(self.capacity);
        self.write_log(previous, &entries).await?;

        if evicted > 0 {
            debug!(evicted, capacity = self.capacity, "evicted oldest log entries");
        }
        Ok(AppendOutcome::Appended {
            evicted,
            len: entries.len(),
        })
    }

    /// Persist `records` as the whole log in one write. Callers pass them
    /// newest first; anything past capacity is dropped from the tail.
    pub async fn replace_all(&self, mut records: Vec<EventRecord>) -> LifeLogResult<()> {
        let _guard = self.write_lock.lock().await;
        let previous = self.read_raw().await?;
        records.truncate(self.capacity);
        self.write_log(previous, &records).await
    }

    /// Keep only the records matching `keep`, writing back only on change.
    pub async fn retain<F>(&self, mut keep: F) -> LifeLogResult<RetainOutcome>
    where
        F: FnMut(&EventRecord) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let previous = self.read_raw().await?;
        let mut entries = decode_stored(previous.as_deref())?;
        let before = entries.len();
        entries.retain(|r| keep(r));
        let removed = before - entries.len();
        if removed > 0 {
            self.write_log(previous, &entries).await?;
        }
        Ok(RetainOutcome {
            removed,
            retained: entries.len(),
        })
    }

    /// Drop the whole log record from the backend.
    pub async fn clear(&self) -> LifeLogResult<()> {
        let _guard = self.write_lock.lock().await;
        let previous = self.read_raw().await?;
        write_bounded(&self.backend, self.timeout, "clear", LOG_KEY, previous, None).await
    }

    async fn read_log(&self) -> LifeLogResult<Vec<EventRecord>> {
        decode_stored(self.read_raw().await?.as_deref())
    }

    async fn read_raw(&self) -> LifeLogResult<Option<Vec<u8>>> {
        run_bounded(&self.backend, self.timeout, "load_log", |b| b.get(LOG_KEY)).await
    }

    /// Replace the stored log; `previous` is what a timed-out write rolls back to.
    async fn write_log(&self, previous: Option<Vec<u8>>, entries: &[EventRecord]) -> LifeLogResult<()> {
        let bytes = serde_json::to_vec(&PersistedLogRef {
            schema_version: LOG_SCHEMA_VERSION,
            entries,
        })?;
        write_bounded(&self.backend, self.timeout, "write_log", LOG_KEY, previous, Some(bytes)).await
    }
}

fn decode_stored(raw: Option<&[u8]>) -> LifeLogResult<Vec<EventRecord>> {
    match raw {
        None => Ok(Vec::new()),
        Some(bytes) => decode_log(bytes),
    }
}

fn decode_log(bytes: &[u8]) -> LifeLogResult<Vec<EventRecord>> {
    let stored: StoredLog = serde_json::from_slice(bytes)
        .map_err(|e| LifeLogError::storage("decode_log", format!("corrupt log record: {e}")))?;
    match stored {
        StoredLog::Versioned(log) if log.schema_version > LOG_SCHEMA_VERSION => {
            Err(LifeLogError::storage(
                "decode_log",
                format!(
                    "log schema version {} is newer than supported {}",
                    log.schema_version, LOG_SCHEMA_VERSION
                ),
            ))
        }
        StoredLog::Versioned(log) => Ok(log.entries),
        StoredLog::Bare(entries) => Ok(entries),
    }
}
