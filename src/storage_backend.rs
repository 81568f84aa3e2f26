//! Abstract key/value persistence the log and toggle are stored in.
//!
//! Backends are synchronous and single-key atomic; the log store moves calls
//! onto the blocking pool and bounds them with a timeout.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{error, warn};

use crate::errors::{LifeLogError, LifeLogResult};

/// Record holding the ordered event log.
pub const LOG_KEY: &str = "life_log_entries";
/// Record holding the logging toggle.
pub const STATE_KEY: &str = "logging_state";

pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> LifeLogResult<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> LifeLogResult<()>;

    fn remove(&self, key: &str) -> LifeLogResult<()>;

    /// Short label used in log lines.
    fn name(&self) -> &'static str {
        "backend"
    }
}

/// Run one backend read on the blocking pool, bounded by `timeout`.
///
/// A read that times out is abandoned and reported as a storage failure;
/// nothing retries it. Writes go through [`write_bounded`].
pub async fn run_bounded<T, F>(
    backend: &Arc<dyn StorageBackend>,
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> LifeLogResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn StorageBackend) -> LifeLogResult<T> + Send + 'static,
{
    let backend = Arc::clone(backend);
    let task = tokio::task::spawn_blocking(move || call(backend.as_ref()));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(LifeLogError::storage(
            operation,
            format!("backend task failed: {join_err}"),
        )),
        Err(_) => Err(LifeLogError::storage(
            operation,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}

/// Write `next` under `key` (`None` removes it), bounded by `timeout`.
///
/// Callers hold their write lock across this call. A write that overruns
/// the timeout is not abandoned: it is awaited to completion and, if it
/// landed, `previous` is put back before the timeout is reported. The key
/// therefore holds either the new value (on `Ok`) or the old one (on `Err`).
pub async fn write_bounded(
    backend: &Arc<dyn StorageBackend>,
    timeout: Duration,
    operation: &'static str,
    key: &'static str,
    previous: Option<Vec<u8>>,
    next: Option<Vec<u8>>,
) -> LifeLogResult<()> {
    let writer = Arc::clone(backend);
    let mut task = tokio::task::spawn_blocking(move || put(writer.as_ref(), key, next.as_deref()));
    let landed = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => return result,
        Ok(Err(join_err)) => {
            return Err(LifeLogError::storage(
                operation,
                format!("backend task failed: {join_err}"),
            ))
        }
        Err(_) => {
            warn!(operation, key, "backend write overran its timeout, waiting for it to settle");
            matches!(task.await, Ok(Ok(())))
        }
    };

    let timed_out = format!("timed out after {}ms", timeout.as_millis());
    if !landed {
        return Err(LifeLogError::storage(operation, timed_out));
    }

    let restorer = Arc::clone(backend);
    let restored = tokio::task::spawn_blocking(move || put(restorer.as_ref(), key, previous.as_deref()))
        .await
        .map_err(|e| LifeLogError::storage(operation, format!("rollback task failed: {e}")))
        .and_then(|result| result);
    match restored {
        Ok(()) => Err(LifeLogError::storage(operation, format!("{timed_out}, rolled back"))),
        Err(e) => {
            error!(operation, key, error = %e, "rollback after timed out write failed");
            Err(LifeLogError::storage(
                operation,
                format!("{timed_out} and rollback failed: {e}"),
            ))
        }
    }
}

fn put(backend: &dyn StorageBackend, key: &str, value: Option<&[u8]>) -> LifeLogResult<()> {
    match value {
        Some(bytes) => backend.set(key, bytes),
        None => backend.remove(key),
    }
}

/// Volatile backend. Also used by tests to inject failures and latency.
#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    latency_ms: AtomicU64,
    next_write_delay_ms: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Block each operation for `latency` before serving it.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay only the next `set`/`remove` by `delay`. The write still lands.
    pub fn slow_next_write(&self, delay: Duration) {
        self.next_write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    fn check_write(&self, operation: &str) -> LifeLogResult<()> {
        let delay = self.next_write_delay_ms.swap(0, Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LifeLogError::storage(operation, "injected write failure"));
        }
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> LifeLogResult<Option<Vec<u8>>> {
        self.simulate_latency();
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LifeLogError::storage("get", "injected read failure"));
        }
        let records = self
            .records
            .read()
            .map_err(|_| LifeLogError::storage("get", "memory backend lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> LifeLogResult<()> {
        self.simulate_latency();
        self.check_write("set")?;
        let mut records = self
            .records
            .write()
            .map_err(|_| LifeLogError::storage("set", "memory backend lock poisoned"))?;
        records.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> LifeLogResult<()> {
        self.simulate_latency();
        self.check_write("remove")?;
        let mut records = self
            .records
            .write()
            .map_err(|_| LifeLogError::storage("remove", "memory backend lock poisoned"))?;
        records.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
