// logging_state.rs
// Purpose: Persisted on/off switch gating admission of new events

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::{LifeLogError, LifeLogResult};
use crate::storage_backend::{run_bounded, write_bounded, StorageBackend, STATE_KEY};

pub const STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default = "default_schema_version")]
    schema_version: u32,
    enabled: bool,
}

fn default_schema_version() -> u32 {
    STATE_SCHEMA_VERSION
}

/// Logging toggle. The current value is held in memory and mirrored to the
/// backend; a new value is published only after it has been persisted.
pub struct LoggingState {
    backend: Arc<dyn StorageBackend>,
    timeout: Duration,
    enabled: AtomicBool,
    write_lock: Mutex<()>,
}

impl LoggingState {
    /// Read the persisted toggle. Absent means first run, which is enabled.
    pub async fn load(backend: Arc<dyn StorageBackend>, timeout: Duration) -> LifeLogResult<Self> {
        let raw = run_bounded(&backend, timeout, "load_state", |b| b.get(STATE_KEY)).await?;
        let enabled = match raw {
            None => true,
            Some(bytes) => {
                let state: PersistedState = serde_json::from_slice(&bytes).map_err(|e| {
                    LifeLogError::storage("load_state", format!("corrupt logging state: {e}"))
                })?;
                if state.schema_version > STATE_SCHEMA_VERSION {
                    return Err(LifeLogError::storage(
                        "load_state",
                        format!(
                            "logging state schema version {} is newer than supported {}",
                            state.schema_version, STATE_SCHEMA_VERSION
                        ),
                    ));
                }
                state.enabled
            }
        };
        info!(enabled, "logging state loaded");
        Ok(Self {
            backend,
            timeout,
            enabled: AtomicBool::new(enabled),
            write_lock: Mutex::new(()),
        })
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Persist `enabled` and return the value now in force.
    pub async fn set_enabled(&self, enabled: bool) -> LifeLogResult<bool> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec(&PersistedState {
            schema_version: STATE_SCHEMA_VERSION,
            enabled,
        })?;
        let saved: LifeLogResult<()> = async {
            let previous =
                run_bounded(&self.backend, self.timeout, "save_state", |b| b.get(STATE_KEY)).await?;
            write_bounded(&self.backend, self.timeout, "save_state", STATE_KEY, previous, Some(bytes))
                .await
        }
        .await;
        if let Err(e) = saved {
            warn!(error = %e, "failed to persist logging state, keeping previous value");
            return Err(e);
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "logging toggled");
        Ok(enabled)
    }
}
