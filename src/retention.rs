// retention.rs
// Purpose: Age-based purge of the event log

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::LifeLogResult;
use crate::log_store::BoundedLogStore;

pub const DEFAULT_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub removed_count: usize,
    pub retained_count: usize,
    pub threshold: DateTime<Utc>,
}

pub struct RetentionSweeper {
    store: Arc<BoundedLogStore>,
    retention: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<BoundedLogStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Remove every record older than `now - retention`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> LifeLogResult<SweepReport> {
        let threshold = now - self.retention;
        match self.store.retain(|record| record.timestamp >= threshold).await {
            Ok(outcome) => {
                info!(
                    removed = outcome.removed,
                    retained = outcome.retained,
                    %threshold,
                    "retention sweep completed"
                );
                Ok(SweepReport {
                    removed_count: outcome.removed,
                    retained_count: outcome.retained,
                    threshold,
                })
            }
            Err(e) => {
                error!(error = %e, "retention sweep failed");
                Err(e)
            }
        }
    }
}
