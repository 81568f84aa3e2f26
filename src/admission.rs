//! Admission and deduplication of incoming activity events.
//!
//! A single navigation often reports twice (history visit and tab
//! completion) within moments; the lookback window keeps it to one record.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::errors::LifeLogResult;
use crate::event_record::{EventRecord, RawEvent};
use crate::log_store::{AppendOutcome, BoundedLogStore};
use crate::logging_state::LoggingState;

pub const DEFAULT_DEDUP_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum AdmissionResult {
    Accepted(EventRecord),
    SkippedDuplicate,
    Disabled,
    /// Raw event without a url. Not stored, like `Disabled`.
    Rejected,
}

impl AdmissionResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionResult::Accepted(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdmissionResult::Accepted(_) => "accepted",
            AdmissionResult::SkippedDuplicate => "skipped_duplicate",
            AdmissionResult::Disabled => "disabled",
            AdmissionResult::Rejected => "rejected",
        }
    }
}

pub struct AdmissionUnit {
    store: Arc<BoundedLogStore>,
    state: Arc<LoggingState>,
    clock: Arc<dyn Clock>,
    dedup_window: Duration,
}

impl AdmissionUnit {
    pub fn new(
        store: Arc<BoundedLogStore>,
        state: Arc<LoggingState>,
        clock: Arc<dyn Clock>,
        dedup_window: Duration,
    ) -> Self {
        Self {
            store,
            state,
            clock,
            dedup_window,
        }
    }

    pub fn logging_state(&self) -> &Arc<LoggingState> {
        &self.state
    }

    pub fn dedup_window(&self) -> Duration {
        self.dedup_window
    }

    /// Decide whether `raw` becomes a stored record.
    pub async fn admit(&self, raw: RawEvent) -> LifeLogResult<AdmissionResult> {
        if !self.state.enabled() {
            debug!("logging disabled, event ignored");
            return Ok(AdmissionResult::Disabled);
        }

        let now = self.clock.now();
        let record = match EventRecord::from_raw(raw, now) {
            Some(record) => record,
            None => {
                debug!("event without url rejected");
                return Ok(AdmissionResult::Rejected);
            }
        };

        let cutoff = now - self.dedup_window;
        let url = record.url.clone();
        let outcome = self
            .store
            .append_unless(record.clone(), |entries| {
                entries
                    .iter()
                    .any(|existing| existing.url == url && existing.timestamp > cutoff)
            })
            .await;

        match outcome {
            Ok(AppendOutcome::Skipped) => {
                debug!(url = %record.url, "duplicate within window, skipped");
                Ok(AdmissionResult::SkippedDuplicate)
            }
            Ok(AppendOutcome::Appended { evicted, len }) => {
                info!(
                    id = %record.id,
                    domain = %record.domain,
                    source = %record.source,
                    len,
                    evicted,
                    "logged {}",
                    record.display_title()
                );
                Ok(AdmissionResult::Accepted(record))
            }
            Err(e) => {
                error!(url = %record.url, error = %e, "failed to save entry");
                Err(e)
            }
        }
    }
}
