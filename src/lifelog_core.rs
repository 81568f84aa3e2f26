//! lifelog_core.rs
//! Wires the storage engine together: backend, bounded store, logging toggle,
//! admission, retention and queries, all built from one configuration.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone};
use tracing::{error, info};

use crate::admission::{AdmissionResult, AdmissionUnit};
use crate::clock::{Clock, SystemClock};
use crate::config_loader::LifeLogConfig;
use crate::errors::{LifeLogError, LifeLogResult};
use crate::event_record::{EventRecord, RawEvent};
use crate::exporter::{self, EXPORT_LIMIT};
use crate::log_store::BoundedLogStore;
use crate::logging_state::LoggingState;
use crate::query::{QueryService, Stats};
use crate::retention::{RetentionSweeper, SweepReport};
use crate::storage_backend::StorageBackend;
use crate::storage_sled::SledBackend;

pub struct LifeLogCore {
    config: LifeLogConfig,
    backend: Arc<dyn StorageBackend>,
    store: Arc<BoundedLogStore>,
    state: Arc<LoggingState>,
    admission: AdmissionUnit,
    sweeper: Arc<RetentionSweeper>,
    queries: QueryService,
    clock: Arc<dyn Clock>,
}

impl LifeLogCore {
    /// Open the sled database under `config.data_dir`.
    pub async fn open(config: LifeLogConfig) -> LifeLogResult<Self> {
        config.validate()?;
        let path = config.data_dir.join("db");
        let backend = tokio::task::spawn_blocking(move || SledBackend::open(path))
            .await
            .map_err(|e| LifeLogError::storage("open", e))??;
        Self::with_backend(config, Arc::new(backend), Arc::new(SystemClock)).await
    }

    pub async fn with_backend(
        config: LifeLogConfig,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> LifeLogResult<Self> {
        config.validate()?;
        let timeout = StdDuration::from_millis(config.storage.timeout_ms);

        let store = Arc::new(BoundedLogStore::new(
            Arc::clone(&backend),
            config.log.capacity,
            timeout,
        ));
        let state = Arc::new(LoggingState::load(Arc::clone(&backend), timeout).await?);
        let admission = AdmissionUnit::new(
            Arc::clone(&store),
            Arc::clone(&state),
            Arc::clone(&clock),
            Duration::seconds(config.log.dedup_window_secs),
        );
        let sweeper = Arc::new(RetentionSweeper::new(
            Arc::clone(&store),
            Duration::days(config.log.retention_days),
        ));
        let queries = QueryService::new(Arc::clone(&store), config.query.top_domains);

        info!(
            backend = backend.name(),
            capacity = config.log.capacity,
            enabled = state.enabled(),
            "life log initialized"
        );

        Ok(Self {
            config,
            backend,
            store,
            state,
            admission,
            sweeper,
            queries,
            clock,
        })
    }

    pub fn config(&self) -> &LifeLogConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn store(&self) -> &Arc<BoundedLogStore> {
        &self.store
    }

    pub fn sweeper(&self) -> Arc<RetentionSweeper> {
        Arc::clone(&self.sweeper)
    }

    pub async fn admit(&self, raw: RawEvent) -> LifeLogResult<AdmissionResult> {
        self.admission.admit(raw).await
    }

    pub async fn recent(&self, limit: i64) -> LifeLogResult<Vec<EventRecord>> {
        self.queries.recent(limit).await
    }

    pub async fn stats(&self) -> LifeLogResult<Stats> {
        self.queries.stats(self.clock.now()).await
    }

    pub async fn stats_in<Tz: TimeZone>(&self, tz: &Tz) -> LifeLogResult<Stats> {
        self.queries.stats_in(self.clock.now(), tz).await
    }

    pub fn logging_enabled(&self) -> bool {
        self.state.enabled()
    }

    pub async fn set_logging(&self, enabled: bool) -> LifeLogResult<bool> {
        self.state.set_enabled(enabled).await
    }

    pub async fn sweep(&self) -> LifeLogResult<SweepReport> {
        self.sweeper.sweep(self.clock.now()).await
    }

    pub async fn clear_all(&self) -> LifeLogResult<()> {
        match self.store.clear().await {
            Ok(()) => {
                info!("all entries cleared");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to clear data");
                Err(e)
            }
        }
    }

    /// Newest entries up to the export limit, rendered as CSV.
    pub async fn export_csv(&self) -> LifeLogResult<String> {
        let entries = self.queries.recent(EXPORT_LIMIT).await?;
        exporter::to_csv_string(&entries)
    }

    pub fn status(&self) -> serde_json::Value {
        serde_json::json!({
            "backend": self.backend.name(),
            "enabled": self.state.enabled(),
            "capacity": self.store.capacity(),
            "dedup_window_secs": self.config.log.dedup_window_secs,
            "retention_days": self.config.log.retention_days,
        })
    }
}
