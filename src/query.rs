//! Read-only queries over a snapshot of the log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::LifeLogResult;
use crate::event_record::EventRecord;
use crate::log_store::BoundedLogStore;
use crate::schedule::local_midnight;

pub const DEFAULT_TOP_DOMAINS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_entries: usize,
    pub today_entries: usize,
    pub top_domains: Vec<DomainCount>,
    /// Distinct domains across the whole log.
    pub unique_domains: usize,
}

impl Stats {
    pub fn empty() -> Self {
        Stats {
            total_entries: 0,
            today_entries: 0,
            top_domains: Vec::new(),
            unique_domains: 0,
        }
    }
}

pub struct QueryService {
    store: Arc<BoundedLogStore>,
    top_domains: usize,
}

impl QueryService {
    pub fn new(store: Arc<BoundedLogStore>, top_domains: usize) -> Self {
        Self { store, top_domains }
    }

    /// Newest-first prefix of at most `limit` records. Non-positive limits
    /// yield nothing.
    pub async fn recent(&self, limit: i64) -> LifeLogResult<Vec<EventRecord>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let mut entries = self.store.load_all().await.map_err(|e| {
            error!(error = %e, "failed to get recent entries");
            e
        })?;
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    /// Aggregate statistics with "today" measured in the local time zone.
    pub async fn stats(&self, now: DateTime<Utc>) -> LifeLogResult<Stats> {
        self.stats_in(now, &Local).await
    }

    pub async fn stats_in<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> LifeLogResult<Stats> {
        let midnight = local_midnight(now, tz);
        let entries = self.store.load_all().await.map_err(|e| {
            error!(error = %e, "failed to get stats");
            e
        })?;
        Ok(summarize(&entries, midnight, self.top_domains))
    }
}

/// Pure aggregation over `entries`. Ties in the domain ranking keep the order
/// in which domains were first met (newest first).
pub fn summarize(entries: &[EventRecord], day_start: DateTime<Utc>, top_n: usize) -> Stats {
    let today_entries = entries.iter().filter(|e| e.timestamp >= day_start).count();

    let mut ranked: Vec<DomainCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        match index.get(entry.domain.as_str()) {
            Some(&i) => ranked[i].count += 1,
            None => {
                index.insert(entry.domain.as_str(), ranked.len());
                ranked.push(DomainCount {
                    domain: entry.domain.clone(),
                    count: 1,
                });
            }
        }
    }
    let unique_domains = ranked.len();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);

    Stats {
        total_entries: entries.len(),
        today_entries,
        top_domains: ranked,
        unique_domains,
    }
}
