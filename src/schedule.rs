//! Daily trigger for the retention sweep.
//!
//! The sweep itself knows nothing about time-of-day; a [`TickSource`] decides
//! when it runs. [`DailyTicker`] fires at the next local midnight and every
//! 24 hours after that.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::retention::RetentionSweeper;

/// Something that resolves once per scheduling period.
pub trait TickSource: Send {
    /// Wait for the next tick. `None` means the source is exhausted.
    fn tick(&mut self) -> impl Future<Output = Option<()>> + Send;
}

/// Longest stretch of nonexistent local time stepped through.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Start of the calendar day containing `now` in `tz`, as UTC. When a DST
/// jump skips midnight the day starts at the first local time that exists.
pub fn local_midnight<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let naive = now.with_timezone(tz).date_naive().and_time(NaiveTime::MIN);
    first_existing(naive, |local| {
        tz.from_local_datetime(&local)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
    })
    .unwrap_or(now)
}

/// Earliest of `start`, `start + 1min`, ... that `resolve` maps to an instant.
fn first_existing<F>(start: NaiveDateTime, resolve: F) -> Option<DateTime<Utc>>
where
    F: Fn(NaiveDateTime) -> Option<DateTime<Utc>>,
{
    (0..=MAX_GAP_MINUTES).find_map(|step| resolve(start + Duration::minutes(step)))
}

/// First local midnight strictly after `now`.
pub fn next_local_midnight<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let today = local_midnight(now, tz);
    let mut candidate = local_midnight(today + Duration::hours(36), tz);
    if candidate <= now {
        candidate = local_midnight(candidate + Duration::hours(36), tz);
    }
    candidate
}

/// Fires at the next local midnight, then every `period`.
pub struct DailyTicker {
    interval: tokio::time::Interval,
}

impl DailyTicker {
    pub fn new(now: DateTime<Utc>, period: Duration) -> Self {
        let first = next_local_midnight(now, &Local);
        let wait = (first - now).to_std().unwrap_or_default();
        let period = period.to_std().unwrap_or(std::time::Duration::from_secs(24 * 60 * 60));
        let mut interval = tokio::time::interval_at(Instant::now() + wait, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(first_tick = %first, "daily sweep scheduled");
        Self { interval }
    }
}

impl TickSource for DailyTicker {
    async fn tick(&mut self) -> Option<()> {
        self.interval.tick().await;
        Some(())
    }
}

/// Tick source fed by a channel, for externally driven or test triggers.
pub struct ChannelTicker {
    rx: mpsc::Receiver<()>,
}

impl ChannelTicker {
    pub fn new(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

impl TickSource for ChannelTicker {
    async fn tick(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// Run `sweeper` on every tick until the source is exhausted. Failures are
/// logged and the loop waits for the next tick.
pub fn spawn_sweeper<T>(
    sweeper: Arc<RetentionSweeper>,
    mut ticks: T,
    clock: Arc<dyn Clock>,
) -> JoinHandle<usize>
where
    T: TickSource + 'static,
{
    tokio::spawn(async move {
        let mut sweeps = 0usize;
        while ticks.tick().await.is_some() {
            match sweeper.sweep(clock.now()).await {
                Ok(_) => sweeps += 1,
                Err(e) => warn!(error = %e, "scheduled sweep failed, retrying on next tick"),
            }
        }
        sweeps
    })
}
