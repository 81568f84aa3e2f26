//! End-to-end tests over the sled backend
//!
//! These exercise the engine the way the server and CLI run it:
//! - admission, dedup and capacity against a real database
//! - logging toggle and log surviving a restart
//! - the command surface, including unknown actions

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use lifelog::clock::ManualClock;
use lifelog::commands::{handle, handle_value, Request};
use lifelog::config_loader::LifeLogConfig;
use lifelog::{AdmissionResult, LifeLogCore, RawEvent, SledBackend, StorageBackend};

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap())
}

async fn open_core(dir: &TempDir, clock: &ManualClock) -> LifeLogCore {
    let config = LifeLogConfig::for_data_dir(dir.path());
    let backend: Arc<dyn StorageBackend> =
        Arc::new(SledBackend::open(dir.path().join("db")).expect("open sled"));
    LifeLogCore::with_backend(config, backend, Arc::new(clock.clone()))
        .await
        .expect("engine init")
}

#[tokio::test]
async fn log_and_toggle_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    {
        let core = open_core(&dir, &clock).await;
        assert!(core.logging_enabled());
        core.admit(RawEvent::history("https://a.com/")).await.unwrap();
        clock.advance(Duration::minutes(1));
        core.admit(RawEvent::tab("https://b.com/", "B")).await.unwrap();
        core.set_logging(false).await.unwrap();
    }

    let core = open_core(&dir, &clock).await;
    assert!(!core.logging_enabled());
    let entries = core.recent(10).await.unwrap();
    let urls: Vec<_> = entries.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, vec!["https://b.com/", "https://a.com/"]);
}

#[tokio::test]
async fn open_uses_the_configured_data_dir() {
    let dir = TempDir::new().unwrap();
    let core = LifeLogCore::open(LifeLogConfig::for_data_dir(dir.path()))
        .await
        .unwrap();
    let outcome = core.admit(RawEvent::history("https://real.com/")).await.unwrap();
    assert!(outcome.is_accepted());
    assert!(dir.path().join("db").exists());
}

#[tokio::test]
async fn toggle_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let core = open_core(&dir, &clock()).await;

    assert!(!core.set_logging(false).await.unwrap());
    assert!(!core.set_logging(false).await.unwrap());
    assert!(!core.logging_enabled());
    assert!(core.set_logging(true).await.unwrap());
    assert!(core.logging_enabled());
}

#[tokio::test]
async fn capacity_holds_against_sled() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let mut config = LifeLogConfig::for_data_dir(dir.path());
    config.log.capacity = 5;
    let backend: Arc<dyn StorageBackend> = Arc::new(SledBackend::temporary().unwrap());
    let core = LifeLogCore::with_backend(config, backend, Arc::new(clock.clone()))
        .await
        .unwrap();

    for i in 0..8 {
        core.admit(RawEvent::history(format!("https://s{i}.com/")))
            .await
            .unwrap();
        clock.advance(Duration::seconds(1));
    }

    let all = core.recent(100).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].url, "https://s7.com/");
    assert_eq!(all[4].url, "https://s3.com/");
}

#[tokio::test]
async fn sweep_after_a_month() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let core = open_core(&dir, &clock).await;

    core.admit(RawEvent::history("https://old.com/")).await.unwrap();
    clock.advance(Duration::days(20));
    core.admit(RawEvent::history("https://new.com/")).await.unwrap();
    clock.advance(Duration::days(11));

    let report = core.sweep().await.unwrap();
    assert_eq!(report.removed_count, 1);
    assert_eq!(report.retained_count, 1);
    assert_eq!(core.recent(10).await.unwrap()[0].url, "https://new.com/");
}

#[tokio::test]
async fn command_surface_end_to_end() {
    let dir = TempDir::new().unwrap();
    let core = open_core(&dir, &clock()).await;

    let resp = handle_value(
        &core,
        json!({"action": "recordEvent", "url": "https://a.com/", "source": "tab"}),
    )
    .await;
    assert!(resp.success);
    assert_eq!(resp.data.as_ref().unwrap()["outcome"], "accepted");

    let resp = handle(&core, Request::GetRecentEntries { limit: None }).await;
    assert_eq!(resp.data.unwrap().as_array().map(Vec::len), Some(1));

    let resp = handle(&core, Request::GetLoggingStatus).await;
    assert_eq!(resp.enabled, Some(true));

    let resp = handle(&core, Request::ExportCsv).await;
    let csv = resp.data.unwrap();
    assert!(csv.as_str().unwrap().starts_with("title,url,domain,timestamp,source"));

    let resp = handle(&core, Request::ClearAll).await;
    assert!(resp.success);
    assert!(resp.data.is_none());

    let resp = handle(&core, Request::GetStats).await;
    assert_eq!(resp.data.unwrap()["totalEntries"], 0);

    let resp = handle_value(&core, json!({"action": "rewindTime"})).await;
    assert!(!resp.success);
    assert_eq!(resp.error.as_deref(), Some("Unknown action: rewindTime"));
}

#[tokio::test]
async fn duplicates_via_both_sources_collapse() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let core = open_core(&dir, &clock).await;

    let first = core.admit(RawEvent::history("https://dup.com/")).await.unwrap();
    clock.advance(Duration::seconds(2));
    let second = core.admit(RawEvent::tab("https://dup.com/", "Dup")).await.unwrap();

    assert!(first.is_accepted());
    assert_eq!(second, AdmissionResult::SkippedDuplicate);
}
