// src/tests/admission.rs
use chrono::Duration;
use std::sync::Arc;

use crate::admission::AdmissionResult;
use crate::event_record::{EventSource, RawEvent, UNKNOWN_DOMAIN};
use crate::storage_backend::{StorageBackend, LOG_KEY};
use crate::tests::test_utils::{harness, start_time};

#[tokio::test]
async fn first_visit_is_accepted_with_derived_fields() {
    let h = harness().await;
    let outcome = h
        .core
        .admit(RawEvent::tab("https://www.example.com/a?b=1", "Example"))
        .await
        .unwrap();

    let record = match outcome {
        AdmissionResult::Accepted(record) => record,
        other => panic!("expected acceptance, got {other:?}"),
    };
    assert_eq!(record.domain, "www.example.com");
    assert_eq!(record.source, EventSource::Tab);
    assert_eq!(record.timestamp, start_time());
    assert!(!record.id.is_empty());
    assert_eq!(h.core.store().len().await.unwrap(), 1);
}

#[tokio::test]
async fn revisits_inside_the_window_are_skipped() {
    let h = harness().await;
    let url = "https://news.example.org/";

    let first = h.core.admit(RawEvent::history(url)).await.unwrap();
    assert!(first.is_accepted());

    h.clock.advance(Duration::minutes(4));
    let second = h.core.admit(RawEvent::tab(url, "News")).await.unwrap();
    assert_eq!(second, AdmissionResult::SkippedDuplicate);

    // six minutes after the only stored record
    h.clock.advance(Duration::minutes(2));
    let third = h.core.admit(RawEvent::history(url)).await.unwrap();
    assert!(third.is_accepted());

    let all = h.core.store().load_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].timestamp, start_time() + Duration::minutes(6));
    assert_eq!(all[1].timestamp, start_time());
}

#[tokio::test]
async fn different_urls_inside_the_window_are_both_kept() {
    let h = harness().await;
    h.core.admit(RawEvent::history("https://a.com/x")).await.unwrap();
    let other = h.core.admit(RawEvent::history("https://a.com/y")).await.unwrap();
    assert!(other.is_accepted());
    assert_eq!(h.core.store().len().await.unwrap(), 2);
}

#[tokio::test]
async fn disabled_logging_leaves_the_log_untouched() {
    let h = harness().await;
    h.core.admit(RawEvent::history("https://a.com/")).await.unwrap();
    let before = h.backend.get(LOG_KEY).unwrap();

    h.core.set_logging(false).await.unwrap();
    h.clock.advance(Duration::hours(1));
    let outcome = h.core.admit(RawEvent::history("https://b.com/")).await.unwrap();

    assert_eq!(outcome, AdmissionResult::Disabled);
    assert_eq!(h.backend.get(LOG_KEY).unwrap(), before);
}

#[tokio::test]
async fn missing_url_is_rejected_and_empty_url_gets_unknown_domain() {
    let h = harness().await;
    let missing = RawEvent {
        url: None,
        title: Some("nothing".into()),
        source: EventSource::Tab,
    };
    assert_eq!(h.core.admit(missing).await.unwrap(), AdmissionResult::Rejected);

    let outcome = h.core.admit(RawEvent::history("")).await.unwrap();
    match outcome {
        AdmissionResult::Accepted(record) => assert_eq!(record.domain, UNKNOWN_DOMAIN),
        other => panic!("expected acceptance, got {other:?}"),
    }
}

#[tokio::test]
async fn storage_failure_surfaces_and_keeps_the_log() {
    let h = harness().await;
    h.core.admit(RawEvent::history("https://a.com/")).await.unwrap();

    h.backend.fail_writes(true);
    let err = h
        .core
        .admit(RawEvent::history("https://b.com/"))
        .await
        .unwrap_err();
    assert!(err.is_storage_failure());

    h.backend.fail_writes(false);
    assert_eq!(h.core.store().len().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admissions_lose_nothing() {
    let h = harness().await;
    let core = Arc::new(h.core);

    let mut tasks = Vec::new();
    for i in 0..40 {
        let core = Arc::clone(&core);
        tasks.push(tokio::spawn(async move {
            core.admit(RawEvent::history(format!("https://site{i}.com/")))
                .await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap().is_accepted());
    }

    assert_eq!(core.store().len().await.unwrap(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_collapse_to_one() {
    let h = harness().await;
    let core = Arc::new(h.core);

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let core = Arc::clone(&core);
        tasks.push(tokio::spawn(async move {
            core.admit(RawEvent::history("https://same.com/")).await
        }));
    }
    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_accepted() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(core.store().len().await.unwrap(), 1);
}
