// src/tests/query.rs
use chrono::{Duration, Utc};

use crate::event_record::RawEvent;
use crate::query::{summarize, DomainCount, Stats};
use crate::tests::test_utils::{harness, record_at, start_time};

fn domain(name: &str, count: usize) -> DomainCount {
    DomainCount {
        domain: name.to_string(),
        count,
    }
}

#[tokio::test]
async fn stats_on_empty_log() {
    let h = harness().await;
    assert_eq!(h.core.stats_in(&Utc).await.unwrap(), Stats::empty());
}

#[tokio::test]
async fn stats_count_today_and_rank_domains() {
    let h = harness().await;
    for url in ["https://a.com/1", "https://a.com/2", "https://b.com/"] {
        h.core.admit(RawEvent::history(url)).await.unwrap();
        h.clock.advance(Duration::seconds(1));
    }

    let stats = h.core.stats_in(&Utc).await.unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.today_entries, 3);
    assert_eq!(stats.unique_domains, 2);
    assert_eq!(stats.top_domains, vec![domain("a.com", 2), domain("b.com", 1)]);
}

#[test]
fn today_excludes_records_before_midnight() {
    let now = start_time();
    let midnight = now - Duration::hours(12);
    let entries = vec![
        record_at("https://a.com/", now),
        record_at("https://a.com/", midnight),
        record_at("https://b.com/", midnight - Duration::seconds(1)),
    ];

    let stats = summarize(&entries, midnight, 5);
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.today_entries, 2);
}

#[test]
fn ties_keep_first_seen_order_and_top_n_truncates() {
    let now = start_time();
    let entries: Vec<_> = ["c.com", "a.com", "b.com", "a.com", "d.com", "e.com", "f.com", "c.com"]
        .iter()
        .map(|d| record_at(&format!("https://{d}/"), now))
        .collect();

    let stats = summarize(&entries, now, 5);
    assert_eq!(stats.unique_domains, 6);
    assert_eq!(
        stats.top_domains,
        vec![
            domain("c.com", 2),
            domain("a.com", 2),
            domain("b.com", 1),
            domain("d.com", 1),
            domain("e.com", 1),
        ]
    );
}

#[tokio::test]
async fn recent_is_a_newest_first_prefix() {
    let h = harness().await;
    for i in 0..5 {
        h.core
            .admit(RawEvent::history(format!("https://site{i}.com/")))
            .await
            .unwrap();
        h.clock.advance(Duration::seconds(10));
    }

    let recent = h.core.recent(3).await.unwrap();
    let all = h.core.recent(100).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(all.len(), 5);
    assert_eq!(recent[..], all[..3]);
    assert_eq!(recent[0].url, "https://site4.com/");
    assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn non_positive_limits_return_nothing() {
    let h = harness().await;
    h.core.admit(RawEvent::history("https://a.com/")).await.unwrap();
    assert!(h.core.recent(0).await.unwrap().is_empty());
    assert!(h.core.recent(-3).await.unwrap().is_empty());
}

#[tokio::test]
async fn queries_surface_storage_failures() {
    let h = harness().await;
    h.backend.fail_reads(true);
    assert!(h.core.recent(10).await.unwrap_err().is_storage_failure());
    assert!(h.core.stats_in(&Utc).await.unwrap_err().is_storage_failure());
}
