// event_record.rs
// Purpose: Shape of a logged browsing event and the helpers that build one from raw input

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Sentinel domain for addresses that do not yield a host.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Provenance of an event. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Backfilled navigation reported by the history feed
    #[default]
    History,
    /// Live tab-completion event
    Tab,
}

impl EventSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSource::History => "history",
            EventSource::Tab => "tab",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "history" => Ok(EventSource::History),
            "tab" => Ok(EventSource::Tab),
            other => Err(format!("unknown event source '{other}'")),
        }
    }
}

/// Activity notification as pushed by the event source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "type", alias = "sourceTag")]
    pub source: EventSource,
}

impl RawEvent {
    pub fn new(url: impl Into<String>, title: Option<String>, source: EventSource) -> Self {
        Self {
            url: Some(url.into()),
            title,
            source,
        }
    }

    pub fn history(url: impl Into<String>) -> Self {
        Self::new(url, None, EventSource::History)
    }

    pub fn tab(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(url, Some(title.into()), EventSource::Tab)
    }
}

/// One logged activity occurrence. Never mutated after admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub domain: String,
    #[serde(default, alias = "type")]
    pub source: EventSource,
}

impl EventRecord {
    /// Build a record for `url` stamped with the admission moment `now`.
    pub fn new(
        url: impl Into<String>,
        title: Option<String>,
        source: EventSource,
        now: DateTime<Utc>,
    ) -> Self {
        let url = url.into();
        Self {
            id: generate_id(now),
            domain: domain_of(&url),
            title: title.filter(|t| !t.is_empty()),
            url,
            timestamp: now,
            source,
        }
    }

    /// Returns `None` when the raw event carries no url.
    pub fn from_raw(raw: RawEvent, now: DateTime<Utc>) -> Option<Self> {
        let url = raw.url?;
        Some(Self::new(url, raw.title, raw.source, now))
    }

    /// Title for display, falling back to the domain.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.domain,
        }
    }
}

/// Extract the hostname of `url`. Total: a url that fails to parse maps to
/// [`UNKNOWN_DOMAIN`], and so does one that parses but has no host
/// (`about:blank`, `data:...`), where a browser's `hostname` would be empty.
pub fn domain_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => UNKNOWN_DOMAIN.to_string(),
        },
        Err(_) => UNKNOWN_DOMAIN.to_string(),
    }
}

/// Time-based prefix (base36 epoch millis) plus a random v4 suffix.
pub fn generate_id(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    format!("{}-{}", to_base36(millis), Uuid::new_v4().simple())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}
