// exporter.rs
// Purpose: CSV export of logged entries

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use csv::WriterBuilder;
use tracing::info;

use crate::errors::{LifeLogError, LifeLogResult};
use crate::event_record::EventRecord;

/// Upper bound on exported rows, the log capacity.
pub const EXPORT_LIMIT: i64 = 1000;

const HEADERS: [&str; 5] = ["title", "url", "domain", "timestamp", "source"];

/// Write `entries` as CSV with a header row.
pub fn write_csv<W: Write>(entries: &[EventRecord], writer: W) -> LifeLogResult<()> {
    let mut csv = WriterBuilder::new().from_writer(writer);
    csv.write_record(HEADERS).map_err(csv_error)?;
    for entry in entries {
        let timestamp = entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        csv.write_record([
            entry.title.as_deref().unwrap_or(""),
            entry.url.as_str(),
            entry.domain.as_str(),
            timestamp.as_str(),
            entry.source.as_str(),
        ])
        .map_err(csv_error)?;
    }
    csv.flush()
        .map_err(|e| LifeLogError::io("flush csv export", e))?;
    Ok(())
}

pub fn to_csv_string(entries: &[EventRecord]) -> LifeLogResult<String> {
    let mut buf = Vec::new();
    write_csv(entries, &mut buf)?;
    String::from_utf8(buf).map_err(|e| LifeLogError::malformed("export", e.to_string()))
}

/// `life-log-YYYY-MM-DD.csv`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("life-log-{}.csv", now.format("%Y-%m-%d"))
}

/// Export into `dir` (or the given file path) and return where it landed.
pub fn export_to_path(entries: &[EventRecord], target: &Path, now: DateTime<Utc>) -> LifeLogResult<PathBuf> {
    let path = if target.is_dir() {
        target.join(export_file_name(now))
    } else {
        target.to_path_buf()
    };
    let file = File::create(&path)
        .map_err(|e| LifeLogError::io(format!("create {}", path.display()), e))?;
    write_csv(entries, file)?;
    info!(path = %path.display(), rows = entries.len(), "exported entries");
    Ok(path)
}

fn csv_error(e: csv::Error) -> LifeLogError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => LifeLogError::io("write csv export", io),
        other => LifeLogError::malformed("export", format!("{other:?}")),
    }
}
