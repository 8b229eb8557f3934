//! Append-only interaction log.
//!
//! One JSON object per line: `{"timestamp", "user_id", "command", "response"}`.
//! This log is the only training corpus for the learned fallback. Records are
//! never edited or deleted; a torn trailing line (process killed mid-append)
//! or any other malformed line is skipped on load with a warning.
//!
//! Only `command` and `response` are required when reading. A missing user
//! is `default_user`; the timestamp may be RFC 3339, a plain
//! `YYYY-MM-DD HH:MM:SS[.ffffff]` local time, or absent.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::journal::append_line;

/// One logged (command, response) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(default = "Local::now", deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Local>,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    pub command: String,
    pub response: String,
}

impl InteractionRecord {
    /// Record stamped with the current local time.
    pub fn now(user_id: &str, command: &str, response: &str) -> Self {
        Self {
            timestamp: Local::now(),
            user_id: user_id.to_string(),
            command: command.to_string(),
            response: response.to_string(),
        }
    }
}

pub const DEFAULT_USER_ID: &str = "default_user";

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}

/// Unreadable or null timestamps become the load time.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match &raw {
        Some(serde_json::Value::String(text)) => parse_timestamp(text),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        debug!(timestamp = ?raw, "unreadable interaction timestamp");
        Local::now()
    }))
}

/// Outcome of reading the whole log.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<InteractionRecord>,
    /// Lines that could not be parsed and were skipped.
    pub skipped: usize,
}

/// Handle to the newline-delimited JSON log file.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably append one record.
    pub fn append(&self, record: &InteractionRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        append_line(&self.path, &line)?;
        debug!(user = %record.user_id, "interaction logged");
        Ok(())
    }

    /// Re-parse the entire log. A missing file is an empty log.
    pub fn load_all(&self) -> Result<Vec<InteractionRecord>> {
        Ok(self.load_report()?.records)
    }

    /// Like [`load_all`](Self::load_all) but also reports skipped lines.
    pub fn load_report(&self) -> Result<LoadReport> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadReport::default()),
            Err(e) => return Err(e.into()),
        };

        let mut report = LoadReport::default();
        for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<InteractionRecord>(&line) {
                Ok(record) => report.records.push(record),
                Err(e) => {
                    report.skipped += 1;
                    warn!(
                        path = %self.path.display(),
                        line = idx + 1,
                        "skipping malformed interaction record: {e}"
                    );
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_in(dir: &tempfile::TempDir) -> InteractionLog {
        InteractionLog::new(dir.path().join("logs").join("interactions.json"))
    }

    #[test]
    fn missing_log_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(log_in(&dir).load_all().unwrap().is_empty());
    }

    #[test]
    fn append_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        for i in 0..5 {
            log.append(&InteractionRecord::now("u1", &format!("cmd {i}"), "ok"))
                .unwrap();
        }
        let commands: Vec<_> = log
            .load_all()
            .unwrap()
            .into_iter()
            .map(|r| r.command)
            .collect();
        assert_eq!(commands, vec!["cmd 0", "cmd 1", "cmd 2", "cmd 3", "cmd 4"]);
    }

    #[test]
    fn malformed_and_torn_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        log.append(&InteractionRecord::now("u1", "play jazz", "Playing jazz."))
            .unwrap();

        // Garbage line, a record missing a field, invalid UTF-8, then a torn tail.
        let mut raw = std::fs::read(log.path()).unwrap();
        raw.extend_from_slice(b"not json\n{\"user_id\":\"u1\",\"command\":\"x\"}\n\xff\xfe\n");
        raw.extend_from_slice(b"{\"timestamp\":\"2024-01-01T00:00:00+00:00\",\"user_");
        std::fs::write(log.path(), raw).unwrap();

        let report = log.load_report().unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped, 4);

        // Appending after the torn tail must not lose the new record.
        log.append(&InteractionRecord::now("u1", "search cats", "Searching Google for cats."))
            .unwrap();
        let records = log.load_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].command, "search cats");
    }

    #[test]
    fn load_count_tracks_successful_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        for n in 1..=20 {
            log.append(&InteractionRecord::now("u", "c", "r")).unwrap();
            assert_eq!(log.load_all().unwrap().len(), n);
        }
    }

    #[test]
    fn accepts_records_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        std::fs::write(
            log.path(),
            "{\"timestamp\":\"2024-05-01T10:00:00+02:00\",\"user_id\":\"default_user\",\"command\":\"play jazz\",\"response\":\"Playing jazz.\"}\n",
        )
        .unwrap();
        let records = log.load_all().unwrap();
        assert_eq!(records[0].response, "Playing jazz.");
    }

    #[test]
    fn command_response_pairs_without_metadata_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        std::fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        std::fs::write(
            log.path(),
            concat!(
                "{\"command\":\"play jazz\",\"response\":\"Playing jazz.\"}\n",
                "{\"command\":\"search cats\",\"response\":\"Searching Google for cats.\"}\n",
                "{\"timestamp\":\"2024-05-01 10:00:00.123456\",\"user_id\":\"alice\",\"command\":\"open github\",\"response\":\"Opening github.\"}\n",
                "{\"timestamp\":null,\"command\":\"tell me a joke\",\"response\":\"Why not?\"}\n",
                "{\"timestamp\":\"yesterday\",\"command\":\"news\",\"response\":\"No news.\"}\n",
                "{\"user_id\":\"alice\",\"command\":\"no answer\"}\n",
            ),
        )
        .unwrap();

        let report = log.load_report().unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.records.len(), 5);
        assert_eq!(report.records[0].user_id, DEFAULT_USER_ID);
        assert_eq!(report.records[1].response, "Searching Google for cats.");
        assert_eq!(report.records[2].user_id, "alice");
        assert_eq!(
            report.records[2].timestamp.naive_local(),
            NaiveDateTime::parse_from_str("2024-05-01 10:00:00.123456", "%Y-%m-%d %H:%M:%S%.f").unwrap()
        );
        assert_eq!(report.records[4].command, "news");
    }
}
