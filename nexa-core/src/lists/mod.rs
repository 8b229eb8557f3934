//! Reminders, notes, to-do items and calendar entries.
//!
//! Every list is an append-only operation log (`<kind>.log`, one JSON object
//! per line). Reading replays the log; removals are recorded as tombstone
//! operations instead of rewriting the file. `compact` folds a log down to
//! one `add` per live entry through a temp file + rename.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::journal::append_line;

/// Logs with at least this many operations are eligible for auto-compaction.
const COMPACT_MIN_OPS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Reminders,
    Notes,
    Todo,
    Calendar,
}

impl ListKind {
    pub const ALL: [ListKind; 4] = [Self::Reminders, Self::Notes, Self::Todo, Self::Calendar];

    /// Words that identify this list inside a command.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Reminders => &["reminders", "reminder"],
            Self::Notes => &["notes", "note"],
            Self::Todo => &["to-do list", "todo list", "to do list", "to-do", "todo"],
            Self::Calendar => &["calendar", "events", "event"],
        }
    }

    /// Phrases that add an entry, longest first.
    pub fn add_phrases(self) -> &'static [&'static str] {
        match self {
            Self::Reminders => &[
                "remind me to",
                "remind me",
                "set a reminder to",
                "set a reminder",
                "add a reminder",
                "add reminder",
            ],
            Self::Notes => &[
                "add a note",
                "add note",
                "take a note",
                "take note",
                "make a note",
                "write down",
            ],
            Self::Todo => &[],
            Self::Calendar => &["add an event", "add event", "schedule an event", "schedule event"],
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            Self::Reminders => "reminders.log",
            Self::Notes => "notes.log",
            Self::Todo => "todo.log",
            Self::Calendar => "calendar.log",
        }
    }

    /// Singular, capitalised label used in spoken responses.
    pub fn entry_label(self) -> &'static str {
        match self {
            Self::Reminders => "Reminder",
            Self::Notes => "Note",
            Self::Todo => "To-do item",
            Self::Calendar => "Event",
        }
    }

    /// Plural label used in "You have no ..." responses.
    pub fn plural_label(self) -> &'static str {
        match self {
            Self::Reminders => "reminders",
            Self::Notes => "notes",
            Self::Todo => "to-do items",
            Self::Calendar => "calendar events",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reminders => "reminders",
            Self::Notes => "notes",
            Self::Todo => "todo",
            Self::Calendar => "calendar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListAction {
    Add,
    Remove,
    Show,
}

impl fmt::Display for ListAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Show => "show",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpKind {
    Add,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ListOp {
    op: OpKind,
    item: String,
    at: DateTime<Utc>,
}

/// Replay state for one list.
#[derive(Debug, Default)]
struct Replay {
    entries: Vec<String>,
    ops: usize,
}

/// Directory of per-kind operation logs.
#[derive(Debug)]
pub struct ListStore {
    dir: PathBuf,
    op_counts: HashMap<ListKind, usize>,
}

impl ListStore {
    /// Open (creating if needed) the list directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let mut op_counts = HashMap::new();
        for kind in ListKind::ALL {
            let replay = replay(&dir.join(kind.file_name()))?;
            op_counts.insert(kind, replay.ops);
        }
        debug!(dir = %dir.display(), "list store opened");
        Ok(Self { dir, op_counts })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, kind: ListKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Record an added entry.
    pub fn add(&mut self, kind: ListKind, item: &str) -> Result<()> {
        self.append(kind, OpKind::Add, item)
    }

    /// Remove every entry equal to `item`. Returns how many were live.
    pub fn remove(&mut self, kind: ListKind, item: &str) -> Result<usize> {
        let live = self
            .entries(kind)?
            .iter()
            .filter(|e| e.as_str() == item)
            .count();
        if live > 0 {
            self.append(kind, OpKind::Remove, item)?;
        }
        Ok(live)
    }

    /// Live entries in insertion order.
    pub fn entries(&self, kind: ListKind) -> Result<Vec<String>> {
        Ok(replay(&self.path(kind))?.entries)
    }

    /// Rewrite the log for `kind` as one `add` per live entry.
    pub fn compact(&mut self, kind: ListKind) -> Result<()> {
        let path = self.path(kind);
        let replay = replay(&path)?;
        if replay.ops == replay.entries.len() {
            return Ok(());
        }

        let tmp = path.with_extension("log.tmp");
        {
            let mut file = File::create(&tmp)?;
            let now = Utc::now();
            for item in &replay.entries {
                let op = ListOp {
                    op: OpKind::Add,
                    item: item.clone(),
                    at: now,
                };
                writeln!(file, "{}", serde_json::to_string(&op)?)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        info!(
            list = %kind,
            ops_before = replay.ops,
            ops_after = replay.entries.len(),
            "list compacted"
        );
        self.op_counts.insert(kind, replay.entries.len());
        Ok(())
    }

    /// Compact every list.
    pub fn compact_all(&mut self) -> Result<()> {
        for kind in ListKind::ALL {
            self.compact(kind)?;
        }
        Ok(())
    }

    fn append(&mut self, kind: ListKind, op: OpKind, item: &str) -> Result<()> {
        let record = ListOp {
            op,
            item: item.to_string(),
            at: Utc::now(),
        };
        append_line(&self.path(kind), &serde_json::to_string(&record)?)?;

        let ops = {
            let count = self.op_counts.entry(kind).or_insert(0);
            *count += 1;
            *count
        };
        if ops >= COMPACT_MIN_OPS {
            let live = self.entries(kind)?.len();
            if ops > live * 2 {
                self.compact(kind)?;
            }
        }
        Ok(())
    }
}

fn replay(path: &Path) -> Result<Replay> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Replay::default()),
        Err(e) => return Err(e.into()),
    };

    let mut replay = Replay::default();
    for (line_no, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let op: ListOp = match serde_json::from_slice(&line) {
            Ok(op) => op,
            Err(e) => {
                warn!(path = %path.display(), line = line_no + 1, "skipping malformed list entry: {e}");
                continue;
            }
        };
        replay.ops += 1;
        match op.op {
            OpKind::Add => replay.entries.push(op.item),
            OpKind::Remove => replay.entries.retain(|e| *e != op.item),
        }
    }
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_count(path: &Path) -> usize {
        fs::read_to_string(path)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[test]
    fn add_remove_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();

        store.add(ListKind::Notes, "buy milk").unwrap();
        store.add(ListKind::Notes, "call mom").unwrap();
        store.add(ListKind::Notes, "buy milk").unwrap();
        assert_eq!(store.remove(ListKind::Notes, "buy milk").unwrap(), 2);

        assert_eq!(store.entries(ListKind::Notes).unwrap(), vec!["call mom"]);
        assert!(store.entries(ListKind::Todo).unwrap().is_empty());

        // Removal is recorded, not rewritten.
        assert_eq!(line_count(&dir.path().join("notes.log")), 4);
    }

    #[test]
    fn removing_missing_entry_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();
        assert_eq!(store.remove(ListKind::Reminders, "nothing").unwrap(), 0);
        assert!(!dir.path().join("reminders.log").exists());
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = ListStore::open(dir.path()).unwrap();
            store.add(ListKind::Calendar, "dentist on friday").unwrap();
        }
        let store = ListStore::open(dir.path()).unwrap();
        assert_eq!(
            store.entries(ListKind::Calendar).unwrap(),
            vec!["dentist on friday"]
        );
    }

    #[test]
    fn compact_keeps_only_live_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();
        store.add(ListKind::Todo, "a").unwrap();
        store.add(ListKind::Todo, "b").unwrap();
        store.remove(ListKind::Todo, "a").unwrap();

        store.compact(ListKind::Todo).unwrap();
        assert_eq!(line_count(&dir.path().join("todo.log")), 1);
        assert_eq!(store.entries(ListKind::Todo).unwrap(), vec!["b"]);
    }

    #[test]
    fn auto_compaction_bounds_log_growth() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ListStore::open(dir.path()).unwrap();
        for i in 0..40 {
            let item = format!("item {i}");
            store.add(ListKind::Reminders, &item).unwrap();
            store.remove(ListKind::Reminders, &item).unwrap();
        }
        assert!(line_count(&dir.path().join("reminders.log")) < COMPACT_MIN_OPS);
        assert!(store.entries(ListKind::Reminders).unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.log");
        fs::write(
            &path,
            "{\"op\":\"add\",\"item\":\"ok\",\"at\":\"2024-01-01T00:00:00Z\"}\n{\"op\":\"add\",\"it",
        )
        .unwrap();
        let store = ListStore::open(dir.path()).unwrap();
        assert_eq!(store.entries(ListKind::Notes).unwrap(), vec!["ok"]);
    }

    #[test]
    fn torn_multibyte_tail_does_not_block_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.log");
        let mut raw = b"{\"op\":\"add\",\"item\":\"milk\",\"at\":\"2024-01-01T00:00:00Z\"}\n".to_vec();
        raw.extend_from_slice(b"{\"op\":\"add\",\"item\":\"caf\xc3");
        fs::write(&path, raw).unwrap();

        let mut store = ListStore::open(dir.path()).unwrap();
        assert_eq!(store.entries(ListKind::Todo).unwrap(), vec!["milk"]);

        store.add(ListKind::Todo, "café").unwrap();
        assert_eq!(store.entries(ListKind::Todo).unwrap(), vec!["milk", "café"]);
    }
}
