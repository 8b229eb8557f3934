//! Per-user history of (command, response) pairs used for exact-repeat
//! personalisation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::interactions::InteractionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub command: String,
    pub response: String,
}

/// In-memory profile store. Append-only; lookups are first-match.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    users: HashMap<String, Vec<ProfileEntry>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild profiles by replaying interaction records in order.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a InteractionRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.append(&record.user_id, &record.command, &record.response);
        }
        store
    }

    /// Response of the first stored entry whose command equals `command`
    /// exactly (case-sensitive).
    pub fn record_lookup(&self, user_id: &str, command: &str) -> Option<&str> {
        self.users
            .get(user_id)?
            .iter()
            .find(|entry| entry.command == command)
            .map(|entry| entry.response.as_str())
    }

    /// Add an entry unconditionally; repeats accumulate.
    pub fn append(&mut self, user_id: &str, command: &str, response: &str) {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .push(ProfileEntry {
                command: command.to_string(),
                response: response.to_string(),
            });
    }

    /// Entries for one user in interaction order.
    pub fn entries(&self, user_id: &str) -> &[ProfileEntry] {
        self.users.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn entry_count(&self) -> usize {
        self.users.values().map(Vec::len).sum()
    }
}
