//! SQLite-backed user profiles.
//!
//! The in-memory `ProfileStore` is rebuilt from this table at startup and
//! every resolved command is appended as it happens, so a repeat command is
//! answered from history on the next run as well.

use std::path::PathBuf;

use chrono::Utc;
use nexa_core::ProfileStore;
use rusqlite::{params, Connection};

pub struct ProfileDb {
    db_path: PathBuf,
}

impl ProfileDb {
    pub fn new(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, String> {
        Connection::open(&self.db_path).map_err(|e| e.to_string())
    }

    fn init_schema(&self) -> Result<(), String> {
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS profile_entries (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT NOT NULL,
              command TEXT NOT NULL,
              response TEXT NOT NULL,
              created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_profile_entries_user
              ON profile_entries(user_id);
            "#,
        )
        .map_err(|e| e.to_string())
    }

    /// All entries in insertion order.
    pub fn load(&self) -> Result<ProfileStore, String> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare("SELECT user_id, command, response FROM profile_entries ORDER BY id ASC")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| e.to_string())?;

        let mut profiles = ProfileStore::new();
        for row in rows {
            let (user_id, command, response) = row.map_err(|e| e.to_string())?;
            profiles.append(&user_id, &command, &response);
        }
        Ok(profiles)
    }

    pub fn append(&self, user_id: &str, command: &str, response: &str) -> Result<(), String> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO profile_entries (user_id, command, response, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, command, response, Utc::now().timestamp_millis()],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize, String> {
        let conn = self.open()?;
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM profile_entries", [], |row| row.get(0))
            .map_err(|e| e.to_string())?;
        Ok(total.max(0) as usize)
    }
}
