//! Preference persistence using SQLite

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::{ColorCatalog, PreferenceStore, DEFAULT_COLORS};
use crate::recipient::RecipientId;
use crate::{Error, Result};

/// SQLite-based preference store
pub struct SqlitePreferenceStore {
    conn: Mutex<Connection>,
}

impl SqlitePreferenceStore {
    /// Open (or create) the database at `db_path`
    pub fn new(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS colors (
                color TEXT PRIMARY KEY
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_colors (
                fb_id TEXT PRIMARY KEY,
                color TEXT NOT NULL
            )",
            [],
        )?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM colors", [], |row| row.get(0))?;
        if count == 0 {
            for color in DEFAULT_COLORS {
                conn.execute("INSERT INTO colors (color) VALUES (?1)", params![color])?;
            }
        }

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| Error::Store(e.to_string()))
    }
}

impl PreferenceStore for SqlitePreferenceStore {
    fn get(&self, recipient: &RecipientId) -> Result<Option<String>> {
        let conn = self.lock()?;
        let color = conn
            .query_row(
                "SELECT color FROM user_colors WHERE fb_id = ?1",
                params![recipient.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(color)
    }

    fn set(&self, recipient: &RecipientId, color: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user_colors (fb_id, color) VALUES (?1, ?2)
             ON CONFLICT(fb_id) DO UPDATE SET color = excluded.color",
            params![recipient.as_str(), color],
        )?;
        Ok(())
    }
}

impl ColorCatalog for SqlitePreferenceStore {
    fn all_colors(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT color FROM colors ORDER BY rowid")?;
        let colors = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(colors)
    }
}
