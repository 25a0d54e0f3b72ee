//! SQLite application store - schema definitions and connection management
//!
//! Table operations live in the tables/ subdirectory.

use parking_lot::Mutex;
use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;

/// Application database wrapper; one connection behind a Mutex
pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    /// Open the database file and initialize the schema
    pub fn new(database_url: &str) -> SqliteResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    #[cfg(test)]
    pub fn in_memory() -> SqliteResult<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> SqliteResult<()> {
        let conn = self.conn.lock();

        // Processing state of uploaded project files
        conn.execute(
            "CREATE TABLE IF NOT EXISTS file_status (
                file_id TEXT NOT NULL,
                project_id TEXT NOT NULL,
                file_name TEXT,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (project_id, file_id)
            )",
            [],
        )?;

        // Location metadata per project and sub-category (JSON payload)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS project_metadata (
                project_id TEXT NOT NULL,
                category TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (project_id, category)
            )",
            [],
        )?;

        // Chat history used to make follow-up questions self-sufficient
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_chat ON chat_messages(chat_id, id)",
            [],
        )?;

        Ok(())
    }
}
