//! Chat history operations

use chrono::Utc;
use rusqlite::Result as SqliteResult;

use super::super::Database;
use super::file_status::parse_timestamp;
use crate::models::{ChatMessage, ChatRole};

impl Database {
    /// Append one message to a chat
    pub fn add_chat_message(&self, chat_id: &str, role: ChatRole, text: &str) -> SqliteResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO chat_messages (chat_id, role, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![chat_id, role.as_str(), text, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The most recent `limit` messages of a chat, oldest first
    pub fn get_recent_chat_messages(&self, chat_id: &str, limit: usize) -> SqliteResult<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT role, text, created_at FROM (
                SELECT id, role, text, created_at FROM chat_messages
                WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;

        let messages = stmt
            .query_map(rusqlite::params![chat_id, limit as i64], |row| {
                let role_str: String = row.get(0)?;
                let created_at_str: String = row.get(2)?;
                Ok(ChatMessage {
                    role: ChatRole::from_str(&role_str).unwrap_or(ChatRole::User),
                    text: row.get(1)?,
                    created_at: Some(parse_timestamp(2, &created_at_str)?),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(messages)
    }
}
