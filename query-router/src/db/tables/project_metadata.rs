//! Project location metadata operations

use chrono::Utc;
use rusqlite::{OptionalExtension, Result as SqliteResult};

use super::super::Database;
use crate::models::MetadataCategory;

impl Database {
    /// Stored metadata of one category for a project
    pub fn get_project_metadata(
        &self,
        project_id: &str,
        category: MetadataCategory,
    ) -> SqliteResult<Option<serde_json::Value>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM project_metadata WHERE project_id = ?1 AND category = ?2",
                [project_id, category.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|data| {
            serde_json::from_str(&data).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
    }

    /// Replace the metadata of one category for a project
    pub fn set_project_metadata(
        &self,
        project_id: &str,
        category: MetadataCategory,
        data: &serde_json::Value,
    ) -> SqliteResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO project_metadata (project_id, category, data, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_id, category) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            rusqlite::params![project_id, category.as_str(), data.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
