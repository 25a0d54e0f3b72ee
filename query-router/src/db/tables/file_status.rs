//! File status database operations

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Result as SqliteResult, Row};

use super::super::{Database, StatusStore};
use crate::error::RouterError;
use crate::models::FileStatus;

pub(super) fn parse_timestamp(idx: usize, raw: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_file_status(row: &Row) -> SqliteResult<FileStatus> {
    let updated_at_str: String = row.get(4)?;
    Ok(FileStatus {
        file_id: row.get(0)?,
        project_id: row.get(1)?,
        file_name: row.get(2)?,
        status: row.get(3)?,
        updated_at: parse_timestamp(4, &updated_at_str)?,
    })
}

impl Database {
    /// Get a file's status record
    pub fn get_file_status(&self, project_id: &str, file_id: &str) -> SqliteResult<Option<FileStatus>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT file_id, project_id, file_name, status, updated_at FROM file_status
             WHERE project_id = ?1 AND file_id = ?2",
            [project_id, file_id],
            row_to_file_status,
        )
        .optional()
    }

    /// List all files of a project, most recently updated first
    pub fn list_project_files(&self, project_id: &str) -> SqliteResult<Vec<FileStatus>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT file_id, project_id, file_name, status, updated_at FROM file_status
             WHERE project_id = ?1 ORDER BY updated_at DESC, file_id",
        )?;
        let files = stmt
            .query_map([project_id], row_to_file_status)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(files)
    }

    /// Insert or update a file's status; keeps the stored name when none is given
    pub fn upsert_file_status(
        &self,
        project_id: &str,
        file_id: &str,
        status: &str,
        file_name: Option<&str>,
    ) -> SqliteResult<FileStatus> {
        let now = Utc::now();
        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO file_status (file_id, project_id, file_name, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(project_id, file_id) DO UPDATE SET
                    file_name = COALESCE(excluded.file_name, file_status.file_name),
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                rusqlite::params![file_id, project_id, file_name, status, now.to_rfc3339()],
            )?;
        }

        self.get_file_status(project_id, file_id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Delete a file's status record
    pub fn delete_file_status(&self, project_id: &str, file_id: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM file_status WHERE project_id = ?1 AND file_id = ?2",
            [project_id, file_id],
        )?;
        Ok(rows > 0)
    }
}

impl StatusStore for Database {
    fn find_file(&self, project_id: &str, file_id: &str) -> Result<Option<FileStatus>, RouterError> {
        Ok(self.get_file_status(project_id, file_id)?)
    }

    fn update_file_status(
        &self,
        project_id: &str,
        file_id: &str,
        status: &str,
        file_name: Option<&str>,
    ) -> Result<FileStatus, RouterError> {
        log::debug!("[DB] file {}/{} -> {}", project_id, file_id, status);
        Ok(self.upsert_file_status(project_id, file_id, status, file_name)?)
    }

    fn delete_file(&self, project_id: &str, file_id: &str) -> Result<bool, RouterError> {
        Ok(self.delete_file_status(project_id, file_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_DELETED;

    #[test]
    fn test_upsert_find_delete() {
        let db = Database::in_memory().unwrap();

        let created = db
            .update_file_status("proj42", "f1", "uploaded", Some("brochure.pdf"))
            .unwrap();
        assert_eq!(created.file_name.as_deref(), Some("brochure.pdf"));

        let updated = db.update_file_status("proj42", "f1", "indexed", None).unwrap();
        assert_eq!(updated.status, "indexed");
        assert_eq!(updated.file_name.as_deref(), Some("brochure.pdf"));

        assert!(db.find_file("other", "f1").unwrap().is_none());
        assert_eq!(db.find_file("proj42", "f1").unwrap(), Some(updated));

        assert!(db.delete_file("proj42", "f1").unwrap());
        assert!(!db.delete_file("proj42", "f1").unwrap());
        assert!(db.find_file("proj42", "f1").unwrap().is_none());
    }

    #[test]
    fn test_list_project_files() {
        let db = Database::in_memory().unwrap();
        db.upsert_file_status("proj42", "a", "indexed", None).unwrap();
        db.upsert_file_status("proj42", "b", STATUS_DELETED, None).unwrap();
        db.upsert_file_status("proj7", "c", "indexed", None).unwrap();

        let files = db.list_project_files("proj42").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.project_id == "proj42"));
    }
}
