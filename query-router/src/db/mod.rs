mod sqlite;
mod tables;

pub use sqlite::Database;

use crate::error::RouterError;
use crate::models::FileStatus;

/// Status of a tenant's files, as seen by handlers.
///
/// Handlers depend on this port, not on the storage behind it.
pub trait StatusStore: Send + Sync {
    fn find_file(&self, project_id: &str, file_id: &str) -> Result<Option<FileStatus>, RouterError>;

    /// Insert or update; returns the stored record
    fn update_file_status(
        &self,
        project_id: &str,
        file_id: &str,
        status: &str,
        file_name: Option<&str>,
    ) -> Result<FileStatus, RouterError>;

    /// Returns whether a record was removed
    fn delete_file(&self, project_id: &str, file_id: &str) -> Result<bool, RouterError>;
}
