use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status marking a file whose content must no longer be served
pub const STATUS_DELETED: &str = "deleted";

/// Processing state of an uploaded project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub file_id: String,
    pub project_id: String,
    pub file_name: Option<String>,
    /// Free-form state, e.g. "uploaded", "indexed", "failed", "deleted"
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Request type for updating a file's status
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFileStatusRequest {
    pub status: String,
    pub file_name: Option<String>,
}
