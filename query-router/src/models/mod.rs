pub mod chat_message;
pub mod file_status;
pub mod metadata;

pub use chat_message::{ChatMessage, ChatRole};
pub use file_status::{FileStatus, UpdateFileStatusRequest, STATUS_DELETED};
pub use metadata::MetadataCategory;
