//! Table modules - extend Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks for one table.

mod chat_messages;    // chat_messages
mod file_status;      // file_status (+ StatusStore impl)
mod project_metadata; // project_metadata
