//! Source-file entity: one uploaded file per (translation job, project).

use serde::Serialize;
use sqlx::FromRow;

use loclink_core::status::MAX_CREATE_ATTEMPTS;
use loclink_core::types::{DbId, Timestamp};

/// A row from the `lc_files` table.
///
/// Each file tracks its own creation and import lifecycle independently
/// of its siblings. `combined_status` is a display label recomputed from
/// project/file/job flags on every save; it is never read back as state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TranslationFile {
    pub id: DbId,
    pub project_id: DbId,
    /// Host-side translation job this file belongs to.
    pub job_id: DbId,
    pub remote_file_id: String,
    pub internal_status: String,
    pub create_attempts: i32,
    pub combined_status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TranslationFile {
    /// The remote source file exists (an id has been stored).
    pub fn created_remotely(&self) -> bool {
        !self.remote_file_id.is_empty()
    }

    /// All create attempts burned without ever getting a remote id.
    pub fn is_failed(&self) -> bool {
        !self.created_remotely() && self.create_attempts >= MAX_CREATE_ATTEMPTS
    }
}
