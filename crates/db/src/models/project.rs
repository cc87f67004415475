//! Project entity: one remote translation project per content-source version.

use serde::Serialize;
use sqlx::FromRow;

use loclink_core::status::{EntityStatus, MAX_CREATE_ATTEMPTS};
use loclink_core::types::{DbId, Timestamp};

use crate::models::file::TranslationFile;

/// A row from the `lc_projects` table.
///
/// The (source_id, source_last_updated_at) composite is the natural key:
/// republishing a source yields a new version marker and therefore a new
/// project. `remote_project_id` stays empty until the project exists on
/// the remote service; that emptiness is what makes repeated export runs
/// idempotent.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub source_id: DbId,
    pub source_last_updated_at: Timestamp,
    pub remote_project_id: String,
    /// Raw status string last reported by the remote service (or recorded
    /// locally after a start/complete call). Empty until created.
    pub remote_status: String,
    pub internal_status: String,
    pub create_attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// The remote project exists (an id has been stored).
    pub fn created_remotely(&self) -> bool {
        !self.remote_project_id.is_empty()
    }

    /// Project and every source file exist remotely.
    ///
    /// Requires at least one file: a project with no files has nothing to
    /// translate and is not considered created.
    pub fn is_created(&self, files: &[TranslationFile]) -> bool {
        self.created_remotely()
            && !files.is_empty()
            && files.iter().all(|f| f.created_remotely())
    }

    /// The project (or any of its files) has burned all create attempts.
    pub fn is_failed(&self, files: &[TranslationFile]) -> bool {
        (!self.created_remotely() && self.create_attempts >= MAX_CREATE_ATTEMPTS)
            || files.iter().any(|f| f.is_failed())
    }

    /// Every file has finished importing.
    pub fn all_files_imported(&self, files: &[TranslationFile]) -> bool {
        !files.is_empty()
            && files
                .iter()
                .all(|f| EntityStatus::parse(&f.internal_status) == EntityStatus::Imported)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn project(remote_id: &str, attempts: i32) -> Project {
        Project {
            id: 1,
            source_id: 10,
            source_last_updated_at: Utc::now(),
            remote_project_id: remote_id.to_string(),
            remote_status: String::new(),
            internal_status: "new".to_string(),
            create_attempts: attempts,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn file(remote_id: &str, attempts: i32, status: &str) -> TranslationFile {
        TranslationFile {
            id: 1,
            project_id: 1,
            job_id: 1,
            remote_file_id: remote_id.to_string(),
            internal_status: status.to_string(),
            create_attempts: attempts,
            combined_status: "Request created".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn is_created_requires_project_and_all_files() {
        let p = project("proj1", 1);
        assert!(p.is_created(&[file("file1", 1, "new"), file("file2", 1, "new")]));
        assert!(!p.is_created(&[file("file1", 1, "new"), file("", 1, "new")]));
        assert!(!p.is_created(&[]));
        assert!(!project("", 1).is_created(&[file("file1", 1, "new")]));
    }

    #[test]
    fn is_failed_after_three_project_attempts() {
        assert!(project("", 3).is_failed(&[]));
        assert!(!project("", 2).is_failed(&[]));
        // A stored remote id clears the failure even at three attempts.
        assert!(!project("proj1", 3).is_failed(&[]));
    }

    #[test]
    fn is_failed_when_any_file_failed() {
        let p = project("proj1", 1);
        assert!(p.is_failed(&[file("file1", 1, "new"), file("", 3, "new")]));
        assert!(!p.is_failed(&[file("file1", 1, "new"), file("", 2, "new")]));
    }

    #[test]
    fn all_files_imported_requires_nonempty_set() {
        let p = project("proj1", 1);
        assert!(!p.all_files_imported(&[]));
        assert!(!p.all_files_imported(&[file("file1", 1, "imported"), file("file2", 1, "new")]));
        assert!(p.all_files_imported(&[file("file1", 1, "imported"), file("file2", 1, "imported")]));
    }
}
