//! Repository interfaces and their Postgres implementations.
//!
//! The sync engine is written against these traits so its orchestration
//! logic can be exercised with in-memory fakes; production wiring uses
//! the `Pg*` implementations backed by a shared [`DbPool`](crate::DbPool).

use async_trait::async_trait;

use loclink_core::types::{DbId, Timestamp};

use crate::models::file::TranslationFile;
use crate::models::project::Project;
use crate::models::settings::{CreateProjectSettings, ProjectSettings};

mod file_repo;
mod project_repo;
mod settings_repo;

pub use file_repo::PgFileRepository;
pub use project_repo::PgProjectRepository;
pub use settings_repo::PgSettingsRepository;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: DbId },
}

/// Access to project rows keyed by (content source, version marker).
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Fetch or atomically create the project for a source version.
    async fn get_or_create(
        &self,
        source_id: DbId,
        source_last_updated_at: Timestamp,
    ) -> Result<Project, StoreError>;

    /// Persist the mutable fields of a project row.
    async fn update(&self, project: &Project) -> Result<(), StoreError>;

    /// Projects that may still need remote resources created:
    /// not imported, and not reported in progress / completed / archived.
    /// Ordered by id for reproducible runs.
    async fn list_for_export(&self) -> Result<Vec<Project>, StoreError>;

    /// Projects with a remote id whose translations may be ready:
    /// not imported and not archived. Ordered by id.
    async fn list_for_import(&self) -> Result<Vec<Project>, StoreError>;

    /// Whether the source has a project currently open on the remote
    /// service (status `created` or `inProgress`).
    async fn has_open_project(&self, source_id: DbId) -> Result<bool, StoreError>;
}

/// Access to source-file rows keyed by (translation job, project).
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Fetch or atomically create the file row for a job within a project.
    async fn get_or_create(
        &self,
        project_id: DbId,
        job_id: DbId,
    ) -> Result<TranslationFile, StoreError>;

    /// Persist the mutable fields of a file row.
    async fn update(&self, file: &TranslationFile) -> Result<(), StoreError>;

    /// All files under a project, ordered by id.
    async fn list_for_project(&self, project_id: DbId) -> Result<Vec<TranslationFile>, StoreError>;
}

/// Access to project-settings rows.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch or atomically create settings for a source version.
    /// Returns the row and whether it was newly created.
    async fn get_or_create(
        &self,
        input: &CreateProjectSettings,
    ) -> Result<(ProjectSettings, bool), StoreError>;

    /// Settings not yet materialized into a project, ordered by id.
    async fn list_unlinked(&self) -> Result<Vec<ProjectSettings>, StoreError>;

    /// Record the one-time settings → project link.
    async fn link_project(&self, settings_id: DbId, project_id: DbId) -> Result<(), StoreError>;

    /// The settings row that materialized a given project, if any.
    async fn find_by_project(&self, project_id: DbId)
        -> Result<Option<ProjectSettings>, StoreError>;
}
