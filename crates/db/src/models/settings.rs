//! Project settings: user/automation intent captured ahead of export.

use serde::Serialize;
use sqlx::FromRow;

use loclink_core::types::{DbId, Timestamp};

/// A row from the `lc_project_settings` table.
///
/// Created when someone (or the stale-content refresh) requests a
/// translation; immutable once `project_id` is set. From then on the
/// settings row exists only as the record of what was requested.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectSettings {
    pub id: DbId,
    pub source_id: DbId,
    pub source_last_updated_at: Timestamp,
    pub source_locale: String,
    /// Translation jobs covered by this request.
    pub job_ids: Vec<DbId>,
    pub name: String,
    pub description: String,
    pub due_date: Timestamp,
    pub template_id: String,
    pub location_id: String,
    /// Set exactly once, when the settings are materialized into a project.
    pub project_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a settings row.
#[derive(Debug, Clone)]
pub struct CreateProjectSettings {
    pub source_id: DbId,
    pub source_last_updated_at: Timestamp,
    pub source_locale: String,
    pub job_ids: Vec<DbId>,
    pub name: String,
    pub description: String,
    pub due_date: Timestamp,
    pub template_id: String,
    pub location_id: String,
}
