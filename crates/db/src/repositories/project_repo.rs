//! Postgres repository for the `lc_projects` table.

use async_trait::async_trait;

use loclink_core::types::{DbId, Timestamp};

use crate::models::project::Project;
use crate::repositories::{ProjectRepository, StoreError};
use crate::DbPool;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, source_id, source_last_updated_at, remote_project_id, remote_status, \
                       internal_status, create_attempts, created_at, updated_at";

pub struct PgProjectRepository {
    pool: DbPool,
}

impl PgProjectRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn get_or_create(
        &self,
        source_id: DbId,
        source_last_updated_at: Timestamp,
    ) -> Result<Project, StoreError> {
        // ON CONFLICT DO NOTHING returns no row when the project already
        // exists, so fall through to a plain select in that case.
        let query = format!(
            "INSERT INTO lc_projects (source_id, source_last_updated_at)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_lc_projects_source_version DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Project>(&query)
            .bind(source_id)
            .bind(source_last_updated_at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(project) = inserted {
            return Ok(project);
        }

        let query = format!(
            "SELECT {COLUMNS} FROM lc_projects
             WHERE source_id = $1 AND source_last_updated_at = $2"
        );
        Ok(sqlx::query_as::<_, Project>(&query)
            .bind(source_id)
            .bind(source_last_updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, project: &Project) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE lc_projects SET
                remote_project_id = $2,
                remote_status = $3,
                internal_status = $4,
                create_attempts = $5,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(project.id)
        .bind(&project.remote_project_id)
        .bind(&project.remote_status)
        .bind(&project.internal_status)
        .bind(project.create_attempts)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "project",
                id: project.id,
            });
        }
        Ok(())
    }

    async fn list_for_export(&self) -> Result<Vec<Project>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM lc_projects
             WHERE internal_status <> 'imported'
               AND remote_status NOT IN ('inProgress', 'completed', 'archived')
             ORDER BY id"
        );
        Ok(sqlx::query_as::<_, Project>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_for_import(&self) -> Result<Vec<Project>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM lc_projects
             WHERE internal_status <> 'imported'
               AND remote_status <> 'archived'
               AND remote_project_id <> ''
             ORDER BY id"
        );
        Ok(sqlx::query_as::<_, Project>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn has_open_project(&self, source_id: DbId) -> Result<bool, StoreError> {
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM lc_projects
                 WHERE source_id = $1 AND remote_status IN ('created', 'inProgress')
             )",
        )
        .bind(source_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(open)
    }
}
