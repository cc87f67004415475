//! Postgres repository for the `lc_project_settings` table.

use async_trait::async_trait;

use loclink_core::types::DbId;

use crate::models::settings::{CreateProjectSettings, ProjectSettings};
use crate::repositories::{SettingsRepository, StoreError};
use crate::DbPool;

const COLUMNS: &str = "id, source_id, source_last_updated_at, source_locale, job_ids, name, \
                       description, due_date, template_id, location_id, project_id, \
                       created_at, updated_at";

pub struct PgSettingsRepository {
    pool: DbPool,
}

impl PgSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get_or_create(
        &self,
        input: &CreateProjectSettings,
    ) -> Result<(ProjectSettings, bool), StoreError> {
        let query = format!(
            "INSERT INTO lc_project_settings
                 (source_id, source_last_updated_at, source_locale, job_ids, name,
                  description, due_date, template_id, location_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT ON CONSTRAINT uq_lc_settings_source_version DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ProjectSettings>(&query)
            .bind(input.source_id)
            .bind(input.source_last_updated_at)
            .bind(&input.source_locale)
            .bind(&input.job_ids)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.due_date)
            .bind(&input.template_id)
            .bind(&input.location_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(settings) = inserted {
            return Ok((settings, true));
        }

        let query = format!(
            "SELECT {COLUMNS} FROM lc_project_settings
             WHERE source_id = $1 AND source_last_updated_at = $2"
        );
        let existing = sqlx::query_as::<_, ProjectSettings>(&query)
            .bind(input.source_id)
            .bind(input.source_last_updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok((existing, false))
    }

    async fn list_unlinked(&self) -> Result<Vec<ProjectSettings>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM lc_project_settings WHERE project_id IS NULL ORDER BY id"
        );
        Ok(sqlx::query_as::<_, ProjectSettings>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn link_project(&self, settings_id: DbId, project_id: DbId) -> Result<(), StoreError> {
        // The link is one-shot: never overwrite an existing project_id.
        let result = sqlx::query(
            "UPDATE lc_project_settings SET project_id = $2, updated_at = NOW()
             WHERE id = $1 AND project_id IS NULL",
        )
        .bind(settings_id)
        .bind(project_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "unlinked settings",
                id: settings_id,
            });
        }
        Ok(())
    }

    async fn find_by_project(
        &self,
        project_id: DbId,
    ) -> Result<Option<ProjectSettings>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM lc_project_settings WHERE project_id = $1"
        );
        Ok(sqlx::query_as::<_, ProjectSettings>(&query)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?)
    }
}
