//! Postgres repository for the `lc_files` table.

use async_trait::async_trait;

use loclink_core::types::DbId;

use crate::models::file::TranslationFile;
use crate::repositories::{FileRepository, StoreError};
use crate::DbPool;

const COLUMNS: &str = "id, project_id, job_id, remote_file_id, internal_status, \
                       create_attempts, combined_status, created_at, updated_at";

pub struct PgFileRepository {
    pool: DbPool,
}

impl PgFileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn get_or_create(
        &self,
        project_id: DbId,
        job_id: DbId,
    ) -> Result<TranslationFile, StoreError> {
        let query = format!(
            "INSERT INTO lc_files (project_id, job_id)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_lc_files_job_project DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, TranslationFile>(&query)
            .bind(project_id)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(file) = inserted {
            return Ok(file);
        }

        let query = format!(
            "SELECT {COLUMNS} FROM lc_files WHERE project_id = $1 AND job_id = $2"
        );
        Ok(sqlx::query_as::<_, TranslationFile>(&query)
            .bind(project_id)
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, file: &TranslationFile) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE lc_files SET
                remote_file_id = $2,
                internal_status = $3,
                create_attempts = $4,
                combined_status = $5,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(file.id)
        .bind(&file.remote_file_id)
        .bind(&file.internal_status)
        .bind(file.create_attempts)
        .bind(&file.combined_status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "file",
                id: file.id,
            });
        }
        Ok(())
    }

    async fn list_for_project(&self, project_id: DbId) -> Result<Vec<TranslationFile>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM lc_files WHERE project_id = $1 ORDER BY id"
        );
        Ok(sqlx::query_as::<_, TranslationFile>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
