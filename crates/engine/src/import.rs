//! Import orchestration: poll remote project status, download completed
//! target files, merge them into the host store, finalize projects.

use loclink_core::content::{ContentError, TranslationJob};
use loclink_core::status::{EntityStatus, RemoteStatus, STATUS_ERROR, STATUS_IMPORTED, REMOTE_STATUS_COMPLETED};
use loclink_core::types::DbId;
use loclink_db::{Project, TranslationFile};
use loclink_events::SyncEvent;

use crate::sync::{SyncEngine, SyncError};

impl SyncEngine {
    /// Run the import phase. Per-project failures are logged and skipped;
    /// the phase itself never fails.
    pub async fn import(&self) {
        tracing::info!("Importing translations from LanguageCloud...");

        let projects = match self.projects.list_for_import().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list projects for import");
                return;
            }
        };

        for project in projects {
            let project_id = project.id;
            if let Err(e) = self.import_project(project).await {
                tracing::error!(project_id, error = %e, "Failed to import project");
            }
        }
    }

    async fn import_project(&self, mut project: Project) -> Result<(), SyncError> {
        let status = match self.client.get_project(&project.remote_project_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(
                    project_id = project.id,
                    remote_id = %project.remote_project_id,
                    error = %e,
                    "Failed to fetch project status"
                );
                return Ok(());
            }
        };

        // Whether the service had already finished before this run; the
        // completion call below is only skipped for projects we had seen
        // completed on a previous pass.
        let previously_completed =
            RemoteStatus::parse(&project.remote_status) == RemoteStatus::Completed;

        if status != project.remote_status {
            project.remote_status = status.clone();
            self.projects.update(&project).await?;
        }

        if !matches!(
            RemoteStatus::parse(&status),
            RemoteStatus::InProgress | RemoteStatus::Completed
        ) {
            tracing::info!(
                project_id = project.id,
                status = %status,
                "Project not ready. Skipping.."
            );
            return Ok(());
        }

        let files = self.files.list_for_project(project.id).await?;
        let jobs = self.load_jobs(&files).await;

        for file in &files {
            // Imported files are done; error files wait for a human
            // content fix and are not retried automatically.
            if matches!(
                EntityStatus::parse(&file.internal_status),
                EntityStatus::Imported | EntityStatus::Error
            ) || !file.created_remotely()
            {
                continue;
            }
            let Some(job) = jobs.get(&file.job_id) else {
                continue;
            };

            let mut file = file.clone();
            self.import_file(&project, &files, &mut file, job).await;
        }

        self.finalize_project(&mut project, &jobs, previously_completed)
            .await?;
        Ok(())
    }

    /// Download and merge one file. All failure classes are logged here;
    /// only persistence errors bubble up.
    async fn import_file(
        &self,
        project: &Project,
        siblings: &[TranslationFile],
        file: &mut TranslationFile,
        job: &TranslationJob,
    ) {
        tracing::info!(
            job = %job.uuid,
            source_locale = %job.source_locale,
            target_locale = %job.target_locale,
            "Processing translation"
        );

        let payload = match self
            .client
            .download_target_file(&project.remote_project_id, &file.remote_file_id)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                // Transient or ambiguous (zero / many matches): leave the
                // file as-is and let the next run retry.
                tracing::error!(
                    file_id = file.id,
                    remote_id = %file.remote_file_id,
                    error = %e,
                    "Failed to download target file"
                );
                return;
            }
        };

        tracing::info!(file_id = file.id, "Importing translations from target file");
        match self.importer.import(job, &payload).await {
            Ok(_warnings) => {
                file.internal_status = STATUS_IMPORTED.to_string();
                if let Err(e) = self.persist_file(project, siblings, file, job).await {
                    tracing::error!(file_id = file.id, error = %e, "Failed to persist imported file");
                    return;
                }
                self.publish_imported(project, job).await;
                tracing::info!(job = %job.uuid, "Successfully imported translations");
            }
            Err(e @ (ContentError::MissingRelatedObject(_) | ContentError::Validation(_))) => {
                // Content-level problem a human has to fix; no automatic
                // retry, the file surfaces as an import error.
                tracing::warn!(job = %job.uuid, error = %e, "Unable to import translations");
                file.internal_status = STATUS_ERROR.to_string();
                if let Err(save_err) = self.persist_file(project, siblings, file, job).await {
                    tracing::error!(file_id = file.id, error = %save_err, "Failed to persist import error");
                }
            }
            Err(e) => {
                // Invalid payload or provider failure: skip this run.
                tracing::error!(job = %job.uuid, error = %e, "Failed to import target file");
            }
        }
    }

    /// Fire the `translation.imported` event for external subscribers.
    async fn publish_imported(
        &self,
        project: &Project,
        job: &TranslationJob,
    ) {
        let source_object = match self.content.object_name(job.source_id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(source_id = job.source_id, error = %e, "Could not resolve source object name");
                format!("source {}", job.source_id)
            }
        };
        let translated_object = match self.content.target_name(job).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(job = %job.uuid, error = %e, "Could not resolve target object name");
                source_object.clone()
            }
        };
        self.bus.publish(SyncEvent::translation_imported(
            project.id,
            &source_object,
            &translated_object,
            &job.target_locale,
        ));
    }

    /// Once every enabled file has imported, mark the project imported
    /// and close it out remotely (unless a previous pass already saw it
    /// completed).
    async fn finalize_project(
        &self,
        project: &mut Project,
        jobs: &std::collections::HashMap<DbId, TranslationJob>,
        previously_completed: bool,
    ) -> Result<(), SyncError> {
        let files = self.files.list_for_project(project.id).await?;
        let enabled: Vec<&TranslationFile> = files
            .iter()
            .filter(|f| jobs.get(&f.job_id).map(|j| j.enabled).unwrap_or(true))
            .collect();

        let all_imported = !enabled.is_empty()
            && enabled
                .iter()
                .all(|f| EntityStatus::parse(&f.internal_status) == EntityStatus::Imported);
        if !all_imported {
            return Ok(());
        }

        project.internal_status = STATUS_IMPORTED.to_string();

        if !previously_completed {
            match self.client.complete_project(&project.remote_project_id).await {
                Ok(()) => {
                    project.remote_status = REMOTE_STATUS_COMPLETED.to_string();
                }
                Err(e) => {
                    // The project still counts as imported; an imported
                    // project drops out of the poll loop, so completion is
                    // not retried.
                    tracing::error!(
                        project_id = project.id,
                        remote_id = %project.remote_project_id,
                        error = %e,
                        "Failed to complete project"
                    );
                }
            }
        }

        self.projects.update(project).await?;
        self.refresh_file_labels(project, jobs).await;
        tracing::info!(project_id = project.id, "Project fully imported");
        Ok(())
    }
}
