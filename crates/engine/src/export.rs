//! Export orchestration: turn pending settings into local state, then
//! push unpushed projects and source files to the remote service.
//!
//! Idempotency is carried entirely by the persisted remote ids: an entity
//! with a stored id is never created again, and a create attempt bumps
//! the entity's attempt counter whether or not it succeeded.

use loclink_core::content::{serialize_entries, TranslationJob};
use loclink_core::status::{EntityStatus, RemoteStatus, REMOTE_STATUS_CREATED, REMOTE_STATUS_IN_PROGRESS};
use loclink_db::{Project, ProjectSettings, TranslationFile};
use loclink_languagecloud::client::CreateProjectRequest;

use crate::sync::{SyncEngine, SyncError};

impl SyncEngine {
    /// Run the export phase. Per-project failures are logged and skipped;
    /// the phase itself never fails.
    pub async fn export(&self) {
        tracing::info!("Exporting translations to LanguageCloud...");

        self.materialize_settings().await;

        let projects = match self.projects.list_for_export().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list projects for export");
                return;
            }
        };

        for project in projects {
            let project_id = project.id;
            if let Err(e) = self.export_project(project).await {
                tracing::error!(project_id, error = %e, "Failed to export project");
            }
        }
    }

    /// Materialize every not-yet-linked settings row into a project and
    /// its per-job files. Settings created while a previous run was in
    /// flight are picked up here on the next pass.
    async fn materialize_settings(&self) {
        let unlinked = match self.settings.list_unlinked().await {
            Ok(unlinked) => unlinked,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list pending project settings");
                return;
            }
        };

        for settings in unlinked {
            let settings_id = settings.id;
            if let Err(e) = self.materialize_one(&settings).await {
                tracing::error!(settings_id, error = %e, "Failed to materialize project settings");
            }
        }
    }

    async fn materialize_one(&self, settings: &ProjectSettings) -> Result<(), SyncError> {
        let project = self
            .projects
            .get_or_create(settings.source_id, settings.source_last_updated_at)
            .await?;

        for job_id in &settings.job_ids {
            let job = self.content.job(*job_id).await?;
            if !job.enabled {
                continue;
            }
            self.files.get_or_create(project.id, *job_id).await?;
        }

        self.settings.link_project(settings.id, project.id).await?;
        tracing::info!(
            settings_id = settings.id,
            project_id = project.id,
            "Materialized project settings"
        );
        Ok(())
    }

    /// Is this project still worth exporting?
    fn should_export(&self, project: &Project, files: &[TranslationFile]) -> bool {
        if EntityStatus::parse(&project.internal_status) == EntityStatus::Imported {
            tracing::info!(
                project_id = project.id,
                "Already imported translations. Skipping.."
            );
            return false;
        }

        if project.is_created(files) {
            tracing::info!(
                project_id = project.id,
                remote_id = %project.remote_project_id,
                "Already created project and all source files. Skipping.."
            );
            return false;
        }

        if project.is_failed(files) {
            tracing::info!(
                project_id = project.id,
                "Too many failed attempts. Skipping.."
            );
            return false;
        }

        matches!(
            RemoteStatus::parse(&project.remote_status),
            RemoteStatus::New | RemoteStatus::Created | RemoteStatus::Unknown
        )
    }

    async fn export_project(&self, mut project: Project) -> Result<(), SyncError> {
        let files = self.files.list_for_project(project.id).await?;
        let jobs = self.load_jobs(&files).await;

        if !self.should_export(&project, &files) {
            return Ok(());
        }

        let Some(settings) = self.settings.find_by_project(project.id).await? else {
            // A project without settings cannot be named or templated;
            // it stays pending until its settings row is linked.
            tracing::debug!(project_id = project.id, "No settings linked yet. Skipping..");
            return Ok(());
        };

        if !project.created_remotely() {
            if !self.create_remote_project(&mut project, &settings, &files, &jobs).await {
                return Ok(());
            }
        } else {
            tracing::info!(
                project_id = project.id,
                remote_id = %project.remote_project_id,
                "Already created project. Skipping.."
            );
        }

        // Walk by index so each file's outcome lands back in the snapshot;
        // the last sibling's combined status then sees the whole picture.
        let mut files = files;
        for index in 0..files.len() {
            let Some(job) = jobs.get(&files[index].job_id).cloned() else {
                continue;
            };
            if !job.enabled || files[index].created_remotely() {
                continue;
            }
            let mut file = files[index].clone();
            self.create_remote_source_file(&project, &settings, &files, &mut file, &job)
                .await;
            files[index] = file;
        }

        self.maybe_start_project(&mut project, &jobs).await?;
        Ok(())
    }

    /// Create the remote project. Returns `false` when creation failed and
    /// the rest of this project should be skipped for the run.
    async fn create_remote_project(
        &self,
        project: &mut Project,
        settings: &ProjectSettings,
        files: &[TranslationFile],
        jobs: &std::collections::HashMap<i64, TranslationJob>,
    ) -> bool {
        let target_locales: Vec<String> = files
            .iter()
            .filter_map(|f| jobs.get(&f.job_id))
            .filter(|j| j.enabled)
            .map(|j| j.target_locale.clone())
            .collect();

        let request = CreateProjectRequest {
            name: settings.name.clone(),
            due_by: settings.due_date,
            description: settings.description.clone(),
            template_id: settings.template_id.clone(),
            location_id: settings.location_id.clone(),
            source_locale: settings.source_locale.clone(),
            target_locales,
        };

        // The attempt counter moves on success and failure alike; it
        // counts tries, and three fruitless tries retire the project.
        let result = self.client.create_project(&request).await;
        project.create_attempts += 1;

        match result {
            Ok(remote_id) => {
                project.remote_project_id = remote_id;
                project.remote_status = REMOTE_STATUS_CREATED.to_string();
                if let Err(e) = self.projects.update(project).await {
                    tracing::error!(project_id = project.id, error = %e, "Failed to persist created project");
                    return false;
                }
                self.refresh_file_labels(project, jobs).await;
                tracing::info!(
                    project_id = project.id,
                    remote_id = %project.remote_project_id,
                    "Created project"
                );
                true
            }
            Err(e) => {
                if let Err(save_err) = self.projects.update(project).await {
                    tracing::error!(project_id = project.id, error = %save_err, "Failed to persist create attempt");
                }
                self.refresh_file_labels(project, jobs).await;
                tracing::error!(
                    project_id = project.id,
                    attempts = project.create_attempts,
                    error = %e,
                    "Failed to create project"
                );
                false
            }
        }
    }

    /// Upload one source file. Failures are logged and isolated so the
    /// project's other files still get their turn.
    async fn create_remote_source_file(
        &self,
        project: &Project,
        settings: &ProjectSettings,
        siblings: &[TranslationFile],
        file: &mut TranslationFile,
        job: &TranslationJob,
    ) {
        let entries = match self.content.export_entries(job.source_id).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(job = %job.uuid, error = %e, "Failed to export content entries");
                return;
            }
        };
        let payload = serialize_entries(&entries);
        let filename = format!("{}_{}.json", settings.name, job.target_locale);

        let result = self
            .client
            .create_source_file(
                &project.remote_project_id,
                &payload,
                &filename,
                &job.source_locale,
                &job.target_locale,
            )
            .await;
        file.create_attempts += 1;

        match result {
            Ok(remote_id) => {
                file.remote_file_id = remote_id;
                if let Err(e) = self.persist_file(project, siblings, file, job).await {
                    tracing::error!(file_id = file.id, error = %e, "Failed to persist created source file");
                    return;
                }
                tracing::info!(
                    file_id = file.id,
                    remote_id = %file.remote_file_id,
                    "Created source file"
                );
            }
            Err(e) => {
                if let Err(save_err) = self.persist_file(project, siblings, file, job).await {
                    tracing::error!(file_id = file.id, error = %save_err, "Failed to persist create attempt");
                }
                tracing::error!(
                    file_id = file.id,
                    attempts = file.create_attempts,
                    error = %e,
                    "Failed to create source file"
                );
            }
        }
    }

    /// Once the project and every enabled file exist remotely, move the
    /// project into translation. A failure here is logged; nothing
    /// created above is rolled back.
    async fn maybe_start_project(
        &self,
        project: &mut Project,
        jobs: &std::collections::HashMap<i64, TranslationJob>,
    ) -> Result<(), SyncError> {
        if !project.created_remotely()
            || RemoteStatus::parse(&project.remote_status) == RemoteStatus::InProgress
        {
            return Ok(());
        }

        let files = self.files.list_for_project(project.id).await?;
        let all_ready = !files.is_empty()
            && files.iter().all(|f| {
                f.created_remotely()
                    && jobs.get(&f.job_id).map(|j| j.enabled).unwrap_or(false)
            });
        if !all_ready {
            return Ok(());
        }

        match self.client.start_project(&project.remote_project_id).await {
            Ok(()) => {
                project.remote_status = REMOTE_STATUS_IN_PROGRESS.to_string();
                self.projects.update(project).await?;
                self.refresh_file_labels(project, jobs).await;
                tracing::info!(
                    project_id = project.id,
                    remote_id = %project.remote_project_id,
                    "Started project"
                );
            }
            Err(e) => {
                tracing::error!(
                    project_id = project.id,
                    remote_id = %project.remote_project_id,
                    error = %e,
                    "Failed to start project"
                );
            }
        }
        Ok(())
    }
}
