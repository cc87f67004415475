//! The sync engine: wiring, the run loop, and shared persistence helpers.

use std::collections::HashMap;
use std::sync::Arc;

use loclink_core::content::{ContentError, ContentProvider, TranslationJob};
use loclink_core::status::{combined_status, EntityStatus, RemoteStatus, StatusInputs};
use loclink_core::types::DbId;
use loclink_db::repositories::{
    FileRepository, ProjectRepository, SettingsRepository, StoreError,
};
use loclink_db::{Project, TranslationFile};
use loclink_events::EventBus;
use loclink_languagecloud::client::{LanguageCloud, LanguageCloudError};

use crate::config::EngineConfig;
use crate::importer::ContentImporter;

/// Errors surfaced by the engine.
///
/// Only [`Authentication`](SyncError::Authentication) ever escapes
/// [`SyncEngine::run`]; everything else is caught at per-project or
/// per-file granularity, logged, and isolated so one bad record cannot
/// abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Authenticating against the remote service failed. Fatal for the
    /// whole run; nothing was imported or exported.
    #[error("authentication failed: {0}")]
    Authentication(#[source] LanguageCloudError),

    #[error(transparent)]
    Api(#[from] LanguageCloudError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// One batch pass over the shared sync state.
///
/// Single-threaded by design: the engine walks projects in primary-key
/// order, talks to the remote service with one authenticated session, and
/// commits every entity mutation immediately. External scheduling is
/// expected to prevent overlapping runs.
pub struct SyncEngine {
    pub(crate) config: EngineConfig,
    pub(crate) client: Arc<dyn LanguageCloud>,
    pub(crate) projects: Arc<dyn ProjectRepository>,
    pub(crate) files: Arc<dyn FileRepository>,
    pub(crate) settings: Arc<dyn SettingsRepository>,
    pub(crate) content: Arc<dyn ContentProvider>,
    pub(crate) importer: ContentImporter,
    pub(crate) bus: Arc<EventBus>,
}

impl SyncEngine {
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn LanguageCloud>,
        projects: Arc<dyn ProjectRepository>,
        files: Arc<dyn FileRepository>,
        settings: Arc<dyn SettingsRepository>,
        content: Arc<dyn ContentProvider>,
        bus: Arc<EventBus>,
    ) -> Self {
        let importer = ContentImporter::new(content.clone());
        Self {
            config,
            client,
            projects,
            files,
            settings,
            content,
            importer,
            bus,
        }
    }

    /// Run one sync pass: authenticate, import finished work, export new
    /// work.
    ///
    /// Import runs first so translations completed since the last run are
    /// merged before any new project for the same content goes out.
    pub async fn run(&self) -> Result<(), SyncError> {
        tracing::info!("Syncing with LanguageCloud...");

        // The OAuth token lives long enough for one batch pass. Nothing
        // can proceed without it, so this is the one fatal failure.
        self.client
            .authenticate()
            .await
            .map_err(SyncError::Authentication)?;

        self.import().await;
        self.export().await;

        tracing::info!("...Done");
        Ok(())
    }

    // -- shared helpers ----------------------------------------------------

    /// Load the translation job for every file, keyed by job id. A job
    /// that cannot be resolved is logged and left out; callers treat its
    /// file conservatively.
    pub(crate) async fn load_jobs(
        &self,
        files: &[TranslationFile],
    ) -> HashMap<DbId, TranslationJob> {
        let mut jobs = HashMap::new();
        for file in files {
            if jobs.contains_key(&file.job_id) {
                continue;
            }
            match self.content.job(file.job_id).await {
                Ok(job) => {
                    jobs.insert(file.job_id, job);
                }
                Err(e) => {
                    tracing::error!(job_id = file.job_id, error = %e, "Failed to load translation job");
                }
            }
        }
        jobs
    }

    /// Persist a file row, recomputing its combined-status label first.
    ///
    /// `siblings` is the project's file set as last loaded; the row being
    /// saved replaces its stale copy so the project-wide `is_created`
    /// aggregate sees the new state.
    pub(crate) async fn persist_file(
        &self,
        project: &Project,
        siblings: &[TranslationFile],
        file: &mut TranslationFile,
        job: &TranslationJob,
    ) -> Result<(), SyncError> {
        let target_published =
            if EntityStatus::parse(&file.internal_status) == EntityStatus::Imported {
                match self.content.target_is_published(job).await {
                    Ok(published) => published,
                    Err(e) => {
                        tracing::warn!(job = %job.uuid, error = %e, "Could not check published state");
                        false
                    }
                }
            } else {
                false
            };

        let current: Vec<TranslationFile> = siblings
            .iter()
            .map(|f| if f.id == file.id { file.clone() } else { f.clone() })
            .collect();

        let inputs = StatusInputs {
            project_created_remotely: project.created_remotely(),
            project_create_attempts: project.create_attempts,
            project_is_created: project.is_created(&current),
            project_remote_status: RemoteStatus::parse(&project.remote_status),
            file_created_remotely: file.created_remotely(),
            file_create_attempts: file.create_attempts,
            file_status: EntityStatus::parse(&file.internal_status),
            job_enabled: job.enabled,
            target_published,
        };
        file.combined_status = combined_status(&inputs).label().to_string();

        self.files.update(file).await?;
        Ok(())
    }

    /// Recompute and save every file's combined-status label after a
    /// project-level change (created remotely, attempts bumped, status
    /// moved). Label refresh failures are logged, never fatal.
    pub(crate) async fn refresh_file_labels(
        &self,
        project: &Project,
        jobs: &HashMap<DbId, TranslationJob>,
    ) {
        let files = match self.files.list_for_project(project.id).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(project_id = project.id, error = %e, "Failed to load files for label refresh");
                return;
            }
        };

        for file in &files {
            let Some(job) = jobs.get(&file.job_id) else {
                continue;
            };
            let mut file = file.clone();
            if let Err(e) = self.persist_file(project, &files, &mut file, job).await {
                tracing::error!(file_id = file.id, error = %e, "Failed to refresh combined status");
            }
        }
    }
}
