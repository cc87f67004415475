//! Shared harness for engine integration tests: an in-memory state
//! store, a scripted remote client, and a scripted content provider.
//!
//! The engine is constructed exactly as production wires it, with every
//! collaborator swapped for a deterministic fake.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use loclink_core::content::{
    ContentEntry, ContentError, ContentProvider, ImportWarning, StaleSource, TranslationJob,
};
use loclink_core::types::{DbId, Timestamp};
use loclink_db::repositories::{
    FileRepository, ProjectRepository, SettingsRepository, StoreError,
};
use loclink_db::{CreateProjectSettings, Project, ProjectSettings, TranslationFile};
use loclink_engine::{EngineConfig, SyncEngine};
use loclink_events::EventBus;
use loclink_languagecloud::client::{
    CreateProjectRequest, LanguageCloud, LanguageCloudError, ProjectTemplate,
};

// ---------------------------------------------------------------------------
// Scripted remote client
// ---------------------------------------------------------------------------

/// A transient-looking API failure for scripting error paths.
pub fn transient() -> LanguageCloudError {
    LanguageCloudError::Api {
        status: 500,
        body: "oh no".to_string(),
    }
}

type Scripted<T> = Mutex<VecDeque<Result<T, LanguageCloudError>>>;

/// Remote client whose responses are queued up front.
///
/// Each call pops the next scripted result for that method; `start` and
/// `complete` default to success when unscripted, everything else fails
/// loudly so an unexpected remote call cannot go unnoticed.
#[derive(Default)]
pub struct MockLanguageCloud {
    pub auth_failure: Mutex<Option<LanguageCloudError>>,
    pub create_project_results: Scripted<String>,
    pub create_source_file_results: Scripted<String>,
    pub get_project_results: Scripted<String>,
    pub download_results: Scripted<String>,
    pub start_results: Scripted<()>,
    pub complete_results: Scripted<()>,

    pub auth_calls: AtomicUsize,
    pub create_project_calls: AtomicUsize,
    pub create_source_file_calls: AtomicUsize,
    pub get_project_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,

    /// Project names seen by `create_project`, for request assertions.
    pub created_names: Mutex<Vec<String>>,
}

impl MockLanguageCloud {
    pub fn push_create_project(&self, result: Result<&str, LanguageCloudError>) {
        self.create_project_results
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn push_create_source_file(&self, result: Result<&str, LanguageCloudError>) {
        self.create_source_file_results
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn push_get_project(&self, result: Result<&str, LanguageCloudError>) {
        self.get_project_results
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string));
    }

    pub fn push_download(&self, result: Result<String, LanguageCloudError>) {
        self.download_results.lock().unwrap().push_back(result);
    }

    fn pop<T>(queue: &Scripted<T>, unscripted: Result<T, LanguageCloudError>) -> Result<T, LanguageCloudError> {
        queue.lock().unwrap().pop_front().unwrap_or(unscripted)
    }
}

#[async_trait]
impl LanguageCloud for MockLanguageCloud {
    async fn authenticate(&self) -> Result<(), LanguageCloudError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        match self.auth_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> Result<String, LanguageCloudError> {
        self.create_project_calls.fetch_add(1, Ordering::SeqCst);
        self.created_names.lock().unwrap().push(request.name.clone());
        Self::pop(
            &self.create_project_results,
            Err(LanguageCloudError::Api {
                status: 599,
                body: "unscripted create_project call".to_string(),
            }),
        )
    }

    async fn create_source_file(
        &self,
        _project_id: &str,
        _content: &str,
        _filename: &str,
        _source_locale: &str,
        _target_locale: &str,
    ) -> Result<String, LanguageCloudError> {
        self.create_source_file_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(
            &self.create_source_file_results,
            Err(LanguageCloudError::Api {
                status: 599,
                body: "unscripted create_source_file call".to_string(),
            }),
        )
    }

    async fn start_project(&self, _project_id: &str) -> Result<(), LanguageCloudError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.start_results, Ok(()))
    }

    async fn complete_project(&self, _project_id: &str) -> Result<(), LanguageCloudError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.complete_results, Ok(()))
    }

    async fn get_project(&self, _project_id: &str) -> Result<String, LanguageCloudError> {
        self.get_project_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.get_project_results, Err(transient()))
    }

    async fn download_target_file(
        &self,
        _project_id: &str,
        _source_file_id: &str,
    ) -> Result<String, LanguageCloudError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.download_results, Err(transient()))
    }

    async fn get_project_templates(&self) -> Result<Vec<ProjectTemplate>, LanguageCloudError> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// In-memory state store
// ---------------------------------------------------------------------------

/// All three repositories over plain vectors, mimicking the Postgres
/// implementations' ordering and composite-key semantics.
#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    pub projects: Mutex<Vec<Project>>,
    pub files: Mutex<Vec<TranslationFile>>,
    pub settings: Mutex<Vec<ProjectSettings>>,
}

impl MemoryStore {
    fn next_id(&self) -> DbId {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn insert_project(&self, source_id: DbId, version: Timestamp) -> Project {
        let project = Project {
            id: self.next_id(),
            source_id,
            source_last_updated_at: version,
            remote_project_id: String::new(),
            remote_status: String::new(),
            internal_status: "new".to_string(),
            create_attempts: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.projects.lock().unwrap().push(project.clone());
        project
    }

    pub fn insert_file(&self, project_id: DbId, job_id: DbId) -> TranslationFile {
        let file = TranslationFile {
            id: self.next_id(),
            project_id,
            job_id,
            remote_file_id: String::new(),
            internal_status: "new".to_string(),
            create_attempts: 0,
            combined_status: "Request created".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.files.lock().unwrap().push(file.clone());
        file
    }

    pub fn project(&self, id: DbId) -> Project {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("project should exist")
    }

    pub fn file(&self, id: DbId) -> TranslationFile {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .expect("file should exist")
    }

    pub fn project_by_source(&self, source_id: DbId) -> Project {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.source_id == source_id)
            .cloned()
            .expect("project should exist for source")
    }

    pub fn files_for_project(&self, project_id: DbId) -> Vec<TranslationFile> {
        let mut files: Vec<TranslationFile> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect();
        files.sort_by_key(|f| f.id);
        files
    }

    pub fn settings_count(&self) -> usize {
        self.settings.lock().unwrap().len()
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn get_or_create(
        &self,
        source_id: DbId,
        source_last_updated_at: Timestamp,
    ) -> Result<Project, StoreError> {
        if let Some(existing) = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.source_id == source_id && p.source_last_updated_at == source_last_updated_at)
        {
            return Ok(existing.clone());
        }
        Ok(self.insert_project(source_id, source_last_updated_at))
    }

    async fn update(&self, project: &Project) -> Result<(), StoreError> {
        let mut projects = self.projects.lock().unwrap();
        let slot = projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or(StoreError::NotFound {
                entity: "project",
                id: project.id,
            })?;
        *slot = project.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn list_for_export(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.internal_status != "imported"
                    && !["inProgress", "completed", "archived"].contains(&p.remote_status.as_str())
            })
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }

    async fn list_for_import(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.internal_status != "imported"
                    && p.remote_status != "archived"
                    && !p.remote_project_id.is_empty()
            })
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.id);
        Ok(projects)
    }

    async fn has_open_project(&self, source_id: DbId) -> Result<bool, StoreError> {
        Ok(self.projects.lock().unwrap().iter().any(|p| {
            p.source_id == source_id
                && ["created", "inProgress"].contains(&p.remote_status.as_str())
        }))
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn get_or_create(
        &self,
        project_id: DbId,
        job_id: DbId,
    ) -> Result<TranslationFile, StoreError> {
        if let Some(existing) = self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.project_id == project_id && f.job_id == job_id)
        {
            return Ok(existing.clone());
        }
        Ok(self.insert_file(project_id, job_id))
    }

    async fn update(&self, file: &TranslationFile) -> Result<(), StoreError> {
        let mut files = self.files.lock().unwrap();
        let slot = files
            .iter_mut()
            .find(|f| f.id == file.id)
            .ok_or(StoreError::NotFound {
                entity: "file",
                id: file.id,
            })?;
        *slot = file.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn list_for_project(&self, project_id: DbId) -> Result<Vec<TranslationFile>, StoreError> {
        Ok(self.files_for_project(project_id))
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn get_or_create(
        &self,
        input: &CreateProjectSettings,
    ) -> Result<(ProjectSettings, bool), StoreError> {
        if let Some(existing) = self.settings.lock().unwrap().iter().find(|s| {
            s.source_id == input.source_id
                && s.source_last_updated_at == input.source_last_updated_at
        }) {
            return Ok((existing.clone(), false));
        }
        let settings = ProjectSettings {
            id: self.next_id(),
            source_id: input.source_id,
            source_last_updated_at: input.source_last_updated_at,
            source_locale: input.source_locale.clone(),
            job_ids: input.job_ids.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            due_date: input.due_date,
            template_id: input.template_id.clone(),
            location_id: input.location_id.clone(),
            project_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.settings.lock().unwrap().push(settings.clone());
        Ok((settings, true))
    }

    async fn list_unlinked(&self) -> Result<Vec<ProjectSettings>, StoreError> {
        let mut settings: Vec<ProjectSettings> = self
            .settings
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.project_id.is_none())
            .cloned()
            .collect();
        settings.sort_by_key(|s| s.id);
        Ok(settings)
    }

    async fn link_project(&self, settings_id: DbId, project_id: DbId) -> Result<(), StoreError> {
        let mut settings = self.settings.lock().unwrap();
        let slot = settings
            .iter_mut()
            .find(|s| s.id == settings_id && s.project_id.is_none())
            .ok_or(StoreError::NotFound {
                entity: "unlinked settings",
                id: settings_id,
            })?;
        slot.project_id = Some(project_id);
        Ok(())
    }

    async fn find_by_project(
        &self,
        project_id: DbId,
    ) -> Result<Option<ProjectSettings>, StoreError> {
        Ok(self
            .settings
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.project_id == Some(project_id))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Scripted content provider
// ---------------------------------------------------------------------------

type ScriptedContent<T> = Mutex<VecDeque<Result<T, ContentError>>>;

/// Content provider over in-memory job and source tables, with scripted
/// merge/save outcomes.
#[derive(Default)]
pub struct MockProvider {
    pub jobs: Mutex<HashMap<DbId, TranslationJob>>,
    pub source_names: Mutex<HashMap<DbId, String>>,
    pub page_like: Mutex<HashSet<DbId>>,
    pub published_jobs: Mutex<HashSet<DbId>>,
    pub stale: Mutex<Vec<StaleSource>>,

    /// Scripted outcomes for `import_entries`; unscripted calls succeed
    /// with no warnings.
    pub import_results: ScriptedContent<Vec<ImportWarning>>,
    /// Scripted outcomes for `save_target`; unscripted calls succeed.
    pub save_results: ScriptedContent<()>,

    /// Entries actually handed to `import_entries`, by job id.
    pub imported: Mutex<Vec<(DbId, Vec<ContentEntry>)>>,
    /// `save_target` calls as (job id, publish flag).
    pub saved: Mutex<Vec<(DbId, bool)>>,
    /// Sources passed to `refresh_source`.
    pub refreshed: Mutex<Vec<DbId>>,
}

impl MockProvider {
    pub fn add_job(&self, id: DbId, source_id: DbId, target_locale: &str, enabled: bool) {
        self.jobs.lock().unwrap().insert(
            id,
            TranslationJob {
                id,
                uuid: Uuid::new_v4(),
                source_id,
                source_locale: "en".to_string(),
                target_locale: target_locale.to_string(),
                enabled,
            },
        );
        self.source_names
            .lock()
            .unwrap()
            .entry(source_id)
            .or_insert_with(|| format!("Source {source_id}"));
    }

    pub fn add_stale(&self, source_id: DbId, name: &str, last_updated_at: Timestamp) {
        self.stale.lock().unwrap().push(StaleSource {
            source_id,
            name: name.to_string(),
            last_updated_at,
        });
        self.source_names
            .lock()
            .unwrap()
            .insert(source_id, name.to_string());
    }
}

/// A small valid exchange payload.
pub fn sample_payload() -> String {
    loclink_core::content::serialize_entries(&[ContentEntry {
        context: "title".to_string(),
        source: "Some translatable content".to_string(),
        translation: "Du contenu traduisible".to_string(),
    }])
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn job(&self, id: DbId) -> Result<TranslationJob, ContentError> {
        self.jobs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ContentError::Other(format!("no job {id}")))
    }

    async fn jobs_for_source(&self, source_id: DbId) -> Result<Vec<TranslationJob>, ContentError> {
        let mut jobs: Vec<TranslationJob> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|j| j.source_id == source_id)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs)
    }

    async fn object_name(&self, source_id: DbId) -> Result<String, ContentError> {
        Ok(self
            .source_names
            .lock()
            .unwrap()
            .get(&source_id)
            .cloned()
            .unwrap_or_else(|| format!("Source {source_id}")))
    }

    async fn object_usage(
        &self,
        source_id: DbId,
        _limit: usize,
    ) -> Result<Vec<String>, ContentError> {
        Ok(vec![format!("https://cms.example.com/pages/{source_id}/")])
    }

    async fn is_page_like(&self, source_id: DbId) -> Result<bool, ContentError> {
        Ok(self.page_like.lock().unwrap().contains(&source_id))
    }

    async fn export_entries(&self, _source_id: DbId) -> Result<Vec<ContentEntry>, ContentError> {
        Ok(vec![ContentEntry {
            context: "title".to_string(),
            source: "Some translatable content".to_string(),
            translation: String::new(),
        }])
    }

    async fn import_entries(
        &self,
        job: &TranslationJob,
        entries: &[ContentEntry],
    ) -> Result<Vec<ImportWarning>, ContentError> {
        let result = self
            .import_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        if result.is_ok() {
            self.imported
                .lock()
                .unwrap()
                .push((job.id, entries.to_vec()));
        }
        result
    }

    async fn save_target(&self, job: &TranslationJob, publish: bool) -> Result<(), ContentError> {
        let result = self
            .save_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.saved.lock().unwrap().push((job.id, publish));
        }
        result
    }

    async fn target_is_published(&self, job: &TranslationJob) -> Result<bool, ContentError> {
        Ok(self.published_jobs.lock().unwrap().contains(&job.id))
    }

    async fn target_name(&self, job: &TranslationJob) -> Result<String, ContentError> {
        let name = self.object_name(job.source_id).await?;
        Ok(format!("{name} ({})", job.target_locale))
    }

    async fn stale_sources(&self) -> Result<Vec<StaleSource>, ContentError> {
        Ok(self.stale.lock().unwrap().clone())
    }

    async fn refresh_source(&self, source_id: DbId) -> Result<(), ContentError> {
        self.refreshed.lock().unwrap().push(source_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub engine: SyncEngine,
    pub client: Arc<MockLanguageCloud>,
    pub store: Arc<MemoryStore>,
    pub provider: Arc<MockProvider>,
    pub bus: Arc<EventBus>,
}

/// Build an engine wired entirely to fakes.
pub fn harness() -> Harness {
    let config = EngineConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        account_id: "tenant".to_string(),
        template_id: "template-1".to_string(),
        location_id: "location-1".to_string(),
        auth_base: "https://auth.example.com/oauth/token".to_string(),
        auth_audience: "https://api.example.com".to_string(),
        api_base: "https://api.example.com/public-api/v1".to_string(),
        project_prefix: String::new(),
        due_by_days: 7,
        request_timeout_secs: 30,
        call_delay_ms: None,
        locale_map: HashMap::new(),
    };

    let client = Arc::new(MockLanguageCloud::default());
    let store = Arc::new(MemoryStore::default());
    let provider = Arc::new(MockProvider::default());
    let bus = Arc::new(EventBus::default());

    let engine = SyncEngine::new(
        config,
        client.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        provider.clone(),
        bus.clone(),
    );

    Harness {
        engine,
        client,
        store,
        provider,
        bus,
    }
}

/// Seed a project that a previous run already exported: remote project
/// id stored, one created file per (job id, target locale) pair, remote
/// status `inProgress`.
pub async fn seed_exported_project(
    harness: &Harness,
    source_id: DbId,
    remote_id: &str,
    jobs: &[(DbId, &str)],
) -> Project {
    for (job_id, locale) in jobs {
        harness.provider.add_job(*job_id, source_id, locale, true);
    }

    let mut project = harness.store.insert_project(source_id, Utc::now());
    project.remote_project_id = remote_id.to_string();
    project.remote_status = "inProgress".to_string();
    ProjectRepository::update(&*harness.store, &project)
        .await
        .expect("project update should succeed");

    for (job_id, _) in jobs {
        let mut file = harness.store.insert_file(project.id, *job_id);
        file.remote_file_id = format!("file{job_id}");
        FileRepository::update(&*harness.store, &file)
            .await
            .expect("file update should succeed");
    }

    project
}

/// Create a settings row ready for materialization.
pub async fn seed_settings(
    harness: &Harness,
    source_id: DbId,
    job_ids: Vec<DbId>,
    version: Timestamp,
) -> ProjectSettings {
    let input = CreateProjectSettings {
        source_id,
        source_last_updated_at: version,
        source_locale: "en".to_string(),
        job_ids,
        name: format!("Source {source_id}_2023-01-15"),
        description: "test project".to_string(),
        due_date: version + chrono::Duration::days(7),
        template_id: "template-1".to_string(),
        location_id: "location-1".to_string(),
    };
    let (settings, created) = SettingsRepository::get_or_create(&*harness.store, &input)
        .await
        .expect("settings insert should succeed");
    assert!(created, "settings should be newly created");
    settings
}
