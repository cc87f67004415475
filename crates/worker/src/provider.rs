//! Directory-backed content provider.
//!
//! Content layout under the root directory:
//!
//! ```text
//! content/
//!   jobs.json            translation jobs (id, uuid, source, locales, enabled)
//!   sources/<id>.json    one document per content source
//!   targets/<job>.json   merged translations, written on import
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use loclink_core::content::{
    ContentEntry, ContentError, ContentProvider, ImportWarning, StaleSource, TranslationJob,
};
use loclink_core::types::{DbId, Timestamp};

/// A content source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub name: String,
    /// Page-like sources get a review/draft step on import.
    #[serde(default)]
    pub page_like: bool,
    /// URLs where this object is used, for project descriptions.
    #[serde(default)]
    pub usage: Vec<String>,
    pub entries: Vec<ContentEntry>,
    pub last_updated_at: Timestamp,
    /// Set by `refresh_source`; a source is stale while this lags
    /// `last_updated_at`.
    #[serde(default)]
    pub last_synced_at: Option<Timestamp>,
}

/// A translated target document, one per job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetDocument {
    #[serde(default)]
    pub entries: Vec<ContentEntry>,
    #[serde(default)]
    pub published: bool,
}

/// [`ContentProvider`] over a plain directory of JSON documents.
pub struct JsonContentProvider {
    root: PathBuf,
}

impl JsonContentProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn source_path(&self, source_id: DbId) -> PathBuf {
        self.root.join("sources").join(format!("{source_id}.json"))
    }

    fn target_path(&self, job_id: DbId) -> PathBuf {
        self.root.join("targets").join(format!("{job_id}.json"))
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ContentError::Other(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| ContentError::Other(format!("parse {}: {e}", path.display())))
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ContentError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ContentError::Other(format!("mkdir {}: {e}", parent.display())))?;
        }
        let raw = serde_json::to_string_pretty(value)
            .map_err(|e| ContentError::Other(format!("serialize {}: {e}", path.display())))?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| ContentError::Other(format!("write {}: {e}", path.display())))
    }

    async fn load_jobs(&self) -> Result<Vec<TranslationJob>, ContentError> {
        Self::read_json(&self.root.join("jobs.json")).await
    }

    async fn load_source(&self, source_id: DbId) -> Result<SourceDocument, ContentError> {
        Self::read_json(&self.source_path(source_id)).await
    }

    async fn load_target(&self, job_id: DbId) -> Result<TargetDocument, ContentError> {
        let path = self.target_path(job_id);
        if !path.exists() {
            return Ok(TargetDocument::default());
        }
        Self::read_json(&path).await
    }
}

#[async_trait]
impl ContentProvider for JsonContentProvider {
    async fn job(&self, id: DbId) -> Result<TranslationJob, ContentError> {
        self.load_jobs()
            .await?
            .into_iter()
            .find(|j| j.id == id)
            .ok_or_else(|| ContentError::Other(format!("no translation job {id}")))
    }

    async fn jobs_for_source(&self, source_id: DbId) -> Result<Vec<TranslationJob>, ContentError> {
        let mut jobs: Vec<TranslationJob> = self
            .load_jobs()
            .await?
            .into_iter()
            .filter(|j| j.source_id == source_id)
            .collect();
        jobs.sort_by_key(|j| j.id);
        Ok(jobs)
    }

    async fn object_name(&self, source_id: DbId) -> Result<String, ContentError> {
        Ok(self.load_source(source_id).await?.name)
    }

    async fn object_usage(
        &self,
        source_id: DbId,
        limit: usize,
    ) -> Result<Vec<String>, ContentError> {
        let mut usage = self.load_source(source_id).await?.usage;
        usage.truncate(limit);
        Ok(usage)
    }

    async fn is_page_like(&self, source_id: DbId) -> Result<bool, ContentError> {
        Ok(self.load_source(source_id).await?.page_like)
    }

    async fn export_entries(&self, source_id: DbId) -> Result<Vec<ContentEntry>, ContentError> {
        Ok(self.load_source(source_id).await?.entries)
    }

    async fn import_entries(
        &self,
        job: &TranslationJob,
        entries: &[ContentEntry],
    ) -> Result<Vec<ImportWarning>, ContentError> {
        let source = self.load_source(job.source_id).await?;
        let mut target = self.load_target(job.id).await?;
        let mut warnings = Vec::new();

        for entry in entries {
            let known_context = source.entries.iter().any(|e| e.context == entry.context);
            if !known_context {
                warnings.push(ImportWarning::UnknownContext {
                    context: entry.context.clone(),
                });
                continue;
            }
            let known_string = source.entries.iter().any(|e| e.source == entry.source);
            if !known_string {
                warnings.push(ImportWarning::UnknownString {
                    string: entry.source.clone(),
                });
                continue;
            }
            let used_in_context = source
                .entries
                .iter()
                .any(|e| e.context == entry.context && e.source == entry.source);
            if !used_in_context {
                warnings.push(ImportWarning::StringNotUsedInContext {
                    string: entry.source.clone(),
                    context: entry.context.clone(),
                });
                continue;
            }

            match target
                .entries
                .iter_mut()
                .find(|e| e.context == entry.context && e.source == entry.source)
            {
                Some(existing) => existing.translation = entry.translation.clone(),
                None => target.entries.push(entry.clone()),
            }
        }

        Self::write_json(&self.target_path(job.id), &target).await?;
        Ok(warnings)
    }

    async fn save_target(&self, job: &TranslationJob, publish: bool) -> Result<(), ContentError> {
        let mut target = self.load_target(job.id).await?;
        target.published = publish;
        Self::write_json(&self.target_path(job.id), &target).await
    }

    async fn target_is_published(&self, job: &TranslationJob) -> Result<bool, ContentError> {
        Ok(self.load_target(job.id).await?.published)
    }

    async fn target_name(&self, job: &TranslationJob) -> Result<String, ContentError> {
        let name = self.object_name(job.source_id).await?;
        Ok(format!("{name} ({})", job.target_locale))
    }

    async fn stale_sources(&self) -> Result<Vec<StaleSource>, ContentError> {
        let sources_dir = self.root.join("sources");
        if !sources_dir.exists() {
            return Ok(Vec::new());
        }

        let mut stale = Vec::new();
        let mut dir = tokio::fs::read_dir(&sources_dir)
            .await
            .map_err(|e| ContentError::Other(format!("read {}: {e}", sources_dir.display())))?;
        while let Some(dir_entry) = dir
            .next_entry()
            .await
            .map_err(|e| ContentError::Other(format!("read {}: {e}", sources_dir.display())))?
        {
            let path = dir_entry.path();
            let Some(source_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<DbId>().ok())
            else {
                continue;
            };
            let source: SourceDocument = Self::read_json(&path).await?;
            let is_stale = match source.last_synced_at {
                Some(synced) => source.last_updated_at > synced,
                None => true,
            };
            if is_stale {
                stale.push(StaleSource {
                    source_id,
                    name: source.name,
                    last_updated_at: source.last_updated_at,
                });
            }
        }

        stale.sort_by_key(|s| s.source_id);
        Ok(stale)
    }

    async fn refresh_source(&self, source_id: DbId) -> Result<(), ContentError> {
        let mut source = self.load_source(source_id).await?;
        source.last_synced_at = Some(source.last_updated_at);
        Self::write_json(&self.source_path(source_id), &source).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
