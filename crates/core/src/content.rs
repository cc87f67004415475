//! The structured-entry exchange format and the host content contract.
//!
//! Translatable content crosses the engine boundary as a JSON array of
//! [`ContentEntry`] values (context, source string, translated string).
//! The actual field-level merge into the host's content store is done by
//! the [`ContentProvider`] collaborator; the engine only interprets its
//! warnings and failure classes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Exchange format
// ---------------------------------------------------------------------------

/// One translatable string: where it lives, what it said, what it says now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Field path or context identifier within the source object.
    pub context: String,
    /// The source-locale string.
    pub source: String,
    /// The target-locale string (empty until translated).
    pub translation: String,
}

/// Serialize entries to the exchange payload uploaded as a source file.
pub fn serialize_entries(entries: &[ContentEntry]) -> String {
    // A Vec of plain structs cannot fail to serialize.
    serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
}

/// Parse a downloaded target-file payload into entries.
///
/// Callers must hand over raw content, never a path to it; a bare path
/// sneaking in here means something upstream confused a filename with a
/// payload, and is rejected outright rather than read from disk.
pub fn parse_entries(content: &str) -> Result<Vec<ContentEntry>, ContentError> {
    if looks_like_path(content) {
        return Err(ContentError::InvalidInput(format!(
            "expected entry payload as string, received {content}"
        )));
    }
    serde_json::from_str(content)
        .map_err(|e| ContentError::InvalidInput(format!("malformed entry payload: {e}")))
}

/// A single line with no JSON structure that resolves to an existing file,
/// or that carries a file extension, is a path rather than a payload.
fn looks_like_path(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.contains('\n') || trimmed.starts_with('[') || trimmed.starts_with('{') {
        return false;
    }
    std::path::Path::new(trimmed).exists()
        || std::path::Path::new(trimmed)
            .extension()
            .is_some_and(|ext| !ext.is_empty())
}

// ---------------------------------------------------------------------------
// Warnings and errors
// ---------------------------------------------------------------------------

/// Non-fatal findings reported by the host merge. Each is logged; none
/// block the import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// The entry's context does not exist on the target object.
    UnknownContext { context: String },
    /// The source string is not known to the target object.
    UnknownString { string: String },
    /// The string exists, but not in the claimed context.
    StringNotUsedInContext { string: String, context: String },
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContext { context } => {
                write!(f, "unrecognised context '{context}'")
            }
            Self::UnknownString { string } => {
                write!(f, "unrecognised string '{string}'")
            }
            Self::StringNotUsedInContext { string, context } => {
                write!(f, "the string '{string}' is not used in context '{context}'")
            }
        }
    }
}

/// Failures from the content collaborator.
///
/// `MissingRelatedObject` and `Validation` are recoverable content-level
/// problems: the merge is abandoned, the target stays unmodified, and a
/// human fixes the content before the file can import. `InvalidInput`
/// marks a malformed payload and skips the item for this run.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("missing related object: {0}")]
    MissingRelatedObject(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid content input: {0}")]
    InvalidInput(String),

    #[error("content store error: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Host contract
// ---------------------------------------------------------------------------

/// The host system's record of "translate this source into this locale".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationJob {
    pub id: DbId,
    /// Host-side correlation id, carried through logs.
    pub uuid: Uuid,
    /// The content source this job translates.
    pub source_id: DbId,
    pub source_locale: String,
    pub target_locale: String,
    /// Disabled jobs are skipped during export and surface as
    /// "Translations disabled" in the combined status.
    pub enabled: bool,
}

/// A content source whose translations have gone stale: the source was
/// republished after it was last handed to the translation service.
#[derive(Debug, Clone)]
pub struct StaleSource {
    pub source_id: DbId,
    pub name: String,
    pub last_updated_at: Timestamp,
}

/// Abstraction over the host CMS content machinery.
///
/// The engine never touches host content directly; it exports entries,
/// imports translated entries, and asks the provider to persist the
/// result as a draft or a published object.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Look up a translation job by id.
    async fn job(&self, id: DbId) -> Result<TranslationJob, ContentError>;

    /// All translation jobs registered for a content source.
    async fn jobs_for_source(&self, source_id: DbId)
        -> Result<Vec<TranslationJob>, ContentError>;

    /// Human-readable name of the source object's current instance.
    async fn object_name(&self, source_id: DbId) -> Result<String, ContentError>;

    /// URLs (or other descriptions) of places the object is used,
    /// capped at `limit` entries.
    async fn object_usage(&self, source_id: DbId, limit: usize)
        -> Result<Vec<String>, ContentError>;

    /// Whether the source is a page-like entity with an explicit
    /// review/draft step. Page-like targets are saved as drafts;
    /// everything else is published on import.
    async fn is_page_like(&self, source_id: DbId) -> Result<bool, ContentError>;

    /// Export the source's translatable content as structured entries.
    async fn export_entries(&self, source_id: DbId) -> Result<Vec<ContentEntry>, ContentError>;

    /// Merge translated entries into the target for `job`, reporting
    /// non-fatal warnings.
    async fn import_entries(
        &self,
        job: &TranslationJob,
        entries: &[ContentEntry],
    ) -> Result<Vec<ImportWarning>, ContentError>;

    /// Persist the merged target, publishing it or saving a draft.
    async fn save_target(&self, job: &TranslationJob, publish: bool) -> Result<(), ContentError>;

    /// Whether the target content for `job` is currently published.
    async fn target_is_published(&self, job: &TranslationJob) -> Result<bool, ContentError>;

    /// Human-readable name of the translated target instance.
    async fn target_name(&self, job: &TranslationJob) -> Result<String, ContentError>;

    /// Sources whose published content is newer than their last handoff
    /// to the translation service.
    async fn stale_sources(&self) -> Result<Vec<StaleSource>, ContentError>;

    /// Re-sync a stale source's current content into its translations
    /// before new project settings are created for it.
    async fn refresh_source(&self, source_id: DbId) -> Result<(), ContentError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
