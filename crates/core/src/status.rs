//! Status constants and the combined-status derivation.
//!
//! Projects and files each carry an internal status (`new` / `imported` /
//! `error`) plus the status last reported by the remote translation
//! service. The user-facing "combined status" is never stored as an
//! independent source of truth: it is recomputed from the flags below on
//! every save, as a first-match-wins priority chain.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Internal status
// ---------------------------------------------------------------------------

pub const STATUS_NEW: &str = "new";
pub const STATUS_IMPORTED: &str = "imported";
pub const STATUS_ERROR: &str = "error";

/// Internal lifecycle status of a project or file row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    New,
    Imported,
    Error,
}

impl EntityStatus {
    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => STATUS_NEW,
            Self::Imported => STATUS_IMPORTED,
            Self::Error => STATUS_ERROR,
        }
    }

    /// Parse a database string value. Unrecognised values map to `New`.
    pub fn parse(s: &str) -> Self {
        match s {
            STATUS_IMPORTED => Self::Imported,
            STATUS_ERROR => Self::Error,
            _ => Self::New,
        }
    }
}

// ---------------------------------------------------------------------------
// Remote project status
// ---------------------------------------------------------------------------

pub const REMOTE_STATUS_CREATED: &str = "created";
pub const REMOTE_STATUS_IN_PROGRESS: &str = "inProgress";
pub const REMOTE_STATUS_COMPLETED: &str = "completed";
pub const REMOTE_STATUS_ARCHIVED: &str = "archived";

/// Project status as last reported by (or recorded for) the remote service.
///
/// `New` means no remote project exists yet (stored as the empty string).
/// Any status string the remote service returns that we do not recognise
/// maps to `Unknown`; the raw value is still persisted for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    New,
    Created,
    InProgress,
    Completed,
    Archived,
    Unknown,
}

impl RemoteStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "" => Self::New,
            REMOTE_STATUS_CREATED => Self::Created,
            REMOTE_STATUS_IN_PROGRESS => Self::InProgress,
            REMOTE_STATUS_COMPLETED => Self::Completed,
            REMOTE_STATUS_ARCHIVED => Self::Archived,
            _ => Self::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Combined status
// ---------------------------------------------------------------------------

/// Inputs to the combined-status derivation, flattened out of the project
/// row, the file row, and the host-side translation job.
///
/// The core crate holds no database handles; callers load the rows and
/// pass the flags in (attempt counters, remote-id presence, the
/// `is_created` aggregate over sibling files, and so on).
#[derive(Debug, Clone)]
pub struct StatusInputs {
    /// Remote project id is non-empty.
    pub project_created_remotely: bool,
    /// Project-level create-attempt counter.
    pub project_create_attempts: i32,
    /// Remote project id set and every sibling file has a remote file id.
    pub project_is_created: bool,
    /// Status last reported by the remote service.
    pub project_remote_status: RemoteStatus,
    /// Remote file id is non-empty.
    pub file_created_remotely: bool,
    /// File-level create-attempt counter.
    pub file_create_attempts: i32,
    /// Internal status of the file row.
    pub file_status: EntityStatus,
    /// The host-side translation job is still enabled.
    pub job_enabled: bool,
    /// The translated target content has been published in the host.
    pub target_published: bool,
}

/// Number of remote-creation attempts after which an entity is considered
/// permanently failed and excluded from further export runs.
pub const MAX_CREATE_ATTEMPTS: i32 = 3;

/// The single human-readable state shown for a file, derived from project,
/// file, and job flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinedStatus {
    ProjectCreationFailed,
    TranslationsDisabled,
    SourceUploadFailed,
    RequestCreated,
    ProjectArchived,
    ReadyForReview,
    Published,
    ImportError,
    InProgressRemotely,
    Unknown,
}

impl CombinedStatus {
    /// Display label, also stored on the file row for report queries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProjectCreationFailed => "Project creation failed",
            Self::TranslationsDisabled => "Translations disabled",
            Self::SourceUploadFailed => "Source upload failed",
            Self::RequestCreated => "Request created",
            Self::ProjectArchived => "Project archived",
            Self::ReadyForReview => "Translations ready for review",
            Self::Published => "Translations published",
            Self::ImportError => "Error importing translation",
            Self::InProgressRemotely => "In progress remotely",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for CombinedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Derive the combined status for one file.
///
/// First match wins; the order of the checks is load-bearing. A project
/// that burned all its create attempts reports "Project creation failed"
/// even if an unrelated sibling file already imported.
pub fn combined_status(i: &StatusInputs) -> CombinedStatus {
    if !i.project_created_remotely && i.project_create_attempts >= MAX_CREATE_ATTEMPTS {
        return CombinedStatus::ProjectCreationFailed;
    }

    if !i.job_enabled {
        return CombinedStatus::TranslationsDisabled;
    }

    if !i.file_created_remotely && i.file_create_attempts >= MAX_CREATE_ATTEMPTS {
        return CombinedStatus::SourceUploadFailed;
    }

    if !i.project_is_created {
        return CombinedStatus::RequestCreated;
    }

    if i.project_remote_status == RemoteStatus::Archived {
        return CombinedStatus::ProjectArchived;
    }

    if i.file_status == EntityStatus::Imported && !i.target_published {
        return CombinedStatus::ReadyForReview;
    }

    if i.file_status == EntityStatus::Imported && i.target_published {
        return CombinedStatus::Published;
    }

    if i.file_status == EntityStatus::Error {
        return CombinedStatus::ImportError;
    }

    if i.project_is_created {
        return CombinedStatus::InProgressRemotely;
    }

    CombinedStatus::Unknown
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
