//! The synchronization engine: keeps host content objects in sync with
//! remote LanguageCloud translation projects.
//!
//! One [`SyncEngine::run`] call is one batch pass: authenticate once,
//! import whatever the remote service finished since the last run, then
//! export newly requested work. Per-entity state is committed after every
//! remote call, so a crash mid-run resumes exactly where the attempt
//! counters and stored remote ids say it stopped. A remote project or
//! file with a persisted id is never created twice.

pub mod config;
mod export;
mod import;
pub mod importer;
pub mod refresh;
pub mod sync;

pub use config::{ConfigError, EngineConfig};
pub use importer::ContentImporter;
pub use refresh::RefreshReport;
pub use sync::{SyncEngine, SyncError};
