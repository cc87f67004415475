//! Shared types and pure logic for the loclink translation sync engine.
//!
//! This crate has no database or HTTP dependencies. It provides:
//!
//! - Identifier and timestamp aliases ([`types`]).
//! - Internal/remote status constants and the combined-status derivation
//!   ([`status`]).
//! - The structured-entry exchange format and the [`ContentProvider`]
//!   contract the host CMS implements ([`content`]).

pub mod content;
pub mod status;
pub mod types;

pub use content::{ContentEntry, ContentError, ContentProvider, ImportWarning, TranslationJob};
pub use status::{CombinedStatus, EntityStatus, RemoteStatus, StatusInputs};
