//! Typed client for the LanguageCloud translation-management API.
//!
//! [`ApiClient`] wraps the remote HTTP API (OAuth client-credentials
//! authentication, project CRUD, source/target file transfer, template
//! listing) using [`reqwest`]. The [`LanguageCloud`] trait is the
//! contract the sync engine consumes, so orchestration tests can run
//! against a scripted client instead of the network.

pub mod cache;
pub mod client;

pub use cache::TtlCache;
pub use client::{
    ApiClient, ClientConfig, CreateProjectRequest, LanguageCloud, LanguageCloudError,
    ProjectTemplate,
};
