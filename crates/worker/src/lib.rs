//! Host-side adapters for running the sync engine standalone.
//!
//! Real deployments embed the engine next to their CMS and implement
//! [`ContentProvider`](loclink_core::ContentProvider) against its content
//! store. This crate ships [`JsonContentProvider`], a directory-backed
//! implementation used by the `loclink` binary for operations and
//! end-to-end testing.

pub mod provider;

pub use provider::JsonContentProvider;
