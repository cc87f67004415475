//! Event bus and notification infrastructure for the sync engine.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SyncEvent`] — the canonical event envelope; the engine publishes
//!   one `translation.imported` event per imported file.
//! - [`email`] — SMTP delivery and message composition.
//! - [`ReviewNotifier`] — bus subscriber that emails reviewers when
//!   translated content is ready.

pub mod bus;
pub mod email;
pub mod notifier;

pub use bus::{EventBus, SyncEvent, TRANSLATION_IMPORTED};
pub use email::{EmailConfig, EmailDelivery};
pub use notifier::{RecipientLookup, ReviewNotifier};
