//! Bus subscriber that emails reviewers when translations import.
//!
//! [`ReviewNotifier`] consumes events from the broadcast channel and, for
//! each `translation.imported` event, resolves recipients through the
//! host's permission-based [`RecipientLookup`] and sends one "ready for
//! review" email per address. Delivery failures are logged and never
//! propagate back into the sync run.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::bus::{SyncEvent, TRANSLATION_IMPORTED};
use crate::email::{compose_review_ready, EmailDelivery};

/// Resolves the addresses that should hear about imported translations.
///
/// The host decides what "may review translations" means (typically a
/// permission query); the notifier only consumes the resulting list.
#[async_trait]
pub trait RecipientLookup: Send + Sync {
    async fn review_recipients(&self) -> Vec<String>;
}

/// Routes `translation.imported` events to reviewer inboxes.
pub struct ReviewNotifier {
    delivery: EmailDelivery,
    recipients: Arc<dyn RecipientLookup>,
    /// Base URL prepended to relative edit paths in the payload.
    base_url: String,
}

impl ReviewNotifier {
    pub fn new(
        delivery: EmailDelivery,
        recipients: Arc<dyn RecipientLookup>,
        base_url: String,
    ) -> Self {
        Self {
            delivery,
            recipients,
            base_url,
        }
    }

    /// Run the notification loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](crate::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<SyncEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Review notifier lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, review notifier shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_event(&self, event: &SyncEvent) {
        if event.event_type != TRANSLATION_IMPORTED {
            return;
        }

        let translated_object = event.payload["translated_object"]
            .as_str()
            .unwrap_or("(unknown)");
        let edit_url = match event.payload["edit_url"].as_str() {
            Some(path) if path.starts_with('/') => format!("{}{}", self.base_url, path),
            Some(url) => url.to_string(),
            None => self.base_url.clone(),
        };

        let (subject, body) = compose_review_ready(translated_object, &edit_url);

        for recipient in self.recipients.review_recipients().await {
            if let Err(e) = self.delivery.send(&recipient, &subject, &body).await {
                tracing::error!(
                    error = %e,
                    to = %recipient,
                    "Failed to send review notification"
                );
            }
        }
    }
}
