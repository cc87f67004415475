//! Content importer: applies a downloaded target file to the host store.

use std::sync::Arc;

use loclink_core::content::{parse_entries, ContentError, ContentProvider, ImportWarning, TranslationJob};

/// Merges translated entries into the host content store through the
/// [`ContentProvider`] collaborator and classifies its findings.
///
/// Page-like targets are saved as drafts so an editor reviews them before
/// publication; every other entity kind has no draft step and is
/// published immediately.
pub struct ContentImporter {
    content: Arc<dyn ContentProvider>,
}

impl ContentImporter {
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        Self { content }
    }

    /// Import one downloaded payload for one translation job.
    ///
    /// Merge warnings (unknown context, unknown string, string unused in
    /// context) are logged and returned; they never block the import.
    /// `MissingRelatedObject` and `Validation` errors from the save are
    /// propagated for the caller to record as an import error, with the
    /// target content left unmodified by the provider.
    pub async fn import(
        &self,
        job: &TranslationJob,
        payload: &str,
    ) -> Result<Vec<ImportWarning>, ContentError> {
        let entries = parse_entries(payload)?;

        let warnings = self.content.import_entries(job, &entries).await?;
        for warning in &warnings {
            tracing::warn!(
                job = %job.uuid,
                target_locale = %job.target_locale,
                "While importing translations: {warning}"
            );
        }

        let page_like = self.content.is_page_like(job.source_id).await?;
        self.content.save_target(job, !page_like).await?;

        Ok(warnings)
    }
}
