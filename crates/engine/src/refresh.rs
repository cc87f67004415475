//! Stale-content refresh: queue re-translation of sources whose content
//! changed after their last handoff to the translation service.

use chrono::{Duration, Utc};
use serde::Serialize;

use loclink_core::content::StaleSource;
use loclink_core::types::{DbId, Timestamp};
use loclink_db::CreateProjectSettings;

use crate::sync::{SyncEngine, SyncError};

/// Outcome of one refresh pass, also used for the summary notification.
#[derive(Debug, Default, Serialize)]
pub struct RefreshReport {
    /// Sources whose settings were (or, on a dry run, would be) created.
    pub refreshed: Vec<(DbId, String)>,
    /// Sources left alone because a translation project is still open.
    pub skipped: Vec<(DbId, String)>,
}

impl RefreshReport {
    pub fn considered(&self) -> usize {
        self.refreshed.len() + self.skipped.len()
    }
}

impl SyncEngine {
    /// Queue new project settings for every stale source without an open
    /// remote project.
    ///
    /// With `dry_run` set, computes the same report without contacting the
    /// remote service or writing any state.
    pub async fn refresh_stale(&self, dry_run: bool) -> Result<RefreshReport, SyncError> {
        tracing::info!("Looking for sources with stale translated content...");

        let stale = self.content.stale_sources().await?;
        let mut report = RefreshReport::default();

        let total = stale.len();
        for (index, source) in stale.into_iter().enumerate() {
            let counter = format!("[{}/{}]", index + 1, total);

            // An open project means translations are mid-flight; queueing
            // a new version now would race the pending import.
            if self.projects.has_open_project(source.source_id).await? {
                tracing::debug!(
                    source_id = source.source_id,
                    "{counter} Skipped source with an open translation project: \"{}\"",
                    source.name
                );
                report.skipped.push((source.source_id, source.name));
                continue;
            }

            if dry_run {
                tracing::info!(
                    source_id = source.source_id,
                    "{counter} Would refresh translations for: \"{}\"",
                    source.name
                );
                report.refreshed.push((source.source_id, source.name));
                continue;
            }

            tracing::info!(
                source_id = source.source_id,
                "{counter} Refreshing translations for: \"{}\"",
                source.name
            );
            match self.refresh_one(&source).await {
                Ok(true) => report.refreshed.push((source.source_id, source.name)),
                Ok(false) => {
                    tracing::debug!(
                        source_id = source.source_id,
                        "Settings already queued for this source version"
                    );
                    report.skipped.push((source.source_id, source.name));
                }
                Err(e) => {
                    tracing::error!(
                        source_id = source.source_id,
                        error = %e,
                        "Failed to refresh source"
                    );
                    report.skipped.push((source.source_id, source.name));
                }
            }
        }

        tracing::info!(
            considered = report.considered(),
            refreshed = report.refreshed.len(),
            skipped = report.skipped.len(),
            "...Refresh done"
        );
        Ok(report)
    }

    /// Re-sync the source and get-or-create settings for it. Returns
    /// whether a new settings row was created.
    async fn refresh_one(&self, source: &StaleSource) -> Result<bool, SyncError> {
        let jobs = self.content.jobs_for_source(source.source_id).await?;
        let enabled: Vec<_> = jobs.into_iter().filter(|j| j.enabled).collect();
        let Some(first) = enabled.first() else {
            tracing::debug!(
                source_id = source.source_id,
                "No enabled translation jobs. Skipping.."
            );
            return Ok(false);
        };

        self.content.refresh_source(source.source_id).await?;

        let description = match self.content.object_usage(source.source_id, 5).await {
            Ok(urls) => urls.join("\n"),
            Err(e) => {
                tracing::warn!(source_id = source.source_id, error = %e, "Could not resolve object usage");
                String::new()
            }
        };

        let input = CreateProjectSettings {
            source_id: source.source_id,
            source_last_updated_at: source.last_updated_at,
            source_locale: first.source_locale.clone(),
            job_ids: enabled.iter().map(|j| j.id).collect(),
            name: default_project_name(
                &self.config.project_prefix,
                &source.name,
                source.last_updated_at,
            ),
            description,
            due_date: Utc::now() + Duration::days(self.config.due_by_days),
            template_id: self.config.template_id.clone(),
            location_id: self.config.location_id.clone(),
        };

        let (_, created) = self.settings.get_or_create(&input).await?;
        Ok(created)
    }
}

/// Default project name: optional prefix, object name, version date.
pub fn default_project_name(prefix: &str, object_name: &str, version: Timestamp) -> String {
    let glue = if prefix.is_empty() || prefix.ends_with('_') {
        ""
    } else {
        "_"
    };
    format!("{prefix}{glue}{object_name}_{}", version.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn name_without_prefix() {
        let version = Utc.with_ymd_and_hms(2018, 2, 2, 12, 0, 1).unwrap();
        assert_eq!(
            default_project_name("", "Test page", version),
            "Test page_2018-02-02"
        );
    }

    #[test]
    fn name_with_underscore_prefix_adds_no_glue() {
        let version = Utc.with_ymd_and_hms(2018, 2, 2, 12, 0, 1).unwrap();
        assert_eq!(
            default_project_name("Website_", "Test page", version),
            "Website_Test page_2018-02-02"
        );
    }

    #[test]
    fn name_with_bare_prefix_gets_glue() {
        let version = Utc.with_ymd_and_hms(2018, 2, 2, 12, 0, 1).unwrap();
        assert_eq!(
            default_project_name("Website", "Test page", version),
            "Website_Test page_2018-02-02"
        );
    }
}
