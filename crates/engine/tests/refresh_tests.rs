//! Integration tests for the stale-content refresh pass.

mod common;

use std::sync::atomic::Ordering;

use chrono::Utc;

use common::{harness, seed_exported_project};

/// Stale sources without an open project get fresh settings queued; the
/// source content is re-synced first.
#[tokio::test]
async fn refresh_queues_settings_for_stale_sources() {
    let h = harness();
    h.provider.add_job(1, 10, "fr", true);
    h.provider.add_job(2, 10, "de", true);
    let version = Utc::now();
    h.provider.add_stale(10, "Home page", version);

    let report = h.engine.refresh_stale(false).await.expect("refresh should succeed");

    assert_eq!(report.considered(), 1);
    assert_eq!(report.refreshed, vec![(10, "Home page".to_string())]);
    assert!(report.skipped.is_empty());
    assert_eq!(h.provider.refreshed.lock().unwrap().as_slice(), &[10]);

    let settings = h.store.settings.lock().unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].source_id, 10);
    assert_eq!(settings[0].job_ids, vec![1, 2]);
    assert_eq!(settings[0].template_id, "template-1");
    assert_eq!(
        settings[0].name,
        format!("Home page_{}", version.format("%Y-%m-%d"))
    );
}

/// A source with a project still open on the remote service is skipped:
/// queueing a new version would race the pending import.
#[tokio::test]
async fn refresh_skips_sources_with_open_projects() {
    let h = harness();
    seed_exported_project(&h, 10, "proj1", &[(1, "fr")]).await;
    h.provider.add_stale(10, "Home page", Utc::now());
    h.provider.add_job(5, 20, "fr", true);
    h.provider.add_stale(20, "About page", Utc::now());

    let report = h.engine.refresh_stale(false).await.expect("refresh should succeed");

    assert_eq!(report.skipped, vec![(10, "Home page".to_string())]);
    assert_eq!(report.refreshed, vec![(20, "About page".to_string())]);
    assert_eq!(h.provider.refreshed.lock().unwrap().as_slice(), &[20]);
}

/// Dry run: the same report, but no writes, no source refreshes, and no
/// remote traffic.
#[tokio::test]
async fn dry_run_computes_report_without_mutating() {
    let h = harness();
    h.provider.add_job(1, 10, "fr", true);
    h.provider.add_stale(10, "Home page", Utc::now());

    let report = h.engine.refresh_stale(true).await.expect("refresh should succeed");

    assert_eq!(report.refreshed, vec![(10, "Home page".to_string())]);
    assert_eq!(h.store.settings_count(), 0);
    assert!(h.provider.refreshed.lock().unwrap().is_empty());
    assert_eq!(h.client.auth_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.client.create_project_calls.load(Ordering::SeqCst), 0);
}

/// A second refresh for the same source version finds the existing
/// settings row and does not duplicate it.
#[tokio::test]
async fn refresh_is_idempotent_per_source_version() {
    let h = harness();
    h.provider.add_job(1, 10, "fr", true);
    h.provider.add_stale(10, "Home page", Utc::now());

    let first = h.engine.refresh_stale(false).await.expect("refresh should succeed");
    let second = h.engine.refresh_stale(false).await.expect("refresh should succeed");

    assert_eq!(first.refreshed.len(), 1);
    assert_eq!(second.refreshed.len(), 0);
    assert_eq!(second.skipped.len(), 1);
    assert_eq!(h.store.settings_count(), 1);
}

/// Sources with no enabled jobs have nothing to queue.
#[tokio::test]
async fn refresh_ignores_sources_without_enabled_jobs() {
    let h = harness();
    h.provider.add_job(1, 10, "fr", false);
    h.provider.add_stale(10, "Home page", Utc::now());

    let report = h.engine.refresh_stale(false).await.expect("refresh should succeed");

    assert!(report.refreshed.is_empty());
    assert_eq!(h.store.settings_count(), 0);
}
