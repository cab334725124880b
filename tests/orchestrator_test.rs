//! Integration tests for the refresh cycle

mod common;

use common::{capture_logs, directory_json, guide_json, source_with_channels, MockSource};
use epgsync::models::{sort_entries, EpgEntry};
use epgsync::parser::JsonParser;
use epgsync::refresh::{RefreshOrchestrator, RunReport};
use epgsync::snapshot::SnapshotStore;
use std::collections::HashSet;
use std::sync::Arc;

fn orchestrator(source: Arc<MockSource>, limit: usize) -> RefreshOrchestrator {
    RefreshOrchestrator::new(
        source,
        Arc::new(JsonParser::new()),
        SnapshotStore::new_arc(),
        limit,
    )
}

#[tokio::test]
async fn test_partial_failure_publishes_survivors() {
    let source = MockSource::new()
        .with_directory(directory_json(&["A", "B", "C"]))
        .with_guide("A", guide_json("A", 2))
        .with_guide("B", guide_json("B", 3))
        .with_guide("C", guide_json("C", 2))
        .failing("B");
    let orchestrator = orchestrator(Arc::new(source), 2);

    let report = orchestrator.run().await;

    assert!(report.is_completed());
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].channel_id.as_str(), "B");

    let store = orchestrator.store();
    assert_eq!(store.load_channels().unwrap().items.len(), 3);

    let epgs = store.load_epgs().unwrap();
    assert_eq!(epgs.items.len(), 4);
    let tagged: HashSet<&str> = epgs.items.iter().map(|e| e.channel_id.as_str()).collect();
    assert_eq!(tagged, HashSet::from(["A", "C"]));
}

#[tokio::test]
async fn test_failed_channel_is_logged_with_its_id() {
    let (logs, _guard) = capture_logs();

    let source = MockSource::new()
        .with_directory(directory_json(&["A", "B", "C"]))
        .with_guide("A", guide_json("A", 2))
        .with_guide("C", guide_json("C", 2))
        .failing("B");
    let orchestrator = orchestrator(Arc::new(source), 2);

    assert!(orchestrator.run().await.is_completed());

    let output = logs.contents();
    let failure_lines: Vec<&str> = output
        .lines()
        .filter(|line| line.contains("Guide fetch failed"))
        .collect();
    assert_eq!(failure_lines.len(), 1, "log output:\n{output}");
    assert!(failure_lines[0].contains("ERROR"));
    assert!(failure_lines[0].contains("channel_id=B"));
}

#[tokio::test]
async fn test_directory_failure_is_logged() {
    let (logs, _guard) = capture_logs();

    let orchestrator = orchestrator(Arc::new(MockSource::new()), 2);
    orchestrator.run().await;

    let output = logs.contents();
    assert!(output.contains("Channel refresh failed, skipping EPG phase"));
    assert!(output.contains("category=\"network\"") || output.contains("category=network"));
}

#[tokio::test]
async fn test_directory_failure_skips_guides() {
    let source = Arc::new(MockSource::new());
    let orchestrator = orchestrator(source.clone(), 4);

    let report = orchestrator.run().await;

    assert!(matches!(report, RunReport::DirectoryFailed { .. }));
    assert!(source.guide_calls().is_empty());
    assert!(orchestrator.store().load_channels().is_none());
    assert!(orchestrator.store().load_epgs().is_none());
}

#[tokio::test]
async fn test_directory_failure_keeps_previous_snapshots() {
    let source = Arc::new(source_with_channels(&["x", "y"], 2));
    let orchestrator = orchestrator(source.clone(), 4);

    assert!(orchestrator.run().await.is_completed());
    let channels_before = orchestrator.store().load_channels().unwrap();
    let epgs_before = orchestrator.store().load_epgs().unwrap();

    source.set_directory(None);
    let report = orchestrator.run().await;
    assert!(!report.is_completed());

    let channels_after = orchestrator.store().load_channels().unwrap();
    let epgs_after = orchestrator.store().load_epgs().unwrap();
    assert!(Arc::ptr_eq(&channels_before, &channels_after));
    assert!(Arc::ptr_eq(&epgs_before, &epgs_after));
}

#[tokio::test]
async fn test_unparsable_directory_aborts_run() {
    let source = Arc::new(MockSource::new().with_directory("{\"channels\": 42}"));
    let orchestrator = orchestrator(source.clone(), 4);

    let report = orchestrator.run().await;

    assert!(matches!(report, RunReport::DirectoryFailed { .. }));
    assert!(source.guide_calls().is_empty());
    assert!(orchestrator.store().load_channels().is_none());
}

#[tokio::test]
async fn test_empty_directory_publishes_empty_snapshots() {
    let source = Arc::new(MockSource::new().with_directory("[]"));
    let orchestrator = orchestrator(source, 4);

    assert!(orchestrator.run().await.is_completed());

    // Published empty, not unset
    assert!(orchestrator.store().load_channels().unwrap().items.is_empty());
    assert!(orchestrator.store().load_epgs().unwrap().items.is_empty());
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent() {
    let source = Arc::new(source_with_channels(&["a", "b", "c", "d"], 3));
    let orchestrator = orchestrator(source, 2);

    let sorted = |orchestrator: &RefreshOrchestrator| -> Vec<EpgEntry> {
        let mut entries = orchestrator.store().load_epgs().unwrap().items.clone();
        sort_entries(&mut entries);
        entries
    };

    orchestrator.run().await;
    let first = sorted(&orchestrator);
    let first_version = orchestrator.store().load_epgs().unwrap().version;

    orchestrator.run().await;
    let second = sorted(&orchestrator);

    assert_eq!(first.len(), 12);
    assert_eq!(first, second);
    assert_eq!(
        orchestrator.store().load_epgs().unwrap().version,
        first_version + 1
    );
}

#[tokio::test]
async fn test_epg_phase_fetches_channels_when_unset() {
    let source = Arc::new(source_with_channels(&["a", "b"], 1));
    let orchestrator = orchestrator(source.clone(), 4);

    let report = orchestrator.refresh_epgs().await.unwrap();

    assert_eq!(source.directory_calls(), 1);
    assert_eq!(report.channels, 2);
    assert_eq!(report.entries, 2);
    assert!(orchestrator.store().load_channels().is_some());
}

#[tokio::test]
async fn test_epg_phase_uses_existing_channel_snapshot() {
    let source = Arc::new(source_with_channels(&["a", "b"], 1));
    let orchestrator = orchestrator(source.clone(), 4);

    orchestrator.refresh_channels().await.unwrap();
    orchestrator.refresh_epgs().await.unwrap();

    assert_eq!(source.directory_calls(), 1);
}

#[tokio::test]
async fn test_epg_phase_fallback_failure_aborts() {
    let source = Arc::new(MockSource::new());
    let orchestrator = orchestrator(source.clone(), 4);

    assert!(orchestrator.refresh_epgs().await.is_err());
    assert!(source.guide_calls().is_empty());
    assert!(orchestrator.store().load_epgs().is_none());
}
