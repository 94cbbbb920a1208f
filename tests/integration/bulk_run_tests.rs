/*!
 * Integration tests for whole translation runs over the in-memory catalog
 */

use std::sync::Arc;
use std::time::Duration;

use catalogtl::catalog::{CatalogStore, Document, MemoryCatalogStore, PartialUpdate};
use catalogtl::notify::RecordingNotifier;
use catalogtl::pipeline::{CancellationController, CollectionPhase};
use catalogtl::providers::MockBackend;

use crate::common::{
    fixed_config, harness, idle_probe, movie, movies_collection, numbered_movies, series,
    series_collection,
};

#[tokio::test]
async fn test_run_with45Docs_batch20_oneWorker_shouldTranslateEverything() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(45)),
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 20, 0),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    assert!(!summary.cancelled);
    assert_eq!(summary.total_done(), 45);
    assert_eq!(summary.total_errors(), 0);
    assert_eq!((summary.plan.workers, summary.plan.batch_size), (1, 20));
    assert_eq!(h.store.write_count(), 45);

    // one render per batch with a zero interval: 20, 20, 5
    let edits = h.notifier.edits();
    assert_eq!(edits.len(), 3);
    assert!(edits[0].contains("movies: 20/45"));
    assert!(edits[1].contains("movies: 40/45"));
    assert!(edits[2].contains("movies: 45/45"));

    let last = h.store.get("movies", "m044").unwrap();
    assert_eq!(last.text("description"), Some("[ru] Plot of movie 44"));
    assert_eq!(last.text("translated_to"), Some("ru"));
}

#[tokio::test]
async fn test_run_withCrashingSecondBatch_shouldFailOnlyThatBatch() {
    let mut docs = numbered_movies(45);
    docs[25] = movie("m025", "boom goes the plot");
    let h = harness(
        MemoryCatalogStore::with_collection("movies", docs),
        MockBackend::panicking_on("boom"),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 20, 0),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    let movies = summary.collection("movies").unwrap();
    assert_eq!(movies.errors, 20);
    assert_eq!(movies.done, 25);
    assert_eq!(movies.phase, CollectionPhase::Finished);

    // the crashed batch wrote nothing, the third batch still ran
    let crashed = h.store.get("movies", "m020").unwrap();
    assert_eq!(crashed.text("description"), Some("Plot of movie 20"));
    assert!(crashed.get("translated_to").is_none());
    let after = h.store.get("movies", "m040").unwrap();
    assert_eq!(after.text("translated_to"), Some("ru"));
}

#[tokio::test]
async fn test_run_withRejectedWrite_shouldCountErrorPerDocument() {
    let store = MemoryCatalogStore::with_collection("movies", numbered_movies(10));
    store.fail_writes_for("m003");
    store.fail_writes_for("m007");
    let h = harness(
        store,
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 2, 5, 5),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    assert_eq!(summary.total_done(), 8);
    assert_eq!(summary.total_errors(), 2);
    assert_eq!(h.store.write_count(), 8);
    assert!(h.store.get("movies", "m004").unwrap().text("translated_to").is_some());
}

#[tokio::test]
async fn test_run_withEmptyDocuments_shouldCountDoneWithoutWriting() {
    let docs = vec![
        Document::new("a"),
        movie("b", "  "),
        movie("c", "Real text"),
    ];
    let h = harness(
        MemoryCatalogStore::with_collection("movies", docs),
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 20, 5),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    assert_eq!(summary.total_done(), 3);
    assert_eq!(h.store.write_count(), 1);
    assert_eq!(h.backend.request_count(), 1);
}

#[tokio::test]
async fn test_rerun_afterCompletion_shouldNotTranslateAgain() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(12)),
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 2, 5, 5),
    );
    let controller = CancellationController::new();

    let first = {
        let ticket = controller.begin_run().unwrap();
        h.orchestrator.run(&ticket, &idle_probe()).await
    };
    assert_eq!(first.total_done(), 12);
    let calls = h.backend.request_count();
    let writes = h.store.write_count();
    let snapshot = h.store.get("movies", "m005").unwrap();

    let second = {
        let ticket = controller.begin_run().unwrap();
        h.orchestrator.run(&ticket, &idle_probe()).await
    };

    assert_eq!(second.collection("movies").unwrap().total, 0);
    assert_eq!(second.total_done(), 0);
    assert_eq!(h.backend.request_count(), calls);
    assert_eq!(h.store.write_count(), writes);
    assert_eq!(h.store.get("movies", "m005").unwrap(), snapshot);
}

#[tokio::test]
async fn test_run_withLongInterval_shouldThrottleRenders() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(30)),
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 10, 60),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    h.orchestrator.run(&ticket, &idle_probe()).await;

    // first batch renders at once, the second is throttled, the last is forced
    let edits = h.notifier.edits();
    assert_eq!(edits.len(), 2);
    assert!(edits[0].contains("movies: 10/30"));
    assert!(edits[1].contains("movies: 30/30"));
}

#[tokio::test]
async fn test_run_withUnavailableNotifier_shouldStillFinishAndAttemptSummary() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(6)),
        MockBackend::working(),
        RecordingNotifier::unavailable(),
        fixed_config(vec![movies_collection()], 2, 3, 0),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    assert_eq!(summary.total_done(), 6);
    assert_eq!(summary.total_errors(), 0);
    let sends = h.notifier.sends();
    assert!(sends.last().unwrap().contains("Translation finished"));
    assert!(h.notifier.edit_count() >= 1);
}

#[tokio::test]
async fn test_run_withFailingBackend_shouldKeepOriginalsUnstamped() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(4)),
        MockBackend::failing(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 10, 5),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    // translation failures are absorbed, documents stay eligible for a re-run
    assert_eq!(summary.total_done(), 4);
    assert_eq!(summary.total_errors(), 0);
    let doc = h.store.get("movies", "m001").unwrap();
    assert_eq!(doc.text("description"), Some("Plot of movie 1"));
    assert!(doc.get("translated_to").is_none());
}

#[tokio::test]
async fn test_run_withTwoCollections_shouldProcessBothInOrder() {
    let store = MemoryCatalogStore::with_collection("movies", numbered_movies(3));
    store.insert_all("series", vec![series("s1", 2, 3), series("s2", 1, 1)]);
    let h = harness(
        store,
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection(), series_collection()], 2, 2, 5),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    let names: Vec<_> = summary.collections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["movies", "series"]);
    assert_eq!(summary.total_done(), 5);

    let s1 = h.store.get("series", "s1").unwrap();
    assert_eq!(s1.text("description"), Some("[ru] Series s1"));
    assert_eq!(
        s1.get("seasons").unwrap()[1]["episodes"][2]["title"],
        serde_json::json!("[ru] Episode 2x3")
    );
    assert_eq!(s1.text("translated_to"), Some("ru"));
}

/// Whole-field writes carry no concurrency check: an edit made between the
/// batch fetch and the write-back is lost.
#[tokio::test]
async fn test_run_withConcurrentEdit_shouldOverwriteIt() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", vec![movie("m1", "Original plot")]),
        MockBackend::slow(200),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 10, 5),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    let store = h.store.clone();
    let editor = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut update = PartialUpdate::new();
        update.set("description", "Edited by an operator");
        store.apply_update("movies", "m1", &update).await
    });

    h.orchestrator.run(&ticket, &idle_probe()).await;
    editor.await.unwrap().unwrap();

    let doc = h.store.get("movies", "m1").unwrap();
    assert_eq!(doc.text("description"), Some("[ru] Original plot"));
    assert_eq!(h.store.write_count(), 2);
}

#[tokio::test]
async fn test_run_withMissingCollection_shouldReportZeroTotals() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(2)),
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![series_collection(), movies_collection()], 1, 5, 5),
    );
    let controller = Arc::new(CancellationController::new());
    let ticket = controller.begin_run().unwrap();

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    let series = summary.collection("series").unwrap();
    assert_eq!((series.total, series.done), (0, 0));
    assert_eq!(summary.collection("movies").unwrap().done, 2);
}
