/*!
 * Integration tests for cooperative cancellation and resumed runs
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use catalogtl::catalog::MemoryCatalogStore;
use catalogtl::errors::{NotifyError, PipelineError};
use catalogtl::notify::{Notifier, RecordingNotifier};
use catalogtl::pipeline::{CancellationController, CollectionPhase, RunOrchestrator};
use catalogtl::providers::MockBackend;

use crate::common::{
    fixed_config, harness, idle_probe, movies_collection, numbered_movies, series,
    series_collection, stamped_ids,
};

fn cancel_after(controller: &Arc<CancellationController>, delay: Duration) {
    let controller = controller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        controller.cancel();
    });
}

/// Notifier that raises the cancel flag once a given progress line renders
struct CancelOnRender {
    controller: Arc<CancellationController>,
    trigger: &'static str,
    inner: RecordingNotifier,
}

#[async_trait]
impl Notifier for CancelOnRender {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.inner.send_message(text).await
    }

    async fn edit_last_message(&self, text: &str) -> Result<(), NotifyError> {
        if text.contains(self.trigger) {
            self.controller.cancel();
        }
        self.inner.edit_last_message(text).await
    }
}

#[tokio::test]
async fn test_cancel_midRun_shouldStopEarlyAndResumeOnRerun() {
    let docs = numbered_movies(40);
    let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
    let h = harness(
        MemoryCatalogStore::with_collection("movies", docs),
        MockBackend::slow(20),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 5, 5),
    );
    let controller = Arc::new(CancellationController::new());

    let first = {
        let ticket = controller.begin_run().unwrap();
        cancel_after(&controller, Duration::from_millis(150));
        h.orchestrator.run(&ticket, &idle_probe()).await
    };

    assert!(first.cancelled);
    let movies = first.collection("movies").unwrap();
    assert!(movies.done < 40);
    assert_eq!(movies.errors, 0);
    assert_eq!(movies.phase, CollectionPhase::Running);
    assert!(first.to_string().contains("[stopped]"));

    // every counted document was committed, nothing else was touched
    let stamped = stamped_ids(&h.store, "movies", &ids);
    assert_eq!(stamped.len(), movies.done);
    assert_eq!(h.store.write_count(), movies.done);
    assert_eq!(h.backend.request_count(), movies.done);

    let second = {
        let ticket = controller.begin_run().unwrap();
        h.orchestrator.run(&ticket, &idle_probe()).await
    };

    assert!(!second.cancelled);
    assert_eq!(second.total_done(), 40 - movies.done);
    assert_eq!(stamped_ids(&h.store, "movies", &ids).len(), 40);
    // no document was translated twice
    assert_eq!(h.backend.request_count(), 40);
}

#[tokio::test]
async fn test_cancel_beforeRun_shouldDispatchNothing() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(10)),
        MockBackend::working(),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection(), series_collection()], 2, 5, 5),
    );
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();
    assert!(controller.cancel());

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    assert!(summary.cancelled);
    assert_eq!(summary.total_done(), 0);
    assert_eq!(summary.collection("movies").unwrap().total, 10);
    assert_eq!(h.backend.request_count(), 0);
    assert!(h.notifier.sends().last().unwrap().contains("Translation cancelled"));
}

#[tokio::test]
async fn test_beginRun_whileRunning_shouldBeRejected() {
    let controller = CancellationController::new();
    let ticket = controller.begin_run().unwrap();

    assert!(matches!(controller.begin_run(), Err(PipelineError::RunInProgress)));
    drop(ticket);
    assert!(controller.begin_run().is_ok());
}

#[tokio::test]
async fn test_cancel_insideEpisodes_shouldWritePartialSeriesWithoutMarker() {
    let h = harness(
        MemoryCatalogStore::with_collection("series", vec![series("s1", 1, 10)]),
        MockBackend::slow(20),
        RecordingNotifier::new(),
        fixed_config(vec![series_collection()], 1, 5, 5),
    );
    let controller = Arc::new(CancellationController::new());
    let ticket = controller.begin_run().unwrap();
    cancel_after(&controller, Duration::from_millis(100));

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;
    assert!(summary.cancelled);
    let progress = summary.collection("series").unwrap();
    assert_eq!(progress.phase, CollectionPhase::Running);
    assert!(summary.to_string().contains("[stopped]"));

    let s1 = h.store.get("series", "s1").unwrap();
    assert!(s1.get("translated_to").is_none());
    assert_eq!(s1.text("description"), Some("[ru] Series s1"));

    let episodes = s1.get("seasons").unwrap()[0]["episodes"].as_array().unwrap().clone();
    assert_eq!(episodes.len(), 10);
    assert!(episodes[0]["title"].as_str().unwrap().starts_with("[ru]"));
    assert_eq!(episodes[9]["title"], serde_json::json!("Episode 1x10"));
}

#[tokio::test]
async fn test_cancel_duringLastBatch_shouldLeaveCollectionStopped() {
    let h = harness(
        MemoryCatalogStore::with_collection("movies", numbered_movies(5)),
        MockBackend::slow(40),
        RecordingNotifier::new(),
        fixed_config(vec![movies_collection()], 1, 5, 5),
    );
    let controller = Arc::new(CancellationController::new());
    let ticket = controller.begin_run().unwrap();
    cancel_after(&controller, Duration::from_millis(60));

    let summary = h.orchestrator.run(&ticket, &idle_probe()).await;

    // the only batch came back, but with documents it never scanned
    assert!(summary.cancelled);
    let movies = summary.collection("movies").unwrap();
    assert!(movies.done < 5);
    assert_eq!(movies.errors, 0);
    assert_ne!(movies.phase, CollectionPhase::Finished);
    let text = summary.to_string();
    assert!(text.starts_with("Translation cancelled"));
    assert!(text.contains(&format!("movies: {}/5 (0 errors) [stopped]", movies.done)));
}

#[tokio::test]
async fn test_cancel_afterLastWrite_shouldReportFinishedRun() {
    let store = Arc::new(MemoryCatalogStore::with_collection("movies", numbered_movies(10)));
    let controller = Arc::new(CancellationController::new());
    let notifier = Arc::new(CancelOnRender {
        controller: controller.clone(),
        trigger: "movies: 10/10",
        inner: RecordingNotifier::new(),
    });
    let orchestrator = RunOrchestrator::new(
        store.clone(),
        Arc::new(MockBackend::working()),
        notifier.clone(),
        fixed_config(vec![movies_collection()], 1, 5, 0),
    );
    let ticket = controller.begin_run().unwrap();

    let summary = orchestrator.run(&ticket, &idle_probe()).await;

    assert!(controller.is_cancelled());
    assert!(!summary.cancelled);
    let movies = summary.collection("movies").unwrap();
    assert_eq!((movies.done, movies.phase), (10, CollectionPhase::Finished));
    assert!(notifier.inner.sends().last().unwrap().contains("Translation finished"));
}
