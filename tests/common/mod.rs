/*!
 * Common test utilities for the catalogtl test suite
 */

use serde_json::json;
use std::sync::Arc;

use catalogtl::app_config::{CollectionConfig, Config, NestedTextConfig};
use catalogtl::catalog::{Document, MemoryCatalogStore};
use catalogtl::notify::RecordingNotifier;
use catalogtl::pipeline::RunOrchestrator;
use catalogtl::providers::MockBackend;
use catalogtl::system_probe::FixedProbe;

/// Route library logs to the test output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A movie with a description
pub fn movie(id: &str, description: &str) -> Document {
    Document::new(id).with_field("description", description)
}

/// `count` movies with zero-padded ids so enumeration order matches creation order
pub fn numbered_movies(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| movie(&format!("m{:03}", i), &format!("Plot of movie {}", i)))
        .collect()
}

/// A series with `seasons` seasons of `episodes` episodes each
pub fn series(id: &str, seasons: usize, episodes: usize) -> Document {
    let seasons: Vec<_> = (1..=seasons)
        .map(|s| {
            let episodes: Vec<_> = (1..=episodes)
                .map(|e| {
                    json!({
                        "number": e,
                        "title": format!("Episode {}x{}", s, e),
                        "overview": format!("Things happen in {}x{}", s, e),
                    })
                })
                .collect();
            json!({"number": s, "episodes": episodes})
        })
        .collect();

    Document::new(id)
        .with_field("description", format!("Series {}", id))
        .with_field("seasons", seasons)
}

/// Configuration over the given collections with fixed sizing
pub fn fixed_config(
    collections: Vec<CollectionConfig>,
    workers: usize,
    batch_size: usize,
    progress_interval_secs: u64,
) -> Config {
    let mut config = Config {
        collections,
        ..Config::default()
    };
    config.pipeline.worker_override = Some(workers);
    config.pipeline.batch_size_override = Some(batch_size);
    config.pipeline.progress_interval_secs = progress_interval_secs;
    config
}

pub fn movies_collection() -> CollectionConfig {
    CollectionConfig::flat("movies", &["description"])
}

pub fn series_collection() -> CollectionConfig {
    CollectionConfig::flat("series", &["description"]).with_nested(NestedTextConfig::default())
}

/// Probe of an idle machine
pub fn idle_probe() -> FixedProbe {
    FixedProbe::new(4, 20.0)
}

/// Everything a run needs, with handles kept for assertions
pub struct Harness {
    pub store: Arc<MemoryCatalogStore>,
    pub backend: Arc<MockBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: RunOrchestrator,
}

pub fn harness(
    store: MemoryCatalogStore,
    backend: MockBackend,
    notifier: RecordingNotifier,
    config: Config,
) -> Harness {
    init_logging();
    let store = Arc::new(store);
    let backend = Arc::new(backend);
    let notifier = Arc::new(notifier);
    let orchestrator = RunOrchestrator::new(store.clone(), backend.clone(), notifier.clone(), config);
    Harness {
        store,
        backend,
        notifier,
        orchestrator,
    }
}

/// Ids of the documents stamped with a target language
pub fn stamped_ids(store: &MemoryCatalogStore, collection: &str, ids: &[String]) -> Vec<String> {
    ids.iter()
        .filter(|id| {
            store
                .get(collection, id)
                .is_some_and(|doc| doc.text("translated_to").is_some())
        })
        .cloned()
        .collect()
}
