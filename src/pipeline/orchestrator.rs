/*!
 * Run orchestrator.
 *
 * Drives one bulk translation run end to end:
 * 1. Preparing: size the pool, count every configured collection
 * 2. Translating: per collection, enumerate ids, chunk them, fan the batches
 *    out to the worker pool, persist results and report progress
 * 3. Summarizing: build the run summary and post it
 *
 * Collections are processed one after another. Persistence happens here, on
 * the coordinating task, one partial update per document.
 */

use log::{debug, error, info, warn};
use std::fmt;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;

use super::batcher::chunk_ids;
use super::cancellation::RunTicket;
use super::progress::{format_duration, CollectionPhase, CollectionProgress, ProgressAggregator};
use super::scheduler::{log_plan, BatchOutcome, ExecutionPlan, SizingPolicy, WorkerPool};
use super::worker::{BatchResult, WorkerContext};
use crate::app_config::{CollectionConfig, Config};
use crate::catalog::{CatalogStore, DocumentFilter};
use crate::notify::Notifier;
use crate::providers::TranslationBackend;
use crate::system_probe::ResourceProbe;
use crate::translation::LanguagePair;

/// Coarse state of a run, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Preparing,
    Translating,
    Summarizing,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Preparing => write!(f, "preparing"),
            Self::Translating => write!(f, "translating"),
            Self::Summarizing => write!(f, "summarizing"),
        }
    }
}

/// Final report of a run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub collections: Vec<CollectionProgress>,
    pub elapsed: Duration,
    pub cancelled: bool,
    pub plan: ExecutionPlan,
}

impl RunSummary {
    pub fn total_done(&self) -> usize {
        self.collections.iter().map(|c| c.done).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.collections.iter().map(|c| c.errors).sum()
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionProgress> {
        self.collections.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.cancelled { "cancelled" } else { "finished" };
        writeln!(
            f,
            "Translation {} in {} (run {})",
            status,
            format_duration(self.elapsed),
            self.run_id
        )?;
        for c in &self.collections {
            write!(f, "{}: {}/{} ({} errors)", c.name, c.done, c.total, c.errors)?;
            if c.phase != CollectionPhase::Finished {
                write!(f, " [stopped]")?;
            }
            if let Some(note) = &c.note {
                write!(f, " - {}", note)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "Total: {} done, {} errors ({} workers, batches of {})",
            self.total_done(),
            self.total_errors(),
            self.plan.workers,
            self.plan.batch_size
        )
    }
}

/// Runs bulk translation over the configured collections
pub struct RunOrchestrator {
    store: Arc<dyn CatalogStore>,
    backend: Arc<dyn TranslationBackend>,
    notifier: Arc<dyn Notifier>,
    config: Config,
}

impl RunOrchestrator {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        backend: Arc<dyn TranslationBackend>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        Self {
            store,
            backend,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn filter(&self) -> DocumentFilter {
        if self.config.pipeline.skip_translated {
            DocumentFilter::MissingField(self.config.pipeline.marker_field.clone())
        } else {
            DocumentFilter::All
        }
    }

    fn enter(&self, ticket: &RunTicket, phase: RunPhase) {
        info!("Run {}: {}", ticket.run_id(), phase);
    }

    /// Execute one run. Always returns a summary, even when cancelled.
    pub async fn run(&self, ticket: &RunTicket, probe: &dyn ResourceProbe) -> RunSummary {
        let started = Instant::now();
        let pipeline = &self.config.pipeline;
        let languages = LanguagePair::new(&self.config.source_language, &self.config.target_language);
        let filter = self.filter();

        // Preparing
        self.enter(ticket, RunPhase::Preparing);
        let plan = SizingPolicy::from_config(pipeline).plan_with_overrides(probe, pipeline);
        log_plan(&plan, &languages);

        let mut aggregator = ProgressAggregator::with_start(pipeline.progress_interval(), started);
        let mut runnable: Vec<&CollectionConfig> = Vec::new();
        for collection in &self.config.collections {
            match self.store.count(&collection.name, &filter).await {
                Ok(total) => {
                    info!("{}: {} document(s) to translate", collection.name, total);
                    aggregator.register(&collection.name, total);
                    runnable.push(collection);
                }
                Err(e) => {
                    error!("Failed to count {}: {}", collection.name, e);
                    aggregator.register_failed(&collection.name, format!("count failed: {}", e));
                }
            }
        }

        if let Err(e) = self
            .notifier
            .send_message(&aggregator.snapshot(Instant::now()).to_string())
            .await
        {
            debug!("Initial status not delivered: {}", e);
        }

        // Translating
        self.enter(ticket, RunPhase::Translating);
        let pool = WorkerPool::new(plan.workers, self.backend.clone());
        let last = runnable.len().saturating_sub(1);

        // decided at the point the loop stops, not by a later signal
        let mut cancelled = false;
        for (position, collection) in runnable.iter().enumerate() {
            if ticket.is_cancelled() {
                info!("Cancelled before {}", collection.name);
                cancelled = true;
                break;
            }

            let completed = self
                .translate_collection(
                    collection,
                    &filter,
                    &languages,
                    &plan,
                    &pool,
                    ticket,
                    &mut aggregator,
                    position == last,
                )
                .await;
            if !completed {
                cancelled = true;
                break;
            }
        }

        // Summarizing
        self.enter(ticket, RunPhase::Summarizing);
        let summary = RunSummary {
            run_id: ticket.run_id().to_string(),
            collections: aggregator.snapshot(Instant::now()).collections,
            elapsed: started.elapsed(),
            cancelled,
            plan,
        };
        info!(
            "Run {} {}: {} done, {} errors",
            summary.run_id,
            if summary.cancelled { "cancelled" } else { "finished" },
            summary.total_done(),
            summary.total_errors()
        );

        if let Err(e) = self.notifier.send_message(&summary.to_string()).await {
            warn!("Failed to send run summary: {}", e);
        }

        self.enter(ticket, RunPhase::Idle);
        summary
    }

    /// Translate one collection. Returns false when the stop signal left any
    /// document of the collection not fully scanned.
    #[allow(clippy::too_many_arguments)]
    async fn translate_collection(
        &self,
        collection: &CollectionConfig,
        filter: &DocumentFilter,
        languages: &LanguagePair,
        plan: &ExecutionPlan,
        pool: &WorkerPool,
        ticket: &RunTicket,
        aggregator: &mut ProgressAggregator,
        is_last_collection: bool,
    ) -> bool {
        let name = collection.name.as_str();
        aggregator.start(name);
        info!("Translating collection {}", name);

        let ids = match self.store.ids(name, filter).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to enumerate {}: {}", name, e);
                aggregator.fail(name, format!("enumeration failed: {}", e));
                return true;
            }
        };

        let chunks = chunk_ids(ids, plan.batch_size);
        let total_batches = chunks.len();
        let context = Arc::new(WorkerContext {
            collection: collection.clone(),
            languages: languages.clone(),
            marker_field: Some(self.config.pipeline.marker_field.clone()),
        });

        let mut received = 0;
        let mut cut_short = 0;
        let mut outcomes = pin!(pool.run_batches(self.store.as_ref(), name, chunks, ticket, context));

        while let Some(outcome) = outcomes.next().await {
            received += 1;
            let index = outcome.index();

            let (done, errors) = match outcome {
                BatchOutcome::Completed {
                    results, missing, ..
                } => {
                    cut_short += results.iter().filter(|r| r.stopped_early()).count();
                    if missing > 0 {
                        warn!("{} document(s) of batch {} vanished from {}", missing, index + 1, name);
                    }
                    let (done, errors) = self.persist(name, results).await;
                    (done, errors + missing)
                }
                BatchOutcome::Failed { ids, reason, .. } => {
                    error!("Batch {}/{} of {} failed: {}", index + 1, total_batches, name, reason);
                    (0, ids.len())
                }
            };

            aggregator.record_batch(name, done, errors);
            debug!("Batch {}/{} of {}: {} done, {} errors", index + 1, total_batches, name, done, errors);

            let force = is_last_collection && index + 1 == total_batches;
            if aggregator.should_emit(Instant::now(), force) {
                let text = aggregator.snapshot(Instant::now()).to_string();
                if let Err(e) = self.notifier.edit_last_message(&text).await {
                    debug!("Progress render skipped: {}", e);
                }
            }
        }

        if received < total_batches || cut_short > 0 {
            info!(
                "Collection {} stopped after {}/{} batches, {} document(s) not fully scanned",
                name, received, total_batches, cut_short
            );
            return false;
        }

        aggregator.finish(name);
        if let Some(progress) = aggregator.collection(name) {
            info!(
                "Collection {} finished: {}/{} done, {} errors",
                name, progress.done, progress.total, progress.errors
            );
        }
        true
    }

    /// Write back every visited result, one document at a time
    async fn persist(&self, collection: &str, results: Vec<BatchResult>) -> (usize, usize) {
        let mut done = 0;
        let mut errors = 0;

        for result in results {
            if !result.visited {
                continue;
            }
            if result.update.is_empty() {
                done += 1;
                continue;
            }
            match self.store.apply_update(collection, &result.id, &result.update).await {
                Ok(()) => done += 1,
                Err(e) => {
                    warn!("Failed to save {}/{}: {}", collection, result.id, e);
                    errors += 1;
                }
            }
        }

        (done, errors)
    }
}
