/*!
 * Worker pool scheduler and dynamic sizing.
 *
 * The pool size and batch size are derived once per run from a resource
 * sample. Batches are dispatched onto spawned execution units with a bounded
 * fan-out: never more batches in flight than workers, results handed back in
 * dispatch order. A crashed unit fails only its own batch.
 */

use futures::future;
use futures::stream::{self, Stream, StreamExt};
use log::{debug, info};
use std::sync::Arc;

use super::cancellation::RunTicket;
use super::worker::{process_batch, BatchResult, WorkerContext};
use crate::app_config::PipelineConfig;
use crate::catalog::{CatalogStore, Document};
use crate::providers::TranslationBackend;
use crate::system_probe::{ResourceProbe, ResourceSample};
use crate::translation::LanguagePair;

/// Sizing limits applied to every run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingPolicy {
    /// Upper bound on parallel execution units
    pub max_workers: usize,
    /// Hard safety ceiling on documents per batch
    pub batch_size_ceiling: usize,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_size_ceiling: 20,
        }
    }
}

impl SizingPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            batch_size_ceiling: config.batch_size_ceiling,
        }
    }

    /// One worker per core up to the ceiling, at least one
    pub fn worker_count(&self, cpu_count: usize) -> usize {
        cpu_count.min(self.max_workers).max(1)
    }

    /// Batch size from RAM pressure, before the safety ceiling
    pub fn raw_batch_size(ram_utilization: f32) -> usize {
        if ram_utilization < 50.0 {
            50
        } else if ram_utilization < 75.0 {
            25
        } else {
            10
        }
    }

    /// Batch size from RAM pressure, capped by the safety ceiling
    pub fn batch_size(&self, ram_utilization: f32) -> usize {
        Self::raw_batch_size(ram_utilization).min(self.batch_size_ceiling.max(1))
    }

    /// Sample the probe and derive the plan of a run
    pub fn plan(&self, probe: &dyn ResourceProbe) -> ExecutionPlan {
        let sample = probe.sample();
        ExecutionPlan {
            workers: self.worker_count(sample.cpu_count),
            batch_size: self.batch_size(sample.ram_utilization),
            sample,
        }
    }

    /// Derive a plan, then apply fixed overrides from the configuration
    pub fn plan_with_overrides(&self, probe: &dyn ResourceProbe, config: &PipelineConfig) -> ExecutionPlan {
        let mut plan = self.plan(probe);
        if let Some(workers) = config.worker_override {
            plan.workers = workers.max(1);
        }
        if let Some(batch_size) = config.batch_size_override {
            plan.batch_size = batch_size.clamp(1, self.batch_size_ceiling.max(1));
        }
        plan
    }
}

/// Worker and batch sizing of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionPlan {
    pub workers: usize,
    pub batch_size: usize,
    /// The sample the plan was derived from
    pub sample: ResourceSample,
}

/// What came back from one dispatched batch
#[derive(Debug)]
pub enum BatchOutcome {
    /// The worker returned; `missing` ids vanished from the store before dispatch
    Completed {
        index: usize,
        results: Vec<BatchResult>,
        missing: usize,
    },
    /// The batch could not be loaded or its execution unit crashed
    Failed {
        index: usize,
        ids: Vec<String>,
        reason: String,
    },
}

impl BatchOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Completed { index, .. } | Self::Failed { index, .. } => *index,
        }
    }
}

/// Bounded pool of execution units for one run
pub struct WorkerPool {
    workers: usize,
    backend: Arc<dyn TranslationBackend>,
}

impl WorkerPool {
    pub fn new(workers: usize, backend: Arc<dyn TranslationBackend>) -> Self {
        Self {
            workers: workers.max(1),
            backend,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run one batch on its own execution unit and wait for it
    pub async fn dispatch(
        &self,
        documents: Vec<Document>,
        ticket: &RunTicket,
        context: Arc<WorkerContext>,
    ) -> Result<Vec<BatchResult>, String> {
        let stop = ticket.stop_signal();
        let backend = self.backend.clone();

        tokio::spawn(process_batch(documents, stop, backend, context))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    "execution unit panicked".to_string()
                } else {
                    format!("execution unit aborted: {}", e)
                }
            })
    }

    /// Dispatch the batches of one collection.
    ///
    /// Documents are loaded on the coordinating task right before dispatch.
    /// The stop flag is checked before each dispatch; once raised, only
    /// batches already in flight are returned.
    pub fn run_batches<'a>(
        &'a self,
        store: &'a dyn CatalogStore,
        collection: &'a str,
        chunks: Vec<Vec<String>>,
        ticket: &'a RunTicket,
        context: Arc<WorkerContext>,
    ) -> impl Stream<Item = BatchOutcome> + 'a {
        let total = chunks.len();

        stream::iter(chunks.into_iter().enumerate())
            .take_while(move |_| future::ready(!ticket.is_cancelled()))
            .map(move |(index, ids)| {
                let context = context.clone();
                async move {
                    debug!("Dispatching batch {}/{} of {} ({} ids)", index + 1, total, collection, ids.len());

                    let documents = match store.find_by_ids(collection, &ids).await {
                        Ok(documents) => documents,
                        Err(e) => {
                            return BatchOutcome::Failed {
                                index,
                                ids,
                                reason: format!("failed to load batch: {}", e),
                            };
                        }
                    };
                    let missing = ids.len().saturating_sub(documents.len());

                    match self.dispatch(documents, ticket, context).await {
                        Ok(results) => BatchOutcome::Completed {
                            index,
                            results,
                            missing,
                        },
                        Err(reason) => BatchOutcome::Failed { index, ids, reason },
                    }
                }
            })
            .buffered(self.workers)
    }
}

/// Log the sizing decision of a run
pub fn log_plan(plan: &ExecutionPlan, languages: &LanguagePair) {
    info!(
        "Translating {} -> {} with {} worker(s), batches of {} (cpus: {}, ram: {:.0}%{})",
        languages.source,
        languages.target,
        plan.workers,
        plan.batch_size,
        plan.sample.cpu_count,
        plan.sample.ram_utilization,
        plan.sample
            .load_average
            .map(|load| format!(", load: {:.2}", load))
            .unwrap_or_default()
    );
}
