/*!
 * Bulk translation pipeline.
 *
 * - `batcher`: splits id lists into fixed-size batches
 * - `worker`: translates one batch into per-document partial updates
 * - `scheduler`: sizes the run and fans batches out to execution units
 * - `progress`: per-collection counters and throttled status rendering
 * - `cancellation`: single-run guard and cooperative stop signals
 * - `orchestrator`: drives a run from preparation to summary
 */

// Re-export main types for easier usage
pub use self::cancellation::{CancellationController, RunTicket, StopSignal};
pub use self::orchestrator::{RunOrchestrator, RunPhase, RunSummary};
pub use self::progress::{CollectionPhase, CollectionProgress, ProgressAggregator, ProgressSnapshot};
pub use self::scheduler::{BatchOutcome, ExecutionPlan, SizingPolicy, WorkerPool};
pub use self::worker::{process_batch, BatchResult, WorkerContext};

// Submodules
pub mod batcher;
pub mod cancellation;
pub mod orchestrator;
pub mod progress;
pub mod scheduler;
pub mod worker;
