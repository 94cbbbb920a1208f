/*!
 * # catalogtl - bulk translation for media catalogs
 *
 * Translates the free-text fields of whole catalog collections (movie
 * descriptions, series descriptions, episode titles and overviews) with an
 * LLM backend, in parallel.
 *
 * ## Features
 *
 * - Dynamic pool and batch sizing from live CPU and RAM pressure
 * - Per-batch fault isolation: a crashed batch fails only its own documents
 * - Cooperative cancellation at document and episode granularity
 * - Throttled live progress with throughput and ETA
 * - Resumable runs: translated documents are stamped and skipped next time
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `catalog`: Document model and store abstraction:
 *   - `catalog::memory`: In-process store
 *   - `catalog::sqlite`: SQLite store with JSON bodies
 * - `translation`: Batch-local cache and fail-soft text translator
 * - `pipeline`: Batching, workers, scheduling, progress, cancellation and
 *   the run orchestrator
 * - `providers`: Translation backends:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::mock`: Scripted backend for tests
 * - `notify`: Operator notification channel
 * - `system_probe`: CPU and RAM sampling
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![cfg_attr(test, allow(non_snake_case))]

// Public modules
pub mod app_config;
pub mod catalog;
pub mod errors;
pub mod language_utils;
pub mod notify;
pub mod pipeline;
pub mod providers;
pub mod system_probe;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use catalog::{CatalogStore, Document, DocumentFilter, PartialUpdate};
pub use notify::Notifier;
pub use pipeline::{CancellationController, RunOrchestrator, RunSummary};
pub use providers::TranslationBackend;
