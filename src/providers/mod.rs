/*!
 * Translation backends.
 *
 * This module contains client implementations for the external translation
 * call consumed by the pipeline:
 * - `ollama`: local LLM server used as a text translator
 * - `mock`: scripted backend for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all translation backends
///
/// A backend translates one piece of text. It may fail for any reason
/// (timeout, quota, network); callers decide how to degrade.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Translate `text` from `source_language` to `target_language`
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;

    /// Test the connection to the backend
    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub mod mock;
pub mod ollama;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
