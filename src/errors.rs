/*!
 * Error types for the catalogtl application.
 *
 * This module contains custom error types for the different collaborators of
 * the translation pipeline, using the thiserror crate for ergonomic error
 * definitions. Only a few of them ever reach the operator: translation
 * failures are absorbed by the fail-soft translator, render failures are
 * swallowed by the progress reporter.
 */

use thiserror::Error;

/// Errors that can occur when talking to a translation backend
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete in time
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Error related to rate limiting or quota
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

/// Errors raised by a catalog store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(String),

    /// A document body could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The document to update does not exist
    #[error("Document '{id}' not found in collection '{collection}'")]
    NotFound {
        /// Collection name
        collection: String,
        /// Document identifier
        id: String,
    },

    /// The store refused the write
    #[error("Write rejected for document '{0}'")]
    WriteRejected(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

/// Errors raised by a notification channel
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The channel refused the message (rate limit, closed chat, ...)
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// The channel is not reachable
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Errors that stop a pipeline run before it starts
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Another translation run holds the single-run guard
    #[error("A translation run is already in progress")]
    RunInProgress,
}
