/*!
 * Operator notification channel.
 *
 * The pipeline reports through two operations: post a new message, and
 * rewrite the last message in place. The live status of a run is one message
 * edited over and over; the final summary is a fresh message.
 */

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::time::Duration;

use crate::errors::NotifyError;

/// Channel the pipeline writes status and summaries to
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post a new message
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;

    /// Replace the content of the last message
    async fn edit_last_message(&self, text: &str) -> Result<(), NotifyError>;
}

/// Terminal notifier: edits land on a spinner line, sends are printed above it
pub struct ConsoleNotifier {
    spinner: ProgressBar,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .or_else(|_| ProgressStyle::with_template("{spinner} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self { spinner }
    }

    /// Stop the spinner and clear its line
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.spinner.suspend(|| println!("{}", text));
        Ok(())
    }

    async fn edit_last_message(&self, text: &str) -> Result<(), NotifyError> {
        if self.spinner.is_finished() {
            return Err(NotifyError::Unavailable("status line already closed".to_string()));
        }
        // the spinner holds a single line
        self.spinner.set_message(text.replace('\n', " | "));
        Ok(())
    }
}

/// Notifier keeping every message in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sends: Mutex<Vec<String>>,
    edits: Mutex<Vec<String>>,
    fail_sends: bool,
    fail_edits: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every edit
    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Self::default()
        }
    }

    /// Reject every send and every edit
    pub fn unavailable() -> Self {
        Self {
            fail_sends: true,
            fail_edits: true,
            ..Self::default()
        }
    }

    pub fn sends(&self) -> Vec<String> {
        self.sends.lock().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().clone()
    }

    /// Number of edit attempts, including rejected ones
    pub fn edit_count(&self) -> usize {
        self.edits.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        self.sends.lock().push(text.to_string());
        if self.fail_sends {
            return Err(NotifyError::Unavailable("recording notifier offline".to_string()));
        }
        Ok(())
    }

    async fn edit_last_message(&self, text: &str) -> Result<(), NotifyError> {
        self.edits.lock().push(text.to_string());
        if self.fail_edits {
            return Err(NotifyError::Rejected("message is not modified".to_string()));
        }
        Ok(())
    }
}
