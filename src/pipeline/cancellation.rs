//! Cooperative cancellation for translation runs.
//!
//! The controller is process-wide: it hands out one `RunTicket` at a time and
//! lets an external trigger (operator command, Ctrl-C) raise the stop flag of
//! the current run. Workers never see the controller. At dispatch time the
//! coordinator gives each batch a `StopSignal`: the decision taken when the
//! batch was sent plus a child token the worker polls between documents and
//! episodes.

use log::info;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineError;

/// Hands out run tickets and relays cancel requests to the current run.
pub struct CancellationController {
    current: Mutex<CancellationToken>,
    running: Arc<AtomicBool>,
}

impl CancellationController {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(CancellationToken::new()),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a run with a cleared flag. Only one run may be active at a time.
    pub fn begin_run(&self) -> Result<RunTicket, PipelineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::RunInProgress);
        }

        let token = CancellationToken::new();
        *self.current.lock() = token.clone();

        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Run {} started", run_id);

        Ok(RunTicket {
            run_id,
            token,
            running: self.running.clone(),
        })
    }

    /// Raise the stop flag of the current run.
    ///
    /// Returns whether a run was active to receive it.
    pub fn cancel(&self) -> bool {
        let active = self.is_running();
        if active {
            info!("Cancellation requested");
            self.current.lock().cancel();
        }
        active
    }

    /// Whether the current (or last) run has been asked to stop
    pub fn is_cancelled(&self) -> bool {
        self.current.lock().is_cancelled()
    }

    /// Whether a run currently holds the ticket
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for CancellationController {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive handle of one run. Dropping it frees the controller for the next run.
pub struct RunTicket {
    run_id: String,
    token: CancellationToken,
    running: Arc<AtomicBool>,
}

impl RunTicket {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Raise the flag from the owner side
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Build the stop signal handed to a batch being dispatched now
    pub fn stop_signal(&self) -> StopSignal {
        StopSignal {
            hint_at_dispatch: self.token.is_cancelled(),
            token: self.token.child_token(),
        }
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Stop request as seen by one batch.
///
/// A child token cannot cancel its parent, so workers can only observe.
#[derive(Debug, Clone)]
pub struct StopSignal {
    hint_at_dispatch: bool,
    token: CancellationToken,
}

impl StopSignal {
    /// A signal that is never raised
    pub fn never() -> Self {
        Self {
            hint_at_dispatch: false,
            token: CancellationToken::new(),
        }
    }

    /// A signal that is already raised
    pub fn stopped() -> Self {
        Self {
            hint_at_dispatch: true,
            token: CancellationToken::new(),
        }
    }

    /// A signal following an externally owned token
    pub fn following(token: &CancellationToken) -> Self {
        Self {
            hint_at_dispatch: token.is_cancelled(),
            token: token.child_token(),
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.hint_at_dispatch || self.token.is_cancelled()
    }
}
