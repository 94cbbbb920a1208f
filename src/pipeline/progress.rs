/*!
 * Progress aggregation for translation runs.
 *
 * The coordinator owns the run state and is its only writer. After each batch
 * it records the counts, then asks whether a status render is due. Renders
 * are throttled to one per interval, except the very first one and the forced
 * render after the final batch of the run.
 */

use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of one collection within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionPhase {
    NotStarted,
    Running,
    Finished,
}

impl fmt::Display for CollectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Counters of one collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionProgress {
    pub name: String,
    /// Documents selected for translation at preparation time
    pub total: usize,
    /// Documents processed successfully
    pub done: usize,
    /// Documents that failed in a crashed batch or a rejected write
    pub errors: usize,
    pub phase: CollectionPhase,
    /// Set when the collection could not be prepared
    pub note: Option<String>,
}

impl CollectionProgress {
    pub fn new(name: impl Into<String>, total: usize) -> Self {
        Self {
            name: name.into(),
            total,
            done: 0,
            errors: 0,
            phase: CollectionPhase::NotStarted,
            note: None,
        }
    }

    pub fn processed(&self) -> usize {
        self.done + self.errors
    }
}

/// Mutable state of one run
#[derive(Debug, Clone)]
pub struct RunState {
    pub collections: Vec<CollectionProgress>,
    pub start_time: Instant,
    pub last_emit: Option<Instant>,
}

/// Tracks per-collection counters and decides when to render
#[derive(Debug)]
pub struct ProgressAggregator {
    state: RunState,
    interval: Duration,
}

impl ProgressAggregator {
    pub fn new(interval: Duration) -> Self {
        Self::with_start(interval, Instant::now())
    }

    pub fn with_start(interval: Duration, start_time: Instant) -> Self {
        Self {
            state: RunState {
                collections: Vec::new(),
                start_time,
                last_emit: None,
            },
            interval,
        }
    }

    /// Add a collection with its total
    pub fn register(&mut self, name: &str, total: usize) {
        self.state.collections.push(CollectionProgress::new(name, total));
    }

    /// Add a collection that could not be prepared
    pub fn register_failed(&mut self, name: &str, note: impl Into<String>) {
        let mut progress = CollectionProgress::new(name, 0);
        progress.phase = CollectionPhase::Finished;
        progress.note = Some(note.into());
        self.state.collections.push(progress);
    }

    pub fn start(&mut self, name: &str) {
        if let Some(progress) = self.find_mut(name) {
            progress.phase = CollectionPhase::Running;
        }
    }

    /// Add the counts of one batch
    pub fn record_batch(&mut self, name: &str, done: usize, errors: usize) {
        if let Some(progress) = self.find_mut(name) {
            progress.done += done;
            progress.errors += errors;
        }
    }

    pub fn finish(&mut self, name: &str) {
        if let Some(progress) = self.find_mut(name) {
            progress.phase = CollectionPhase::Finished;
        }
    }

    /// Close a collection that could not be processed
    pub fn fail(&mut self, name: &str, note: impl Into<String>) {
        if let Some(progress) = self.find_mut(name) {
            progress.phase = CollectionPhase::Finished;
            progress.note = Some(note.into());
        }
    }

    /// Whether a render is due now. Marks the emission when it is.
    pub fn should_emit(&mut self, now: Instant, force: bool) -> bool {
        let due = match self.state.last_emit {
            None => true,
            Some(last) => force || now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.state.last_emit = Some(now);
        }
        due
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionProgress> {
        self.state.collections.iter().find(|c| c.name == name)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.state.start_time)
    }

    /// Build the status view at `now`
    pub fn snapshot(&self, now: Instant) -> ProgressSnapshot {
        let collections = &self.state.collections;
        let total: usize = collections.iter().map(|c| c.total).sum();
        let done: usize = collections.iter().map(|c| c.done).sum();
        let errors: usize = collections.iter().map(|c| c.errors).sum();
        let elapsed = self.elapsed(now);

        let processed = done + errors;
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            processed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        ProgressSnapshot {
            collections: collections.clone(),
            total,
            done,
            errors,
            elapsed,
            throughput,
            eta: estimate_eta(total, processed, elapsed),
        }
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut CollectionProgress> {
        self.state.collections.iter_mut().find(|c| c.name == name)
    }
}

/// Remaining time at the observed rate. Zero until something was processed.
pub fn estimate_eta(total: usize, processed: usize, elapsed: Duration) -> Duration {
    if processed == 0 || elapsed.is_zero() {
        return Duration::ZERO;
    }
    let remaining = total.saturating_sub(processed);
    let rate = processed as f64 / elapsed.as_secs_f64();
    Duration::from_secs_f64(remaining as f64 / rate)
}

/// Point-in-time view of a run
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub collections: Vec<CollectionProgress>,
    pub total: usize,
    pub done: usize,
    pub errors: usize,
    pub elapsed: Duration,
    /// Documents per second
    pub throughput: f64,
    pub eta: Duration,
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Translation progress")?;
        for c in &self.collections {
            write!(f, "{}: {}/{} ({} errors) [{}]", c.name, c.done, c.total, c.errors, c.phase)?;
            if let Some(note) = &c.note {
                write!(f, " - {}", note)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "Total: {}/{} | {:.1} docs/s | elapsed {} | ETA {}",
            self.done + self.errors,
            self.total,
            self.throughput,
            format_duration(self.elapsed),
            format_duration(self.eta)
        )
    }
}

/// Format a duration as `HH:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
