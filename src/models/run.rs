//! Generation run record.
//!
//! A `GenerationRun` is the sole mutable artifact the engine produces:
//! one execution record tracking the status state machine, incremental
//! progress, and the final result or failure. `RunHandle` shares the
//! record between the worker thread executing the run and any number
//! of pollers.
//!
//! # State machine
//! `Pending → Validating → Generating → Optimizing → Completed`, with
//! `Failed` reachable from any non-terminal state. `Optimizing` is
//! skipped in CSP-only mode.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::progress::ProgressSink;

/// Lifecycle state of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Created, not yet started.
    Pending,
    /// Precondition checks in progress.
    Validating,
    /// CSP search in progress.
    Generating,
    /// GA refinement in progress.
    Optimizing,
    /// Finished with a result.
    Completed,
    /// Finished without a result.
    Failed,
}

impl RunStatus {
    /// Whether the run can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// One end-to-end execution record, parameterized by the report type
/// the pipeline produces.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRun<R> {
    /// Run identifier.
    pub id: String,
    /// Current state.
    pub status: RunStatus,
    /// Progress percent (0-100).
    pub progress_percent: u8,
    /// Free-text progress message.
    pub progress_message: String,
    /// Final serialized assignment set, on success.
    pub result: Option<R>,
    /// Fitness score of the result (0-100).
    pub fitness_score: Option<f64>,
    /// Non-blocking quality observations.
    pub warnings: Vec<String>,
    /// Human-actionable diagnosis, on failure.
    pub error_message: Option<String>,
    /// When execution began.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution ended (either terminal state).
    pub finished_at: Option<DateTime<Utc>>,
}

impl<R> GenerationRun<R> {
    /// Creates a pending run.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: RunStatus::Pending,
            progress_percent: 0,
            progress_message: String::new(),
            result: None,
            fitness_score: None,
            warnings: Vec::new(),
            error_message: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Wall-clock duration in seconds, once finished.
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }
}

/// Shared handle to a run record.
///
/// The worker thread writes through it; pollers read a snapshot at any
/// time without waiting for the run to complete. Cloning shares the
/// same underlying record.
#[derive(Debug)]
pub struct RunHandle<R> {
    inner: Arc<RwLock<GenerationRun<R>>>,
}

impl<R> Clone for RunHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Clone> RunHandle<R> {
    /// Creates a handle around a fresh pending run.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GenerationRun::new(run_id))),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, GenerationRun<R>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, GenerationRun<R>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> GenerationRun<R> {
        self.read().clone()
    }

    /// Current status.
    pub fn status(&self) -> RunStatus {
        self.read().status
    }

    /// Marks the run started and transitions to the given state.
    pub fn start(&self, status: RunStatus) {
        let mut run = self.write();
        run.started_at = Some(Utc::now());
        run.status = status;
    }

    /// Transitions to a new state, leaving progress untouched.
    pub fn set_status(&self, status: RunStatus) {
        self.write().status = status;
    }

    /// Writes a progress update.
    pub fn set_progress(&self, percent: u8, message: impl Into<String>) {
        let mut run = self.write();
        run.progress_percent = percent.min(100);
        run.progress_message = message.into();
    }

    /// Completes the run with a result.
    pub fn complete(&self, result: R, fitness_score: f64, warnings: Vec<String>) {
        let mut run = self.write();
        run.status = RunStatus::Completed;
        run.progress_percent = 100;
        run.progress_message = "completed".into();
        run.result = Some(result);
        run.fitness_score = Some(fitness_score);
        run.warnings = warnings;
        run.finished_at = Some(Utc::now());
    }

    /// Fails the run with a diagnosis. Any partial progress is
    /// discarded; a failed run never carries a result.
    pub fn fail(&self, error_message: impl Into<String>) {
        let mut run = self.write();
        run.status = RunStatus::Failed;
        run.result = None;
        run.fitness_score = None;
        run.error_message = Some(error_message.into());
        run.finished_at = Some(Utc::now());
    }
}

impl<R: Clone + Send + Sync> ProgressSink for RunHandle<R> {
    fn report(&self, percent: u8, message: &str) {
        self.set_progress(percent, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Optimizing.is_terminal());
    }

    #[test]
    fn test_handle_progress_visible_to_pollers() {
        let handle: RunHandle<String> = RunHandle::new("run-1");
        let poller = handle.clone();

        handle.start(RunStatus::Validating);
        handle.set_progress(10, "validating inputs");

        let snap = poller.snapshot();
        assert_eq!(snap.status, RunStatus::Validating);
        assert_eq!(snap.progress_percent, 10);
        assert_eq!(snap.progress_message, "validating inputs");
        assert!(snap.started_at.is_some());
        assert!(snap.finished_at.is_none());
    }

    #[test]
    fn test_complete() {
        let handle: RunHandle<String> = RunHandle::new("run-1");
        handle.start(RunStatus::Generating);
        handle.complete("payload".into(), 92.5, vec!["warning".into()]);

        let snap = handle.snapshot();
        assert_eq!(snap.status, RunStatus::Completed);
        assert_eq!(snap.progress_percent, 100);
        assert_eq!(snap.result.as_deref(), Some("payload"));
        assert_eq!(snap.fitness_score, Some(92.5));
        assert_eq!(snap.warnings.len(), 1);
        assert!(snap.duration_seconds().is_some());
    }

    #[test]
    fn test_fail_discards_partial_state() {
        let handle: RunHandle<String> = RunHandle::new("run-1");
        handle.start(RunStatus::Generating);
        handle.fail("no feasible schedule within 100000 iterations");

        let snap = handle.snapshot();
        assert_eq!(snap.status, RunStatus::Failed);
        assert!(snap.result.is_none());
        assert!(snap.fitness_score.is_none());
        assert!(snap.error_message.unwrap().contains("feasible"));
    }

    #[test]
    fn test_progress_clamped() {
        let handle: RunHandle<String> = RunHandle::new("run-1");
        handle.set_progress(250, "overshoot");
        assert_eq!(handle.snapshot().progress_percent, 100);
    }
}
