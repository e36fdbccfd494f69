//! Progress reporting and deadlines.
//!
//! The solvers are long-running synchronous computations; they talk to
//! the outside world only through a caller-supplied [`ProgressSink`]
//! and check a cooperative [`Deadline`] token at backtracking/GA
//! generation granularity. Neither depends on any queue technology.

use std::time::{Duration, Instant};

/// Receives periodic `(percent, message)` progress updates.
pub trait ProgressSink: Send + Sync {
    /// Reports progress. `percent` is 0-100 within the caller's frame.
    fn report(&self, percent: u8, message: &str);
}

/// Discards all updates.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Maps a phase's local 0-100 progress into a [lo, hi] window of the
/// overall run, so each pipeline step reports in its own terms.
pub struct ScaledSink<'a> {
    inner: &'a dyn ProgressSink,
    lo: u8,
    hi: u8,
}

impl<'a> ScaledSink<'a> {
    /// Creates a sink reporting into [lo, hi].
    pub fn new(inner: &'a dyn ProgressSink, lo: u8, hi: u8) -> Self {
        Self {
            inner,
            lo,
            hi: hi.max(lo),
        }
    }
}

impl ProgressSink for ScaledSink<'_> {
    fn report(&self, percent: u8, message: &str) {
        let span = (self.hi - self.lo) as u32;
        let scaled = self.lo as u32 + span * percent.min(100) as u32 / 100;
        self.inner.report(scaled as u8, message);
    }
}

/// Cooperative deadline token.
///
/// Checked by the solvers between backtracking attempts and between GA
/// generations; there is no mid-run cancellation signal beyond it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline `limit` from now.
    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(limit),
        }
    }

    /// A deadline that never expires.
    pub fn never() -> Self {
        Self { at: None }
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        match self.at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }
}
