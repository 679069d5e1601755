//! Progress notification port
//!
//! Defines the interface for reporting state transitions of a review run.

use pr_review_domain::RunState;

/// Callback for run state changes.
///
/// Called once per transition, including the final `Done` / `Failed`.
pub trait ReviewProgress: Send + Sync {
    fn on_state(&self, state: &RunState);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ReviewProgress for NoProgress {
    fn on_state(&self, _state: &RunState) {}
}
