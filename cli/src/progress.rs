//! Progress reporting for a review run

use pr_review_application::ReviewProgress;
use pr_review_domain::RunState;

/// Writes one line per state transition to stderr
pub struct ProgressReporter;

impl ReviewProgress for ProgressReporter {
    fn on_state(&self, state: &RunState) {
        match state {
            RunState::Idle => {}
            RunState::Failed(reason) => eprintln!("x {}", reason),
            other => eprintln!("> {}", other.as_str()),
        }
    }
}
