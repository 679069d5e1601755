//! Orchestrator state machine
//!
//! A review run is a linear pipeline:
//!
//! ```text
//! Idle ──▶ Connected ──▶ FetchedData ──▶ Posted ──▶ Done
//!   │          │              │            │
//!   └──────────┴──────────────┴────────────┴──▶ Failed(reason)
//! ```
//!
//! `Done` and `Failed` are terminal. Skipping a step (e.g. `Connected ──▶
//! Posted`) is rejected, which is what guarantees that no comment is posted
//! from data that was never fetched.

use thiserror::Error;

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Could not open or handshake the session
    Handshake(String),
    /// `get_pr_data` failed or returned unusable data
    Fetch(String),
    /// `post_pr_comment` failed
    Post(String),
    /// The run tried an illegal state change
    Internal(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Handshake(msg) => write!(f, "handshake failed: {}", msg),
            FailureReason::Fetch(msg) => write!(f, "fetching PR data failed: {}", msg),
            FailureReason::Post(msg) => write!(f, "posting comment failed: {}", msg),
            FailureReason::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

/// Current stage of a review run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Connected,
    FetchedData,
    Posted,
    Done,
    Failed(FailureReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid run transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::Idle => "idle",
            RunState::Connected => "connected",
            RunState::FetchedData => "fetched_data",
            RunState::Posted => "posted",
            RunState::Done => "done",
            RunState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunState::Failed(_))
    }

    /// The only successor reachable without failing.
    fn successor(&self) -> Option<RunState> {
        match self {
            RunState::Idle => Some(RunState::Connected),
            RunState::Connected => Some(RunState::FetchedData),
            RunState::FetchedData => Some(RunState::Posted),
            RunState::Posted => Some(RunState::Done),
            RunState::Done | RunState::Failed(_) => None,
        }
    }

    /// Move to `next`, which must be the direct successor.
    pub fn advance(&mut self, next: RunState) -> Result<(), InvalidTransition> {
        if self.successor().as_ref() == Some(&next) {
            *self = next;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// Enter `Failed` from any non-terminal state.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), InvalidTransition> {
        if self.is_terminal() {
            return Err(InvalidTransition {
                from: self.as_str().to_string(),
                to: "failed".to_string(),
            });
        }
        *self = RunState::Failed(reason);
        Ok(())
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Failed(reason) => write!(f, "failed ({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = RunState::default();
        state.advance(RunState::Connected).unwrap();
        state.advance(RunState::FetchedData).unwrap();
        state.advance(RunState::Posted).unwrap();
        state.advance(RunState::Done).unwrap();
        assert!(state.is_terminal());
        assert!(!state.is_failed());
    }

    #[test]
    fn test_skipping_is_rejected() {
        let mut state = RunState::Connected;
        let err = state.advance(RunState::Posted).unwrap_err();
        assert_eq!(err.from, "connected");
        assert_eq!(err.to, "posted");
        assert_eq!(state, RunState::Connected);
    }

    #[test]
    fn test_fail_from_any_live_state() {
        for start in [
            RunState::Idle,
            RunState::Connected,
            RunState::FetchedData,
            RunState::Posted,
        ] {
            let mut state = start;
            state.fail(FailureReason::Fetch("boom".into())).unwrap();
            assert!(state.is_failed());
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut done = RunState::Done;
        assert!(done.fail(FailureReason::Post("late".into())).is_err());
        assert!(done.advance(RunState::Idle).is_err());

        let mut failed = RunState::Failed(FailureReason::Handshake("x".into()));
        assert!(failed.advance(RunState::Connected).is_err());
        assert!(failed.fail(FailureReason::Post("again".into())).is_err());
    }

    #[test]
    fn test_display() {
        let state = RunState::Failed(FailureReason::Post("HTTP 500".into()));
        assert_eq!(state.to_string(), "failed (posting comment failed: HTTP 500)");
        assert_eq!(RunState::FetchedData.to_string(), "fetched_data");
    }
}
