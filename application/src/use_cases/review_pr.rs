//! Review Pull Request use case
//!
//! Drives one review run through the [`RunState`] pipeline:
//!
//! 1. **Connect**: open a session through the [`SessionConnector`]
//! 2. **Fetch**: `get_pr_data` → strongly typed [`PullRequestData`]
//! 3. **Post**: render the [`ReviewTemplate`] and call `post_pr_comment`
//!
//! Every failure is terminal. A failed fetch never leads to a post, and a
//! failed post is never reported as success. The session is closed on every
//! exit path once it has been opened.

use crate::config::ReviewConfig;
use crate::ports::progress::{NoProgress, ReviewProgress};
use crate::ports::tool_session::{SessionConnector, SessionError, ToolSession};
use pr_review_domain::{
    FailureReason, GET_PR_DATA, InvalidTransition, POST_PR_COMMENT, PostedComment, PrRef,
    PullRequestData, ReviewTemplate, RunState,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end a review run
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Could not open session: {0}")]
    Connect(SessionError),

    #[error("get_pr_data failed: {0}")]
    Fetch(SessionError),

    #[error("get_pr_data returned unusable data: {0}")]
    InvalidPrData(String),

    #[error("post_pr_comment failed: {0}")]
    Post(SessionError),

    #[error("post_pr_comment returned unusable data: {0}")]
    InvalidPostResult(String),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

impl ReviewError {
    fn reason(&self) -> FailureReason {
        match self {
            ReviewError::Connect(e) => FailureReason::Handshake(e.to_string()),
            ReviewError::Fetch(_) | ReviewError::InvalidPrData(_) => {
                FailureReason::Fetch(self.to_string())
            }
            ReviewError::Post(_) | ReviewError::InvalidPostResult(_) => {
                FailureReason::Post(self.to_string())
            }
            ReviewError::Transition(e) => FailureReason::Internal(e.to_string()),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct ReviewOutput {
    pub pr: PrRef,
    pub data: PullRequestData,
    /// Exact text sent to the comment sink
    pub comment: String,
    pub posted: PostedComment,
}

/// A run that ended in `Failed`
#[derive(Debug, Error)]
#[error("Review of {pr} {state}")]
pub struct ReviewFailure {
    pub pr: PrRef,
    /// Always `RunState::Failed`
    pub state: RunState,
    #[source]
    pub error: ReviewError,
}

/// Use case for reviewing one pull request
pub struct ReviewPullRequestUseCase<C: SessionConnector + 'static> {
    connector: Arc<C>,
}

impl<C: SessionConnector + 'static> ReviewPullRequestUseCase<C> {
    pub fn new(connector: Arc<C>) -> Self {
        Self { connector }
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(&self, config: &ReviewConfig) -> Result<ReviewOutput, ReviewFailure> {
        self.execute_with_progress(config, &NoProgress).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        config: &ReviewConfig,
        progress: &dyn ReviewProgress,
    ) -> Result<ReviewOutput, ReviewFailure> {
        let pr = config.pr().clone();
        let mut state = RunState::Idle;
        progress.on_state(&state);

        info!("Starting review of {}", pr);

        let session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => return Err(Self::fail(pr, state, ReviewError::Connect(e), progress)),
        };

        let result = Self::run_pipeline(session.as_ref(), &pr, &mut state, progress).await;

        debug!("Closing session");
        session.close().await;

        match result {
            Ok((data, comment, posted)) => {
                if let Err(e) = state.advance(RunState::Done) {
                    return Err(Self::fail(pr, state, e.into(), progress));
                }
                progress.on_state(&state);
                info!("Review posted: {}", posted.comment_url);
                Ok(ReviewOutput {
                    pr,
                    data,
                    comment,
                    posted,
                })
            }
            Err(e) => Err(Self::fail(pr, state, e, progress)),
        }
    }

    /// Connected → FetchedData → Posted
    async fn run_pipeline(
        session: &dyn ToolSession,
        pr: &PrRef,
        state: &mut RunState,
        progress: &dyn ReviewProgress,
    ) -> Result<(PullRequestData, String, PostedComment), ReviewError> {
        state.advance(RunState::Connected)?;
        progress.on_state(state);

        let data = Self::fetch(session, pr).await?;
        state.advance(RunState::FetchedData)?;
        progress.on_state(state);

        let comment = ReviewTemplate::render(&data);
        debug!("Rendered review comment ({} bytes)", comment.len());

        let posted = Self::post(session, pr, &comment).await?;
        state.advance(RunState::Posted)?;
        progress.on_state(state);

        Ok((data, comment, posted))
    }

    async fn fetch(session: &dyn ToolSession, pr: &PrRef) -> Result<PullRequestData, ReviewError> {
        let args = json!({
            "owner": pr.owner,
            "repo": pr.repo,
            "prNumber": pr.pr_number,
        });

        let content = session
            .call_tool(GET_PR_DATA, args)
            .await
            .map_err(ReviewError::Fetch)?;

        serde_json::from_value(content).map_err(|e| ReviewError::InvalidPrData(e.to_string()))
    }

    async fn post(
        session: &dyn ToolSession,
        pr: &PrRef,
        comment: &str,
    ) -> Result<PostedComment, ReviewError> {
        let args = json!({
            "owner": pr.owner,
            "repo": pr.repo,
            "prNumber": pr.pr_number,
            "comment": comment,
        });

        let content = session
            .call_tool(POST_PR_COMMENT, args)
            .await
            .map_err(ReviewError::Post)?;

        serde_json::from_value(content).map_err(|e| ReviewError::InvalidPostResult(e.to_string()))
    }

    fn fail(
        pr: PrRef,
        mut state: RunState,
        error: ReviewError,
        progress: &dyn ReviewProgress,
    ) -> ReviewFailure {
        warn!("Review of {} failed in state {}: {}", pr, state, error);
        let reason = error.reason();
        if state.fail(reason.clone()).is_err() {
            // Already terminal; record the failure anyway
            state = RunState::Failed(reason);
        }
        progress.on_state(&state);
        ReviewFailure { pr, state, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pr_review_domain::{CallError, PromptMessage, ToolError};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    // ==================== Fakes ====================

    struct ScriptedSession {
        fetch: Result<Value, SessionError>,
        post: Result<Value, SessionError>,
        calls: Arc<Mutex<Vec<(String, Value)>>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ToolSession for ScriptedSession {
        async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, SessionError> {
            self.calls.lock().unwrap().push((name.to_string(), arguments));
            match name {
                GET_PR_DATA => self.fetch.clone(),
                POST_PR_COMMENT => self.post.clone(),
                other => Err(CallError::unknown_tool(other).into()),
            }
        }

        async fn call_prompt(
            &self,
            name: &str,
            _arguments: Value,
        ) -> Result<Vec<PromptMessage>, SessionError> {
            Err(CallError::unknown_prompt(name).into())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct ScriptedConnector {
        handshake: Option<SessionError>,
        fetch: Result<Value, SessionError>,
        post: Result<Value, SessionError>,
        calls: Arc<Mutex<Vec<(String, Value)>>>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedConnector {
        fn new(fetch: Result<Value, SessionError>, post: Result<Value, SessionError>) -> Self {
            Self {
                handshake: None,
                fetch,
                post,
                calls: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn tool_names(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    #[async_trait]
    impl SessionConnector for ScriptedConnector {
        async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError> {
            if let Some(e) = &self.handshake {
                return Err(e.clone());
            }
            Ok(Box::new(ScriptedSession {
                fetch: self.fetch.clone(),
                post: self.post.clone(),
                calls: Arc::clone(&self.calls),
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    struct RecordingProgress(Mutex<Vec<String>>);

    impl ReviewProgress for RecordingProgress {
        fn on_state(&self, state: &RunState) {
            self.0.lock().unwrap().push(state.as_str().to_string());
        }
    }

    fn pr_json() -> Value {
        json!({
            "title": "Fix login bug",
            "description": "Resolves #42",
            "filesChanged": ["src/auth.js", "test/auth.test.js"],
        })
    }

    fn posted_json() -> Value {
        json!({
            "commentId": 99,
            "commentUrl": "https://github.com/octo/hello/pull/42#issuecomment-99",
            "status": 201,
        })
    }

    fn config() -> ReviewConfig {
        ReviewConfig::from_launch_inputs(Some("octo/hello"), Some("42")).unwrap()
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_happy_path_posts_rendered_comment() {
        let connector = Arc::new(ScriptedConnector::new(Ok(pr_json()), Ok(posted_json())));
        let progress = RecordingProgress(Mutex::new(Vec::new()));
        let use_case = ReviewPullRequestUseCase::new(Arc::clone(&connector));

        let output = use_case
            .execute_with_progress(&config(), &progress)
            .await
            .unwrap();

        assert!(output.comment.contains("Fix login bug"));
        assert!(output.comment.contains("Resolves #42"));
        assert!(output.comment.contains("- src/auth.js"));
        assert!(output.comment.contains("- test/auth.test.js"));
        assert_eq!(output.posted.comment_id, 99);

        let calls = connector.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, json!({"owner": "octo", "repo": "hello", "prNumber": 42}));
        assert_eq!(calls[1].0, POST_PR_COMMENT);
        assert_eq!(calls[1].1["comment"], Value::String(output.comment.clone()));

        assert!(connector.closed.load(Ordering::SeqCst));
        assert_eq!(
            *progress.0.lock().unwrap(),
            vec!["idle", "connected", "fetched_data", "posted", "done"]
        );
    }

    #[tokio::test]
    async fn test_handshake_failure() {
        let mut connector = ScriptedConnector::new(Ok(pr_json()), Ok(posted_json()));
        connector.handshake = Some(SessionError::Handshake("protocol mismatch".into()));
        let connector = Arc::new(connector);
        let use_case = ReviewPullRequestUseCase::new(Arc::clone(&connector));

        let failure = use_case.execute(&config()).await.unwrap_err();

        assert!(matches!(failure.state, RunState::Failed(FailureReason::Handshake(_))));
        assert!(matches!(failure.error, ReviewError::Connect(_)));
        assert!(connector.tool_names().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_never_posts() {
        let not_found = CallError::ToolFailed {
            name: GET_PR_DATA.into(),
            error: ToolError::not_found("octo/hello#42").with_status(404),
        };
        let connector = Arc::new(ScriptedConnector::new(
            Err(not_found.into()),
            Ok(posted_json()),
        ));
        let use_case = ReviewPullRequestUseCase::new(Arc::clone(&connector));

        let failure = use_case.execute(&config()).await.unwrap_err();

        assert!(matches!(failure.state, RunState::Failed(FailureReason::Fetch(_))));
        assert_eq!(connector.tool_names(), vec![GET_PR_DATA.to_string()]);
        assert!(connector.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_undecodable_pr_data_never_posts() {
        let connector = Arc::new(ScriptedConnector::new(
            Ok(json!({"title": "only a title"})),
            Ok(posted_json()),
        ));
        let use_case = ReviewPullRequestUseCase::new(Arc::clone(&connector));

        let failure = use_case.execute(&config()).await.unwrap_err();

        assert!(matches!(failure.error, ReviewError::InvalidPrData(_)));
        assert_eq!(connector.tool_names(), vec![GET_PR_DATA.to_string()]);
    }

    #[tokio::test]
    async fn test_post_failure_is_not_success() {
        let rejected = CallError::ToolFailed {
            name: POST_PR_COMMENT.into(),
            error: ToolError::collaborator_failed("HTTP 500").with_status(500),
        };
        let connector = Arc::new(ScriptedConnector::new(Ok(pr_json()), Err(rejected.into())));
        let use_case = ReviewPullRequestUseCase::new(Arc::clone(&connector));

        let failure = use_case.execute(&config()).await.unwrap_err();

        assert!(matches!(failure.state, RunState::Failed(FailureReason::Post(_))));
        match &failure.error {
            ReviewError::Post(e) => assert_eq!(e.call_error().and_then(|c| c.status()), Some(500)),
            other => panic!("unexpected error: {other:?}"),
        }
        // One attempt only
        assert_eq!(connector.tool_names().len(), 2);
        assert!(connector.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_post_timeout_fails_run() {
        let connector = Arc::new(ScriptedConnector::new(
            Ok(pr_json()),
            Err(SessionError::Timeout {
                name: POST_PR_COMMENT.into(),
                timeout: std::time::Duration::from_secs(1),
            }),
        ));
        let use_case = ReviewPullRequestUseCase::new(connector);

        let failure = use_case.execute(&config()).await.unwrap_err();
        assert!(failure.state.is_failed());
        assert!(failure.to_string().contains("octo/hello#42"));
    }

    #[test]
    fn test_illegal_transition_is_not_reported_as_post_failure() {
        let mut state = RunState::Idle;
        let err = state.advance(RunState::Posted).unwrap_err();
        let reason = ReviewError::from(err).reason();

        assert!(matches!(reason, FailureReason::Internal(_)));
        assert!(reason.to_string().starts_with("internal error"));
    }
}
