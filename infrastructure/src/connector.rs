//! Session connector that launches the provider as a child process

use crate::protocol::{ClientSession, ProviderCommand, Transport};
use async_trait::async_trait;
use pr_review_application::{
    NoTranscript, SessionConnector, SessionError, SessionParams, ToolSession, TranscriptLogger,
};
use std::sync::Arc;
use tracing::info;

/// Spawns `command` and opens a [`ClientSession`] over its stdio.
pub struct StdioSessionConnector {
    command: ProviderCommand,
    params: SessionParams,
    transcript: Arc<dyn TranscriptLogger>,
}

impl StdioSessionConnector {
    pub fn new(command: ProviderCommand, params: SessionParams) -> Self {
        Self {
            command,
            params,
            transcript: Arc::new(NoTranscript),
        }
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn TranscriptLogger>) -> Self {
        self.transcript = transcript;
        self
    }
}

#[async_trait]
impl SessionConnector for StdioSessionConnector {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError> {
        info!("Launching provider {:?}", self.command);
        let transport =
            Transport::spawn(&self.command).map_err(|e| SessionError::Handshake(e.to_string()))?;
        let session = ClientSession::connect_with_transcript(
            transport,
            self.params.clone(),
            Arc::clone(&self.transcript),
        )
        .await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProviderServer;
    use crate::provider::pr_review::fakes::{FakeSink, FakeSource, login_fix};
    use crate::provider::{ToolProvider, build_pr_review_provider};
    use pr_review_application::ports::collaborators::CollaboratorError;
    use pr_review_application::{ReviewConfig, ReviewError, ReviewPullRequestUseCase};
    use pr_review_domain::{ANALYZE_PR, GET_PR_DATA, POST_PR_COMMENT, PrRef, RunState};
    use std::time::Duration;

    /// Serves the provider over an in-memory duplex instead of a child process.
    struct InProcessConnector {
        provider: Arc<ToolProvider>,
    }

    impl InProcessConnector {
        fn new(source: Arc<FakeSource>, sink: Arc<FakeSink>) -> Self {
            let provider = build_pr_review_provider(source, sink).unwrap();
            Self {
                provider: Arc::new(provider),
            }
        }

        async fn session(&self) -> ClientSession {
            let (client_io, server_io) = tokio::io::duplex(64 * 1024);
            let server = ProviderServer::new(Arc::clone(&self.provider));
            let (server_read, server_write) = tokio::io::split(server_io);
            tokio::spawn(async move { server.serve(server_read, server_write).await });
            ClientSession::connect(Transport::from_stream(client_io), SessionParams::default())
                .await
                .unwrap()
        }
    }

    #[async_trait]
    impl SessionConnector for InProcessConnector {
        async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError> {
            Ok(Box::new(self.session().await))
        }
    }

    fn config() -> ReviewConfig {
        ReviewConfig::new(PrRef::new("octo", "hello", 42))
    }

    #[tokio::test]
    async fn review_posts_rendered_comment() {
        let source = Arc::new(FakeSource::returning(login_fix()));
        let sink = Arc::new(FakeSink::default());
        let connector = Arc::new(InProcessConnector::new(source.clone(), sink.clone()));

        let output = ReviewPullRequestUseCase::new(connector)
            .execute(&config())
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        let bodies = sink.bodies.lock().unwrap().clone();
        assert_eq!(bodies, vec![output.comment.clone()]);

        let comment = &bodies[0];
        assert!(comment.contains("Fix login bug"));
        assert!(comment.contains("Resolves #42"));
        assert!(comment.contains("- src/auth.js"));
        assert!(comment.contains("- test/auth.test.js"));
        assert_eq!(output.posted.comment_id, 1001);
        assert_eq!(output.posted.status, 201);
    }

    #[tokio::test]
    async fn review_fails_without_posting_when_pr_missing() {
        let source = Arc::new(FakeSource::failing(CollaboratorError::NotFound(
            "octo/hello#42".into(),
        )));
        let sink = Arc::new(FakeSink::default());
        let connector = Arc::new(InProcessConnector::new(source.clone(), sink.clone()));

        let failure = ReviewPullRequestUseCase::new(connector)
            .execute(&config())
            .await
            .unwrap_err();

        assert!(matches!(failure.state, RunState::Failed(_)));
        match &failure.error {
            ReviewError::Fetch(e) => {
                assert_eq!(e.call_error().and_then(|c| c.status()), Some(404));
            }
            other => panic!("expected fetch failure, got {other:?}"),
        }
        assert_eq!(sink.calls(), 0);
    }

    #[tokio::test]
    async fn review_reports_post_failure() {
        let source = Arc::new(FakeSource::returning(login_fix()));
        let sink = Arc::new(FakeSink {
            failure: Some(CollaboratorError::Http {
                status: 502,
                message: "Bad Gateway".into(),
            }),
            ..Default::default()
        });
        let connector = Arc::new(InProcessConnector::new(source, sink.clone()));

        let failure = ReviewPullRequestUseCase::new(connector)
            .execute(&config())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, ReviewError::Post(_)));
        assert_eq!(sink.calls(), 1);
    }

    #[tokio::test]
    async fn listings_travel_over_the_wire() {
        let connector = InProcessConnector::new(
            Arc::new(FakeSource::returning(login_fix())),
            Arc::new(FakeSink::default()),
        );
        let session = connector.session().await;

        let tools: Vec<String> = session
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(tools, vec![GET_PR_DATA, POST_PR_COMMENT]);

        let prompts = session.list_prompts().await.unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].name, ANALYZE_PR);

        session.close().await;
    }

    #[tokio::test]
    async fn invalid_arguments_rejected_before_collaborator() {
        let source = Arc::new(FakeSource::returning(login_fix()));
        let connector = InProcessConnector::new(source.clone(), Arc::new(FakeSink::default()));
        let session = connector.session().await;

        let err = session
            .call_tool(
                GET_PR_DATA,
                serde_json::json!({"owner": "octo", "repo": "hello", "prNumber": 0}),
            )
            .await
            .unwrap_err();

        assert!(err.call_error().is_some_and(|e| e.is_validation()));
        assert_eq!(source.calls(), 0);
        session.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn provider_that_exits_fails_handshake() {
        let connector = StdioSessionConnector::new(
            ProviderCommand::new("true"),
            SessionParams::default().with_handshake_timeout(Duration::from_secs(5)),
        );
        let err = match connector.connect().await {
            Ok(_) => panic!("handshake should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, SessionError::Handshake(_)));
    }

    #[tokio::test]
    async fn missing_provider_binary_fails_handshake() {
        let connector = StdioSessionConnector::new(
            ProviderCommand::new("pr-review-provider-does-not-exist"),
            SessionParams::default(),
        );
        let err = match connector.connect().await {
            Ok(_) => panic!("spawn should fail"),
            Err(e) => e,
        };
        match err {
            SessionError::Handshake(msg) => assert!(msg.contains("pr-review-provider-does-not-exist")),
            other => panic!("expected handshake error, got {other:?}"),
        }
    }
}
