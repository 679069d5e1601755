//! The PR review tool set
//!
//! | Name | Kind | Collaborator |
//! |------|------|--------------|
//! | `get_pr_data` | tool | [`PrMetadataSource`] |
//! | `post_pr_comment` | tool | [`CommentSink`] (not idempotent) |
//! | `analyze_pr` | prompt | none |

use std::sync::Arc;

use async_trait::async_trait;
use pr_review_application::ports::collaborators::{CommentSink, PrMetadataSource};
use pr_review_domain::{
    ANALYZE_PR, Constraint, FieldSpec, FieldType, GET_PR_DATA, MAX_COMMENT_LENGTH,
    POST_PR_COMMENT, PrRef, PromptDefinition, PromptMessage, PullRequestData, RegistrationError, ReviewTemplate, Schema,
    ToolDefinition, ToolError, ToolHandler, ValidatedArgs,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::registry::ToolProvider;

/// Arguments shared by both tools
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrTarget {
    owner: String,
    repo: String,
    pr_number: u64,
}

impl From<PrTarget> for PrRef {
    fn from(t: PrTarget) -> Self {
        PrRef::new(t.owner, t.repo, t.pr_number)
    }
}

fn pr_target_schema() -> Schema {
    Schema::new()
        .with_field(
            FieldSpec::new("owner", "Repository owner", true).with_constraint(Constraint::NonEmpty),
        )
        .with_field(
            FieldSpec::new("repo", "Repository name", true).with_constraint(Constraint::NonEmpty),
        )
        .with_field(
            FieldSpec::new("prNumber", "Pull request number", true)
                .with_type(FieldType::Integer)
                .with_constraint(Constraint::Min(1)),
        )
}

fn decode_target(args: &ValidatedArgs) -> Result<PrRef, ToolError> {
    args.decode::<PrTarget>()
        .map(PrRef::from)
        .map_err(|e| ToolError::invalid_argument(e.to_string()))
}

pub fn get_pr_data_definition() -> ToolDefinition {
    ToolDefinition::new(
        GET_PR_DATA,
        "Fetch the title, description and changed files of a pull request",
    )
    .with_input(pr_target_schema())
    .with_output(
        Schema::new()
            .with_field(FieldSpec::new("title", "Pull request title", true))
            .with_field(FieldSpec::new("description", "Pull request body", true))
            .with_field(
                FieldSpec::new("filesChanged", "Paths of changed files", true)
                    .with_type(FieldType::string_array()),
            )
            .with_field(FieldSpec::new("diffUrl", "URL of the unified diff", false)),
    )
}

pub fn post_pr_comment_definition() -> ToolDefinition {
    ToolDefinition::new(
        POST_PR_COMMENT,
        "Post a comment on a pull request. Not idempotent: a retried call may post twice.",
    )
    .with_input(
        pr_target_schema().with_field(
            FieldSpec::new("comment", "Comment body (Markdown)", true)
                .with_constraint(Constraint::NonEmpty)
                .with_constraint(Constraint::MaxLength(MAX_COMMENT_LENGTH)),
        ),
    )
    .with_output(
        Schema::new()
            .with_field(
                FieldSpec::new("commentId", "Id of the created comment", true)
                    .with_type(FieldType::Integer)
                    .with_constraint(Constraint::Min(1)),
            )
            .with_field(
                FieldSpec::new("commentUrl", "Link to the created comment", true)
                    .with_constraint(Constraint::NonEmpty),
            )
            .with_field(
                FieldSpec::new("status", "HTTP status returned by the sink", true)
                    .with_type(FieldType::Integer),
            ),
    )
}

pub fn analyze_pr_definition() -> PromptDefinition {
    PromptDefinition::new(ANALYZE_PR, "Review checklist for a pull request").with_input(
        Schema::new()
            .with_field(FieldSpec::new("title", "Pull request title", true))
            .with_field(FieldSpec::new("description", "Pull request body", false))
            .with_field(
                FieldSpec::new("filesChanged", "Paths of changed files", true)
                    .with_type(FieldType::string_array()),
            ),
    )
}

/// `get_pr_data` handler
pub struct GetPrDataHandler {
    source: Arc<dyn PrMetadataSource>,
}

impl GetPrDataHandler {
    pub fn new(source: Arc<dyn PrMetadataSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ToolHandler for GetPrDataHandler {
    async fn call(&self, args: ValidatedArgs) -> Result<Value, ToolError> {
        let pr = decode_target(&args)?;
        debug!("Fetching pull request {}", pr);

        let metadata = self.source.fetch_pull_request(&pr).await?;
        let data = PullRequestData {
            title: metadata.title,
            description: metadata.body.unwrap_or_default(),
            files_changed: metadata.files,
            diff_url: metadata.diff_url,
        };
        info!("Fetched {} ({} files)", pr, data.files_changed.len());

        serde_json::to_value(&data).map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}

/// `post_pr_comment` handler
pub struct PostPrCommentHandler {
    sink: Arc<dyn CommentSink>,
}

impl PostPrCommentHandler {
    pub fn new(sink: Arc<dyn CommentSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ToolHandler for PostPrCommentHandler {
    async fn call(&self, args: ValidatedArgs) -> Result<Value, ToolError> {
        let pr = decode_target(&args)?;
        let comment = args.require_str("comment").map_err(ToolError::invalid_argument)?;
        debug!("Posting {} byte comment on {}", comment.len(), pr);

        let posted = self.sink.create_comment(&pr, comment).await?;
        info!("Posted comment {} on {}", posted.comment_id, pr);

        serde_json::to_value(&posted).map_err(|e| ToolError::execution_failed(e.to_string()))
    }
}

/// Render `analyze_pr` through the same template the orchestrator posts.
pub fn render_analyze_pr(args: &ValidatedArgs) -> Result<Vec<PromptMessage>, String> {
    let data = PullRequestData {
        title: args.require_str("title")?.to_string(),
        description: args.get_str("description").unwrap_or_default().to_string(),
        files_changed: args.get_str_list("filesChanged"),
        diff_url: None,
    };
    Ok(vec![PromptMessage::user(ReviewTemplate::render(&data))])
}

/// Build the provider with every PR review tool and prompt registered.
pub fn build_pr_review_provider(
    source: Arc<dyn PrMetadataSource>,
    sink: Arc<dyn CommentSink>,
) -> Result<ToolProvider, RegistrationError> {
    let mut provider = ToolProvider::new();
    provider.register(get_pr_data_definition(), GetPrDataHandler::new(source))?;
    provider.register(post_pr_comment_definition(), PostPrCommentHandler::new(sink))?;
    provider.register_prompt(analyze_pr_definition(), render_analyze_pr)?;
    Ok(provider)
}

#[cfg(test)]
pub(crate) mod fakes {
    //! In-memory collaborators shared by provider, server and e2e tests

    use async_trait::async_trait;
    use pr_review_application::ports::collaborators::{
        CollaboratorError, CommentSink, PrMetadataSource, PullRequestMetadata,
    };
    use pr_review_domain::{PostedComment, PrRef};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FakeSource {
        pub result: Result<PullRequestMetadata, CollaboratorError>,
        pub calls: AtomicUsize,
    }

    impl FakeSource {
        pub fn returning(metadata: PullRequestMetadata) -> Self {
            Self {
                result: Ok(metadata),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(error: CollaboratorError) -> Self {
            Self {
                result: Err(error),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PrMetadataSource for FakeSource {
        async fn fetch_pull_request(
            &self,
            _pr: &PrRef,
        ) -> Result<PullRequestMetadata, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    #[derive(Default)]
    pub struct FakeSink {
        pub failure: Option<CollaboratorError>,
        pub bodies: Mutex<Vec<String>>,
    }

    impl FakeSink {
        pub fn calls(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommentSink for FakeSink {
        async fn create_comment(
            &self,
            pr: &PrRef,
            body: &str,
        ) -> Result<PostedComment, CollaboratorError> {
            self.bodies.lock().unwrap().push(body.to_string());
            if let Some(e) = &self.failure {
                return Err(e.clone());
            }
            Ok(PostedComment {
                comment_id: 1001,
                comment_url: format!(
                    "https://github.com/{}/pull/{}#issuecomment-1001",
                    pr.slug(),
                    pr.pr_number
                ),
                status: 201,
            })
        }
    }

    pub fn login_fix() -> PullRequestMetadata {
        PullRequestMetadata {
            title: "Fix login bug".into(),
            body: Some("Resolves #42".into()),
            diff_url: Some("https://github.com/octo/hello/pull/42.diff".into()),
            files: vec!["src/auth.js".into(), "test/auth.test.js".into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{FakeSink, FakeSource, login_fix};
    use super::*;
    use pr_review_application::ports::collaborators::CollaboratorError;
    use pr_review_domain::CallError;
    use serde_json::json;

    fn provider_with(source: Arc<FakeSource>, sink: Arc<FakeSink>) -> ToolProvider {
        build_pr_review_provider(source, sink).unwrap()
    }

    #[tokio::test]
    async fn test_get_pr_data_returns_schema_valid_content() {
        let source = Arc::new(FakeSource::returning(login_fix()));
        let provider = provider_with(Arc::clone(&source), Arc::new(FakeSink::default()));

        let content = provider
            .dispatch(GET_PR_DATA, json!({"owner": "octo", "repo": "hello", "prNumber": 42}))
            .await
            .unwrap();

        let data: PullRequestData = serde_json::from_value(content).unwrap();
        assert_eq!(data.title, "Fix login bug");
        assert_eq!(data.description, "Resolves #42");
        assert_eq!(data.files_changed, vec!["src/auth.js", "test/auth.test.js"]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_null_body_becomes_empty_description() {
        let mut metadata = login_fix();
        metadata.body = None;
        let provider = provider_with(
            Arc::new(FakeSource::returning(metadata)),
            Arc::new(FakeSink::default()),
        );

        let content = provider
            .dispatch(GET_PR_DATA, json!({"owner": "octo", "repo": "hello", "prNumber": 42}))
            .await
            .unwrap();
        assert_eq!(content["description"], "");
    }

    #[tokio::test]
    async fn test_not_found_keeps_status() {
        let provider = provider_with(
            Arc::new(FakeSource::failing(CollaboratorError::NotFound(
                "octo/hello#404".into(),
            ))),
            Arc::new(FakeSink::default()),
        );

        let err = provider
            .dispatch(GET_PR_DATA, json!({"owner": "octo", "repo": "hello", "prNumber": 404}))
            .await
            .unwrap_err();

        assert!(matches!(err, CallError::ToolFailed { .. }));
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_bad_pr_number_is_rejected_before_fetch() {
        let source = Arc::new(FakeSource::returning(login_fix()));
        let provider = provider_with(Arc::clone(&source), Arc::new(FakeSink::default()));

        let err = provider
            .dispatch(GET_PR_DATA, json!({"owner": "octo", "repo": "", "prNumber": 0}))
            .await
            .unwrap_err();

        let paths = err.field_paths();
        assert!(paths.contains(&"repo"));
        assert!(paths.contains(&"prNumber"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_post_pr_comment_passes_body_through() {
        let sink = Arc::new(FakeSink::default());
        let provider = provider_with(
            Arc::new(FakeSource::returning(login_fix())),
            Arc::clone(&sink),
        );

        let content = provider
            .dispatch(
                POST_PR_COMMENT,
                json!({"owner": "octo", "repo": "hello", "prNumber": 42, "comment": "LGTM"}),
            )
            .await
            .unwrap();

        assert_eq!(content["commentId"], 1001);
        assert_eq!(content["status"], 201);
        assert_eq!(*sink.bodies.lock().unwrap(), vec!["LGTM".to_string()]);
    }

    #[tokio::test]
    async fn test_post_failure_preserves_status() {
        let sink = Arc::new(FakeSink {
            failure: Some(CollaboratorError::Http {
                status: 422,
                message: "Validation Failed".into(),
            }),
            ..Default::default()
        });
        let provider = provider_with(Arc::new(FakeSource::returning(login_fix())), sink);

        let err = provider
            .dispatch(
                POST_PR_COMMENT,
                json!({"owner": "octo", "repo": "hello", "prNumber": 42, "comment": "x"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let sink = Arc::new(FakeSink::default());
        let provider = provider_with(
            Arc::new(FakeSource::returning(login_fix())),
            Arc::clone(&sink),
        );

        let err = provider
            .dispatch(
                POST_PR_COMMENT,
                json!({"owner": "octo", "repo": "hello", "prNumber": 42, "comment": "  "}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.field_paths(), vec!["comment"]);
        assert_eq!(sink.calls(), 0);
    }

    #[test]
    fn test_analyze_pr_matches_posted_template() {
        let provider = provider_with(
            Arc::new(FakeSource::returning(login_fix())),
            Arc::new(FakeSink::default()),
        );

        let messages = provider
            .render_prompt(
                ANALYZE_PR,
                json!({
                    "title": "Fix login bug",
                    "description": "Resolves #42",
                    "filesChanged": ["src/auth.js", "test/auth.test.js"],
                }),
            )
            .unwrap();

        let expected = ReviewTemplate::render(&PullRequestData {
            title: "Fix login bug".into(),
            description: "Resolves #42".into(),
            files_changed: vec!["src/auth.js".into(), "test/auth.test.js".into()],
            diff_url: None,
        });
        assert_eq!(messages, vec![PromptMessage::user(expected)]);
    }

    #[test]
    fn test_all_declarations_registered() {
        let provider = provider_with(
            Arc::new(FakeSource::returning(login_fix())),
            Arc::new(FakeSink::default()),
        );
        let tools: Vec<String> = provider.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(tools, vec![GET_PR_DATA, POST_PR_COMMENT]);
        assert!(provider.has_prompt(ANALYZE_PR));
    }
}
