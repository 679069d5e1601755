//! GitHub REST implementation of both collaborator ports
//!
//! | Port | Endpoint |
//! |------|----------|
//! | [`PrMetadataSource`] | `GET /repos/{o}/{r}/pulls/{n}` + `GET /repos/{o}/{r}/pulls/{n}/files` (paged) |
//! | [`CommentSink`] | `POST /repos/{o}/{r}/issues/{n}/comments` |
//!
//! Status mapping: 404 → not found, 401/403 → unauthorized, any other
//! non-2xx → HTTP error carrying the status.

use async_trait::async_trait;
use pr_review_application::ports::collaborators::{
    CollaboratorError, CommentSink, PrMetadataSource, PullRequestMetadata,
};
use pr_review_domain::{PostedComment, PrRef};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("pr-review/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const FILES_PER_PAGE: usize = 100;
/// GitHub stops listing files after 3000.
const MAX_FILE_PAGES: usize = 30;

#[derive(Debug, Deserialize)]
struct PullResponse {
    title: String,
    body: Option<String>,
    diff_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// GitHub REST client
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: DEFAULT_API_URL.to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Point at another API root (GitHub Enterprise, a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("GitHub {} {}", method, url);
        let builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and map non-2xx statuses to collaborator errors.
    async fn send(&self, builder: RequestBuilder, resource: &str) -> Result<Response, CollaboratorError> {
        let response = builder
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        trace!("GitHub error body: {}", text);
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown")
                    .to_string()
            });

        Err(match status {
            StatusCode::NOT_FOUND => CollaboratorError::NotFound(resource.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CollaboratorError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            _ => CollaboratorError::Http {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CollaboratorError> {
        response
            .json::<T>()
            .await
            .map_err(|e| CollaboratorError::Decode(e.to_string()))
    }

    async fn list_files(&self, pr: &PrRef) -> Result<Vec<String>, CollaboratorError> {
        let path = format!(
            "/repos/{}/{}/pulls/{}/files",
            pr.owner, pr.repo, pr.pr_number
        );
        let mut files = Vec::new();

        for page in 1..=MAX_FILE_PAGES {
            let builder = self
                .request(Method::GET, &path)
                .query(&[("per_page", FILES_PER_PAGE), ("page", page)]);
            let entries: Vec<FileEntry> = Self::decode(self.send(builder, &pr.to_string()).await?).await?;
            let last_page = entries.len() < FILES_PER_PAGE;
            files.extend(entries.into_iter().map(|f| f.filename));
            if last_page {
                break;
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl PrMetadataSource for GitHubClient {
    async fn fetch_pull_request(&self, pr: &PrRef) -> Result<PullRequestMetadata, CollaboratorError> {
        let path = format!("/repos/{}/{}/pulls/{}", pr.owner, pr.repo, pr.pr_number);
        let response = self
            .send(self.request(Method::GET, &path), &pr.to_string())
            .await?;
        let pull: PullResponse = Self::decode(response).await?;
        let files = self.list_files(pr).await?;

        Ok(PullRequestMetadata {
            title: pull.title,
            body: pull.body,
            diff_url: pull.diff_url,
            files,
        })
    }
}

#[async_trait]
impl CommentSink for GitHubClient {
    async fn create_comment(&self, pr: &PrRef, body: &str) -> Result<PostedComment, CollaboratorError> {
        let path = format!(
            "/repos/{}/{}/issues/{}/comments",
            pr.owner, pr.repo, pr.pr_number
        );
        let response = self
            .send(
                self.request(Method::POST, &path).json(&json!({ "body": body })),
                &pr.to_string(),
            )
            .await?;
        let status = response.status().as_u16();
        let comment: CommentResponse = Self::decode(response).await?;

        Ok(PostedComment {
            comment_id: comment.id,
            comment_url: comment.html_url,
            status,
        })
    }
}
