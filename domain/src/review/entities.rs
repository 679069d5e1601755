//! Pull request review entities

use serde::{Deserialize, Serialize};

/// Identifies one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrRef {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

impl PrRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, pr_number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            pr_number,
        }
    }

    /// Parse an `owner/repo` slug plus a PR number.
    pub fn parse(repository: &str, pr_number: u64) -> Result<Self, String> {
        let (owner, repo) = repository
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("Repository must be 'owner/repo', got '{}'", repository))?;

        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(format!(
                "Repository must be 'owner/repo', got '{}'",
                repository
            ));
        }
        if pr_number == 0 {
            return Err("Pull request number must be positive".to_string());
        }

        Ok(Self::new(owner, repo, pr_number))
    }

    /// `owner/repo` slug
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Display for PrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.pr_number)
    }
}

/// Structured content returned by the `get_pr_data` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestData {
    pub title: String,
    /// PR body; GitHub's `null` body is normalized to an empty string
    pub description: String,
    pub files_changed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_url: Option<String>,
}

/// Structured content returned by the `post_pr_comment` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedComment {
    pub comment_id: u64,
    pub comment_url: String,
    /// HTTP status reported by the comment sink
    pub status: u16,
}
