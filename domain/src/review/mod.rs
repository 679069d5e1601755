//! Pull request review domain
//!
//! Entities exchanged through the `get_pr_data` / `post_pr_comment` tools and
//! the pure template that turns fetched data into a review comment.

pub mod entities;
pub mod template;

pub use entities::{PostedComment, PrRef, PullRequestData};
pub use template::{MAX_COMMENT_LENGTH, ReviewTemplate};

/// Tool that fetches pull request metadata
pub const GET_PR_DATA: &str = "get_pr_data";

/// Tool that posts a comment on a pull request
pub const POST_PR_COMMENT: &str = "post_pr_comment";

/// Prompt that renders the review checklist
pub const ANALYZE_PR: &str = "analyze_pr";
