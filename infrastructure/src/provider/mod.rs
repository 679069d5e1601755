//! Tool provider: declaration registry and the PR review tool set

pub mod pr_review;
pub mod registry;

pub use pr_review::build_pr_review_provider;
pub use registry::ToolProvider;
