//! Review comment template
//!
//! The review is a fixed Markdown checklist filled in with the PR's title,
//! description and changed files. Both the orchestrator and the
//! `analyze_pr` prompt render through [`ReviewTemplate`], so the two paths
//! always produce identical text for the same input.

use super::entities::PullRequestData;

/// Rules every PR is checked against
const RULES: [&str; 3] = [
    "PR title must be descriptive.",
    "PR body must explain purpose.",
    "No TODO or commented code left.",
];

/// GitHub rejects comment bodies longer than this many characters.
pub const MAX_COMMENT_LENGTH: usize = 65_536;

const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 16_000;
const MAX_PATH_CHARS: usize = 512;

/// Room kept free for the "more files" line
const OVERFLOW_RESERVE: usize = 64;

/// Templates for the review comment
pub struct ReviewTemplate;

impl ReviewTemplate {
    /// Checklist rules in display order
    pub fn rules() -> &'static [&'static str] {
        &RULES
    }

    /// Render the full review comment. Pure and deterministic.
    ///
    /// The result never exceeds [`MAX_COMMENT_LENGTH`] characters. Long
    /// titles, descriptions and paths are cut with an ellipsis, and files
    /// that do not fit are summarized as a count.
    pub fn render(pr: &PullRequestData) -> String {
        let mut head = String::from("## Automated PR Review\n\n");

        head.push_str(&format!(
            "**PR Title:** {}\n\n",
            truncate(&pr.title, MAX_TITLE_CHARS)
        ));

        head.push_str("**Description:**\n");
        if pr.description.trim().is_empty() {
            head.push_str("_No description provided._\n\n");
        } else {
            head.push_str(&truncate(pr.description.trim_end(), MAX_DESCRIPTION_CHARS));
            head.push_str("\n\n");
        }

        head.push_str(&format!("**Files changed ({}):**\n", pr.files_changed.len()));

        let mut tail = String::from("\n**Checklist:**\n");
        for rule in RULES {
            tail.push_str(&format!("- [ ] {}\n", rule));
        }
        tail.push('\n');
        tail.push_str("Decision: Looks good if all points are followed.\n");

        let budget = MAX_COMMENT_LENGTH
            .saturating_sub(head.chars().count() + tail.chars().count() + OVERFLOW_RESERVE);

        let mut files = String::new();
        let mut used = 0;
        let mut listed = 0;
        if pr.files_changed.is_empty() {
            files.push_str("_No files changed._\n");
        }
        for file in &pr.files_changed {
            let line = format!("- {}\n", truncate(file, MAX_PATH_CHARS));
            let len = line.chars().count();
            if used + len > budget {
                break;
            }
            files.push_str(&line);
            used += len;
            listed += 1;
        }
        let omitted = pr.files_changed.len() - listed;
        if omitted > 0 {
            files.push_str(&format!("- ... and {} more files\n", omitted));
        }

        head + &files + &tail
    }
}

/// Cut `text` to at most `max` characters, marking the cut with "...".
fn truncate(text: &str, max: usize) -> std::borrow::Cow<'_, str> {
    if text.chars().count() <= max {
        return text.into();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept).into()
}
