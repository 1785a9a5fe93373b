//! Source records supplied by the external collaborators.
//!
//! All three record types are immutable once constructed: the scraper,
//! JIRA client, and GitHub client hand them over fully formed and the
//! pipeline only reads them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One item from a release page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEntry {
    /// Declared project/component area, e.g. `OCPNODE`.
    pub project: String,
    pub title: String,
    pub raw_text: String,
    pub source_url: String,
}

/// A JIRA issue as returned by the JIRA client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraIssue {
    /// Full issue key, e.g. `OCPNODE-2340`.
    pub issue_id: String,
    pub summary: String,
    #[serde(default)]
    pub description: String,
}

impl JiraIssue {
    /// Normalized project key derived from the issue id prefix, or `None`
    /// when the id is malformed (treated as "no match", never an error).
    pub fn project_key(&self) -> Option<String> {
        crate::extract::issue_project_key(&self.issue_id)
    }
}

/// Kind of GitHub item a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GithubKind {
    PullRequest,
    Commit,
}

impl fmt::Display for GithubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GithubKind::PullRequest => write!(f, "PR"),
            GithubKind::Commit => write!(f, "commit"),
        }
    }
}

/// A pull request or commit as returned by the GitHub client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubRecord {
    pub kind: GithubKind,
    /// PR number or commit SHA, as a string.
    pub identifier: String,
    pub title_or_message: String,
    /// Issue ids already extracted by the client, possibly empty.
    #[serde(default)]
    pub referenced_issue_ids: Vec<String>,
}

impl GithubRecord {
    /// Uniqueness key within a correlated project.
    pub fn identity(&self) -> (GithubKind, &str) {
        (self.kind, self.identifier.as_str())
    }
}
