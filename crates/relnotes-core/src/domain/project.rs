//! The central aggregate: all activity observed for one project key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::record::{GithubRecord, JiraIssue, ReleaseEntry};

/// All records grouped under one normalized project key.
///
/// Built once during a correlation pass and not mutated afterward. Member
/// lists keep input insertion order; a GitHub record referencing issues
/// across projects is attached to every matching project behind the same
/// `Arc` (shared by reference, not duplicated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedProject {
    pub project_key: String,
    /// Originating release-page entry, when one exists for this key.
    pub release_entry: Option<ReleaseEntry>,
    pub issues: Vec<JiraIssue>,
    pub records: Vec<Arc<GithubRecord>>,
}

impl CorrelatedProject {
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            release_entry: None,
            issues: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Add an issue, deduplicated by `issue_id`. Returns `false` on a
    /// duplicate (re-adding is a no-op).
    pub fn push_issue(&mut self, issue: JiraIssue) -> bool {
        if self.issues.iter().any(|i| i.issue_id == issue.issue_id) {
            return false;
        }
        self.issues.push(issue);
        true
    }

    /// Add a GitHub record, deduplicated by `(kind, identifier)`.
    pub fn push_record(&mut self, record: Arc<GithubRecord>) -> bool {
        if self.records.iter().any(|r| r.identity() == record.identity()) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Total member count across all three sources.
    pub fn item_count(&self) -> usize {
        usize::from(self.release_entry.is_some()) + self.issues.len() + self.records.len()
    }
}
