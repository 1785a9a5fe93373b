//! Grouping of heterogeneous records into per-project bundles.
//!
//! A single correlation pass builds one [`CorrelatedProject`] per distinct
//! normalized project key observed across the three sources. The output
//! mapping and the member lists inside each project are deterministic for
//! identical input sequences; malformed identifiers are logged and skipped,
//! never a hard error.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{CorrelatedProject, GithubRecord, JiraIssue, ReleaseEntry};
use crate::extract::{self, IdentifierExtractor};

/// Result of one correlation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationOutcome {
    /// Project key to bundle, ordered by key for reproducible output.
    pub projects: BTreeMap<String, CorrelatedProject>,
    /// GitHub records whose text and references matched no project key.
    pub non_correlated: Vec<GithubRecord>,
}

impl CorrelationOutcome {
    /// Total members across all projects.
    pub fn correlated_items(&self) -> usize {
        self.projects.values().map(|p| p.item_count()).sum()
    }
}

/// Correlates release entries, JIRA issues, and GitHub records by
/// normalized project key.
#[derive(Debug, Default)]
pub struct Correlator {
    extractor: IdentifierExtractor,
}

impl Correlator {
    pub fn new(extractor: IdentifierExtractor) -> Self {
        Self { extractor }
    }

    /// Run one correlation pass over the given input sequences.
    ///
    /// Accumulation is per source into disjoint key buckets and the merge
    /// into the shared mapping happens serially right here, so the mapping
    /// needs no locking.
    pub fn correlate(
        &self,
        entries: Vec<ReleaseEntry>,
        issues: Vec<JiraIssue>,
        records: Vec<GithubRecord>,
    ) -> CorrelationOutcome {
        let mut projects: BTreeMap<String, CorrelatedProject> = BTreeMap::new();
        let mut non_correlated = Vec::new();

        for entry in entries {
            let key = extract::normalize_project_key(&entry.project);
            if key.is_empty() {
                warn!(title = %entry.title, "release entry without usable project key, skipped");
                continue;
            }
            let project = projects
                .entry(key.clone())
                .or_insert_with(|| CorrelatedProject::new(key.clone()));
            if project.release_entry.is_some() {
                warn!(key = %key, title = %entry.title, "duplicate release entry for project, keeping first");
            } else {
                project.release_entry = Some(entry);
            }
        }

        for issue in issues {
            let Some(key) = issue.project_key() else {
                warn!(issue_id = %issue.issue_id, "issue id has no usable project prefix, skipped");
                continue;
            };
            let project = projects
                .entry(key.clone())
                .or_insert_with(|| CorrelatedProject::new(key));
            if !project.push_issue(issue) {
                debug!("duplicate issue ignored");
            }
        }

        for record in records {
            let keys = self.candidate_keys(&record);
            if keys.is_empty() {
                non_correlated.push(record);
                continue;
            }
            // A record referencing issues across projects is attached to
            // every matching project, shared behind one Arc.
            let record = Arc::new(record);
            for key in keys {
                let project = projects
                    .entry(key.clone())
                    .or_insert_with(|| CorrelatedProject::new(key));
                let _ = project.push_record(Arc::clone(&record));
            }
        }

        info!(
            projects = projects.len(),
            non_correlated = non_correlated.len(),
            "correlation pass complete"
        );
        CorrelationOutcome {
            projects,
            non_correlated,
        }
    }

    /// Distinct project keys a GitHub record belongs to: keys extracted
    /// from its text, unioned with keys derived from its pre-extracted
    /// issue references. Order is first-seen.
    fn candidate_keys(&self, record: &GithubRecord) -> Vec<String> {
        let mut keys: Vec<String> = self
            .extractor
            .extract(&record.title_or_message)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        for issue_id in &record.referenced_issue_ids {
            match extract::issue_project_key(issue_id) {
                Some(key) => {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                None => {
                    warn!(issue_id = %issue_id, "unparseable issue reference, ignored");
                }
            }
        }
        keys.dedup();
        keys
    }
}
