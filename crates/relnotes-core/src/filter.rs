//! Configured inclusion/exclusion rules applied to records before
//! correlation or summarization.
//!
//! Rules are evaluated in configured order. A record is dropped as soon as
//! any exclude rule matches; when include rules are present, at least one
//! of them must match. With no rules configured everything passes.
//! `passes` is a pure function of `(record, rules)` and safe to re-run.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ConfigError;
use crate::domain::{GithubRecord, JiraIssue, ReleaseEntry};

/// Whether a matching rule keeps or drops the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Include,
    Exclude,
}

/// One rule from the external rule file (`filter.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    /// Record field the pattern is matched against.
    pub field: String,
    /// Case-insensitive regex.
    pub pattern: String,
    pub action: FilterAction,
}

/// Records expose named text fields to the filter engine.
pub trait Filterable {
    fn field(&self, name: &str) -> Option<&str>;
}

impl Filterable for ReleaseEntry {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "project" => Some(&self.project),
            "title" => Some(&self.title),
            "raw_text" => Some(&self.raw_text),
            "source_url" => Some(&self.source_url),
            _ => None,
        }
    }
}

impl Filterable for JiraIssue {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "issue_id" => Some(&self.issue_id),
            "summary" => Some(&self.summary),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

impl Filterable for GithubRecord {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "identifier" => Some(&self.identifier),
            // "title" is accepted as an alias so one rule file can target
            // the title-ish field of every record type.
            "title" | "title_or_message" => Some(&self.title_or_message),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct CompiledRule {
    field: String,
    regex: Regex,
    action: FilterAction,
}

/// Ordered rule set compiled for matching.
#[derive(Debug, Default)]
pub struct FilterEngine {
    rules: Vec<CompiledRule>,
}

impl FilterEngine {
    /// Compile a rule list. An invalid regex is a configuration error,
    /// fatal at startup.
    pub fn new(rules: Vec<FilterRule>) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let regex = RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidFilterRule {
                    field: rule.field.clone(),
                    pattern: rule.pattern.clone(),
                    reason: e.to_string(),
                })?;
            compiled.push(CompiledRule {
                field: rule.field,
                regex,
                action: rule.action,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Load and compile rules from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::UnreadableFile {
            what: "filter rules",
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let rules: Vec<FilterRule> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::UnreadableFile {
                what: "filter rules",
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::new(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `record` survives the rule set.
    pub fn passes(&self, record: &dyn Filterable) -> bool {
        let mut has_include = false;
        let mut include_hit = false;

        for rule in &self.rules {
            let matched = record
                .field(&rule.field)
                .is_some_and(|value| rule.regex.is_match(value));
            match rule.action {
                FilterAction::Exclude => {
                    if matched {
                        return false;
                    }
                }
                FilterAction::Include => {
                    has_include = true;
                    if matched {
                        include_hit = true;
                    }
                }
            }
        }

        !has_include || include_hit
    }

    /// Filter a batch, logging how many records were dropped.
    pub fn apply<T: Filterable>(&self, items: Vec<T>, source: &str) -> Vec<T> {
        if self.is_empty() {
            return items;
        }
        let before = items.len();
        let kept: Vec<T> = items.into_iter().filter(|i| self.passes(i)).collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            info!(source, kept = kept.len(), dropped, "filter applied");
        } else {
            debug!(source, kept = kept.len(), "filter applied, nothing dropped");
        }
        kept
    }
}
