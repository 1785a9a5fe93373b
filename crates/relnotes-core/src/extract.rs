//! Identifier extraction from free text.
//!
//! Pulls project/issue identifiers out of titles, commit messages, and
//! descriptions using an ordered list of configurable pattern rules. A text
//! with no match yields an empty set; absence of an identifier means the
//! text is unassociated, never an error.

use regex::Regex;
use tracing::warn;

use crate::config::ConfigError;

/// One identifier pattern, applied in configured order.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub name: String,
    regex: Regex,
    /// Capture group holding the project key portion of the match.
    project_key_group: usize,
}

impl PatternRule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        project_key_group: usize,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidFilterRule {
            field: name.clone(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            regex,
            project_key_group,
        })
    }
}

/// Normalize a project key: uppercase, separators stripped.
///
/// `"OCPNODE"`, `"ocpnode"`, and `"ocp_node"` all normalize to `OCPNODE`.
pub fn normalize_project_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Normalized project key for a full issue id, from its prefix.
///
/// `"ocpnode_2340"` yields `Some("OCPNODE")`. Ids without an alphabetic
/// prefix are malformed and yield `None` (treated as "no match").
pub fn issue_project_key(issue_id: &str) -> Option<String> {
    let prefix = issue_id.trim().split(['-', '_']).next()?;
    let key = normalize_project_key(prefix);
    if key.is_empty() || !key.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(key)
}

/// Canonical form of a raw issue id: uppercase, underscores mapped to
/// hyphens, so `"ocpnode_2340"` and `"OCPNODE-2340"` compare equal.
pub fn canonicalize_issue_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c == '_' { '-' } else { c.to_ascii_uppercase() })
        .collect()
}

/// Extracts `(project_key, raw_id)` pairs from free text.
#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    patterns: Vec<PatternRule>,
}

impl IdentifierExtractor {
    pub fn new(patterns: Vec<PatternRule>) -> Self {
        Self { patterns }
    }

    /// The stock JIRA-style issue-key pattern, e.g. `OCPNODE-2340`.
    pub fn with_default_patterns() -> Self {
        let rule = PatternRule::new(
            "jira-issue-key",
            r"\b([A-Za-z][A-Za-z0-9]*)[-_](\d+)\b",
            1,
        )
        .expect("default pattern is valid");
        Self::new(vec![rule])
    }

    /// Apply each pattern in order and collect every distinct
    /// `(project_key, raw_id)` pair, in first-match order.
    ///
    /// Returns an empty vector when nothing matches.
    pub fn extract(&self, text: &str) -> Vec<(String, String)> {
        let mut found: Vec<(String, String)> = Vec::new();
        for rule in &self.patterns {
            for caps in rule.regex.captures_iter(text) {
                let Some(key_match) = caps.get(rule.project_key_group) else {
                    warn!(rule = %rule.name, "pattern matched without its project key group");
                    continue;
                };
                let key = normalize_project_key(key_match.as_str());
                if key.is_empty() {
                    continue;
                }
                let raw_id = canonicalize_issue_id(caps.get(0).map_or("", |m| m.as_str()));
                let pair = (key, raw_id);
                if !found.contains(&pair) {
                    found.push(pair);
                }
            }
        }
        found
    }
}

impl Default for IdentifierExtractor {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}
