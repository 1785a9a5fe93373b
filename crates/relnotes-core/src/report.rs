//! Run-level accounting for a summarization pass.
//!
//! Degradations (a chunk that never summarized, a recursion round that hit
//! the cap) are recorded here rather than failing the run; hard failures
//! that abort a whole project land in `failures`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    RetriesExhausted,
    Timeout,
    RecursionCapExceeded,
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RetriesExhausted => write!(f, "retries exhausted"),
            Self::Timeout => write!(f, "timed out"),
            Self::RecursionCapExceeded => write!(f, "recursion cap exceeded"),
        }
    }
}

/// One part of a project's input that did not get a real summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedItem {
    pub project_key: String,
    /// Chunk within the map stage, if the degradation was chunk-scoped.
    pub chunk_index: Option<usize>,
    pub reason: DegradedReason,
    pub detail: String,
}

/// Result of summarizing one correlated project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectOutcome {
    pub project_key: String,
    pub summary: Summary,
    pub degraded: Vec<DegradedItem>,
}

impl ProjectOutcome {
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

/// Everything that happened in one summarize invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<ProjectOutcome>,
    /// Projects that produced no summary at all, with the error text.
    pub failures: Vec<(String, String)>,
}

impl RunReport {
    pub fn degraded_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.degraded.len()).sum()
    }

    /// True when every project failed outright.
    pub fn total_failure(&self) -> bool {
        self.outcomes.is_empty() && !self.failures.is_empty()
    }
}
