//! Summarization output.

use serde::{Deserialize, Serialize};

/// Natural-language summary of one chunk or one correlated project.
///
/// Persisted externally keyed by `(release_version, subject_key)`; the text
/// is whatever the backend returned, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub subject_key: String,
    pub text: String,
}

impl Summary {
    pub fn new(subject_key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            subject_key: subject_key.into(),
            text: text.into(),
        }
    }
}
