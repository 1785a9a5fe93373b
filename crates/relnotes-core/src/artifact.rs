//! Filesystem persistence for summaries and correlation output.
//!
//! Layout: `<root>/<release_version>/<sanitized subject key>.txt`

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::domain::{Result, Summary};

pub struct SummaryStore {
    release_dir: PathBuf,
}

impl SummaryStore {
    pub fn new(root: impl AsRef<Path>, release_version: &str) -> Self {
        Self {
            release_dir: root.as_ref().join(sanitize_component(release_version)),
        }
    }

    pub fn summary_path(&self, subject_key: &str) -> PathBuf {
        self.release_dir
            .join(format!("{}.txt", sanitize_component(subject_key)))
    }

    pub fn save(&self, summary: &Summary) -> Result<PathBuf> {
        let path = self.summary_path(&summary.subject_key);
        fs::create_dir_all(&self.release_dir)?;

        // Atomic write: write to temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&self.release_dir)?;
        tmp.write_all(summary.text.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(path)
    }

    pub fn load(&self, subject_key: &str) -> Result<Summary> {
        let text = fs::read_to_string(self.summary_path(subject_key))?;
        Ok(Summary::new(subject_key, text))
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` so keys stay valid file names.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
