//! Domain model for the correlation and summarization pipeline.

pub mod error;
pub mod project;
pub mod record;
pub mod summary;

pub use error::{RelnotesError, Result};
pub use project::CorrelatedProject;
pub use record::{GithubKind, GithubRecord, JiraIssue, ReleaseEntry};
pub use summary::Summary;
