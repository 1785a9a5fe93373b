//! relnotes Core Library
//!
//! Correlation and summarization pipeline for release tracking: groups
//! release-page entries, JIRA issues, and GitHub activity under normalized
//! project keys, then produces one token-budgeted LLM summary per project.

pub mod artifact;
pub mod chunk;
pub mod config;
pub mod correlate;
pub mod domain;
pub mod extract;
pub mod filter;
pub mod report;
pub mod summarize;
pub mod telemetry;
pub mod template;

pub use artifact::SummaryStore;
pub use chunk::{estimate_tokens, Chunk, TextChunker};
pub use config::{AppConfig, ConfigError, LlmProvider};
pub use correlate::{CorrelationOutcome, Correlator};
pub use domain::{
    CorrelatedProject, GithubKind, GithubRecord, JiraIssue, ReleaseEntry, RelnotesError, Result,
    Summary,
};
pub use extract::IdentifierExtractor;
pub use filter::{FilterAction, FilterEngine, FilterRule};
pub use report::{DegradedItem, DegradedReason, ProjectOutcome, RunReport};
pub use summarize::{
    assemble_text, combine_partials, SummarizeOptions, SummaryOrchestrator, SummaryStage,
    PLACEHOLDER_SUMMARY,
};
pub use template::PromptTemplate;
