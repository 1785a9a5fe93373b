//! Token-budgeted summarization orchestrator.
//!
//! One correlated project becomes one summary. Input that fits the
//! effective per-call budget goes through a single backend call; larger
//! input is chunked, each chunk summarized (the map stage), partials are
//! combined under `## Part N` markers, and the combination is summarized
//! again (the reduce stage), recursing until the text fits or the depth
//! cap is reached.
//!
//! Failure containment: a chunk whose calls are exhausted degrades to a
//! placeholder and is recorded in the outcome; only a failure of the
//! initial single-call path aborts the whole project.

use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relnotes_llm::{with_retries, BackendError, LlmBackend, RetryPolicy};

use crate::chunk::{estimate_tokens, Chunk, TextChunker};
use crate::config::AppConfig;
use crate::domain::{CorrelatedProject, RelnotesError, Result, Summary};
use crate::report::{DegradedItem, DegradedReason, ProjectOutcome};
use crate::template::PromptTemplate;

/// Stand-in text for a section that never produced a real summary.
pub const PLACEHOLDER_SUMMARY: &str = "[summary unavailable for this section]";

/// Tokens held back from the context window for the model's response.
pub const RESPONSE_MARGIN_TOKENS: usize = 2_000;

/// Tuning knobs for a summarization pass.
#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    /// Backend context-window budget in tokens.
    pub max_input_tokens: usize,
    /// Target chunk size in tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in tokens.
    pub chunk_overlap: usize,
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
    /// Cap on reduce rounds before the text is truncated instead.
    pub recursion_cap: usize,
}

impl From<&AppConfig> for SummarizeOptions {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_input_tokens: cfg.max_input_tokens,
            chunk_size: cfg.chunk_size,
            chunk_overlap: cfg.chunk_overlap,
            retry: RetryPolicy {
                max_attempts: cfg.max_retries.max(1),
                ..RetryPolicy::default()
            },
            call_timeout: cfg.call_timeout,
            recursion_cap: cfg.recursion_cap,
        }
    }
}

/// How a given input will be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStage {
    SingleCall,
    MapReduce { chunks: usize },
}

/// Render a correlated project as the text handed to the backend.
///
/// Release entry first, then one `##` section per issue, then a flat list
/// of code changes.
pub fn assemble_text(project: &CorrelatedProject) -> String {
    let mut out = String::new();

    if let Some(entry) = &project.release_entry {
        out.push_str(&format!("# {}\n{}\n", entry.title, entry.raw_text));
    } else {
        out.push_str(&format!("# {}\n", project.project_key));
    }

    for issue in &project.issues {
        out.push_str(&format!("\n## {}: {}\n", issue.issue_id, issue.summary));
        if !issue.description.is_empty() {
            out.push_str(&issue.description);
            out.push('\n');
        }
    }

    if !project.records.is_empty() {
        out.push_str("\n## Code changes\n");
        for record in &project.records {
            out.push_str(&format!(
                "- {} {}: {}\n",
                record.kind, record.identifier, record.title_or_message
            ));
        }
    }

    out
}

/// Join partial summaries into one reduce-stage input.
///
/// Headers inside the partials are demoted to plain text so the `## Part N`
/// markers stay the only structure the reduce call sees.
pub fn combine_partials(partials: &[String]) -> String {
    let mut out = String::new();
    for (i, part) in partials.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        out.push_str(&format!("## Part {}\n{}", i + 1, demote_headers(part.trim())));
    }
    out
}

fn demote_headers(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let stripped = line.trim_start_matches('#');
        if stripped.len() != line.len() {
            lines.push(stripped.trim_start());
        } else {
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Longest prefix of `text` (on a char boundary) whose estimate fits
/// `budget` tokens. Relies on the estimator being monotone in length.
fn truncate_to_budget(text: &str, budget: usize) -> String {
    if estimate_tokens(text) <= budget {
        return text.to_string();
    }
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let mut lo = 0;
    let mut hi = boundaries.len() - 1;
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if estimate_tokens(&text[..boundaries[mid]]) <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    text[..boundaries[lo]].to_string()
}

fn degrade_reason(err: &BackendError) -> DegradedReason {
    match err {
        BackendError::Timeout(_) => DegradedReason::Timeout,
        BackendError::RetriesExhausted { last, .. } => degrade_reason(last),
        _ => DegradedReason::RetriesExhausted,
    }
}

/// Drives backend calls for one or more correlated projects.
pub struct SummaryOrchestrator<B: LlmBackend> {
    backend: B,
    template: PromptTemplate,
    opts: SummarizeOptions,
    /// Completion time of the most recent paced call. Pacing spans stage
    /// and project boundaries, so the state lives here and not in the
    /// per-stage loops.
    last_paced_call: tokio::sync::Mutex<Option<tokio::time::Instant>>,
}

impl<B: LlmBackend> SummaryOrchestrator<B> {
    pub fn new(backend: B, template: PromptTemplate, opts: SummarizeOptions) -> Self {
        Self {
            backend,
            template,
            opts,
            last_paced_call: tokio::sync::Mutex::new(None),
        }
    }

    /// Effective per-call input budget: the configured chunk size, capped
    /// so template overhead plus the response still fit the context window.
    pub fn chunk_budget(&self) -> usize {
        let window = self
            .opts
            .max_input_tokens
            .saturating_sub(self.template.overhead_tokens() + RESPONSE_MARGIN_TOKENS);
        self.opts.chunk_size.min(window).max(1)
    }

    fn chunker(&self) -> TextChunker {
        TextChunker::new(self.chunk_budget(), self.opts.chunk_overlap)
    }

    /// Decide whether `text` needs the map-reduce path.
    pub fn plan_stage(&self, text: &str) -> SummaryStage {
        if estimate_tokens(text) <= self.chunk_budget() {
            SummaryStage::SingleCall
        } else {
            SummaryStage::MapReduce {
                chunks: self.chunker().split(text).len(),
            }
        }
    }

    /// Summarize one correlated project end to end.
    pub async fn summarize_project(
        &self,
        project: &CorrelatedProject,
        cancel: &CancellationToken,
    ) -> Result<ProjectOutcome> {
        let text = assemble_text(project);
        debug!(
            project = %project.project_key,
            items = project.item_count(),
            tokens = estimate_tokens(&text),
            "assembled summarization input"
        );

        let mut degraded = Vec::new();
        let summary_text = self
            .summarize_text(&project.project_key, &text, 0, cancel, &mut degraded)
            .await?;

        Ok(ProjectOutcome {
            project_key: project.project_key.clone(),
            summary: Summary::new(&project.project_key, summary_text),
            degraded,
        })
    }

    /// Recursive map-reduce core. `depth` counts reduce rounds; at depth 0
    /// a single-call failure aborts the project, deeper failures degrade.
    fn summarize_text<'a>(
        &'a self,
        key: &'a str,
        text: &'a str,
        depth: usize,
        cancel: &'a CancellationToken,
        degraded: &'a mut Vec<DegradedItem>,
    ) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            if cancel.is_cancelled() {
                return Err(RelnotesError::Cancelled);
            }
            let budget = self.chunk_budget();

            if estimate_tokens(text) <= budget {
                return match self.call_backend(text).await {
                    Ok(summary) => Ok(summary),
                    Err(err) if depth > 0 => {
                        warn!(key, depth, error = %err, "reduce call failed, keeping combined partials");
                        degraded.push(DegradedItem {
                            project_key: key.to_string(),
                            chunk_index: None,
                            reason: degrade_reason(&err),
                            detail: err.to_string(),
                        });
                        Ok(truncate_to_budget(text, budget))
                    }
                    Err(err) => Err(err.into()),
                };
            }

            if depth >= self.opts.recursion_cap {
                warn!(key, depth, "recursion cap reached, truncating instead of summarizing");
                degraded.push(DegradedItem {
                    project_key: key.to_string(),
                    chunk_index: None,
                    reason: DegradedReason::RecursionCapExceeded,
                    detail: format!("input still above budget after {depth} reduce rounds"),
                });
                return Ok(truncate_to_budget(text, budget));
            }

            let chunks = self.chunker().split(text);
            info!(
                key,
                depth,
                chunks = chunks.len(),
                backend = self.backend.name(),
                "map stage"
            );
            let partials = self.summarize_chunks(key, &chunks, cancel, degraded).await?;
            let combined = combine_partials(&partials);
            self.summarize_text(key, &combined, depth + 1, cancel, degraded)
                .await
        })
    }

    /// Map stage: one call per chunk. Paced backends run sequentially
    /// (the delay itself lives in `call_backend`); unpaced backends run
    /// all chunks concurrently. A failed chunk becomes the placeholder,
    /// never an error.
    async fn summarize_chunks(
        &self,
        key: &str,
        chunks: &[Chunk],
        cancel: &CancellationToken,
        degraded: &mut Vec<DegradedItem>,
    ) -> Result<Vec<String>> {
        let mut results = Vec::with_capacity(chunks.len());

        match self.backend.pacing() {
            Some(_) => {
                for chunk in chunks {
                    if cancel.is_cancelled() {
                        return Err(RelnotesError::Cancelled);
                    }
                    results.push(self.call_backend(&chunk.text).await);
                }
            }
            None => {
                if cancel.is_cancelled() {
                    return Err(RelnotesError::Cancelled);
                }
                let calls = chunks.iter().map(|chunk| self.call_backend(&chunk.text));
                results = join_all(calls).await;
            }
        }

        let mut partials = Vec::with_capacity(results.len());
        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(summary) => partials.push(summary),
                Err(err) => {
                    warn!(key, chunk = i, error = %err, "chunk degraded to placeholder");
                    degraded.push(DegradedItem {
                        project_key: key.to_string(),
                        chunk_index: Some(i),
                        reason: degrade_reason(&err),
                        detail: err.to_string(),
                    });
                    partials.push(PLACEHOLDER_SUMMARY.to_string());
                }
            }
        }
        Ok(partials)
    }

    /// One rendered, timeout-bounded, retried backend call. For paced
    /// backends the pacing interval is enforced between every pair of
    /// successive calls, including across map, reduce, and project
    /// boundaries.
    async fn call_backend(&self, body: &str) -> relnotes_llm::BackendResult<String> {
        let prompt = self.template.render(body);
        match self.backend.pacing() {
            Some(pause) => {
                let mut last = self.last_paced_call.lock().await;
                if let Some(previous) = *last {
                    tokio::time::sleep_until(previous + pause).await;
                }
                let result = self.attempt_call(&prompt).await;
                *last = Some(tokio::time::Instant::now());
                result
            }
            None => self.attempt_call(&prompt).await,
        }
    }

    async fn attempt_call(&self, prompt: &str) -> relnotes_llm::BackendResult<String> {
        with_retries(&self.opts.retry, || {
            let timeout = self.opts.call_timeout;
            async move {
                match tokio::time::timeout(timeout, self.backend.generate(prompt)).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::Timeout(timeout.as_secs())),
                }
            }
        })
        .await
    }
}
