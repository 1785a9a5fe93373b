//! relnotes - Release Tracking Correlation and Summarization CLI
//!
//! ## Commands
//!
//! - `scrape`: Ingest record exports, apply filter rules, stage the results
//! - `correlate`: Group staged records under normalized project keys
//! - `summarize`: Produce one LLM summary per correlated project

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

use relnotes_core::summarize::SummarizeOptions;
use relnotes_core::{
    AppConfig, Correlator, FilterEngine, GithubRecord, JiraIssue, LlmProvider, PromptTemplate,
    ProjectOutcome, ReleaseEntry, RunReport, SummaryOrchestrator, SummaryStore,
};
use relnotes_llm::{GeminiBackend, LlmBackend, OllamaBackend};

/// Built-in summarize prompt, used when no template file is given.
const DEFAULT_TEMPLATE: &str = "You are preparing release notes for an \
engineering audience. Summarize the following correlated release activity \
into a short, factual overview. Keep issue identifiers verbatim.\n\n\
{release-notes}\n";

const ENTRIES_FILE: &str = "entries.json";
const JIRA_FILE: &str = "jira.json";
const GITHUB_FILE: &str = "github.json";
const CORRELATED_FILE: &str = "correlated.json";
const NON_CORRELATED_FILE: &str = "non_correlated.json";
const FILTER_RULES_FILE: &str = "filter.json";
const RUN_REPORT_FILE: &str = "run_report.json";

#[derive(Parser)]
#[command(name = "relnotes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release-tracking correlation and summarization pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest record exports, apply filter rules, stage them in the data dir
    Scrape {
        /// Release-page entries export (JSON array)
        #[arg(long)]
        entries: PathBuf,

        /// JIRA issues export (JSON array)
        #[arg(long)]
        jira: PathBuf,

        /// GitHub PR/commit export (JSON array)
        #[arg(long)]
        github: PathBuf,

        /// Data directory (default: DATA_DIR env or ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Skip filter rules even when filtering is enabled
        #[arg(long)]
        no_filter: bool,
    },

    /// Group staged records under normalized project keys
    Correlate {
        /// Data directory (default: DATA_DIR env or ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Skip filter rules even when filtering is enabled
        #[arg(long)]
        no_filter: bool,
    },

    /// Produce one LLM summary per correlated project
    Summarize {
        /// Release version used to key stored artifacts
        #[arg(long)]
        release_version: String,

        /// Data directory (default: DATA_DIR env or ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Prompt template file with a body placeholder
        #[arg(long)]
        template: Option<PathBuf>,

        /// Placeholder name substituted in the template
        #[arg(long, default_value = "release-notes")]
        placeholder: String,

        /// Output directory for summary artifacts (default: <data-dir>/summaries)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    relnotes_core::telemetry::init_tracing(cli.json, level);

    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command {
        Commands::Scrape {
            entries,
            jira,
            github,
            data_dir,
            no_filter,
        } => cmd_scrape(&config, &entries, &jira, &github, data_dir, no_filter),
        Commands::Correlate {
            data_dir,
            no_filter,
        } => cmd_correlate(&config, data_dir, no_filter),
        Commands::Summarize {
            release_version,
            data_dir,
            template,
            placeholder,
            out,
        } => {
            cmd_summarize(
                &config,
                &release_version,
                data_dir,
                template.as_deref(),
                &placeholder,
                out,
            )
            .await
        }
    }
}

fn resolve_data_dir(config: &AppConfig, override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| config.data_dir.clone())
}

/// Rule engine for this run, or `None` when filtering is off. A missing or
/// unreadable rules file with filtering enabled is fatal.
fn load_filter(
    config: &AppConfig,
    data_dir: &Path,
    no_filter: bool,
) -> Result<Option<FilterEngine>> {
    if !config.filter_on || no_filter {
        info!("record filtering disabled");
        return Ok(None);
    }
    let rules_path = data_dir.join(FILTER_RULES_FILE);
    let engine = FilterEngine::from_file(&rules_path)
        .with_context(|| format!("loading filter rules from {}", rules_path.display()))?;
    Ok(Some(engine))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Stage filtered record exports into the data directory.
fn cmd_scrape(
    config: &AppConfig,
    entries_path: &Path,
    jira_path: &Path,
    github_path: &Path,
    data_dir: Option<PathBuf>,
    no_filter: bool,
) -> Result<()> {
    let data_dir = resolve_data_dir(config, data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let mut entries: Vec<ReleaseEntry> = load_json(entries_path)?;
    let mut issues: Vec<JiraIssue> = load_json(jira_path)?;
    let mut records: Vec<GithubRecord> = load_json(github_path)?;

    if let Some(filter) = load_filter(config, &data_dir, no_filter)? {
        entries = filter.apply(entries, "entries");
        issues = filter.apply(issues, "jira");
        records = filter.apply(records, "github");
    }

    save_json(&data_dir.join(ENTRIES_FILE), &entries)?;
    save_json(&data_dir.join(JIRA_FILE), &issues)?;
    save_json(&data_dir.join(GITHUB_FILE), &records)?;

    info!(
        entries = entries.len(),
        issues = issues.len(),
        records = records.len(),
        "staged records into {}",
        data_dir.display()
    );
    println!(
        "Staged {} entries, {} issues, {} GitHub records",
        entries.len(),
        issues.len(),
        records.len()
    );
    Ok(())
}

/// Correlate the staged records and persist both output files.
fn cmd_correlate(config: &AppConfig, data_dir: Option<PathBuf>, no_filter: bool) -> Result<()> {
    let data_dir = resolve_data_dir(config, data_dir);

    let mut entries: Vec<ReleaseEntry> = load_json(&data_dir.join(ENTRIES_FILE))?;
    let mut issues: Vec<JiraIssue> = load_json(&data_dir.join(JIRA_FILE))?;
    let mut records: Vec<GithubRecord> = load_json(&data_dir.join(GITHUB_FILE))?;

    // Staged files may come from an external producer, so the rules are
    // applied here as well; re-filtering already-filtered data is a no-op.
    if let Some(filter) = load_filter(config, &data_dir, no_filter)? {
        entries = filter.apply(entries, "entries");
        issues = filter.apply(issues, "jira");
        records = filter.apply(records, "github");
    }

    let outcome = Correlator::default().correlate(entries, issues, records);

    save_json(&data_dir.join(CORRELATED_FILE), &outcome.projects)?;
    save_json(&data_dir.join(NON_CORRELATED_FILE), &outcome.non_correlated)?;

    println!(
        "Correlated {} items into {} projects ({} records unmatched)",
        outcome.correlated_items(),
        outcome.projects.len(),
        outcome.non_correlated.len()
    );
    Ok(())
}

/// Summarize every correlated project and persist one artifact each.
async fn cmd_summarize(
    config: &AppConfig,
    release_version: &str,
    data_dir: Option<PathBuf>,
    template_path: Option<&Path>,
    placeholder: &str,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let data_dir = resolve_data_dir(config, data_dir);
    let out_dir = out_dir.unwrap_or_else(|| data_dir.join("summaries"));

    let projects: std::collections::BTreeMap<String, relnotes_core::CorrelatedProject> =
        load_json(&data_dir.join(CORRELATED_FILE))?;
    if projects.is_empty() {
        bail!("no correlated projects found; run `relnotes correlate` first");
    }

    let template = match template_path {
        Some(path) => {
            PromptTemplate::from_file(path, placeholder).context("loading prompt template")?
        }
        None => PromptTemplate::new(DEFAULT_TEMPLATE, placeholder)
            .context("built-in template")?,
    };
    let options = SummarizeOptions::from(config);
    let backend = build_backend(config);
    let store = SummaryStore::new(&out_dir, release_version);
    let cancel = CancellationToken::new();

    let started_at = Utc::now();
    let mut outcomes: Vec<ProjectOutcome> = Vec::new();
    let mut failures: Vec<(String, String)> = Vec::new();

    let orchestrator = SummaryOrchestrator::new(backend, template, options);
    for (key, project) in &projects {
        match orchestrator.summarize_project(project, &cancel).await {
            Ok(outcome) => {
                let path = store.save(&outcome.summary)?;
                info!(project = %key, path = %path.display(), "summary stored");
                outcomes.push(outcome);
            }
            Err(err) => {
                warn!(project = %key, error = %err, "project summarization failed");
                failures.push((key.clone(), err.to_string()));
            }
        }
    }

    let report = RunReport {
        started_at,
        finished_at: Utc::now(),
        outcomes,
        failures,
    };
    save_json(&data_dir.join(RUN_REPORT_FILE), &report)?;
    print_report(&report, &out_dir);

    if report.total_failure() {
        bail!("all {} projects failed to summarize", report.failures.len());
    }
    Ok(())
}

fn build_backend(config: &AppConfig) -> Box<dyn LlmBackend> {
    match config.provider {
        LlmProvider::Local => Box::new(
            OllamaBackend::new(&config.llm_api_url, &config.llm_model)
                .with_pacing(config.pacing),
        ),
        LlmProvider::Gemini => Box::new(
            GeminiBackend::new(
                config.google_api_key.clone().unwrap_or_default(),
                &config.gemini_model,
            )
            .with_pacing(config.pacing),
        ),
    }
}

fn print_report(report: &RunReport, out_dir: &Path) {
    println!(
        "Summarized {} projects in {}s ({} degraded sections, {} failures)",
        report.outcomes.len(),
        (report.finished_at - report.started_at).num_seconds(),
        report.degraded_count(),
        report.failures.len()
    );
    println!("Artifacts written under {}", out_dir.display());

    for outcome in &report.outcomes {
        for item in &outcome.degraded {
            match item.chunk_index {
                Some(i) => println!(
                    "  degraded: {} chunk {} ({}): {}",
                    item.project_key, i, item.reason, item.detail
                ),
                None => println!(
                    "  degraded: {} ({}): {}",
                    item.project_key, item.reason, item.detail
                ),
            }
        }
    }
    for (key, error) in &report.failures {
        println!("  failed: {key}: {error}");
    }
}
