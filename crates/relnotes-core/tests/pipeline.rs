//! End-to-end pipeline tests: correlate raw records, summarize each
//! project, persist the summaries.

use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use relnotes_core::summarize::SummarizeOptions;
use relnotes_core::{
    assemble_text, Correlator, GithubKind, GithubRecord, JiraIssue, PromptTemplate, ReleaseEntry,
    SummaryOrchestrator, SummaryStore,
};
use relnotes_llm::fakes::{EchoBackend, FailingBackend, FlakyBackend};
use relnotes_llm::RetryPolicy;

fn release_entry(project: &str, title: &str) -> ReleaseEntry {
    ReleaseEntry {
        project: project.to_string(),
        title: title.to_string(),
        raw_text: format!("{title} shipped in this release."),
        source_url: "https://example.invalid/notes".to_string(),
    }
}

fn issue(id: &str, summary: &str) -> JiraIssue {
    JiraIssue {
        issue_id: id.to_string(),
        summary: summary.to_string(),
        description: String::new(),
    }
}

fn pull_request(number: &str, title: &str, refs: &[&str]) -> GithubRecord {
    GithubRecord {
        kind: GithubKind::PullRequest,
        identifier: number.to_string(),
        title_or_message: title.to_string(),
        referenced_issue_ids: refs.iter().map(|s| s.to_string()).collect(),
    }
}

fn test_options() -> SummarizeOptions {
    SummarizeOptions {
        max_input_tokens: 50_000,
        chunk_size: 40_000,
        chunk_overlap: 100,
        retry: RetryPolicy::no_delays(1),
        call_timeout: std::time::Duration::from_secs(5),
        recursion_cap: 3,
    }
}

#[tokio::test]
async fn correlated_projects_summarize_and_persist() {
    let entries = vec![release_entry("OCPNODE", "Node improvements")];
    let issues = vec![issue("OCPNODE-2340", "kubelet crash on cgroup v2")];
    let records = vec![pull_request(
        "481",
        "OCPNODE-2340: guard cgroup probe",
        &["OCPNODE-2340"],
    )];

    let outcome = Correlator::default().correlate(entries, issues, records);
    assert_eq!(outcome.projects.len(), 1);
    assert!(outcome.non_correlated.is_empty());

    let project = &outcome.projects["OCPNODE"];
    let orchestrator = SummaryOrchestrator::new(
        EchoBackend::new(),
        PromptTemplate::passthrough(),
        test_options(),
    );
    let cancel = CancellationToken::new();

    let result = orchestrator
        .summarize_project(project, &cancel)
        .await
        .unwrap();

    // Echo backend returns the assembled text, so all three sources show up.
    assert!(result.summary.text.contains("Node improvements"));
    assert!(result.summary.text.contains("kubelet crash on cgroup v2"));
    assert!(result.summary.text.contains("guard cgroup probe"));
    assert!(result.is_clean());

    let dir = TempDir::new().unwrap();
    let store = SummaryStore::new(dir.path(), "4.16.2");
    let path = store.save(&result.summary).unwrap();
    assert!(path.is_file());
    assert_eq!(store.load("OCPNODE").unwrap(), result.summary);
}

#[tokio::test]
async fn cross_project_record_appears_in_both_summaries() {
    let issues = vec![
        issue("OCPNODE-1", "node fix"),
        issue("STOR-2", "storage fix"),
    ];
    let records = vec![pull_request(
        "99",
        "shared fix for OCPNODE-1 and STOR-2",
        &["OCPNODE-1", "STOR-2"],
    )];

    let outcome = Correlator::default().correlate(vec![], issues, records);
    let node = &outcome.projects["OCPNODE"];
    let stor = &outcome.projects["STOR"];
    assert!(Arc::ptr_eq(&node.records[0], &stor.records[0]));

    assert!(assemble_text(node).contains("shared fix"));
    assert!(assemble_text(stor).contains("shared fix"));
}

#[tokio::test]
async fn transient_backend_failures_recover_without_surfacing() {
    let issues = vec![issue("STOR-3", "csi driver timeout")];
    let outcome = Correlator::default().correlate(vec![], issues, vec![]);
    let project = &outcome.projects["STOR"];

    // Two failures, then success; three attempts cover it.
    let orchestrator = SummaryOrchestrator::new(
        FlakyBackend::failing_first(2),
        PromptTemplate::passthrough(),
        SummarizeOptions {
            retry: RetryPolicy::no_delays(3),
            ..test_options()
        },
    );

    let result = orchestrator
        .summarize_project(project, &CancellationToken::new())
        .await
        .unwrap();

    assert!(result.is_clean());
    assert!(result.summary.text.contains("csi driver timeout"));
}

#[tokio::test]
async fn one_failing_project_does_not_take_down_the_run() {
    let issues = vec![issue("NET-7", "route flap")];
    let outcome = Correlator::default().correlate(vec![], issues, vec![]);
    let project = &outcome.projects["NET"];

    let orchestrator = SummaryOrchestrator::new(
        FailingBackend::new(),
        PromptTemplate::passthrough(),
        test_options(),
    );
    let cancel = CancellationToken::new();

    // Small input, single-call path: the project fails but yields a typed
    // error the caller records as a per-project failure.
    let err = orchestrator
        .summarize_project(project, &cancel)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("retries exhausted"));
}
