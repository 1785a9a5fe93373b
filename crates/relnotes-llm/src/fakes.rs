//! In-memory fake backends (testing only)
//!
//! Provides `EchoBackend`, `FlakyBackend`, and `FailingBackend` that satisfy
//! the [`LlmBackend`] contract without network access. Used by unit and
//! integration tests across the workspace.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{BackendError, BackendResult, LlmBackend};

/// Returns every prompt verbatim and records it.
#[derive(Debug, Default)]
pub struct EchoBackend {
    calls: Mutex<Vec<String>>,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> BackendResult<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        Ok(prompt.to_string())
    }
}

/// Fails the first `failures` calls with a 500, then echoes.
#[derive(Debug)]
pub struct FlakyBackend {
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyBackend {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, prompt: &str) -> BackendResult<String> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(BackendError::Status {
                status: 500,
                body: format!("transient failure {}", n + 1),
            })
        } else {
            Ok(prompt.to_string())
        }
    }
}

/// Always fails with a 503.
#[derive(Debug, Default)]
pub struct FailingBackend {
    attempts: AtomicUsize,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> BackendResult<String> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BackendError::Status {
            status: 503,
            body: "permanently unavailable".to_string(),
        })
    }
}
