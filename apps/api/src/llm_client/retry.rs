//! Bounded retry loop around a single `CompletionService` call.
//!
//! Fixed backoff, no jitter. Only `FailureKind::Transient` errors are retried.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::{CompletionService, FailureKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. 0 is treated as 1.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Error generating response after {attempts} attempt(s): {message}")]
pub struct CompletionError {
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

/// The completion entry point used by the pipeline.
#[derive(Clone)]
pub struct CompletionClient {
    service: Arc<dyn CompletionService>,
    policy: RetryPolicy,
}

impl CompletionClient {
    pub fn new(service: Arc<dyn CompletionService>, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Sends `prompt`, constraining the answer to one JSON value when `structured` is set.
    pub async fn complete(&self, prompt: &str, structured: bool) -> Result<String, CompletionError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.service.generate(prompt, structured).await {
                Ok(text) => {
                    debug!(
                        "Completion succeeded on attempt {attempt}: {} chars",
                        text.len()
                    );
                    return Ok(text);
                }
                Err(err) => err,
            };

            let kind = err.kind();
            if kind == FailureKind::Permanent || attempt >= max_attempts {
                return Err(CompletionError {
                    kind,
                    message: err.to_string(),
                    attempts: attempt,
                });
            }

            warn!(
                "Completion attempt {attempt}/{max_attempts} failed ({err}), retrying after {}ms...",
                self.policy.backoff.as_millis()
            );
            tokio::time::sleep(self.policy.backoff).await;
        }
    }
}
