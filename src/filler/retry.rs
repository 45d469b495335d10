//! Timeout, bounded retry and corrective retry around a slot filler.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use crate::error::{Error, Result};
use crate::model::FilledBlock;

use super::{unavailable, validate_blocks, FillRequest, SlotFiller, DEFAULT_TIMEOUT};

/// Retry budget for classification calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per call when the engine is unavailable (at least 1)
    pub max_attempts: u32,

    /// Corrective retries after a malformed answer
    pub corrective_retries: u32,

    /// Time budget of a single attempt
    pub timeout: Duration,

    /// Backoff before the second attempt
    pub initial_backoff: Duration,

    /// Upper bound of the exponential backoff
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            corrective_retries: 0,
            ..Self::default()
        }
    }

    /// Set the number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the number of corrective retries.
    pub fn with_corrective_retries(mut self, retries: u32) -> Self {
        self.corrective_retries = retries;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the backoff bounds.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Delay before attempt `attempt + 1` (attempts count from 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            corrective_retries: 1,
            timeout: DEFAULT_TIMEOUT,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Wraps a filler with a per-call timeout, bounded retries while the engine
/// is unavailable and corrective retries on malformed answers.
///
/// Every answer is validated against the request's blueprint, so blocks
/// returned from [`RetryingFiller::fill`] are structurally sound.
#[derive(Clone)]
pub struct RetryingFiller {
    inner: Arc<dyn SlotFiller>,
    policy: RetryPolicy,
}

impl RetryingFiller {
    /// Wrap a filler.
    pub fn new(inner: Arc<dyn SlotFiller>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one call on a worker thread and wait at most `policy.timeout`.
    ///
    /// A call that misses the deadline is abandoned; its thread finishes in
    /// the background and its answer is discarded.
    fn call_once(&self, request: &FillRequest) -> Result<Vec<FilledBlock>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let inner = Arc::clone(&self.inner);
        let request = request.clone();

        thread::Builder::new()
            .name("redocx-filler".into())
            .spawn(move || {
                let _ = tx.send(inner.fill(&request));
            })
            .map_err(|e| unavailable(self.inner.name(), format!("cannot start worker: {}", e)))?;

        match rx.recv_timeout(self.policy.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(unavailable(
                self.inner.name(),
                format!("no answer within {:?}", self.policy.timeout),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(unavailable(
                self.inner.name(),
                "worker terminated without an answer",
            )),
        }
    }

    /// Call with bounded retries while the engine is unavailable.
    fn call_with_retry(&self, request: &FillRequest) -> Result<Vec<FilledBlock>> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.call_once(request) {
                Err(Error::ClassificationUnavailable(msg)) if attempt < attempts => {
                    let delay = self.policy.backoff(attempt);
                    log::warn!(
                        "Classification attempt {}/{} failed ({}); retrying in {:?}",
                        attempt,
                        attempts,
                        msg,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl SlotFiller for RetryingFiller {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fill(&self, request: &FillRequest) -> Result<Vec<FilledBlock>> {
        let mut request = request.clone();
        let mut corrections = 0;

        loop {
            let answer = self
                .call_with_retry(&request)
                .and_then(|blocks| validate_blocks(&blocks, request.blueprint()).map(|_| blocks));

            match answer {
                Err(Error::ClassificationMalformed(msg))
                    if corrections < self.policy.corrective_retries =>
                {
                    corrections += 1;
                    log::warn!(
                        "Malformed classification from {}: {}; corrective retry {}/{}",
                        self.inner.name(),
                        msg,
                        corrections,
                        self.policy.corrective_retries
                    );
                    request = request.with_correction(msg);
                }
                other => return other,
            }
        }
    }
}
