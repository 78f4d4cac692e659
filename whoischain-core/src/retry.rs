//! Retry with exponential backoff for batch lookups.
//!
//! The engine itself never retries; [`RetryExecutor`] wraps a whole lookup
//! for callers that want it (the bulk executor, opted in per run).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{Result, WhoisError};

/// Configuration for retry behavior with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: usize,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (delay *= multiplier after each retry).
    pub multiplier: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// A single attempt; what the bulk executor uses unless told otherwise.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        // 2^20 is already far past any sensible max_delay
        let safe_attempt = attempt.min(20) as i32;

        let base_delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(safe_attempt);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // between 50% and 100% of the delay
            let mut rng = rand::thread_rng();
            capped_delay * rng.gen_range(0.5..1.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Decides whether a failed lookup is worth another attempt.
pub trait RetryClassifier: Send + Sync {
    fn is_retryable(&self, error: &WhoisError) -> bool;
}

/// Retries failures raised while talking to a server; never retries bad
/// input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkRetryClassifier;

impl RetryClassifier for NetworkRetryClassifier {
    fn is_retryable(&self, error: &WhoisError) -> bool {
        match error {
            WhoisError::NetworkFailure { .. } | WhoisError::Timeout(_) => true,
            // the same server will send the same oversized answer
            WhoisError::ResponseTooLarge { .. } => false,
            WhoisError::InvalidQuery(_)
            | WhoisError::InvalidHostName(_)
            | WhoisError::InvalidTemplate { .. }
            | WhoisError::NotImplemented(_)
            | WhoisError::RetryExhausted { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryExecutor<C: RetryClassifier = NetworkRetryClassifier> {
    policy: RetryPolicy,
    classifier: C,
}

impl RetryExecutor<NetworkRetryClassifier> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: NetworkRetryClassifier,
        }
    }
}

impl<C: RetryClassifier> RetryExecutor<C> {
    pub fn with_classifier(policy: RetryPolicy, classifier: C) -> Self {
        Self { policy, classifier }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the policy's attempts are used up. Returns the result together
    /// with the number of attempts made.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> (Result<T>, usize)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(value) => return (Ok(value), attempt + 1),
                Err(e) => e,
            };

            let attempts_remaining = self.policy.max_attempts.saturating_sub(attempt + 1);
            if !self.classifier.is_retryable(&error) || attempts_remaining == 0 {
                if attempt == 0 {
                    return (Err(error), 1);
                }
                warn!(
                    attempts = attempt + 1,
                    error = %error,
                    "Lookup failed after retries"
                );
                let exhausted = WhoisError::RetryExhausted {
                    attempts: attempt + 1,
                    last_error: error.to_string(),
                };
                return (Err(exhausted), attempt + 1);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            debug!(
                attempt = attempt + 1,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying after transient error"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
