//! Retry policy and the attempt state machine.
//!
//! The loop is modeled as explicit states rather than break/continue so the
//! "retry only when the failure is classified retryable" rule can be tested
//! without network I/O.

use std::collections::HashSet;
use std::time::Duration;

/// Statuses retried when no custom set is configured.
pub const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first; total attempts = max_retries + 1.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retryable_statuses: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.iter().copied().collect(),
        }
    }
}

/// How a completed attempt was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptDisposition {
    Success,
    /// Transport failure or retryable upstream status.
    RetryableFailure,
    /// Configuration, payload, or non-retryable status failure.
    FatalFailure,
}

/// States of the retry loop. `retries` counts backoffs actually taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32 },
    Backoff { next_attempt: u32, delay: Duration },
    Succeeded { retries: u32 },
    Failed { retries: u32 },
}

impl RetryPolicy {
    /// Linear backoff. The original computed `delay * (attempt + 1)` while
    /// calling it exponential; the literal formula is kept.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Transition out of attempt `attempt` given its classified outcome.
    pub fn next_state(&self, attempt: u32, disposition: AttemptDisposition) -> RetryState {
        match disposition {
            AttemptDisposition::Success => RetryState::Succeeded { retries: attempt },
            AttemptDisposition::FatalFailure => RetryState::Failed { retries: attempt },
            AttemptDisposition::RetryableFailure if attempt < self.max_retries => {
                RetryState::Backoff {
                    next_attempt: attempt + 1,
                    delay: self.backoff_delay(attempt),
                }
            }
            AttemptDisposition::RetryableFailure => RetryState::Failed { retries: attempt },
        }
    }
}
