//! Retry policy: how many times a step's webhook is attempted and how long to wait in between.

use std::time::Duration;

use crate::webhook::Webhook;

/// Bounded, fixed-backoff retry policy for a single step dispatch.
///
/// `max_attempts` counts the first attempt, so it is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    fixed_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single()
    }
}

impl RetryPolicy {
    /// Build a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, fixed_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            fixed_delay,
        }
    }

    /// Exactly one attempt, no backoff.
    #[must_use]
    pub fn single() -> Self {
        Self {
            max_attempts: 1,
            fixed_delay: Duration::ZERO,
        }
    }

    /// Effective policy for a step: the step's `retry_on_failure` gates the
    /// webhook's own retry settings.
    #[must_use]
    pub fn for_step(webhook: &Webhook, retry_on_failure: bool) -> Self {
        if !retry_on_failure || !webhook.retry_enabled {
            return Self::single();
        }
        Self::new(
            webhook.retry_count.saturating_add(1),
            Duration::from_secs(webhook.retry_delay_seconds),
        )
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait between two consecutive attempts.
    #[must_use]
    pub fn fixed_delay(&self) -> Duration {
        self.fixed_delay
    }

    /// Whether another attempt is allowed after `attempts_made` attempts.
    #[must_use]
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}
