//! Retry policy for failed executions.

use relay_config::JobsConfig;
use std::time::Duration;

/// Fixed-delay retry policy.
///
/// A failed execution is re-dispatched as a new process after a fixed wait,
/// up to the retry ceiling. The delay is deliberately flat, not exponential;
/// retries exist for transient execution errors only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of automatic retries after the initial attempt.
    pub max_retries: u32,

    /// Wait before spawning the retry process.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Creates a fixed-delay policy.
    #[must_use]
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Creates a policy from configuration.
    #[must_use]
    pub fn from_config(config: &JobsConfig) -> Self {
        Self::fixed(config.max_retries, config.retry_delay())
    }

    /// Returns true if an attempt at `retry_count` may be retried once more.
    #[must_use]
    pub const fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }

    #[test]
    fn test_retry_ceiling() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy::fixed(0, Duration::ZERO);
        assert!(!policy.should_retry(0));
    }

    #[test]
    fn test_from_config() {
        let config = JobsConfig {
            max_retries: 2,
            retry_delay_secs: 1,
            ..JobsConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.delay, Duration::from_secs(1));
    }
}
