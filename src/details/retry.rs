//! Retry and backoff policy for throttled directory calls.

use std::time::Duration;

use crate::directory::DirectoryError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded exponential backoff for rate-limited requests.
///
/// Only the directory's throttling signal is retried; every other error is
/// terminal on its first occurrence.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay unit for backoff; retry `k` waits `2^k` units plus up to
    /// one unit of random jitter.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after a failed attempt. `retry` is 0-based: the
    /// value passed after the first failure is 0.
    pub fn decide(&self, retry: u32, error: &DirectoryError) -> RetryDecision {
        if !error.is_throttled() || retry >= self.max_retries {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff_delay(retry))
    }

    /// Backoff delay for the given retry.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exp = 1u32 << retry.min(16);
        let jitter = self.base_delay.mul_f64(rand::random::<f64>());
        self.base_delay.saturating_mul(exp) + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_jitter_window() {
        let policy = RetryPolicy::default();
        for retry in 0..5 {
            let floor = Duration::from_millis(500) * (1u32 << retry);
            let ceiling = floor + Duration::from_millis(500);
            for _ in 0..50 {
                let delay = policy.backoff_delay(retry);
                assert!(delay >= floor, "retry {}: {:?} below floor", retry, delay);
                assert!(delay < ceiling, "retry {}: {:?} at or above ceiling", retry, delay);
            }
        }
    }

    #[test]
    fn test_only_throttling_is_retried() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.decide(0, &DirectoryError::OverQueryLimit),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(
            policy.decide(0, &DirectoryError::NotFound("poi-1".into())),
            RetryDecision::NoRetry
        );
        assert_eq!(
            policy.decide(0, &DirectoryError::Status("UNKNOWN_ERROR".into())),
            RetryDecision::NoRetry
        );
    }

    #[test]
    fn test_respects_max_retries() {
        let policy = RetryPolicy::default();
        assert!(matches!(
            policy.decide(4, &DirectoryError::OverQueryLimit),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(
            policy.decide(5, &DirectoryError::OverQueryLimit),
            RetryDecision::NoRetry
        );
    }
}
