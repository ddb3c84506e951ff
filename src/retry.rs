//! Retry policy collaborator: decides whether a transient failure gets another
//! attempt, and how long to wait first.

use crate::error::UploadError;
use std::time::Duration;

/// Decides whether a retryable failure gets another attempt and the backoff delay
/// before it.
pub trait RetryPolicy: Send + Sync {
    /// Maximum number of attempts (including the first) for a single chunk.
    fn max_attempts(&self) -> u32;

    /// Whether `attempt` (0-based, counting completed attempts) should be retried
    /// given `error`. Only called for errors where [`UploadError::is_retryable`] is
    /// true; the driver never retries a fatal error regardless of this return value.
    fn should_retry(&self, attempt: u32, error: &UploadError) -> bool {
        let _ = error;
        attempt + 1 < self.max_attempts()
    }

    /// Delay to wait before attempt number `attempt` (0-based; `attempt == 0` is the
    /// delay before the first retry, i.e. the second attempt overall).
    fn backoff(&self, attempt: u32) -> Duration;
}

/// `base * 2^attempt`, capped at `max_delay`. Mirrors the exponential backoff shape
/// used throughout this codebase's other chunked-transfer retry loops.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_RETRIES,
            base_delay: crate::config::DEFAULT_RETRY_BASE_DELAY,
            max_delay: crate::config::DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
        Duration::from_millis(delay_ms).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt() {
        let policy = ExponentialBackoff {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = ExponentialBackoff {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(policy.backoff(5), Duration::from_millis(300));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = ExponentialBackoff {
            max_attempts: 3,
            ..ExponentialBackoff::default()
        };
        let err = UploadError::Transient("boom".into());
        assert!(policy.should_retry(0, &err));
        assert!(policy.should_retry(1, &err));
        assert!(!policy.should_retry(2, &err));
    }
}
