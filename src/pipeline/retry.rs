// src/pipeline/retry.rs
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// How long to wait between submission attempts
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    /// Exponential backoff with jitter: delay = min(base * 2^attempt + jitter, max)
    ExponentialWithJitter { base_ms: u64, max_ms: u64 },
}

/// Attempt budget and backoff for one submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            backoff: BackoffStrategy::Fixed,
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_attempts: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts,
            delay: Duration::from_millis(base_ms),
            backoff: BackoffStrategy::ExponentialWithJitter { base_ms, max_ms },
        }
    }

    /// Fixed-delay config, mostly for tests.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: BackoffStrategy::Fixed,
        }
    }

    /// Delay before retrying after failed attempt `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match &self.backoff {
            BackoffStrategy::Fixed => self.delay,
            BackoffStrategy::ExponentialWithJitter { base_ms, max_ms } => {
                let base = base_ms.saturating_mul(2_u64.saturating_pow(attempt));
                let jitter = jitter(base / 2);
                let total = base.saturating_add(jitter).min(*max_ms);
                Duration::from_millis(total)
            }
        }
    }
}

/// Uniform random jitter in `0..=max_jitter`.
fn jitter(max_jitter: u64) -> u64 {
    if max_jitter == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max_jitter)
}

/// Errors that say whether trying again could succeed.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation`, retrying transient errors within the attempt budget.
/// The last error is returned.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = config.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    max = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Upload outcome scripted per attempt: `true` = transient failure.
    #[derive(Debug)]
    struct UploadError {
        transient: bool,
    }

    impl std::fmt::Display for UploadError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let kind = if self.transient { "transient" } else { "permanent" };
            write!(f, "{} upload failure", kind)
        }
    }

    impl IsRetryable for UploadError {
        fn is_retryable(&self) -> bool {
            self.transient
        }
    }

    /// Run `with_retry` against a script of failures, then succeed.
    async fn run_script(config: &RetryConfig, failures: &[bool]) -> (Result<usize, UploadError>, usize) {
        let attempts = Cell::new(0usize);
        let result = with_retry(config, || {
            let n = attempts.get();
            attempts.set(n + 1);
            let outcome = match failures.get(n) {
                Some(transient) => Err(UploadError { transient: *transient }),
                None => Ok(n),
            };
            async move { outcome }
        })
        .await;
        (result, attempts.get())
    }

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig::fixed(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn first_success_is_returned_without_retry() {
        let (result, attempts) = run_script(&RetryConfig::default(), &[]).await;
        assert_eq!(result.unwrap(), 0);
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let (result, attempts) = run_script(&quick(3), &[true, true]).await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let (result, attempts) = run_script(&quick(3), &[true, true, true, true]).await;
        assert!(result.unwrap_err().transient);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn permanent_failure_stops_immediately() {
        let (result, attempts) = run_script(&quick(3), &[true, false]).await;
        assert!(!result.unwrap_err().transient);
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_run_once() {
        let (_, attempts) = run_script(&quick(0), &[true]).await;
        assert_eq!(attempts, 1);
    }

    #[test]
    fn exponential_delay_grows_and_is_capped() {
        let config = RetryConfig::exponential(5, 500, 3_000);
        let first = config.delay_for_attempt(0);
        assert!(first >= Duration::from_millis(500) && first <= Duration::from_millis(750));
        let second = config.delay_for_attempt(1);
        assert!(second >= Duration::from_millis(1_000) && second <= Duration::from_millis(1_500));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(3_000));
        assert_eq!(quick(2).delay_for_attempt(7), Duration::from_millis(1));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        assert_eq!(jitter(0), 0);
        for _ in 0..200 {
            assert!(jitter(250) <= 250);
        }
        let spread: std::collections::HashSet<u64> = (0..200).map(|_| jitter(1_000)).collect();
        assert!(spread.len() > 1);
    }
}
