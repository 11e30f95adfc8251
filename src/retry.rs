use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::ClientOptions;

/// Bounded exponential retry policy used by the request executor.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: usize,
    /// Delay before the first retry; doubled for every following one.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_options(&ClientOptions::default())
    }
}

impl RetryPolicy {
    pub fn from_options(options: &ClientOptions) -> Self {
        Self {
            max_retries: options.max_retries,
            backoff_base: Duration::from_millis(options.retry_backoff_ms),
        }
    }

    /// Whether a failure on the 0-indexed `attempt` may be followed by another.
    pub fn has_attempts_left(&self, attempt: usize) -> bool {
        attempt < self.max_retries
    }

    /// Delay after a failure on `attempt`: `base * 2^attempt`.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        self.backoff_base.saturating_mul(1u32 << exp)
    }

    /// Delay after a failure on `attempt`, preferring a server-provided value.
    pub fn delay_for(&self, attempt: usize, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.backoff_for(attempt))
    }

    /// Parses a `Retry-After` header given in whole seconds.
    ///
    /// HTTP-date values are ignored and yield `None`.
    pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
        headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    use super::RetryPolicy;
    use crate::ClientOptions;

    fn policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy::from_options(&ClientOptions {
            max_retries,
            ..ClientOptions::default()
        })
    }

    #[test]
    fn backoff_doubles_from_one_second() {
        let policy = policy(3);
        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_exponent_is_capped() {
        let policy = policy(100);
        assert_eq!(policy.backoff_for(16), policy.backoff_for(40));
    }

    #[test]
    fn attempts_left_is_bounded_by_max_retries() {
        let two = policy(2);
        assert!(two.has_attempts_left(0));
        assert!(two.has_attempts_left(1));
        assert!(!two.has_attempts_left(2));
        assert!(!policy(0).has_attempts_left(0));
    }

    #[test]
    fn retry_after_seconds_override_backoff() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let retry_after = RetryPolicy::retry_after(&headers);
        assert_eq!(retry_after, Some(Duration::from_secs(7)));
        assert_eq!(policy(3).delay_for(2, retry_after), Duration::from_secs(7));
    }

    #[test]
    fn retry_after_http_date_falls_back_to_backoff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        let retry_after = RetryPolicy::retry_after(&headers);
        assert_eq!(retry_after, None);
        assert_eq!(policy(3).delay_for(1, retry_after), Duration::from_secs(2));
    }
}
