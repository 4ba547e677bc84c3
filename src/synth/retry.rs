//! Retry and backoff for synthesis requests.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Cap for any single backoff delay.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base: DEFAULT_BACKOFF_BASE,
            max: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), honouring a server
    /// supplied Retry-After when present.
    pub fn delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) => Duration::from_secs(secs).min(self.max),
            None => calculate_backoff(attempt, self.base, self.max),
        }
    }
}

/// Connection failures, timeouts, and interrupted bodies.
pub fn is_transient_network_error(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() || error.is_body() {
        return true;
    }
    error.status().is_some_and(is_retryable_status)
}

/// 429 and the server-side 5xx family worth another try.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Retry-After in whole seconds; HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// `min(base * 2^attempt + base/2 (at most 500ms), max)`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponential = base.saturating_mul(2u32.saturating_pow(attempt));
    let jitter_ms = (base.as_millis() as u64).min(1000);
    let jitter = Duration::from_millis(jitter_ms / 2);
    exponential.saturating_add(jitter).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_calculate_backoff_grows() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(60);
        assert_eq!(calculate_backoff(0, base, max), Duration::from_millis(1500));
        assert_eq!(calculate_backoff(1, base, max), Duration::from_millis(2500));
        assert_eq!(calculate_backoff(2, base, max), Duration::from_millis(4500));
    }

    #[test]
    fn test_calculate_backoff_respects_max() {
        let delay = calculate_backoff(10, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[test]
    fn test_policy_prefers_retry_after() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0, Some(7)), Duration::from_secs(7));
        assert_eq!(policy.delay(0, Some(600)), DEFAULT_BACKOFF_MAX);
        assert_eq!(policy.delay(0, None), Duration::from_millis(1500));
    }

    #[test]
    fn test_policy_none() {
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert("retry-after", HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(12));

        headers.insert("retry-after", HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }
}
