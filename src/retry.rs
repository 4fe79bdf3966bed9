// Bounded retry with exponential backoff for outbound HTTP calls.
//
// Transient failures (HTTP 429, 5xx, timeouts, connection errors) are retried
// up to `max_retries` times with exponentially increasing, jittered delays.
// Everything else is returned to the caller on the first failure.

use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use tracing::warn;

/// A non-success HTTP response, kept as a typed error so retry decisions
/// don't have to parse error strings.
#[derive(Debug)]
pub struct HttpStatusError {
    pub endpoint: String,
    pub status: StatusCode,
    pub body: String,
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            endpoint,
            status,
            body,
        } = self;
        write!(f, "{endpoint} returned {status}: {body}")
    }
}

impl std::error::Error for HttpStatusError {}

impl HttpStatusError {
    /// Read the body of a failed response into an error.
    pub async fn from_response(endpoint: &str, response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self {
            endpoint: endpoint.to_string(),
            status,
            body,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

/// Retry limits for one kind of call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Whether an error is worth retrying.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    for cause in err.chain() {
        if let Some(status_err) = cause.downcast_ref::<HttpStatusError>() {
            return status_err.is_transient();
        }
        if let Some(req_err) = cause.downcast_ref::<reqwest::Error>() {
            return req_err.is_timeout() || req_err.is_connect() || req_err.is_request();
        }
    }
    false
}

/// Run `operation`, retrying transient failures per `policy`.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, what: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient_error(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }

                attempt += 1;
                let backoff = policy.backoff(attempt);

                // +/- 25% jitter from the clock's nanosecond component
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos();
                let jitter_factor = 0.75 + (nanos % 500) as f64 / 1000.0;
                let jittered = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);

                warn!(
                    call = what,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    backoff_ms = jittered.as_millis() as u64,
                    error = %err,
                    "Transient failure, retrying"
                );

                tokio::time::sleep(jittered).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    fn status_error(status: StatusCode) -> anyhow::Error {
        anyhow::Error::new(HttpStatusError {
            endpoint: "test".to_string(),
            status,
            body: String::new(),
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
        assert_eq!(policy.backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn test_transient_classification() {
        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::BAD_GATEWAY] {
            assert!(is_transient_error(&status_error(status)));
        }
        assert!(!is_transient_error(&status_error(StatusCode::BAD_REQUEST)));
        assert!(!is_transient_error(&anyhow::anyhow!("parse failure")));
        let unavailable = status_error(StatusCode::SERVICE_UNAVAILABLE);
        assert!(is_transient_error(&unavailable.context("wrapped")));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retry(&fast_policy(), "test", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(status_error(StatusCode::TOO_MANY_REQUESTS))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<()> = with_retry(&fast_policy(), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(StatusCode::UNAUTHORIZED))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<()> = with_retry(&fast_policy(), "test", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(status_error(StatusCode::INTERNAL_SERVER_ERROR))
            }
        })
        .await;

        assert!(result.is_err());
        // One initial attempt plus three retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
