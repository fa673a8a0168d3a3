//! Retry loop for running an exchange under a [`RetryPolicy`].

use crate::policy::{RetryPolicy, RetrySignal};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use webpulse_core::{ClientError, ClientResult};

/// State of a retried operation.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// Attempts made so far, including the first one.
    pub attempts: u32,
    /// Retries made so far.
    pub retries: u32,
    /// Total time spent waiting.
    pub total_wait_time: Duration,
    /// History of attempts.
    pub history: Vec<AttemptInfo>,
}

/// Information about a single attempt.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Attempt number (1-indexed).
    pub attempt: u32,
    /// Whether it succeeded.
    pub success: bool,
    /// Error message if failed.
    pub error: Option<String>,
    /// Time waited after this attempt.
    pub wait_time: Duration,
}

/// Run `operation` under `policy`, retrying failures the policy accepts.
///
/// `target` identifies the call in logs and retry signals (normally the URL).
/// Once the policy declines, the last failure is returned.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, target: &str, operation: F) -> ClientResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    with_retry_state(policy, target, operation).await.0
}

/// Run with retries and get state information.
pub async fn with_retry_state<F, Fut, T>(
    policy: &RetryPolicy,
    target: &str,
    mut operation: F,
) -> (ClientResult<T>, RetryState)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let mut state = RetryState::default();

    loop {
        state.attempts += 1;

        debug!(
            url = %target,
            attempt = state.attempts,
            max_attempts = policy.max_attempts,
            "Executing attempt"
        );

        match operation().await {
            Ok(result) => {
                state.history.push(AttemptInfo {
                    attempt: state.attempts,
                    success: true,
                    error: None,
                    wait_time: Duration::ZERO,
                });
                return (Ok(result), state);
            }
            Err(error) => {
                if !policy.should_retry(&error, state.retries) {
                    state.history.push(attempt_failed(state.attempts, &error, Duration::ZERO));
                    return (Err(error), state);
                }

                let wait = policy.delay();
                state.retries += 1;
                state.total_wait_time += wait;
                state.history.push(attempt_failed(state.attempts, &error, wait));

                let signal = RetrySignal {
                    url: target.to_string(),
                    retry_count: state.retries,
                    error: error.to_string(),
                };
                info!(
                    url = %signal.url,
                    retry_count = signal.retry_count,
                    "Retrying"
                );
                if let Some(observer) = &policy.before_retry {
                    observer(&signal);
                }

                sleep(wait).await;
            }
        }
    }
}

fn attempt_failed(attempt: u32, error: &ClientError, wait_time: Duration) -> AttemptInfo {
    AttemptInfo {
        attempt,
        success: false,
        error: Some(error.to_string()),
        wait_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RetryFilter;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use webpulse_core::http::{HeaderMap, StatusCode};

    fn server_error() -> ClientError {
        ClientError::response_status(StatusCode::INTERNAL_SERVER_ERROR, "boom", HeaderMap::new())
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let policy = RetryPolicy::from_seconds(3, 0, RetryFilter::always());
        let result = with_retry(&policy, "http://svc", || async { Ok::<_, ClientError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_eventual_success() {
        let policy = RetryPolicy::fixed_delay(3, Duration::from_millis(1), RetryFilter::always());
        let attempts = Arc::new(AtomicU32::new(0));

        let (result, state) = with_retry_state(&policy, "http://svc", || {
            let attempts = attempts.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(server_error())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(state.attempts, 3);
        assert_eq!(state.retries, 2);
        assert_eq!(state.history.len(), 3);
        assert!(state.history[2].success);
        assert_eq!(state.total_wait_time, Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_exactly_n_retries_then_last_error() {
        let signals = Arc::new(Mutex::new(Vec::new()));
        let sink = signals.clone();
        let policy = RetryPolicy::fixed_delay(3, Duration::ZERO, RetryFilter::always())
            .observe(move |s| sink.lock().push(s.clone()));

        let attempts = Arc::new(AtomicU32::new(0));
        let result = with_retry(&policy, "http://svc/a", || {
            let attempts = attempts.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ClientError::other(format!("failure {n}")))
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err().to_string(), "failure 3");

        let signals = signals.lock();
        let counts: Vec<u32> = signals.iter().map(|s| s.retry_count).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(signals.iter().all(|s| s.url == "http://svc/a"));
    }

    #[tokio::test]
    async fn test_zero_attempts_never_signals() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let policy = RetryPolicy::fixed_delay(0, Duration::ZERO, RetryFilter::always())
            .observe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let result = with_retry(&policy, "http://svc", || async { Err::<(), _>(server_error()) }).await;
        assert!(result.is_err());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_filter_declines_first_failure() {
        let policy = RetryPolicy::from_seconds(3, 1, RetryFilter::never());
        let attempts = Arc::new(AtomicU32::new(0));

        let (result, state) = with_retry_state(&policy, "http://svc", || {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(server_error())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(state.retries, 0);
        assert_eq!(state.total_wait_time, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_filter_sees_each_failure() {
        let policy = RetryPolicy::fixed_delay(
            5,
            Duration::ZERO,
            RetryFilter::from_fn(|e| e.status() == Some(StatusCode::SERVICE_UNAVAILABLE)),
        );
        let attempts = Arc::new(AtomicU32::new(0));

        let result = with_retry(&policy, "http://svc", || {
            let attempts = attempts.clone();
            async move {
                let status = if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::BAD_REQUEST
                };
                Err::<(), _>(ClientError::http_status(status, ""))
            }
        })
        .await;

        assert_eq!(result.unwrap_err().status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
