//! Fixed-delay retry policy.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use webpulse_core::http::StatusCode;
use webpulse_core::ClientError;

/// Predicate deciding which failures may be retried.
#[derive(Clone)]
pub struct RetryFilter {
    predicate: Arc<dyn Fn(&ClientError) -> bool + Send + Sync>,
    label: &'static str,
}

impl RetryFilter {
    /// Filter backed by a custom predicate.
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&ClientError) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            label: "custom",
        }
    }

    /// Never retry.
    pub fn never() -> Self {
        Self {
            predicate: Arc::new(|_| false),
            label: "never",
        }
    }

    /// Retry every failure.
    pub fn always() -> Self {
        Self {
            predicate: Arc::new(|_| true),
            label: "always",
        }
    }

    /// Retry failures carrying one of the given status codes.
    pub fn on_status(codes: impl IntoIterator<Item = u16>) -> Self {
        let codes: Vec<u16> = codes.into_iter().collect();
        Self {
            predicate: Arc::new(move |error| {
                error
                    .status()
                    .map(|s| codes.contains(&s.as_u16()))
                    .unwrap_or(false)
            }),
            label: "status",
        }
    }

    /// Retry server errors (5xx).
    pub fn on_server_errors() -> Self {
        Self {
            predicate: Arc::new(|error| {
                error
                    .status()
                    .map(|s| s.is_server_error())
                    .unwrap_or(false)
            }),
            label: "server_errors",
        }
    }

    /// Retry rate limiting (429).
    pub fn on_rate_limit() -> Self {
        Self {
            predicate: Arc::new(|error| error.status() == Some(StatusCode::TOO_MANY_REQUESTS)),
            label: "rate_limit",
        }
    }

    /// Retry failures that never reached a server response (connect, timeout, ...).
    pub fn on_transport_errors() -> Self {
        Self {
            predicate: Arc::new(|error| matches!(error, ClientError::Transport(_))),
            label: "transport",
        }
    }

    /// Combine with another filter using OR logic.
    #[must_use]
    pub fn or(self, other: RetryFilter) -> Self {
        Self {
            predicate: Arc::new(move |error| self.matches(error) || other.matches(error)),
            label: "combined",
        }
    }

    /// Check if an error should be retried.
    pub fn matches(&self, error: &ClientError) -> bool {
        (self.predicate)(error)
    }
}

impl Default for RetryFilter {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for RetryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RetryFilter").field(&self.label).finish()
    }
}

/// Information published before each retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySignal {
    /// Target URL.
    pub url: String,
    /// Number of the retry about to happen (1-based).
    pub retry_count: u32,
    /// Message of the failure that triggered the retry.
    pub error: String,
}

/// Callback invoked before each retry.
pub type RetryObserver = Arc<dyn Fn(&RetrySignal) + Send + Sync>;

/// Fixed-delay retry policy.
///
/// Defaults: no retries, zero delay, and a filter that retries nothing.
#[derive(Clone, Default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Constant delay between attempts.
    pub backoff: Duration,
    /// Which failures may be retried.
    pub retry_filter: RetryFilter,
    /// Observer notified before each retry.
    pub before_retry: Option<RetryObserver>,
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self::default()
    }

    /// Retry up to `max_attempts` times, waiting `backoff` between attempts.
    pub fn fixed_delay(max_attempts: u32, backoff: Duration, retry_filter: RetryFilter) -> Self {
        Self {
            max_attempts,
            backoff,
            retry_filter,
            before_retry: None,
        }
    }

    /// Same as [`fixed_delay`](Self::fixed_delay) with the delay in whole seconds.
    pub fn from_seconds(max_attempts: u32, backoff_seconds: u64, retry_filter: RetryFilter) -> Self {
        Self::fixed_delay(max_attempts, Duration::from_secs(backoff_seconds), retry_filter)
    }

    /// Set an observer notified before each retry.
    #[must_use]
    pub fn observe<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RetrySignal) + Send + Sync + 'static,
    {
        self.before_retry = Some(Arc::new(observer));
        self
    }

    /// Decide whether to retry after `retries` retries have already run.
    ///
    /// `max_attempts == 0` short-circuits without consulting the filter.
    pub fn should_retry(&self, error: &ClientError, retries: u32) -> bool {
        if self.max_attempts == 0 || retries >= self.max_attempts {
            return false;
        }
        self.retry_filter.matches(error)
    }

    /// Delay before the next attempt. Constant for every retry.
    pub fn delay(&self) -> Duration {
        self.backoff
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("retry_filter", &self.retry_filter)
            .field("before_retry", &self.before_retry.is_some())
            .finish()
    }
}
