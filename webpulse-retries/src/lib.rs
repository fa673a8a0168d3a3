//! # webpulse-retries
//!
//! Retry policy and retry handlers for webpulse.
//!
//! ## Core Concepts
//!
//! - **[`RetryPolicy`]**: maximum retries, constant delay, and a
//!   [`RetryFilter`] deciding which failures are retriable
//! - **[`with_retry`]**: run an exchange under a policy
//! - **[`RetryHandler`]**: caller hook that may escalate a failure once
//!   retries are exhausted
//! - **[`RetryHandlerRegistry`]**: name → handler lookup shared by a client
//!
//! The delay between attempts never grows: a policy with
//! `backoff = 1s` waits exactly one second before every retry.
//!
//! ## Example
//!
//! ```ignore
//! use webpulse_retries::{with_retry, RetryFilter, RetryPolicy};
//!
//! let policy = RetryPolicy::from_seconds(3, 1, RetryFilter::on_server_errors());
//!
//! let result = with_retry(&policy, "https://api.example.com", || async {
//!     // Your exchange
//!     Ok::<_, webpulse_core::ClientError>("success")
//! }).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod executor;
pub mod handler;
pub mod policy;
pub mod registry;

// Re-exports
pub use executor::{with_retry, with_retry_state, AttemptInfo, RetryState};
pub use handler::{EscalateUnhandled, FnHandler, HandlerDecision, RetryHandler, StatusEscalation};
pub use policy::{RetryFilter, RetryObserver, RetryPolicy, RetrySignal};
pub use registry::{BoxedRetryHandler, RetryHandlerRegistry};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        with_retry, HandlerDecision, RetryFilter, RetryHandler, RetryHandlerRegistry, RetryPolicy,
    };
}
