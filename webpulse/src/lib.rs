//! # webpulse - HTTP calls that always come back as an envelope
//!
//! webpulse wraps an HTTP client so that every call, whatever happens on the
//! wire, produces a [`ResponseEnvelope`]: the decoded payload on success, or
//! the status and raw error text on failure. Callers decide per request how
//! failures are retried and which named retry handlers may escalate a
//! failure into a hard error instead.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use webpulse::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     webpulse::telemetry::init_tracing();
//!
//!     let registry = Arc::new(RetryHandlerRegistry::new());
//!     registry.register_handler(StatusEscalation::server_errors("escalate-5xx"));
//!
//!     let config = WebClientConfig::default().with_env_overrides()?;
//!     let client = WebClient::from_config(&config, registry)?;
//!
//!     let request = RequestDescriptor::<(), String>::new(
//!         Method::GET,
//!         "https://api.example.com/status",
//!         RequestOptions {
//!             retry_policy: RetryPolicy::from_seconds(3, 1, RetryFilter::on_server_errors()),
//!             retry_handlers: vec!["escalate-5xx".into()],
//!             ..Default::default()
//!         },
//!     );
//!
//!     let envelope = client.execute(request).await?;
//!     if envelope.is_success_2xx() {
//!         println!("{}", envelope.payload().unwrap());
//!     } else {
//!         eprintln!("{}: {}", envelope.status(), envelope.error().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Execution modes
//!
//! - [`WebClient::execute`]: in place, as a future
//! - [`WebClient::execute_async`]: as a background task, via [`ResponseHandle`]
//! - [`WebClient::execute_blocking`]: on the calling thread
//!
//! In every mode the caller's [`DiagnosticContext`] is captured when the
//! call is made and is visible to all logging done on its behalf.
//!
//! ## Architecture
//!
//! - [`webpulse_core`] - envelope, failure taxonomy, diagnostic context
//! - [`webpulse_retries`] - retry policy, retry handlers, handler registry
//! - [`webpulse_transport`] - transport trait, reqwest transport, config, filters

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod handle;
pub mod request;
pub mod telemetry;

// Re-export crates
pub use webpulse_core as core;
pub use webpulse_retries as retries;
pub use webpulse_transport as transport;

pub use client::{Outcome, WebClient};
pub use error::WebClientError;
pub use handle::ResponseHandle;
pub use request::{RequestDescriptor, RequestOptions};

pub use webpulse_core::{
    context, http, Classification, ClientError, ClientResult, ContextExt, DecodeBody, DecodeError,
    DiagnosticContext, FailureKind, Json, ResponseEnvelope,
};
pub use webpulse_retries::{
    EscalateUnhandled, FnHandler, HandlerDecision, RetryFilter, RetryHandler,
    RetryHandlerRegistry, RetryPolicy, RetrySignal, StatusEscalation,
};
pub use webpulse_transport::{
    ConfigError, FilterChain, HeaderFilter, HttpTransport, ReqwestTransport, RequestFilter,
    WebClientConfig,
};

/// Convenient prelude for common imports.
///
/// ```ignore
/// use webpulse::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{Outcome, WebClient};
    pub use crate::error::WebClientError;
    pub use crate::handle::ResponseHandle;
    pub use crate::request::{RequestDescriptor, RequestOptions};
    pub use crate::telemetry::init_tracing;

    pub use webpulse_core::http::{HeaderMap, HeaderValue, Method, StatusCode};
    pub use webpulse_core::{
        ClientError, ClientResult, ContextExt, DecodeBody, DiagnosticContext, Json,
        ResponseEnvelope,
    };
    pub use webpulse_retries::{
        FnHandler, HandlerDecision, RetryFilter, RetryHandler, RetryHandlerRegistry, RetryPolicy,
        StatusEscalation,
    };
    pub use webpulse_transport::{HttpTransport, RequestFilter, WebClientConfig};
}
