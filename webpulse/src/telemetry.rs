//! Logging setup.
//!
//! Every call runs inside a `webclient.request` span carrying the method,
//! the URL and the caller's diagnostic context, so any subscriber that
//! prints span fields shows them on each line logged during the call.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a human-readable subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = try_init_tracing();
}

/// Like [`init_tracing`], but reports an already installed subscriber.
pub fn try_init_tracing() -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// Install a JSON subscriber filtered by `RUST_LOG`, including the fields of
/// the current span in each line.
pub fn init_json_tracing() -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
        .try_init()
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use webpulse_core::context;
    use webpulse_core::http::{Method, StatusCode};
    use webpulse_transport::{OutboundRequest, RawResponse};

    /// Records the diagnostic context visible when each event fires.
    #[derive(Clone, Default)]
    struct ContextCapture {
        seen: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    impl<S: Subscriber> Layer<S> for ContextCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let target = event.metadata().target();
            if target.starts_with("webpulse") {
                self.seen
                    .lock()
                    .push((target.to_string(), context::get("traceId")));
            }
        }
    }

    struct Unavailable;

    #[async_trait]
    impl HttpTransport for Unavailable {
        async fn send(&self, _request: OutboundRequest) -> ClientResult<RawResponse> {
            Ok(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE, "busy"))
        }
    }

    #[test]
    fn test_context_visible_in_every_log_event() {
        let capture = ContextCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _default = tracing::subscriber::set_default(subscriber);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        let client = WebClient::new(Unavailable, Arc::new(RetryHandlerRegistry::new()));
        let request = RequestDescriptor::<(), String>::new(
            Method::GET,
            "http://svc",
            RequestOptions {
                retry_policy: RetryPolicy::from_seconds(2, 1, RetryFilter::always()),
                retry_handlers: vec!["absent".into()],
                ..Default::default()
            },
        );

        context::replace(Some(DiagnosticContext::new().with("traceId", "t-log")));
        let envelope = runtime.block_on(client.execute(request)).unwrap();

        assert_eq!(envelope.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(context::current().is_none());

        let seen = capture.seen.lock();
        assert!(seen.iter().any(|(target, _)| target.starts_with("webpulse_retries")));
        assert!(seen.iter().any(|(target, _)| target.starts_with("webpulse::client")));
        for (target, trace_id) in seen.iter() {
            assert_eq!(trace_id.as_deref(), Some("t-log"), "event from {target}");
        }
    }

    #[test]
    fn test_second_init_is_reported() {
        init_tracing();
        assert!(super::try_init_tracing().is_err());
        assert!(super::init_json_tracing().is_err());
    }
}
