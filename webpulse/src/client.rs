//! The request executor.

use crate::error::WebClientError;
use crate::handle::ResponseHandle;
use crate::request::RequestDescriptor;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use webpulse_core::context::{self, ContextExt};
use webpulse_core::http::header::{HeaderValue, CONTENT_TYPE};
use webpulse_core::{encode_json, ClientError, ClientResult, DecodeBody, ResponseEnvelope};
use webpulse_retries::{with_retry_state, RetryHandlerRegistry};
use webpulse_transport::{
    BoxedTransport, ConfigError, FilterChain, HttpTransport, OutboundRequest, RawResponse,
    ReqwestTransport, RequestFilter, WebClientConfig,
};

/// Result of the failure path of a call.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The failure was normalized into a failed envelope.
    Recovered(ResponseEnvelope<T>),
    /// A retry handler escalated the failure.
    Escalate(WebClientError),
}

impl<T> Outcome<T> {
    /// Convert into the value returned to the caller.
    pub fn into_result(self) -> Result<ResponseEnvelope<T>, WebClientError> {
        match self {
            Self::Recovered(envelope) => Ok(envelope),
            Self::Escalate(err) => Err(err),
        }
    }
}

/// HTTP client that turns every call into a [`ResponseEnvelope`].
///
/// Cloning is cheap; clones share the transport, the handler registry and
/// the filter chain.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use webpulse::prelude::*;
///
/// let registry = Arc::new(RetryHandlerRegistry::new());
/// registry.register_handler(StatusEscalation::server_errors("escalate-5xx"));
///
/// let client = WebClient::from_config(&WebClientConfig::default(), registry)?;
/// let envelope = client
///     .execute(RequestDescriptor::<(), String>::get("https://api.example.com/ping"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct WebClient {
    transport: BoxedTransport,
    registry: Arc<RetryHandlerRegistry>,
    filters: FilterChain,
}

impl WebClient {
    /// Create a client over `transport`.
    pub fn new(transport: impl HttpTransport + 'static, registry: Arc<RetryHandlerRegistry>) -> Self {
        Self {
            transport: Arc::new(transport),
            registry,
            filters: FilterChain::new(),
        }
    }

    /// Create a client over a [`ReqwestTransport`] built from `config`.
    pub fn from_config(
        config: &WebClientConfig,
        registry: Arc<RetryHandlerRegistry>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(ReqwestTransport::from_config(config)?, registry))
    }

    /// Add a request filter. Filters run in the order they were added,
    /// before every attempt.
    #[must_use]
    pub fn with_filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.filters.push(filter);
        self
    }

    /// The retry handler registry.
    pub fn registry(&self) -> &Arc<RetryHandlerRegistry> {
        &self.registry
    }

    /// The transport.
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    /// Execute a call in place.
    ///
    /// The calling thread's diagnostic context is captured now and installed
    /// on whichever thread polls the returned future. It is cleared from
    /// that thread once the call completes or the future is dropped.
    pub fn execute<Req, Resp>(
        &self,
        request: RequestDescriptor<Req, Resp>,
    ) -> impl Future<Output = Result<ResponseEnvelope<Resp>, WebClientError>> + Send + 'static
    where
        Req: Serialize + Send + Sync + 'static,
        Resp: DecodeBody,
    {
        let client = self.clone();
        let captured = context::current();
        let context_field = captured.as_ref().map(ToString::to_string).unwrap_or_default();

        info!(
            method = %request.method(),
            url = %request.url(),
            context = %context_field,
            "HTTP call initiated"
        );

        let span = info_span!(
            "webclient.request",
            method = %request.method(),
            url = %request.url(),
            context = %context_field,
        );

        async move { client.run(request).await }
            .instrument(span)
            .with_diagnostic_context(captured)
    }

    /// Execute a call as a background task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn execute_async<Req, Resp>(&self, request: RequestDescriptor<Req, Resp>) -> ResponseHandle<Resp>
    where
        Req: Serialize + Send + Sync + 'static,
        Resp: DecodeBody,
    {
        ResponseHandle::new(tokio::spawn(self.execute(request)))
    }

    /// Execute a call and block the calling thread until it completes.
    ///
    /// A current-thread runtime is created for the call. Calling this from
    /// inside a tokio runtime returns [`WebClientError::BlockingInAsyncContext`].
    pub fn execute_blocking<Req, Resp>(
        &self,
        request: RequestDescriptor<Req, Resp>,
    ) -> Result<ResponseEnvelope<Resp>, WebClientError>
    where
        Req: Serialize + Send + Sync + 'static,
        Resp: DecodeBody,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(WebClientError::BlockingInAsyncContext);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let _guard = runtime.enter();
        let handle = self.execute_async(request);
        runtime.block_on(handle)
    }

    async fn run<Req, Resp>(
        &self,
        request: RequestDescriptor<Req, Resp>,
    ) -> Result<ResponseEnvelope<Resp>, WebClientError>
    where
        Req: Serialize,
        Resp: DecodeBody,
    {
        let outbound = match prepare(&request) {
            Ok(outbound) => outbound,
            Err(err) => return self.recover(&request, err, 0).into_result(),
        };

        let (result, state) = with_retry_state(request.retry_policy(), request.url(), move || {
            self.exchange::<Resp>(outbound.clone())
        })
        .await;

        match result {
            Ok(envelope) => {
                debug!(
                    url = %request.url(),
                    status = %envelope.status(),
                    attempts = state.attempts,
                    "HTTP call completed"
                );
                Ok(envelope)
            }
            Err(err) => self.recover(&request, err, state.attempts).into_result(),
        }
    }

    async fn exchange<Resp: DecodeBody>(
        &self,
        request: OutboundRequest,
    ) -> ClientResult<ResponseEnvelope<Resp>> {
        let request = self.filters.apply(request);
        let RawResponse {
            status,
            headers,
            body,
        } = self.transport.send(request).await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            return Err(ClientError::response_status(status, text, headers));
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match Resp::decode(content_type.as_deref(), body.clone()) {
            Ok(payload) => Ok(ResponseEnvelope::success(payload, status)),
            Err(e) => Err(ClientError::UnknownContentType {
                status: status.as_u16(),
                content_type,
                body: Some(String::from_utf8_lossy(&body).into_owned()),
                headers,
                reason: e.reason,
            }),
        }
    }

    fn recover<Req, Resp>(
        &self,
        request: &RequestDescriptor<Req, Resp>,
        err: ClientError,
        attempts: u32,
    ) -> Outcome<Resp> {
        let classification = err.classify(request.url());
        error!(
            url = %request.url(),
            status = %classification.status,
            kind = ?classification.kind,
            attempts,
            "Exception while executing HTTP request: {}",
            classification.message
        );

        for name in request.retry_handlers() {
            let Some(handler) = self.registry.get(name) else {
                warn!(url = %request.url(), handler = %name, "Retry handler not registered");
                continue;
            };
            if handler.check(&err).is_escalate() {
                warn!(
                    url = %request.url(),
                    handler = %name,
                    status = %classification.status,
                    "Retry handler escalated failure"
                );
                return Outcome::Escalate(WebClientError::Escalated {
                    handler: name.clone(),
                    source: err,
                });
            }
        }

        Outcome::Recovered(ResponseEnvelope::failure(
            classification.error_text,
            classification.status,
        ))
    }
}

impl std::fmt::Debug for WebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebClient")
            .field("transport", &self.transport.name())
            .field("registry", &self.registry)
            .field("filters", &self.filters)
            .finish()
    }
}

fn prepare<Req: Serialize, Resp>(request: &RequestDescriptor<Req, Resp>) -> ClientResult<OutboundRequest> {
    let mut outbound = OutboundRequest::new(request.method().clone(), request.url());
    outbound.headers = request.headers().clone();

    if let Some(body) = request.body() {
        let encoded = encode_json(body)
            .map_err(|e| ClientError::other(format!("Failed to encode request body: {e}")))?;
        if !outbound.headers.contains_key(CONTENT_TYPE) {
            outbound
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        outbound.body = Some(encoded);
    }

    Ok(outbound)
}
