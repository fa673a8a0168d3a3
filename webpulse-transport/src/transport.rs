//! Transport abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use webpulse_core::http::{header, HeaderMap, Method, StatusCode};
use webpulse_core::ClientResult;

/// A fully built outbound request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Encoded body, if any.
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Raw response as returned by the transport.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Create a response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Set the content type header.
    #[must_use]
    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.headers
            .insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));
        self
    }

    /// Content type header, if present and valid.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can send an [`OutboundRequest`].
///
/// Implementations report failures that happen before a response is
/// available (connect, TLS, timeouts, body limits). Non-2xx responses are
/// returned as `Ok`; the executor decides what counts as a failure.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and wait for the response.
    async fn send(&self, request: OutboundRequest) -> ClientResult<RawResponse>;

    /// Transport name, for logging.
    fn name(&self) -> &str {
        "transport"
    }
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn HttpTransport>;

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: OutboundRequest) -> ClientResult<RawResponse> {
        (**self).send(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_accessors() {
        let response = RawResponse::new(StatusCode::OK, "héllo").with_content_type("text/plain");
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.text_lossy(), "héllo");
    }

    #[test]
    fn test_text_lossy_replaces_invalid() {
        let response = RawResponse::new(StatusCode::OK, vec![b'a', 0xff]);
        assert_eq!(response.text_lossy(), "a\u{fffd}");
    }

    #[test]
    fn test_outbound_defaults() {
        let request = OutboundRequest::new(Method::GET, "http://svc");
        assert!(request.headers.is_empty());
        assert!(request.body.is_none());
    }
}
