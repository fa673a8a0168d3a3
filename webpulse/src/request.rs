//! Request descriptors.

use std::fmt;
use std::marker::PhantomData;
use webpulse_core::http::{HeaderMap, Method};
use webpulse_retries::RetryPolicy;

/// Optional parts of a request.
///
/// Defaults: no headers, no body, [`RetryPolicy::default`] (no retries), and
/// no retry handlers.
///
/// ```ignore
/// let options = RequestOptions {
///     body: Some(order),
///     retry_handlers: vec!["escalate-5xx".into()],
///     ..Default::default()
/// };
/// ```
pub struct RequestOptions<Req = ()> {
    /// Headers sent verbatim. They take precedence over transport defaults.
    pub headers: HeaderMap,
    /// Body, serialized as JSON. `None` sends no body for any method.
    pub body: Option<Req>,
    /// Retry policy.
    pub retry_policy: RetryPolicy,
    /// Names of the retry handlers consulted on failure, in order.
    pub retry_handlers: Vec<String>,
}

impl<Req> Default for RequestOptions<Req> {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            body: None,
            retry_policy: RetryPolicy::default(),
            retry_handlers: Vec::new(),
        }
    }
}

/// Immutable description of one outbound call.
///
/// `Req` is the body type and `Resp` the expected response type.
pub struct RequestDescriptor<Req, Resp> {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Req>,
    retry_policy: RetryPolicy,
    retry_handlers: Vec<String>,
    _response: PhantomData<fn() -> Resp>,
}

impl<Req, Resp> RequestDescriptor<Req, Resp> {
    /// Create a descriptor.
    pub fn new(method: Method, url: impl Into<String>, options: RequestOptions<Req>) -> Self {
        let RequestOptions {
            headers,
            body,
            retry_policy,
            retry_handlers,
        } = options;
        Self {
            method,
            url: url.into(),
            headers,
            body,
            retry_policy,
            retry_handlers,
            _response: PhantomData,
        }
    }

    /// GET request with default options.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestOptions::default())
    }

    /// POST request carrying `body`.
    pub fn post(url: impl Into<String>, body: Req) -> Self {
        Self::new(
            Method::POST,
            url,
            RequestOptions {
                body: Some(body),
                ..Default::default()
            },
        )
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body.
    pub fn body(&self) -> Option<&Req> {
        self.body.as_ref()
    }

    /// Retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Retry handler names.
    pub fn retry_handlers(&self) -> &[String] {
        &self.retry_handlers
    }
}

impl<Req: Clone, Resp> Clone for RequestDescriptor<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            retry_policy: self.retry_policy.clone(),
            retry_handlers: self.retry_handlers.clone(),
            _response: PhantomData,
        }
    }
}

impl<Req, Resp> fmt::Debug for RequestDescriptor<Req, Resp> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .field("retry_policy", &self.retry_policy)
            .field("retry_handlers", &self.retry_handlers)
            .finish()
    }
}
