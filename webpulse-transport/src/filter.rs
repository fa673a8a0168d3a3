//! Request filters applied before every call.

use crate::transport::OutboundRequest;
use std::fmt;
use std::sync::Arc;
use webpulse_core::http::{HeaderName, HeaderValue};

/// Hook that may rewrite a request before it is sent.
pub trait RequestFilter: Send + Sync {
    /// Rewrite the request.
    fn apply(&self, request: OutboundRequest) -> OutboundRequest;
}

impl<F> RequestFilter for F
where
    F: Fn(OutboundRequest) -> OutboundRequest + Send + Sync,
{
    fn apply(&self, request: OutboundRequest) -> OutboundRequest {
        self(request)
    }
}

/// Ordered chain of request filters.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn RequestFilter>>,
}

impl FilterChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    pub fn push(&mut self, filter: impl RequestFilter + 'static) {
        self.filters.push(Arc::new(filter));
    }

    /// Append a filter (builder style).
    #[must_use]
    pub fn with(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.push(filter);
        self
    }

    /// Run every filter in order.
    pub fn apply(&self, request: OutboundRequest) -> OutboundRequest {
        self.filters.iter().fold(request, |req, f| f.apply(req))
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filter_count", &self.filters.len())
            .finish()
    }
}

/// Filter that sets a header when the request does not already carry it.
#[derive(Debug, Clone)]
pub struct HeaderFilter {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderFilter {
    /// Create a header filter.
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl RequestFilter for HeaderFilter {
    fn apply(&self, mut request: OutboundRequest) -> OutboundRequest {
        if !request.headers.contains_key(&self.name) {
            request.headers.insert(self.name.clone(), self.value.clone());
        }
        request
    }
}
