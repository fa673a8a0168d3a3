//! reqwest-backed transport.

use crate::config::{ConfigError, HttpClientConfig, WebClientConfig};
use crate::transport::{HttpTransport, OutboundRequest, RawResponse};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;
use url::Url;
use webpulse_core::{ClientError, ClientResult};

/// HTTP transport backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    http: HttpClientConfig,
    max_in_memory_size: usize,
}

impl ReqwestTransport {
    /// Build a transport from a config.
    pub fn from_config(config: &WebClientConfig) -> Result<Self, ConfigError> {
        let pool = &config.connection_pool;
        let http = &config.http_client;

        debug!(
            max_connections = pool.max_connections,
            max_idle_time_ms = pool.max_idle_time_ms,
            max_life_time_ms = pool.max_life_time_ms,
            pending_acquire_timeout_ms = pool.pending_acquire_timeout_ms,
            connect_timeout_ms = http.connect_timeout_ms,
            socket_timeout_ms = http.socket_timeout_ms,
            "Building HTTP client"
        );

        let client = Client::builder()
            .pool_max_idle_per_host(pool.max_connections)
            .pool_idle_timeout(pool.max_idle_time())
            .connect_timeout(http.connect_timeout())
            .read_timeout(http.socket_timeout())
            .default_headers(default_headers(config)?)
            .build()?;

        Ok(Self::with_client(client, config))
    }

    /// Wrap an existing client. Only the per-route and body-size settings of
    /// `config` are used.
    pub fn with_client(client: Client, config: &WebClientConfig) -> Self {
        Self {
            client,
            http: config.http_client.clone(),
            max_in_memory_size: config.max_in_memory_size,
        }
    }

    /// Get a reference to the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Timeout override for the route of `url`, if configured.
    ///
    /// `host:port` entries take precedence over bare `host` entries.
    pub fn route_timeout(&self, url: &str) -> Option<Duration> {
        if self.http.max_ttl_per_route.is_empty() {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        parsed
            .port_or_known_default()
            .and_then(|port| self.http.max_ttl_for_route(&format!("{host}:{port}")))
            .or_else(|| self.http.max_ttl_for_route(host))
    }

    async fn read_body(&self, mut response: Response) -> ClientResult<Bytes> {
        let limit = self.max_in_memory_size;
        let mut buf = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if limit > 0 && buf.len() + chunk.len() > limit {
                return Err(ClientError::other(format!(
                    "Exceeded limit on max bytes to buffer: {limit}"
                )));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> ClientResult<RawResponse> {
        let timeout = self.route_timeout(&request.url);
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = self.read_body(response).await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

fn default_headers(config: &WebClientConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &config.default_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            }
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}
