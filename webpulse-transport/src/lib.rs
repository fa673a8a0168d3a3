//! # webpulse-transport
//!
//! The HTTP side of webpulse: a [`HttpTransport`] trait, its reqwest
//! implementation, connection configuration, and request filters.
//!
//! ```ignore
//! use webpulse_transport::{ReqwestTransport, WebClientConfig};
//!
//! let config = WebClientConfig::from_json_str(r#"{"connection_pool": {"max_connections": 50}}"#)?
//!     .with_env_overrides()?;
//! let transport = ReqwestTransport::from_config(&config)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod filter;
pub mod transport;

// Re-exports
pub use client::ReqwestTransport;
pub use config::{ConfigError, ConnectionPoolConfig, HttpClientConfig, WebClientConfig};
pub use filter::{FilterChain, HeaderFilter, RequestFilter};
pub use transport::{BoxedTransport, HttpTransport, OutboundRequest, RawResponse};
