//! # webpulse-core
//!
//! Core types shared by the webpulse crates.
//!
//! - **[`ResponseEnvelope`]**: uniform result of every call
//! - **[`ClientError`]**: failure taxonomy and [`Classification`]
//! - **[`DiagnosticContext`]**: key/value map propagated to log output
//! - **[`DecodeBody`]**: expected response types

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod body;
pub mod context;
pub mod envelope;
pub mod error;

// Re-exports
pub use body::{encode_json, DecodeBody, DecodeError, Json};
pub use context::{ContextExt, DiagnosticContext, WithContext};
pub use envelope::ResponseEnvelope;
pub use error::{Classification, ClientError, ClientResult, FailureKind};

/// HTTP types used across the public API.
pub mod http {
    pub use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
    pub use reqwest::{Method, StatusCode};
}
