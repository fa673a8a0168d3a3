//! Failure taxonomy for outbound HTTP calls.
//!
//! Every failure that reaches the executor is a [`ClientError`]. Before it is
//! offered to retry handlers it is classified into a [`Classification`],
//! which carries the status code and error text that end up in the
//! response envelope.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced while executing an outbound call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status. Body, headers and status
    /// were captured together.
    #[error("HTTP status {status}: {body}")]
    ResponseStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Raw response body.
        body: String,
        /// Response headers.
        headers: HeaderMap,
    },

    /// The server answered with a non-2xx status, reported without headers.
    ///
    /// Produced by transports and filters that only track status and body.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },

    /// The response body could not be decoded into the expected type.
    #[error("Unable to decode response with content type {content_type:?} (status {status}): {reason}")]
    UnknownContentType {
        /// Raw numeric status; may not be a registered status code.
        status: u16,
        /// Content type reported by the server.
        content_type: Option<String>,
        /// Raw body, when it was read.
        body: Option<String>,
        /// Response headers.
        headers: HeaderMap,
        /// Why decoding failed.
        reason: String,
    },

    /// Error raised by the HTTP client itself (connect, TLS, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other error.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Create a rich status error.
    pub fn response_status(status: StatusCode, body: impl Into<String>, headers: HeaderMap) -> Self {
        Self::ResponseStatus {
            status,
            body: body.into(),
            headers,
        }
    }

    /// Create a status error without headers.
    pub fn http_status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a content decoding error.
    pub fn unknown_content_type(
        status: u16,
        content_type: Option<String>,
        body: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnknownContentType {
            status,
            content_type,
            body,
            headers: HeaderMap::new(),
            reason: reason.into(),
        }
    }

    /// Create an error from a message.
    pub fn other(msg: impl std::fmt::Display) -> Self {
        Self::Other(anyhow::anyhow!("{msg}"))
    }

    /// Get the failure kind.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ResponseStatus { .. } => FailureKind::ResponseStatus,
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::UnknownContentType { .. } => FailureKind::UnknownContentType,
            Self::Transport(_) | Self::Other(_) => FailureKind::Other,
        }
    }

    /// Get the HTTP status if the server produced one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::ResponseStatus { status, .. } | Self::HttpStatus { status, .. } => Some(*status),
            Self::UnknownContentType { status, .. } => StatusCode::from_u16(*status).ok(),
            Self::Transport(err) => err.status(),
            Self::Other(_) => None,
        }
    }

    /// Get the raw response body if one was captured.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::ResponseStatus { body, .. } | Self::HttpStatus { body, .. } => Some(body),
            Self::UnknownContentType { body, .. } => body.as_deref(),
            Self::Transport(_) | Self::Other(_) => None,
        }
    }

    /// Classify this error for the call to `url`.
    ///
    /// The status is taken from the error for the three server-side kinds
    /// and is `500 Internal Server Error` for everything else. The error
    /// text is the raw body when one was captured, otherwise the error's own
    /// message.
    pub fn classify(&self, url: &str) -> Classification {
        let kind = self.kind();
        let (status, message) = match self {
            Self::ResponseStatus {
                status,
                body,
                headers,
            } => (
                *status,
                format!(
                    "Error in HTTP call (response status). url={url} Error={body} Headers={headers:?} statusCode={status}"
                ),
            ),
            Self::HttpStatus { status, body } => (
                *status,
                format!("Error in HTTP call (status code). url={url} Error={body} statusCode={status}"),
            ),
            Self::UnknownContentType {
                status,
                body,
                headers,
                reason,
                ..
            } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                format!(
                    "Error in HTTP call (unknown content type). url={url} Error={} Headers={headers:?} statusCode={status} reason={reason}",
                    body.as_deref().unwrap_or_default()
                ),
            ),
            Self::Transport(_) | Self::Other(_) => {
                let cause = std::error::Error::source(self)
                    .and_then(std::error::Error::source)
                    .map(ToString::to_string);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Unhandled error in HTTP call. url={url} Error={self} Cause={cause:?}"),
                )
            }
        };

        let error_text = self
            .response_body()
            .map(str::to_owned)
            .unwrap_or_else(|| self.to_string());

        Classification {
            kind,
            status,
            error_text,
            message,
        }
    }
}

/// Kinds of failure, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Non-2xx status with body, headers and status.
    ResponseStatus,
    /// Non-2xx status without headers.
    HttpStatus,
    /// Body could not be decoded into the expected type.
    UnknownContentType,
    /// Anything else.
    Other,
}

/// Result of classifying a [`ClientError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Kind of failure.
    pub kind: FailureKind,
    /// Status reported in the envelope.
    pub status: StatusCode,
    /// Error text reported in the envelope.
    pub error_text: String,
    /// Diagnostic message for logs.
    pub message: String,
}

/// Result type for a single exchange.
pub type ClientResult<T> = Result<T, ClientError>;
