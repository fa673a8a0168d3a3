//! Errors returned to callers of [`WebClient`](crate::WebClient).

use thiserror::Error;
use webpulse_core::ClientError;

/// Errors returned by the client instead of a response envelope.
///
/// Ordinary call failures never show up here: they are recovered into a
/// failed [`ResponseEnvelope`](webpulse_core::ResponseEnvelope). Only a retry
/// handler's escalation or a failure of the execution machinery itself is
/// reported as an error.
#[derive(Debug, Error)]
pub enum WebClientError {
    /// A retry handler escalated the failure.
    #[error("Retry handler '{handler}' escalated: {source}")]
    Escalated {
        /// Name of the escalating handler.
        handler: String,
        /// The failure being escalated.
        #[source]
        source: ClientError,
    },

    /// The runtime for a blocking call could not be built.
    #[error("Failed to build runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// `execute_blocking` was called from inside an async runtime.
    #[error("Blocking execution is not allowed inside an async runtime")]
    BlockingInAsyncContext,

    /// The spawned request task panicked or was cancelled.
    #[error("Request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl WebClientError {
    /// Name of the escalating handler, if this is an escalation.
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Escalated { handler, .. } => Some(handler),
            _ => None,
        }
    }

    /// The escalated failure, if this is an escalation.
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::Escalated { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether the request task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Join(e) if e.is_cancelled())
    }
}
