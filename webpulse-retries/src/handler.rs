//! Retry handlers: caller hooks that can escalate a failure.
//!
//! After the retry policy gives up, the executor offers the failure to every
//! handler named on the request. A handler that answers
//! [`HandlerDecision::Escalate`] turns the failure into a hard error instead
//! of a failed envelope.

use std::fmt;
use webpulse_core::{ClientError, FailureKind};

/// What a handler decided about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerDecision {
    /// Let the failure be recovered into an envelope.
    Proceed,
    /// Propagate the failure to the caller.
    Escalate,
}

impl HandlerDecision {
    /// Whether this decision escalates.
    pub fn is_escalate(self) -> bool {
        matches!(self, Self::Escalate)
    }
}

/// Hook inspecting failures after retries are exhausted.
pub trait RetryHandler: Send + Sync {
    /// Inspect a failure and decide whether to escalate it.
    fn check(&self, error: &ClientError) -> HandlerDecision;

    /// Handler name.
    fn name(&self) -> &str;
}

/// Handler backed by a closure.
pub struct FnHandler<F> {
    name: String,
    check: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&ClientError) -> HandlerDecision + Send + Sync,
{
    /// Create a new closure handler.
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> RetryHandler for FnHandler<F>
where
    F: Fn(&ClientError) -> HandlerDecision + Send + Sync,
{
    fn check(&self, error: &ClientError) -> HandlerDecision {
        (self.check)(error)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

/// Escalates failures carrying one of the configured status codes.
#[derive(Debug, Clone)]
pub struct StatusEscalation {
    name: String,
    codes: Vec<u16>,
}

impl StatusEscalation {
    /// Escalate the given status codes.
    pub fn new(name: impl Into<String>, codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            name: name.into(),
            codes: codes.into_iter().collect(),
        }
    }

    /// Escalate server errors (5xx).
    pub fn server_errors(name: impl Into<String>) -> Self {
        Self::new(name, 500..=599)
    }
}

impl RetryHandler for StatusEscalation {
    fn check(&self, error: &ClientError) -> HandlerDecision {
        match error.status() {
            Some(status) if self.codes.contains(&status.as_u16()) => HandlerDecision::Escalate,
            _ => HandlerDecision::Proceed,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Escalates failures that never produced a server response.
#[derive(Debug, Clone)]
pub struct EscalateUnhandled {
    name: String,
}

impl EscalateUnhandled {
    /// Create a new handler.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RetryHandler for EscalateUnhandled {
    fn check(&self, error: &ClientError) -> HandlerDecision {
        if error.kind() == FailureKind::Other {
            HandlerDecision::Escalate
        } else {
            HandlerDecision::Proceed
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
