//! Handle to a request running as a background task.

use crate::error::WebClientError;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;
use webpulse_core::ResponseEnvelope;

pin_project! {
    /// Pending result of [`WebClient::execute_async`](crate::WebClient::execute_async).
    ///
    /// Resolves exactly once, with the envelope or the error the in-place
    /// call would have produced. Dropping the handle detaches the task; use
    /// [`cancel`](Self::cancel) to stop it.
    #[must_use = "dropping a ResponseHandle detaches the request"]
    pub struct ResponseHandle<T> {
        #[pin]
        task: JoinHandle<Result<ResponseEnvelope<T>, WebClientError>>,
    }
}

impl<T> ResponseHandle<T> {
    pub(crate) fn new(task: JoinHandle<Result<ResponseEnvelope<T>, WebClientError>>) -> Self {
        Self { task }
    }

    /// Cancel the request. No retry handler runs for a cancelled request and
    /// awaiting the handle yields a cancelled [`WebClientError::Join`].
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Whether the request has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Future for ResponseHandle<T> {
    type Output = Result<ResponseEnvelope<T>, WebClientError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().task.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_error)) => Poll::Ready(Err(WebClientError::Join(join_error))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> std::fmt::Debug for ResponseHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
