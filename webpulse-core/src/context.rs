//! Diagnostic context carried across task and thread boundaries.
//!
//! A [`DiagnosticContext`] is a small key/value map (request ids, trace ids,
//! ...) attached to log output. Each thread has a "current" context slot
//! that code running on it can read with [`get`] or [`current`].
//!
//! Thread-local state does not follow a future when it is moved to another
//! worker thread, so the map is captured explicitly at call entry and
//! carried by [`WithContext`], which installs it on whichever thread polls
//! the future and clears it afterwards.
//!
//! ```ignore
//! use webpulse_core::context::{self, ContextExt};
//!
//! context::put("traceId", "abc");
//! let captured = context::current();
//! tokio::spawn(async {
//!     assert_eq!(context::get("traceId").as_deref(), Some("abc"));
//! }.with_diagnostic_context(captured));
//! ```

use pin_project_lite::pin_project;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

thread_local! {
    static CURRENT: RefCell<Option<DiagnosticContext>> = const { RefCell::new(None) };
}

/// Key/value map attached to log output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticContext {
    entries: BTreeMap<String, String>,
}

impl DiagnosticContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the calling thread's context. Same as [`current`].
    pub fn current() -> Option<Self> {
        current()
    }

    /// Insert an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Add an entry (builder style).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get an entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the context is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DiagnosticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DiagnosticContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Copy of the current thread's context, if any.
pub fn current() -> Option<DiagnosticContext> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Get one entry of the current thread's context.
pub fn get(key: &str) -> Option<String> {
    CURRENT.with(|slot| {
        slot.borrow()
            .as_ref()
            .and_then(|ctx| ctx.get(key))
            .map(str::to_owned)
    })
}

/// Set one entry of the current thread's context.
pub fn put(key: impl Into<String>, value: impl Into<String>) {
    CURRENT.with(|slot| {
        slot.borrow_mut()
            .get_or_insert_with(DiagnosticContext::new)
            .insert(key, value);
    });
}

/// Remove one entry of the current thread's context.
pub fn remove(key: &str) -> Option<String> {
    CURRENT.with(|slot| slot.borrow_mut().as_mut().and_then(|ctx| ctx.remove(key)))
}

/// Replace the current thread's context, returning the previous one.
pub fn replace(context: Option<DiagnosticContext>) -> Option<DiagnosticContext> {
    CURRENT.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), context))
}

/// Take the current thread's context, leaving the slot empty.
pub fn take() -> Option<DiagnosticContext> {
    replace(None)
}

/// Clear the current thread's context.
pub fn clear() {
    replace(None);
}

pin_project! {
    /// Future that carries a diagnostic context across polls.
    ///
    /// On every poll the context is installed on the polling thread. When
    /// the inner future is pending, the (possibly updated) context is taken
    /// back off the thread. When it completes, or the wrapper is dropped
    /// before completion, the thread's slot is cleared.
    #[must_use = "futures do nothing unless polled"]
    pub struct WithContext<F> {
        #[pin]
        inner: F,
        context: Option<DiagnosticContext>,
        done: bool,
    }

    impl<F> PinnedDrop for WithContext<F> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if !*this.done {
                clear();
            }
        }
    }
}

impl<F> WithContext<F> {
    /// The context carried by this future.
    pub fn context(&self) -> Option<&DiagnosticContext> {
        self.context.as_ref()
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        replace(this.context.clone());

        let poll = this.inner.poll(cx);
        match poll {
            Poll::Pending => {
                *this.context = take();
            }
            Poll::Ready(_) => {
                *this.done = true;
                clear();
            }
        }
        poll
    }
}

/// Wrap `future` so it runs with `context` installed.
pub fn with_context<F: Future>(context: Option<DiagnosticContext>, future: F) -> WithContext<F> {
    WithContext {
        inner: future,
        context,
        done: false,
    }
}

/// Extension trait for attaching a diagnostic context to a future.
pub trait ContextExt: Future + Sized {
    /// Run this future with `context` installed on every poll.
    fn with_diagnostic_context(self, context: Option<DiagnosticContext>) -> WithContext<Self> {
        with_context(context, self)
    }

    /// Run this future with the calling thread's current context.
    fn in_current_context(self) -> WithContext<Self> {
        with_context(current(), self)
    }
}

impl<F: Future> ContextExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_thread_local_api() {
        clear();
        assert!(current().is_none());

        put("traceId", "t-1");
        put("user", "u-1");
        assert_eq!(get("traceId").as_deref(), Some("t-1"));
        assert_eq!(current().map(|c| c.len()), Some(2));

        assert_eq!(remove("user").as_deref(), Some("u-1"));
        assert_eq!(get("user"), None);

        clear();
        assert!(current().is_none());
    }

    #[test]
    fn test_display() {
        let ctx = DiagnosticContext::new().with("b", "2").with("a", "1");
        assert_eq!(ctx.to_string(), "{a=1, b=2}");
        assert_eq!(DiagnosticContext::new().to_string(), "{}");
    }

    #[test]
    fn test_from_iter() {
        let ctx: DiagnosticContext = [("k", "v")].into_iter().collect();
        assert_eq!(ctx.get("k"), Some("v"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_context_follows_spawned_task() {
        clear();
        let captured = Some(DiagnosticContext::new().with("traceId", "abc"));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_task = seen.clone();
        let handle = tokio::spawn(
            async move {
                seen_task.lock().unwrap().push(get("traceId"));
                tokio::task::yield_now().await;
                seen_task.lock().unwrap().push(get("traceId"));
            }
            .with_diagnostic_context(captured),
        );
        handle.await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|v| v.as_deref() == Some("abc")));
    }

    #[test]
    fn test_cleared_after_completion() {
        clear();
        put("traceId", "caller");
        let captured = current();

        let inner = tokio_test::block_on(
            async {
                tokio::task::yield_now().await;
                get("traceId")
            }
            .with_diagnostic_context(captured),
        );

        assert_eq!(inner.as_deref(), Some("caller"));
        assert!(current().is_none());
    }

    #[test]
    fn test_updates_persist_across_polls() {
        clear();
        let value = tokio_test::block_on(
            async {
                put("step", "one");
                tokio::task::yield_now().await;
                get("step")
            }
            .with_diagnostic_context(Some(DiagnosticContext::new())),
        );
        assert_eq!(value.as_deref(), Some("one"));
    }

    #[test]
    fn test_cleared_on_drop() {
        clear();
        let fut = async {}.with_diagnostic_context(Some(DiagnosticContext::new().with("k", "v")));
        put("k", "leaked");
        drop(fut);
        assert!(current().is_none());
    }

    #[test]
    fn test_pending_poll_does_not_leak() {
        clear();
        let mut task = tokio_test::task::spawn(
            std::future::pending::<()>()
                .with_diagnostic_context(Some(DiagnosticContext::new().with("k", "v"))),
        );
        assert!(task.poll().is_pending());
        assert!(current().is_none());
        assert!(task.poll().is_pending());
        assert!(current().is_none());
    }
}
