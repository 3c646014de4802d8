//! Consumption shapes of a proxied call.
//!
//! One asynchronous core serves all of them: [`Continuation`]/[`Completion`]
//! for the suspending convention, [`Deferred`] for single-value async returns
//! and [`ResponseStream`] for multi-value returns.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tokio::sync::oneshot;

use crate::core::{ChatError, Describe, InvokeError, TypeDescriptor};

/// Resumes a suspended caller with the outcome of its call.
pub struct Continuation<T> {
    method: String,
    sender: oneshot::Sender<Result<T, InvokeError>>,
}

impl<T> Continuation<T> {
    /// Creates the resuming half and the awaiting half of one call.
    pub fn channel(method: impl Into<String>) -> (Continuation<T>, Completion<T>) {
        let method = method.into();
        let (sender, receiver) = oneshot::channel();
        (
            Continuation {
                method: method.clone(),
                sender,
            },
            Completion { method, receiver },
        )
    }

    pub fn resume(self, outcome: Result<T, InvokeError>) {
        if self.sender.send(outcome).is_err() {
            tracing::debug!(method = %self.method, "caller stopped waiting before completion");
        }
    }
}

impl<T: Describe> Describe for Continuation<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::continuation(T::descriptor())
    }
}

impl<T> fmt::Debug for Continuation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Awaiting half of a suspended call.
///
/// Resolves to `Err(InvokeError::Remote { source: ChatError::Cancelled, .. })`
/// when the [`Continuation`] is dropped without resuming.
pub struct Completion<T> {
    method: String,
    receiver: oneshot::Receiver<Result<T, InvokeError>>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T, InvokeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(InvokeError::Remote {
                method: self.method.clone(),
                source: ChatError::Cancelled,
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Single-value asynchronous return. Nothing runs until it is polled.
pub struct Deferred<T> {
    inner: BoxFuture<'static, Result<T, InvokeError>>,
}

impl<T> Deferred<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, InvokeError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(future),
        }
    }
}

impl<T> Future for Deferred<T> {
    type Output = Result<T, InvokeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T: Describe> Describe for Deferred<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::single(T::descriptor())
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

/// Multi-value asynchronous return.
///
/// The model answers with one JSON array; elements are decoded one at a time
/// as the stream is polled. The stream is finite and yields each element once.
pub struct ResponseStream<T> {
    inner: BoxStream<'static, Result<T, InvokeError>>,
}

impl<T> ResponseStream<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T, InvokeError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = Result<T, InvokeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T: Describe> Describe for ResponseStream<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::stream(T::descriptor())
    }
}

impl<T> fmt::Debug for ResponseStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseStream(..)")
    }
}
