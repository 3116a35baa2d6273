use std::{
    future::Future,
    pin::Pin,
    task::{self, Poll},
};

use futures::ready;
use pin_project::pin_project;
use tokio::sync::oneshot;

use crate::error::LoadError;

pub(crate) type Settle<V, E> = oneshot::Sender<Result<V, LoadError<E>>>;

const POLL_AFTER_READY_ERROR: &str = "LoadFuture can't be polled after finishing";

/// Handle to a single key request.
///
/// Completes exactly once, either with the value for the key or with the
/// [`LoadError`] that rejected it. Dropping the handle does not remove the key
/// from its batch.
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[pin_project]
pub struct LoadFuture<V, E> {
    #[pin]
    state: LoadState<V, E>,
}

#[pin_project(project = LoadStateProj)]
enum LoadState<V, E> {
    /// Answered without queueing, e.g. from the cache store.
    Ready(Option<Result<V, LoadError<E>>>),
    /// Waiting for the batch containing the key to settle.
    Pending(#[pin] oneshot::Receiver<Result<V, LoadError<E>>>),
}

impl<V, E> LoadFuture<V, E> {
    pub(crate) fn ready(value: V) -> Self {
        Self {
            state: LoadState::Ready(Some(Ok(value))),
        }
    }

    pub(crate) fn channel() -> (Settle<V, E>, Self) {
        let (tx, rx) = oneshot::channel();
        let future = Self {
            state: LoadState::Pending(rx),
        };
        (tx, future)
    }

    /// Returns `true` if the result is available without waiting for a flush.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, LoadState::Ready(_))
    }
}

impl<V, E> std::fmt::Debug for LoadFuture<V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            LoadState::Ready(_) => f.write_str("LoadFuture::Ready"),
            LoadState::Pending(_) => f.write_str("LoadFuture::Pending"),
        }
    }
}

impl<V, E> Future for LoadFuture<V, E> {
    type Output = Result<V, LoadError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            LoadStateProj::Ready(result) => {
                Poll::Ready(result.take().expect(POLL_AFTER_READY_ERROR))
            }
            LoadStateProj::Pending(rx) => {
                let settled = ready!(rx.poll(cx));
                Poll::Ready(settled.unwrap_or(Err(LoadError::Canceled)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_future_resolves_immediately() {
        let future: LoadFuture<u32, std::io::Error> = LoadFuture::ready(7);
        assert!(future.is_ready());
        assert_eq!(future.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn dropped_sender_cancels() {
        let (tx, future) = LoadFuture::<u32, std::io::Error>::channel();
        drop(tx);
        assert!(matches!(future.await, Err(LoadError::Canceled)));
    }

    #[tokio::test]
    async fn settles_through_channel() {
        let (tx, future) = LoadFuture::<u32, std::io::Error>::channel();
        assert!(!future.is_ready());
        tx.send(Ok(3)).unwrap();
        assert_eq!(future.await.unwrap(), 3);
    }
}
