//! Batch fetch abstraction.

use std::future::Future;
use std::hash::Hash;

use async_trait::async_trait;

/// Outcome of a single batch fetch.
///
/// The outer `Result` is the fetch call itself; the inner vector holds one
/// slot per requested key, in the same order as the keys were passed.
pub type FetchResult<V, E> = Result<Vec<Result<V, E>>, E>;

/// Loads values for a batch of keys in one backend call.
///
/// Implementations must return exactly one slot per key, aligned by position.
/// A slot may hold a per-key error without failing its siblings. Returning
/// `Err` from [`fetch`](Fetch::fetch) fails the whole batch.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use batchbox_core::{Fetch, FetchResult};
///
/// struct Squares;
///
/// #[async_trait]
/// impl Fetch<u64> for Squares {
///     type Value = u64;
///     type Error = std::io::Error;
///
///     async fn fetch(&self, keys: &[u64]) -> FetchResult<u64, std::io::Error> {
///         Ok(keys.iter().map(|key| Ok(key * key)).collect())
///     }
/// }
/// ```
#[async_trait]
pub trait Fetch<K>: Send + Sync + 'static
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Value produced for each key.
    type Value: Clone + Send + Sync + 'static;

    /// Error produced either for a single key or for the whole batch.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the values for `keys`.
    async fn fetch(&self, keys: &[K]) -> FetchResult<Self::Value, Self::Error>;
}

/// [`Fetch`] implementation backed by an async closure.
///
/// Created with [`fetch_fn`].
#[derive(Clone)]
pub struct FetchFn<F> {
    f: F,
}

impl<F> std::fmt::Debug for FetchFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

/// Wraps an async closure taking the batch keys into a [`Fetch`].
///
/// ```rust
/// use batchbox_core::fetch_fn;
///
/// let fetch = fetch_fn(|keys: Vec<u32>| async move {
///     Ok::<_, std::io::Error>(keys.into_iter().map(Ok::<u32, std::io::Error>).collect::<Vec<_>>())
/// });
/// # let _ = fetch;
/// ```
pub fn fetch_fn<F>(f: F) -> FetchFn<F> {
    FetchFn { f }
}

#[async_trait]
impl<K, V, E, F, Fut> Fetch<K> for FetchFn<F>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<V, E>> + Send,
{
    type Value = V;
    type Error = E;

    async fn fetch(&self, keys: &[K]) -> FetchResult<V, E> {
        (self.f)(keys.to_vec()).await
    }
}
