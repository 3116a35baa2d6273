//! Error types for scheduler construction and key loading.

use std::sync::Arc;

use thiserror::Error;

/// Error returned when a [`BatchScheduler`](crate::BatchScheduler) cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Caching was enabled but no [`CacheStore`](crate::CacheStore) was supplied.
    #[error("caching is enabled but no cache store was provided")]
    MissingCacheStore,
}

/// Error delivered to a caller whose request could not be resolved.
///
/// Errors coming from the fetch are shared through an [`Arc`], so every caller
/// waiting on the same key (or the same batch) observes the same instance.
#[derive(Debug, Error)]
pub enum LoadError<E> {
    /// The fetch returned a different number of results than keys it was given.
    ///
    /// Every request of the batch is rejected with this error.
    #[error("fetch returned {actual} results for {expected} keys")]
    ArityMismatch {
        /// Number of keys sent to the fetch.
        expected: usize,
        /// Number of results returned by the fetch.
        actual: usize,
    },

    /// The fetch produced an error for this particular key.
    #[error("failed to load key: {0}")]
    Key(#[source] Arc<E>),

    /// The fetch call itself failed; every request of the batch is rejected.
    #[error("batch fetch failed: {0}")]
    Fetch(#[source] Arc<E>),

    /// The batch was dropped before this request was settled.
    #[error("batch was dropped before the request was settled")]
    Canceled,
}

impl<E> LoadError<E> {
    /// Returns the underlying fetch error, if any.
    pub fn fetch_error(&self) -> Option<&Arc<E>> {
        match self {
            Self::Key(err) | Self::Fetch(err) => Some(err),
            Self::ArityMismatch { .. } | Self::Canceled => None,
        }
    }

    /// Returns `true` if the error affected the whole batch rather than one key.
    pub fn is_batch_error(&self) -> bool {
        !matches!(self, Self::Key(_))
    }
}

impl<E> Clone for LoadError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::ArityMismatch { expected, actual } => Self::ArityMismatch {
                expected: *expected,
                actual: *actual,
            },
            Self::Key(err) => Self::Key(Arc::clone(err)),
            Self::Fetch(err) => Self::Fetch(Arc::clone(err)),
            Self::Canceled => Self::Canceled,
        }
    }
}
