#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Scheduler configuration types.
///
/// Provides [`SchedulerConfig`] with the batching interval and the caching
/// and dedupe switches, deserializable with humantime intervals.
pub mod config;

/// Error types for scheduler construction and key loading.
///
/// Defines:
/// - [`ConfigError`] returned when a scheduler cannot be built
/// - [`LoadError`] delivered to callers whose request was rejected
pub mod error;

/// Future returned for every key request.
pub mod future;

/// Metrics collection for batching observability.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - Cache hits and misses on request intake
/// - Flushed batches, batch sizes and fetch latency
/// - Fetch failures, arity mismatches and per-key errors
pub mod metrics;

/// The batch scheduler and its builder.
pub mod scheduler;

/// Built-in [`CacheStore`] implementations.
pub mod store;

pub use batchbox_core::{CacheStore, Fetch, FetchFn, FetchResult, fetch_fn};
pub use config::{SchedulerConfig, SchedulerConfigBuilder};
pub use error::{ConfigError, LoadError};
pub use future::LoadFuture;
pub use scheduler::{BatchScheduler, BatchSchedulerBuilder};
pub use store::DashMapStore;

/// The `batchbox` prelude.
///
/// ```rust
/// use batchbox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{BatchScheduler, CacheStore, Fetch, LoadError, fetch_fn};
}
