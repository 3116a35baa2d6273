//! Metrics declaration and recording helpers.

use std::time::Duration;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Request intake metrics

    /// Track number of requests answered from the cache store.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "batchbox_cache_hit_total",
            "Total number of requests answered from the cache store."
        );
        "batchbox_cache_hit_total"
    };
    /// Track number of requests queued for a batch.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "batchbox_cache_miss_total",
            "Total number of requests queued for a batch fetch."
        );
        "batchbox_cache_miss_total"
    };

    // Flush metrics

    /// Track number of flushed batches.
    pub static ref BATCHES_FLUSHED: &'static str = {
        metrics::describe_counter!(
            "batchbox_batches_flushed_total",
            "Total number of batches flushed to the fetch."
        );
        "batchbox_batches_flushed_total"
    };
    /// Histogram of keys sent per fetch.
    pub static ref BATCH_SIZE: &'static str = {
        metrics::describe_histogram!(
            "batchbox_batch_size",
            "Number of keys sent to the fetch per batch."
        );
        "batchbox_batch_size"
    };
    /// Histogram of fetch duration.
    pub static ref FETCH_DURATION: &'static str = {
        metrics::describe_histogram!(
            "batchbox_fetch_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of batch fetch calls in seconds."
        );
        "batchbox_fetch_duration_seconds"
    };

    // Failure metrics

    /// Track number of fetch calls that failed outright.
    pub static ref FETCH_FAILURES: &'static str = {
        metrics::describe_counter!(
            "batchbox_fetch_failures_total",
            "Total number of fetch calls that failed for the whole batch."
        );
        "batchbox_fetch_failures_total"
    };
    /// Track number of fetch calls whose result length did not match the keys.
    pub static ref ARITY_MISMATCHES: &'static str = {
        metrics::describe_counter!(
            "batchbox_arity_mismatch_total",
            "Total number of fetch results with a wrong number of slots."
        );
        "batchbox_arity_mismatch_total"
    };
    /// Track number of per-key errors.
    pub static ref KEY_ERRORS: &'static str = {
        metrics::describe_counter!(
            "batchbox_key_errors_total",
            "Total number of result slots holding an error."
        );
        "batchbox_key_errors_total"
    };
}

/// Outcome of a flush, used as the `outcome` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The fetch produced one slot per key.
    Completed,
    /// The fetch produced the wrong number of slots.
    ArityMismatch,
    /// The fetch failed for the whole batch.
    Failed,
}

impl FlushOutcome {
    /// Label value for this outcome.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ArityMismatch => "arity_mismatch",
            Self::Failed => "failed",
        }
    }
}

/// Record whether a cache lookup hit. Only called for caching schedulers.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_request(cache_hit: bool) {
    let counter = if cache_hit {
        *CACHE_HIT_COUNTER
    } else {
        *CACHE_MISS_COUNTER
    };
    metrics::counter!(counter).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_request(_cache_hit: bool) {}

/// Record a finished flush.
///
/// # Arguments
/// * `keys` - Number of keys sent to the fetch
/// * `duration` - Time spent awaiting the fetch
/// * `outcome` - How the batch was settled
/// * `key_errors` - Number of slots holding an error
#[cfg(feature = "metrics")]
#[inline]
pub fn record_flush(keys: usize, duration: Duration, outcome: FlushOutcome, key_errors: usize) {
    metrics::counter!(*BATCHES_FLUSHED, "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!(*BATCH_SIZE).record(keys as f64);
    metrics::histogram!(*FETCH_DURATION, "outcome" => outcome.as_str())
        .record(duration.as_secs_f64());
    match outcome {
        FlushOutcome::Completed => {}
        FlushOutcome::ArityMismatch => metrics::counter!(*ARITY_MISMATCHES).increment(1),
        FlushOutcome::Failed => metrics::counter!(*FETCH_FAILURES).increment(1),
    }
    if key_errors > 0 {
        metrics::counter!(*KEY_ERRORS).increment(key_errors as u64);
    }
}

/// No-op version when metrics feature is disabled.
/// The compiler will eliminate this empty function call.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_flush(_keys: usize, _duration: Duration, _outcome: FlushOutcome, _key_errors: usize) {
}
