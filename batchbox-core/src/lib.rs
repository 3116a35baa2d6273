#![warn(missing_docs)]
//! # batchbox-core
//!
//! Core traits for the batchbox request-batching framework.
//!
//! This crate defines the two collaborators a
//! [`BatchScheduler`](https://docs.rs/batchbox) talks to:
//!
//! - **Load** values for a batch of keys ([`Fetch`])
//! - **Memoize** resolved values between batches ([`CacheStore`])
//!
//! Store implementations live in `batchbox` (`DashMapStore`) and
//! `batchbox-moka` (`MokaStore`).

pub mod fetch;
pub mod store;

pub use fetch::{Fetch, FetchFn, FetchResult, fetch_fn};
pub use store::CacheStore;
