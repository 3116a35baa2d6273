//! Recording fetch implementation shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use batchbox::{Fetch, FetchResult};
use tokio::time::Instant;

type Respond = dyn Fn(&[u64]) -> FetchResult<u64, io::Error> + Send + Sync;

/// A single observed fetch call.
#[derive(Debug, Clone)]
pub struct Call {
    pub keys: Vec<u64>,
    pub at: Instant,
}

/// Fetch that records every call and answers through a configurable closure.
///
/// Clones share the call log, so the test keeps one clone for inspection
/// while the scheduler owns another.
#[derive(Clone)]
pub struct RecordingFetch {
    calls: Arc<Mutex<Vec<Call>>>,
    respond: Arc<Respond>,
    latency: Duration,
}

impl RecordingFetch {
    pub fn new<R>(respond: R) -> Self
    where
        R: Fn(&[u64]) -> FetchResult<u64, io::Error> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(respond),
            latency: Duration::ZERO,
        }
    }

    /// Answers every key with itself.
    pub fn identity() -> Self {
        Self::new(|keys| Ok(keys.iter().map(|key| Ok(*key)).collect()))
    }

    /// Answers every key with itself, except `failing` which gets an error.
    pub fn failing_key(failing: u64) -> Self {
        Self::new(move |keys| {
            Ok(keys
                .iter()
                .map(|key| {
                    if *key == failing {
                        Err(io::Error::other(format!("no value for {key}")))
                    } else {
                        Ok(*key)
                    }
                })
                .collect())
        })
    }

    /// Delays every answer by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        Self { latency, ..self }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<Vec<u64>> {
        self.calls().into_iter().map(|call| call.keys).collect()
    }
}

#[async_trait]
impl Fetch<u64> for RecordingFetch {
    type Value = u64;
    type Error = io::Error;

    async fn fetch(&self, keys: &[u64]) -> FetchResult<u64, io::Error> {
        self.calls.lock().unwrap().push(Call {
            keys: keys.to_vec(),
            at: Instant::now(),
        });
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.respond)(keys)
    }
}
