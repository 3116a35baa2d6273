mod common;

use std::time::Duration;

use batchbox::{BatchScheduler, SchedulerConfig, fetch_fn};
use common::RecordingFetch;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_millis(100);

fn scheduler(fetch: &RecordingFetch) -> BatchScheduler<u64, RecordingFetch> {
    BatchScheduler::builder(fetch.clone())
        .interval(INTERVAL)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_requests_within_interval_share_one_fetch() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);

    let one = scheduler.request_one(1);
    let two = scheduler.request_one(2);
    let three = scheduler.request_one(3);
    assert_eq!(scheduler.pending_len(), 3);

    tokio::time::sleep(INTERVAL).await;

    assert_eq!(one.await.unwrap(), 1);
    assert_eq!(two.await.unwrap(), 2);
    assert_eq!(three.await.unwrap(), 3);
    assert_eq!(fetch.keys(), vec![vec![1, 2, 3]]);
    assert_eq!(scheduler.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_duplicates_kept_without_dedupe() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);

    let values = scheduler.request_many([5, 1, 5, 2]).await.unwrap();

    assert_eq!(values, vec![5, 1, 5, 2]);
    assert_eq!(fetch.keys(), vec![vec![5, 1, 5, 2]]);
}

#[tokio::test(start_paused = true)]
async fn test_request_many_keeps_positions() {
    let fetch = RecordingFetch::new(|keys| Ok(keys.iter().map(|key| Ok(key * 100)).collect()));
    let scheduler = scheduler(&fetch);

    let first = scheduler.request_many([3, 2, 1]);
    let second = scheduler.request_many([4]);

    assert_eq!(first.await.unwrap(), vec![300, 200, 100]);
    assert_eq!(second.await.unwrap(), vec![400]);
    assert_eq!(fetch.keys(), vec![vec![3, 2, 1, 4]]);
}

#[tokio::test(start_paused = true)]
async fn test_first_flush_waits_for_interval() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);
    let requested_at = Instant::now();

    scheduler.request_one(1).await.unwrap();

    let calls = fetch.calls();
    assert_eq!(calls.len(), 1);
    let waited = calls[0].at - requested_at;
    assert!(waited >= INTERVAL, "flushed too early: {waited:?}");
    assert!(
        waited <= INTERVAL + Duration::from_millis(1),
        "flushed too late: {waited:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_rides_existing_timer() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);
    let opened_at = Instant::now();

    let early = scheduler.request_one(1);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let late = scheduler.request_one(2);

    assert_eq!(early.await.unwrap(), 1);
    assert_eq!(late.await.unwrap(), 2);

    let calls = fetch.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].keys, vec![1, 2]);
    assert!(calls[0].at - opened_at <= INTERVAL + Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_idle_scheduler_flushes_without_delay() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);

    scheduler.request_one(1).await.unwrap();
    tokio::time::sleep(INTERVAL * 5).await;

    let requested_at = Instant::now();
    scheduler.request_one(2).await.unwrap();

    let calls = fetch.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].at - requested_at <= Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_next_batch_waits_remaining_interval() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);

    scheduler.request_one(1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    scheduler.request_one(2).await.unwrap();

    let calls = fetch.calls();
    assert_eq!(calls.len(), 2);
    let gap = calls[1].at - calls[0].at;
    assert!(gap >= INTERVAL, "flushes closer than the interval: {gap:?}");
    assert!(gap <= INTERVAL + Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_requests_during_fetch_open_new_batch() {
    let fetch = RecordingFetch::identity().with_latency(Duration::from_millis(500));
    let scheduler = scheduler(&fetch);

    let first = scheduler.request_one(1);
    tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
    assert_eq!(fetch.keys(), vec![vec![1]]);
    assert_eq!(scheduler.pending_len(), 0);

    let second = scheduler.request_one(2);
    assert_eq!(scheduler.pending_len(), 1);

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap(), 1);
    assert_eq!(second.unwrap(), 2);
    assert_eq!(fetch.keys(), vec![vec![1], vec![2]]);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handle_does_not_disturb_batch() {
    let fetch = RecordingFetch::identity();
    let scheduler = scheduler(&fetch);

    let kept = scheduler.request_one(1);
    drop(scheduler.request_one(2));

    assert_eq!(kept.await.unwrap(), 1);
    assert_eq!(fetch.keys(), vec![vec![1, 2]]);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_still_batches_synchronous_requests() {
    let fetch = RecordingFetch::identity();
    let scheduler = BatchScheduler::<u64, _>::builder(fetch.clone())
        .config(SchedulerConfig::builder().interval(Duration::ZERO).build())
        .build()
        .unwrap();

    let values = scheduler.request_many([1, 2, 3]).await.unwrap();

    assert_eq!(values, vec![1, 2, 3]);
    assert_eq!(fetch.keys(), vec![vec![1, 2, 3]]);
}

#[tokio::test]
async fn test_closure_fetch_with_string_keys() {
    let scheduler = BatchScheduler::builder(fetch_fn(|keys: Vec<String>| async move {
        Ok::<_, std::io::Error>(keys.into_iter().map(|key| Ok(key.len())).collect())
    }))
    .interval(Duration::from_millis(5))
    .build()
    .unwrap();

    let lengths = scheduler
        .request_many(["a".to_owned(), "abc".to_owned()])
        .await
        .unwrap();
    assert_eq!(lengths, vec![1, 3]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_request_many_is_one_batch_on_multi_thread_runtime() {
    let fetch = RecordingFetch::identity();
    let scheduler = BatchScheduler::<u64, _>::builder(fetch.clone())
        .interval(Duration::from_millis(1))
        .build()
        .unwrap();

    for round in 0..50 {
        // Idle past the interval so the next batch is armed with no delay.
        tokio::time::sleep(Duration::from_millis(3)).await;
        let before = fetch.calls().len();

        let values = scheduler.request_many(0..500).await.unwrap();

        assert_eq!(values.len(), 500);
        assert_eq!(
            fetch.calls().len() - before,
            1,
            "round {round} split across batches"
        );
    }
}
