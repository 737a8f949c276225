// Tests for the periodic sampling / batching loop

use std::sync::Arc;
use std::time::Duration;

use hostmon::core::sampler::{SamplerConfig, SamplerLoop, Value};
use tokio::sync::watch;

use super::support::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_one_append_per_batch_of_ticks() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    let sources = vec![CountingSource::boxed("a", 3), CountingSource::boxed("b", 2)];

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let stats = SamplerLoop::new(fast_config(5, Some(10)), sources, Arc::clone(&flusher))
        .run(cancel_rx)
        .await;

    assert_eq!(stats.ticks, 10);
    assert_eq!(stats.flushes, 2);

    let batches = sink.batches();
    assert_eq!(batches.len(), 2);
    for (n, batch) in batches.iter().enumerate() {
        // 5 ticks x (3 + 2) samples
        assert_eq!(batch.len(), 25);
        assert_non_decreasing(batch);

        // exactly the calls belonging to this batch, from both sources
        let first_call = (n * 5 + 1) as i64;
        for device in ["a", "b"] {
            let mut calls: Vec<i64> = batch
                .iter()
                .filter(|s| s.device == device)
                .map(|s| match s.value {
                    Value::Int(v) => v,
                    ref other => panic!("unexpected value {:?}", other),
                })
                .collect();
            calls.dedup();
            assert_eq!(calls, (first_call..first_call + 5).collect::<Vec<_>>());
        }
    }
    assert!(flusher.buffer().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_flush_every_tick() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    SamplerLoop::new(
        fast_config(1, Some(4)),
        vec![CountingSource::boxed("cpu", 2)],
        flusher,
    )
    .run(cancel_rx)
    .await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 4);
    assert!(batches.iter().all(|b| b.len() == 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failing_source_does_not_stop_others() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    let sources = vec![
        Box::new(BrokenSource) as Box<dyn hostmon::core::sampler::MetricSource>,
        CountingSource::boxed("ram", 2),
    ];

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let stats = SamplerLoop::new(fast_config(2, Some(4)), sources, flusher)
        .run(cancel_rx)
        .await;

    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.source_failures, 4);

    let batches = sink.batches();
    assert_eq!(batches.len(), 2);
    for batch in &batches {
        assert_eq!(batch.len(), 4);
        assert!(batch.iter().all(|s| s.device == "ram"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_source_is_isolated() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    let sources = vec![
        Box::new(PanickingSource) as Box<dyn hostmon::core::sampler::MetricSource>,
        CountingSource::boxed("cpu", 1),
    ];

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let stats = SamplerLoop::new(fast_config(3, Some(3)), sources, flusher)
        .run(cancel_rx)
        .await;

    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.source_failures, 3);
    assert_eq!(stats.failed_flushes, 0);

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert!(batches[0].iter().all(|s| s.device == "cpu"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stuck_source_times_out_without_stalling_cadence() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    let sources = vec![
        Box::new(StuckSource {
            delay: Duration::from_millis(400),
        }) as Box<dyn hostmon::core::sampler::MetricSource>,
        CountingSource::boxed("cpu", 1),
    ];
    let config = SamplerConfig {
        source_timeout: Duration::from_millis(30),
        max_ticks: Some(4),
        ..SamplerConfig::new(Duration::from_millis(50), 2)
    };

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let started = std::time::Instant::now();
    let stats = SamplerLoop::new(config, sources, flusher)
        .run(cancel_rx)
        .await;

    // four ticks at 50ms must not wait out the 400ms probe
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.source_failures, 4);
    assert_eq!(sink.total_rows(), 4);
    assert!(sink
        .batches()
        .iter()
        .flatten()
        .all(|s| s.device == "cpu"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_flush_is_retried_at_next_boundary() {
    let sink = RecordingSink::new();
    sink.fail_next(1);
    let flusher = flusher_for(&sink);

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let stats = SamplerLoop::new(
        fast_config(2, Some(4)),
        vec![CountingSource::boxed("disks", 3)],
        Arc::clone(&flusher),
    )
    .run(cancel_rx)
    .await;

    assert_eq!(stats.flushes, 2);
    assert_eq!(stats.failed_flushes, 1);

    // the second flush carries all four ticks, oldest first
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 12);
    assert_eq!(batches[0][0].value, Value::Int(1));
    assert_eq!(batches[0][11].value, Value::Int(4));
    assert_non_decreasing(&batches[0]);
    assert!(flusher.buffer().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_stops_loop_without_flushing() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let handle = tokio::spawn(
        SamplerLoop::new(
            fast_config(1000, None),
            vec![CountingSource::boxed("cpu", 1)],
            Arc::clone(&flusher),
        )
        .run(cancel_rx),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel_tx.send(true).unwrap();
    let stats = handle.await.unwrap();

    assert!(stats.ticks >= 1);
    assert_eq!(stats.flushes, 0);
    assert_eq!(sink.attempts.load(std::sync::atomic::Ordering::SeqCst), 0);
    // everything sampled is still waiting for the final flush
    assert_eq!(flusher.buffer().len() as u64, stats.ticks);
}
