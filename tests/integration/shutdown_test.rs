// Tests for the termination path: one final flush, exactly once

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hostmon::core::sampler::{
    BatchBuffer, Flusher, PersistenceSink, Sample, SamplerLoop, ShutdownCoordinator,
    ShutdownOutcome,
};
use tokio::sync::watch;

use super::support::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_final_flush_saves_partial_batch() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    let (exits, exit) = counting_exit();
    let coordinator = ShutdownCoordinator::with_exit(Arc::clone(&flusher), exit);

    // 7 ticks with a flush every 5: two ticks are still in memory
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    SamplerLoop::new(
        fast_config(5, Some(7)),
        vec![CountingSource::boxed("cpu", 2), CountingSource::boxed("ram", 1)],
        Arc::clone(&flusher),
    )
    .run(cancel_rx)
    .await;
    assert_eq!(sink.batches().len(), 1);
    assert_eq!(sink.batches()[0].len(), 15);

    assert_eq!(coordinator.request_shutdown(), ShutdownOutcome::Flushed(6));
    assert_eq!(exits.load(Ordering::SeqCst), 1);

    let batches = sink.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].len(), 6);
    assert_non_decreasing(&batches[1]);
    assert!(flusher.buffer().is_closed());
}

#[test]
fn test_repeated_requests_flush_once() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    flusher
        .buffer()
        .append(vec![Sample::new(5, "cpu", "cpu_percent", 1.0)]);
    let (exits, exit) = counting_exit();
    let coordinator = ShutdownCoordinator::with_exit(flusher, exit);

    assert_eq!(coordinator.request_shutdown(), ShutdownOutcome::Flushed(1));
    assert_eq!(
        coordinator.request_shutdown(),
        ShutdownOutcome::AlreadyRequested
    );

    assert!(coordinator.is_requested());
    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_requests_flush_once() {
    let sink = RecordingSink::new();
    let (exits, exit) = counting_exit();
    let coordinator = Arc::new(ShutdownCoordinator::with_exit(flusher_for(&sink), exit));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || coordinator.request_shutdown())
        })
        .collect();
    let outcomes: Vec<ShutdownOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let flushed = outcomes
        .iter()
        .filter(|o| matches!(o, ShutdownOutcome::Flushed(_)))
        .count();
    assert_eq!(flushed, 1);
    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);

    coordinator.wait_until_complete();
}

#[test]
fn test_failed_final_flush_still_exits() {
    let sink = RecordingSink::new();
    sink.fail_always();
    let flusher = flusher_for(&sink);
    flusher
        .buffer()
        .append(vec![Sample::new(5, "ram", "ram_percent", 30.0)]);
    let (exits, exit) = counting_exit();
    let coordinator = ShutdownCoordinator::with_exit(flusher, exit);

    assert_eq!(coordinator.request_shutdown(), ShutdownOutcome::FlushFailed);
    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert!(sink.batches().is_empty());
}

#[test]
fn test_final_flush_includes_batch_kept_from_failed_flush() {
    let sink = RecordingSink::new();
    sink.fail_next(1);
    let flusher = flusher_for(&sink);
    flusher
        .buffer()
        .append(vec![Sample::new(1, "cpu", "cpu_percent", 5.0)]);

    assert!(flusher.flush().is_err());
    flusher
        .buffer()
        .append(vec![Sample::new(2, "cpu", "cpu_percent", 6.0)]);

    let (_exits, exit) = counting_exit();
    let coordinator = ShutdownCoordinator::with_exit(Arc::clone(&flusher), exit);
    assert_eq!(coordinator.request_shutdown(), ShutdownOutcome::Flushed(2));

    // a routine flush after the final one has nothing left to write
    assert_eq!(flusher.flush().unwrap(), 0);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_final_flush_waits_for_write_in_progress() {
    let sink = SlowSink::new();
    let dyn_sink: Arc<dyn PersistenceSink> = sink.clone();
    let flusher = Arc::new(Flusher::new(Arc::new(BatchBuffer::new()), dyn_sink));
    flusher
        .buffer()
        .append(vec![Sample::new(1, "cpu", "cpu_percent", 10.0)]);

    let routine = {
        let flusher = Arc::clone(&flusher);
        thread::spawn(move || flusher.flush())
    };
    sink.wait_until_writing();

    // sampled while the routine batch is on its way to disk
    flusher
        .buffer()
        .append(vec![Sample::new(2, "cpu", "cpu_percent", 20.0)]);

    let (exits, exit) = counting_exit();
    let coordinator = Arc::new(ShutdownCoordinator::with_exit(Arc::clone(&flusher), exit));
    let shutdown = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.request_shutdown())
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!shutdown.is_finished());
    assert_eq!(sink.appends_started(), 1);

    sink.release();
    assert_eq!(routine.join().unwrap().unwrap(), 1);
    assert_eq!(shutdown.join().unwrap(), ShutdownOutcome::Flushed(1));
    assert_eq!(exits.load(Ordering::SeqCst), 1);

    assert!(!sink.overlapped());
    let stamps: Vec<Vec<i64>> = sink
        .batches()
        .iter()
        .map(|batch| batch.iter().map(|s| s.timestamp).collect())
        .collect();
    assert_eq!(stamps, vec![vec![1], vec![2]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_signal_while_sampling_loses_nothing() {
    let sink = RecordingSink::new();
    let flusher = flusher_for(&sink);
    let (exits, exit) = counting_exit();
    let coordinator = Arc::new(ShutdownCoordinator::with_exit(Arc::clone(&flusher), exit));

    // simulated signal delivery from another thread, twice
    let signaller = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(170));
            let first = coordinator.request_shutdown();
            let second = coordinator.request_shutdown();
            (first, second)
        })
    };

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let stats = SamplerLoop::new(
        fast_config(3, None),
        vec![CountingSource::boxed("cpu", 2), CountingSource::boxed("gpu_0", 1)],
        Arc::clone(&flusher),
    )
    .run(cancel_rx)
    .await;

    let (first, second) = signaller.join().unwrap();
    assert!(matches!(first, ShutdownOutcome::Flushed(_)));
    assert_eq!(second, ShutdownOutcome::AlreadyRequested);
    assert_eq!(exits.load(Ordering::SeqCst), 1);

    // every completed tick reached the sink, nothing twice
    assert!(stats.ticks > 0);
    assert_eq!(sink.total_rows() as u64, stats.ticks * 3);
    for batch in sink.batches() {
        assert_non_decreasing(&batch);
    }
}
