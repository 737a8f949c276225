//! Tokio-driven sampling loop.
//!
//! Ticks at a fixed rate, reads every source on the blocking pool under a
//! timeout, buffers the merged result and flushes every `ticks_per_flush`
//! ticks.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use super::flush::Flusher;
use super::sample::Sample;
use super::source::MetricSource;
use crate::error::{HostmonError, Result};

/// Timing parameters for the sampler loop
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub ticks_per_flush: u32,
    /// Read budget for a single source in a single tick
    pub source_timeout: Duration,
    /// Stop after this many ticks (unbounded when `None`)
    pub max_ticks: Option<u64>,
}

impl SamplerConfig {
    pub fn new(interval: Duration, ticks_per_flush: u32) -> Self {
        Self {
            interval,
            ticks_per_flush: ticks_per_flush.max(1),
            source_timeout: interval / 2,
            max_ticks: None,
        }
    }
}

/// Counters reported when the loop returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub source_failures: u64,
}

/// A source plus its cached name. The mutex is held for the duration of a
/// read, so a read that outlived its timeout keeps the source busy and the
/// next tick skips it instead of piling up a second read.
struct SourceSlot {
    name: String,
    source: Arc<Mutex<Box<dyn MetricSource>>>,
}

pub struct SamplerLoop {
    config: SamplerConfig,
    sources: Vec<SourceSlot>,
    flusher: Arc<Flusher>,
}

impl SamplerLoop {
    pub fn new(
        config: SamplerConfig,
        sources: Vec<Box<dyn MetricSource>>,
        flusher: Arc<Flusher>,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| SourceSlot {
                name: source.name().to_string(),
                source: Arc::new(Mutex::new(source)),
            })
            .collect();

        Self {
            config,
            sources,
            flusher,
        }
    }

    /// Run until `cancel` flips to `true` (or its sender is dropped), the
    /// tick limit is reached, or the final flush closes the buffer.
    ///
    /// Returning never flushes: what is still buffered belongs to the
    /// shutdown coordinator.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> SamplerStats {
        log::info!(
            "Sampler started: {} sources, every {:?}, flush every {} ticks",
            self.sources.len(),
            self.config.interval,
            self.config.ticks_per_flush
        );

        let mut stats = SamplerStats::default();
        let mut ticks_since_flush: u32 = 0;
        let mut last_timestamp = i64::MIN;

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let timestamp = next_timestamp(chrono::Utc::now().timestamp(), last_timestamp);
                    last_timestamp = timestamp;

                    let (samples, failures) = self.sample_all(timestamp).await;
                    stats.source_failures += failures;

                    if !self.flusher.buffer().append(samples) {
                        log::debug!("Buffer closed by final flush, sampler stopping");
                        break;
                    }
                    stats.ticks += 1;
                    ticks_since_flush += 1;
                    log::trace!("Tick {} at {}", stats.ticks, timestamp);

                    if ticks_since_flush >= self.config.ticks_per_flush {
                        ticks_since_flush = 0;
                        stats.flushes += 1;
                        if self.flush().await.is_err() {
                            stats.failed_flushes += 1;
                        }
                    }

                    if self.config.max_ticks.is_some_and(|max| stats.ticks >= max) {
                        log::debug!("Tick limit reached");
                        break;
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        log::debug!("Sampler cancelled");
                        break;
                    }
                }
            }
        }

        log::info!(
            "Sampler stopped after {} ticks ({} flushes, {} failed)",
            stats.ticks,
            stats.flushes,
            stats.failed_flushes
        );
        stats
    }

    /// Read all sources concurrently and merge in source order
    async fn sample_all(&self, timestamp: i64) -> (Vec<Sample>, u64) {
        let reads = self.sources.iter().map(|slot| {
            read_source(
                slot.name.clone(),
                Arc::clone(&slot.source),
                timestamp,
                self.config.source_timeout,
            )
        });

        let mut samples = Vec::new();
        let mut failures = 0;
        for result in join_all(reads).await {
            match result {
                Ok(mut produced) => {
                    // one timestamp per tick
                    for sample in &mut produced {
                        sample.timestamp = timestamp;
                    }
                    samples.extend(produced);
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("{}", e);
                }
            }
        }
        (samples, failures)
    }

    async fn flush(&self) -> Result<usize> {
        let flusher = Arc::clone(&self.flusher);
        match tokio::task::spawn_blocking(move || flusher.flush()).await {
            Ok(result) => result,
            Err(e) => Err(HostmonError::sink_write(format!("flush task failed: {}", e))),
        }
    }
}

/// Timestamp for a tick. The wall clock may step backwards; timestamps must not.
fn next_timestamp(now: i64, last: i64) -> i64 {
    now.max(last)
}

async fn read_source(
    name: String,
    source: Arc<Mutex<Box<dyn MetricSource>>>,
    timestamp: i64,
    timeout: Duration,
) -> Result<Vec<Sample>> {
    let task_name = name.clone();
    let read = tokio::task::spawn_blocking(move || {
        let mut source = source.try_lock().ok_or_else(|| {
            HostmonError::source_unavailable(&task_name, "previous read still in progress")
        })?;
        source.sample(timestamp)
    });

    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(result)) => result.map_err(|e| {
            if e.is_source_failure() {
                e
            } else {
                HostmonError::source_unavailable(name, e.to_string())
            }
        }),
        Ok(Err(e)) => Err(HostmonError::source_unavailable(
            name,
            format!("read task failed: {}", e),
        )),
        Err(_) => Err(HostmonError::source_timeout(name, timeout)),
    }
}
