//! `hostmon run`: sample until terminated.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use tokio::sync::watch;

use crate::core::config::Config;
use crate::core::csv_sink::CsvSink;
use crate::core::sampler::{
    collect_static_info, BatchBuffer, Flusher, PersistenceSink, SamplerLoop, ShutdownCoordinator,
    ShutdownOutcome,
};
use crate::platform::build_sources;

/// Execute the run command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    config.validate().context("Invalid configuration")?;
    let max_ticks = matches.get_one::<u64>("ticks").copied();

    let mut sources = build_sources(&config);
    if sources.is_empty() {
        bail!("No metric source could be initialized");
    }

    // Static info is written once, before the first tick
    let static_info = collect_static_info(&mut sources);
    let sink: Arc<dyn PersistenceSink> = Arc::new(CsvSink::new(config.output.clone()));
    sink.initialize(&static_info)
        .with_context(|| format!("Failed to initialize output store {:?}", config.output))?;

    let flusher = Arc::new(Flusher::new(Arc::new(BatchBuffer::new()), sink));
    let coordinator = Arc::new(ShutdownCoordinator::new(Arc::clone(&flusher)));
    coordinator.install()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .thread_name("sampler-worker")
        .build()
        .context("Failed to build sampler runtime")?;

    log::info!("Writing samples to {:?}", config.output);
    let sampler = SamplerLoop::new(config.sampler_config(max_ticks), sources, flusher);

    // Held for the whole run: dropping it would cancel the sampler
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let stats = runtime.block_on(sampler.run(cancel_rx));
    log::debug!("Sampler stats: {:?}", stats);

    // Only reached with --ticks, or after a signal already closed the buffer
    if coordinator.request_shutdown() == ShutdownOutcome::AlreadyRequested {
        coordinator.wait_until_complete();
    }
    Ok(())
}

/// Defaults, then the config file, then command-line flags
pub fn resolve_config(matches: &ArgMatches) -> Result<Config> {
    let explicit = matches.get_one::<PathBuf>("config");
    let mut config = Config::load(explicit.map(|p| p.as_path()))?;

    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.interval_secs = interval;
    }
    if let Some(&ticks) = matches.get_one::<u32>("ticks-per-flush") {
        config.ticks_per_flush = ticks;
    }
    if let Some(path) = matches.get_one::<PathBuf>("disk-path") {
        config.disk_path = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("output") {
        config.output = path.clone();
    }
    if let Some(&timeout) = matches.get_one::<u64>("source-timeout-ms") {
        config.source_timeout_ms = Some(timeout);
    }
    if let Some(sources) = matches.get_many::<String>("sources") {
        config.sources = sources.cloned().collect();
    }

    Ok(config)
}
