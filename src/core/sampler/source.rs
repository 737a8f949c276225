use super::sample::Sample;
use crate::error::Result;

/// Trait for metric providers
///
/// Each implementation covers one metric category (cpu, ram, disks,
/// temperature, gpu). Implementations live in the platform layer and are
/// selected at startup; the sampler only ever sees this trait.
pub trait MetricSource: Send {
    /// Category name, also used in log lines and config (`cpu`, `ram`, ...)
    fn name(&self) -> &str;

    /// Read the probe once. Every returned sample must carry `timestamp`.
    ///
    /// Fails with `SourceUnavailable` when the underlying probe cannot be read.
    fn sample(&mut self, timestamp: i64) -> Result<Vec<Sample>>;

    /// Fixed machine characteristics, written once before sampling starts
    fn static_info(&mut self) -> Result<Vec<Sample>> {
        Ok(Vec::new())
    }
}

/// Collect static info from every source, skipping (and logging) sources
/// that cannot describe themselves.
pub fn collect_static_info(sources: &mut [Box<dyn MetricSource>]) -> Vec<Sample> {
    let mut info = Vec::new();
    for source in sources.iter_mut() {
        match source.static_info() {
            Ok(samples) => info.extend(samples),
            Err(e) => log::warn!("No static info from '{}': {}", source.name(), e),
        }
    }
    info
}
