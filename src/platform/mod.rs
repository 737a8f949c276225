// Platform-specific code module

pub mod gpu;
pub mod probes;
#[cfg(target_os = "linux")]
pub mod procfs;

use crate::core::config::Config;
use crate::core::sampler::MetricSource;

pub use gpu::get_gpu_source;
pub use probes::{CpuSource, DiskSource, MemorySource, TemperatureSource};

/// Build the sources enabled in `config`, in the canonical row order
/// (cpu, ram, disks, temperature, gpu).
///
/// A category whose hardware is missing (no supported GPU) is skipped with a
/// warning instead of failing startup.
pub fn build_sources(config: &Config) -> Vec<Box<dyn MetricSource>> {
    let mut sources: Vec<Box<dyn MetricSource>> = Vec::new();

    if config.is_enabled("cpu") {
        sources.push(Box::new(CpuSource::new()));
    }
    if config.is_enabled("ram") {
        sources.push(Box::new(MemorySource::new()));
    }
    if config.is_enabled("disks") {
        sources.push(Box::new(DiskSource::new(config.disk_path.clone())));
    }
    if config.is_enabled("temperature") {
        sources.push(Box::new(TemperatureSource::new()));
    }
    if config.is_enabled("gpu") {
        match get_gpu_source() {
            Ok(source) => sources.push(source),
            Err(e) => log::warn!("GPU source disabled: {}", e),
        }
    }

    sources
}
