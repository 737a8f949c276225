//! GPU-specific platform code.
//!
//! NVIDIA is read through NVML when the `nvml` feature is enabled.

mod nvidia;

pub use nvidia::NvidiaGpuSource;

use crate::core::sampler::MetricSource;
use crate::error::Result;

/// Attempt to get a GPU source for the GPUs present on this machine.
///
/// Returns an error if no supported GPU is available.
pub fn get_gpu_source() -> Result<Box<dyn MetricSource>> {
    let source = NvidiaGpuSource::new()?;
    log::debug!("NVML found {} GPU(s)", source.device_count());
    Ok(Box::new(source))
}
