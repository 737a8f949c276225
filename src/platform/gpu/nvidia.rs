#[cfg(feature = "nvml")]
use nvml_wrapper::{
    enum_wrappers::device::{Clock, PerformanceState, TemperatureSensor},
    Device, Nvml,
};

use crate::core::sampler::{MetricSource, Sample};
use crate::error::{HostmonError, Result};

#[cfg(feature = "nvml")]
const BYTES_PER_MIB: u64 = 1024 * 1024;

/// P-state number, 0 being maximum performance
#[cfg(feature = "nvml")]
fn pstate_index(state: PerformanceState) -> Option<u32> {
    let index = match state {
        PerformanceState::Zero => 0,
        PerformanceState::One => 1,
        PerformanceState::Two => 2,
        PerformanceState::Three => 3,
        PerformanceState::Four => 4,
        PerformanceState::Five => 5,
        PerformanceState::Six => 6,
        PerformanceState::Seven => 7,
        PerformanceState::Eight => 8,
        PerformanceState::Nine => 9,
        PerformanceState::Ten => 10,
        PerformanceState::Eleven => 11,
        PerformanceState::Twelve => 12,
        PerformanceState::Thirteen => 13,
        PerformanceState::Fourteen => 14,
        PerformanceState::Fifteen => 15,
        PerformanceState::Unknown => return None,
    };
    Some(index)
}

/// NVIDIA GPUs via NVML. Reports every device; rows use `gpu_<uuid>` as
/// device name.
pub struct NvidiaGpuSource {
    #[cfg(feature = "nvml")]
    nvml: Nvml,
    device_count: u32,
}

impl NvidiaGpuSource {
    /// Initialize NVML and make sure at least one device is present
    pub fn new() -> Result<Self> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init().map_err(|e| {
                HostmonError::gpu_not_available(format!("Failed to init NVML: {}", e))
            })?;

            let device_count = nvml.device_count().map_err(|e| {
                HostmonError::gpu_not_available(format!("Failed to count GPUs: {}", e))
            })?;
            if device_count == 0 {
                return Err(HostmonError::gpu_not_available("NVML reports no devices"));
            }

            Ok(Self { nvml, device_count })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(HostmonError::gpu_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    pub fn device_count(&self) -> u32 {
        self.device_count
    }

    #[cfg(feature = "nvml")]
    fn get_device(&self, index: u32) -> Result<(Device<'_>, String)> {
        let device = self.nvml.device_by_index(index).map_err(|e| {
            HostmonError::source_unavailable("gpu", format!("GPU {} not found: {}", index, e))
        })?;
        let uuid = device.uuid().map_err(|e| {
            HostmonError::source_unavailable("gpu", format!("GPU {} has no UUID: {}", index, e))
        })?;
        Ok((device, format!("gpu_{}", uuid)))
    }
}

impl MetricSource for NvidiaGpuSource {
    fn name(&self) -> &str {
        "gpu"
    }

    fn sample(&mut self, timestamp: i64) -> Result<Vec<Sample>> {
        #[cfg(feature = "nvml")]
        {
            let mut samples = Vec::new();
            for index in 0..self.device_count {
                let (device, name) = self.get_device(index)?;

                let memory = device.memory_info().map_err(|e| {
                    HostmonError::source_unavailable(
                        "gpu",
                        format!("Failed to get memory info: {}", e),
                    )
                })?;
                let memory_util = if memory.total > 0 {
                    memory.used as f64 / memory.total as f64
                } else {
                    0.0
                };

                if let Ok(utilization) = device.utilization_rates() {
                    samples.push(Sample::new(timestamp, &name, "gpu_load", utilization.gpu));
                }
                samples.push(Sample::new(
                    timestamp,
                    &name,
                    "gpu_memory_used",
                    memory.used / BYTES_PER_MIB,
                ));
                samples.push(Sample::new(timestamp, &name, "gpu_memory_util", memory_util));
                if let Ok(celsius) = device.temperature(TemperatureSensor::Gpu) {
                    samples.push(Sample::new(timestamp, &name, "gpu_temperature", celsius));
                }
                if let Some(pstate) = device.performance_state().ok().and_then(pstate_index) {
                    samples.push(Sample::new(timestamp, &name, "performance", pstate));
                }
                if let Ok(mhz) = device.clock_info(Clock::Graphics) {
                    samples.push(Sample::new(timestamp, &name, "graphics_clock_frequency", mhz));
                }
                if let Ok(mhz) = device.clock_info(Clock::SM) {
                    samples.push(Sample::new(timestamp, &name, "sm_clock_frequency", mhz));
                }
                // milliwatts
                if let Ok(mw) = device.power_usage() {
                    samples.push(Sample::new(
                        timestamp,
                        &name,
                        "last_power_draw",
                        f64::from(mw) / 1000.0,
                    ));
                }
                // fanless boards report NotSupported
                if let Ok(percent) = device.fan_speed(0) {
                    samples.push(Sample::new(timestamp, &name, "fan_speed", percent));
                }
            }
            Ok(samples)
        }
        #[cfg(not(feature = "nvml"))]
        {
            let _ = timestamp;
            Err(HostmonError::gpu_not_available(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    fn static_info(&mut self) -> Result<Vec<Sample>> {
        #[cfg(feature = "nvml")]
        {
            let driver = self
                .nvml
                .sys_driver_version()
                .unwrap_or_else(|_| "unknown".to_string());

            let mut info = Vec::new();
            for index in 0..self.device_count {
                let (device, name) = self.get_device(index)?;
                let gpu_name = device
                    .name()
                    .unwrap_or_else(|_| "Unknown NVIDIA GPU".to_string());
                info.push(Sample::static_info(&name, "gpu_name", gpu_name));
                if let Ok(memory) = device.memory_info() {
                    info.push(Sample::static_info(
                        &name,
                        "gpu_memory_total",
                        memory.total / BYTES_PER_MIB,
                    ));
                }
                if let Ok(mhz) = device.max_clock_info(Clock::Graphics) {
                    info.push(Sample::static_info(&name, "max_graphics_clock_frequency", mhz));
                }
                if let Ok(mhz) = device.max_clock_info(Clock::SM) {
                    info.push(Sample::static_info(&name, "max_sm_frequency", mhz));
                }
                info.push(Sample::static_info(&name, "driver", driver.as_str()));
            }
            Ok(info)
        }
        #[cfg(not(feature = "nvml"))]
        {
            Ok(Vec::new())
        }
    }
}
