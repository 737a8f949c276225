use sysinfo::{CpuRefreshKind, RefreshKind, System};

use crate::core::sampler::{MetricSource, Sample};
use crate::error::Result;

const DEVICE: &str = "cpu";

/// CPU load, frequency and (on Linux) cumulative CPU times
pub struct CpuSource {
    system: System,
}

impl CpuSource {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing().with_cpu(CpuRefreshKind::everything());
        let mut system = System::new_with_specifics(refresh);
        // usage is a delta, the first tick measures against this refresh
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for CpuSource {
    fn name(&self) -> &str {
        DEVICE
    }

    fn sample(&mut self, timestamp: i64) -> Result<Vec<Sample>> {
        self.system.refresh_cpu_all();

        let cpus = self.system.cpus();
        let frequency = cpus.first().map(|cpu| cpu.frequency()).unwrap_or(0);

        let mut samples = vec![Sample::new(
            timestamp,
            DEVICE,
            "cpu_percent",
            self.system.global_cpu_usage(),
        )];

        #[cfg(target_os = "linux")]
        match crate::platform::procfs::read_cpu_times() {
            Ok(times) => {
                samples.push(Sample::new(timestamp, DEVICE, "user_time", times.user));
                samples.push(Sample::new(timestamp, DEVICE, "system_time", times.system));
                samples.push(Sample::new(timestamp, DEVICE, "idle_time", times.idle));
            }
            Err(e) => log::debug!("CPU times unavailable: {}", e),
        }

        samples.push(Sample::new(timestamp, DEVICE, "frequency", frequency));
        Ok(samples)
    }

    fn static_info(&mut self) -> Result<Vec<Sample>> {
        let logical = self.system.cpus().len();
        let physical = System::physical_core_count().unwrap_or(0);

        Ok(vec![
            Sample::static_info(DEVICE, "logical_CPU", logical),
            Sample::static_info(DEVICE, "physical_CPU", physical),
        ])
    }
}
