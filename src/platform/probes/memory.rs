use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::core::sampler::{MetricSource, Sample};
use crate::error::Result;

const DEVICE: &str = "ram";

pub struct MemorySource {
    system: System,
}

impl MemorySource {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing().with_memory(MemoryRefreshKind::everything());
        Self {
            system: System::new_with_specifics(refresh),
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

impl MetricSource for MemorySource {
    fn name(&self) -> &str {
        DEVICE
    }

    fn sample(&mut self, timestamp: i64) -> Result<Vec<Sample>> {
        self.system.refresh_memory();

        let ram = percent(self.system.used_memory(), self.system.total_memory());
        let swap = percent(self.system.used_swap(), self.system.total_swap());

        Ok(vec![
            Sample::new(timestamp, DEVICE, "ram_percent", ram),
            Sample::new(timestamp, DEVICE, "swap_percent", swap),
        ])
    }

    fn static_info(&mut self) -> Result<Vec<Sample>> {
        self.system.refresh_memory();
        Ok(vec![
            Sample::static_info(DEVICE, "total_memory", self.system.total_memory()),
            Sample::static_info(DEVICE, "total_swap", self.system.total_swap()),
        ])
    }
}
