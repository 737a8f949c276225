use sysinfo::Components;

use crate::core::sampler::{MetricSource, Sample};
use crate::error::{HostmonError, Result};

const DEVICE: &str = "temperature";

/// Temperature of every sensor sysinfo can see, keyed by sensor label
pub struct TemperatureSource {
    components: Components,
}

impl TemperatureSource {
    pub fn new() -> Self {
        Self {
            components: Components::new_with_refreshed_list(),
        }
    }
}

impl Default for TemperatureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for TemperatureSource {
    fn name(&self) -> &str {
        DEVICE
    }

    fn sample(&mut self, timestamp: i64) -> Result<Vec<Sample>> {
        self.components.refresh(true);

        if self.components.list().is_empty() {
            return Err(HostmonError::source_unavailable(
                DEVICE,
                "no temperature sensors found",
            ));
        }

        Ok(self
            .components
            .list()
            .iter()
            .filter_map(|comp| {
                comp.temperature()
                    .map(|celsius| Sample::new(timestamp, DEVICE, comp.label(), celsius))
            })
            .collect())
    }

    fn static_info(&mut self) -> Result<Vec<Sample>> {
        Ok(self
            .components
            .list()
            .iter()
            .filter_map(|comp| {
                comp.critical().map(|celsius| {
                    Sample::static_info(DEVICE, format!("critical_{}", comp.label()), celsius)
                })
            })
            .collect())
    }
}
