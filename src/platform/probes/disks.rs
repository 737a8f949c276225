use std::path::{Path, PathBuf};

use sysinfo::{Disk, Disks};

use crate::core::sampler::{MetricSource, Sample};
use crate::error::{HostmonError, Result};

const DEVICE: &str = "disks";

/// Usage of the filesystem holding `target`, plus machine-wide I/O counters
pub struct DiskSource {
    disks: Disks,
    target: PathBuf,
}

impl DiskSource {
    pub fn new<P: Into<PathBuf>>(target: P) -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            target: target.into(),
        }
    }

    fn io_counters(&self) -> Result<Vec<(&'static str, u64)>> {
        #[cfg(target_os = "linux")]
        {
            let c = crate::platform::procfs::read_disk_counters().map_err(|e| {
                HostmonError::source_unavailable(DEVICE, format!("I/O counters: {}", e))
            })?;
            Ok(vec![
                ("write_count", c.write_count),
                ("write_bytes", c.write_bytes),
                ("read_count", c.read_count),
                ("read_bytes", c.read_bytes),
            ])
        }
        #[cfg(not(target_os = "linux"))]
        {
            let (written, read) = self.disks.list().iter().fold((0u64, 0u64), |(w, r), disk| {
                let usage = disk.usage();
                (w + usage.total_written_bytes, r + usage.total_read_bytes)
            });
            Ok(vec![("write_bytes", written), ("read_bytes", read)])
        }
    }

    /// Every mounted filesystem. sysinfo hides virtual ones, so on Linux the
    /// mount table is read directly.
    fn mount_count(&self) -> usize {
        #[cfg(target_os = "linux")]
        match crate::platform::procfs::read_mount_count() {
            Ok(count) => return count,
            Err(e) => log::debug!("Mount table unavailable: {}", e),
        }
        self.disks.list().len()
    }
}

/// Disk whose mount point is the longest prefix of `target`
pub fn disk_for_path<'a>(disks: &'a [Disk], target: &Path) -> Option<&'a Disk> {
    disks
        .iter()
        .filter(|disk| target.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
}

pub fn usage_percent(total: u64, available: u64) -> f64 {
    if total > 0 {
        (total.saturating_sub(available) as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

impl MetricSource for DiskSource {
    fn name(&self) -> &str {
        DEVICE
    }

    fn sample(&mut self, timestamp: i64) -> Result<Vec<Sample>> {
        self.disks.refresh(true);

        let disk = disk_for_path(self.disks.list(), &self.target).ok_or_else(|| {
            HostmonError::source_unavailable(
                DEVICE,
                format!("no mounted filesystem holds {:?}", self.target),
            )
        })?;

        let mut samples = vec![Sample::new(
            timestamp,
            DEVICE,
            "disk_percent",
            usage_percent(disk.total_space(), disk.available_space()),
        )];
        match self.io_counters() {
            Ok(counters) => {
                for (measure, value) in counters {
                    samples.push(Sample::new(timestamp, DEVICE, measure, value));
                }
            }
            Err(e) => log::debug!("Disk I/O counters unavailable: {}", e),
        }
        Ok(samples)
    }

    fn static_info(&mut self) -> Result<Vec<Sample>> {
        self.disks.refresh(true);
        let all = self.mount_count();
        let physical = self
            .disks
            .list()
            .iter()
            .filter(|disk| !disk.is_removable())
            .count();

        Ok(vec![
            Sample::static_info(DEVICE, "num_partitions", all),
            Sample::static_info(DEVICE, "physical_partitions", physical),
        ])
    }
}
