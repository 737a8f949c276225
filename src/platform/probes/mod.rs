//! sysinfo-backed metric sources.

mod cpu;
mod disks;
mod memory;
mod temperature;

pub use cpu::CpuSource;
pub use disks::{disk_for_path, usage_percent, DiskSource};
pub use memory::MemorySource;
pub use temperature::TemperatureSource;
