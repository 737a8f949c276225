//! Linux `/proc` counters that sysinfo does not expose.

use std::fs;

use crate::error::{HostmonError, Result};

const SECTOR_SIZE: u64 = 512;

/// Cumulative CPU time in seconds, summed across all cores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuTimes {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
}

/// Cumulative block I/O counters, summed across whole disks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_count: u64,
    pub read_bytes: u64,
    pub write_count: u64,
    pub write_bytes: u64,
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// `user` includes `nice`, matching what most tools report.
pub fn parse_cpu_times(stat: &str, ticks_per_sec: f64) -> Option<CpuTimes> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    if fields.len() < 4 || ticks_per_sec <= 0.0 {
        return None;
    }

    // user nice system idle iowait ...
    Some(CpuTimes {
        user: (fields[0] + fields[1]) as f64 / ticks_per_sec,
        system: fields[2] as f64 / ticks_per_sec,
        idle: fields[3] as f64 / ticks_per_sec,
    })
}

/// Sum `/proc/diskstats` rows for which `is_whole_disk` holds
pub fn parse_diskstats<F>(diskstats: &str, is_whole_disk: F) -> DiskCounters
where
    F: Fn(&str) -> bool,
{
    let mut counters = DiskCounters::default();
    for line in diskstats.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // major minor name reads merged sectors ms writes merged sectors ...
        if fields.len() < 10 || !is_whole_disk(fields[2]) {
            continue;
        }
        let num = |i: usize| fields[i].parse::<u64>().unwrap_or(0);
        counters.read_count += num(3);
        counters.read_bytes += num(5) * SECTOR_SIZE;
        counters.write_count += num(7);
        counters.write_bytes += num(9) * SECTOR_SIZE;
    }
    counters
}

/// Count mounted filesystems in a `/proc/self/mounts` listing, virtual
/// ones included
pub fn parse_mount_count(mounts: &str) -> usize {
    mounts
        .lines()
        .filter(|line| line.split_whitespace().nth(1).is_some())
        .count()
}

pub fn read_mount_count() -> Result<usize> {
    let mounts = fs::read_to_string("/proc/self/mounts")?;
    Ok(parse_mount_count(&mounts))
}

pub fn read_cpu_times() -> Result<CpuTimes> {
    let stat = fs::read_to_string("/proc/stat")?;
    parse_cpu_times(&stat, clock_ticks_per_sec())
        .ok_or_else(|| HostmonError::source_unavailable("cpu", "unexpected /proc/stat format"))
}

pub fn read_disk_counters() -> Result<DiskCounters> {
    let diskstats = fs::read_to_string("/proc/diskstats")?;
    let whole_disks: Vec<String> = fs::read_dir("/sys/block")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with("loop") && !name.starts_with("ram"))
        .collect();

    Ok(parse_diskstats(&diskstats, |name| {
        whole_disks.iter().any(|d| d == name)
    }))
}

fn clock_ticks_per_sec() -> f64 {
    // SAFETY: sysconf has no preconditions
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as f64
    } else {
        100.0
    }
}
