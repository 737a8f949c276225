use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::sampler::SamplerConfig;
use crate::error::HostmonError;

/// Metric categories a run can sample
pub const KNOWN_SOURCES: [&str; 5] = ["cpu", "ram", "disks", "temperature", "gpu"];

const DEFAULT_INTERVAL_SECS: u64 = 2;
const DEFAULT_TICKS_PER_FLUSH: u32 = 5;
const DEFAULT_OUTPUT: &str = "data.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between two samples
    pub interval_secs: u64,
    /// Samples are written to disk once every this many ticks
    pub ticks_per_flush: u32,
    /// Path whose filesystem is reported by the disk source
    pub disk_path: PathBuf,
    /// CSV store location
    pub output: PathBuf,
    /// Per-source read budget; half the interval when unset
    pub source_timeout_ms: Option<u64>,
    /// Enabled categories
    pub sources: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            ticks_per_flush: DEFAULT_TICKS_PER_FLUSH,
            disk_path: default_disk_path(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            source_timeout_ms: None,
            sources: KNOWN_SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn default_disk_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\")
    } else {
        PathBuf::from("/")
    }
}

impl Config {
    /// Load from an explicit file, or from the per-user config file when it
    /// exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::get_config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// `<config dir>/hostmon/config.json`
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("hostmon").join("config.json"))
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.interval_secs == 0 {
            return Err(HostmonError::config("interval must be at least 1 second"));
        }
        if self.ticks_per_flush == 0 {
            return Err(HostmonError::config("ticks per flush must be at least 1"));
        }
        if self.source_timeout_ms == Some(0) {
            return Err(HostmonError::config("source timeout must be positive"));
        }
        if self.sources.is_empty() {
            return Err(HostmonError::config("at least one source must be enabled"));
        }
        if let Some(unknown) = self
            .sources
            .iter()
            .find(|s| !KNOWN_SOURCES.contains(&s.as_str()))
        {
            return Err(HostmonError::config(format!(
                "unknown source '{}' (expected one of: {})",
                unknown,
                KNOWN_SOURCES.join(", ")
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        self.source_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.interval() / 2)
    }

    pub fn is_enabled(&self, source: &str) -> bool {
        self.sources.iter().any(|s| s == source)
    }

    pub fn sampler_config(&self, max_ticks: Option<u64>) -> SamplerConfig {
        SamplerConfig {
            source_timeout: self.source_timeout(),
            max_ticks,
            ..SamplerConfig::new(self.interval(), self.ticks_per_flush)
        }
    }
}
