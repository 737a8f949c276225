use std::io;
use std::time::Duration;
use thiserror::Error;

/// Custom error type for hostmon
#[derive(Error, Debug)]
pub enum HostmonError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A probe could not be read this tick
    #[error("Source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// A probe exceeded its read budget this tick
    #[error("Source '{source_name}' timed out after {after:?}")]
    SourceTimeout { source_name: String, after: Duration },

    #[error("Sink write failed: {0}")]
    SinkWrite(String),

    #[error("Startup failed: {0}")]
    Startup(String),

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),
}

/// Result type alias for hostmon
pub type Result<T> = std::result::Result<T, HostmonError>;

impl HostmonError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HostmonError::Config(msg.into())
    }

    pub fn source_unavailable<N: Into<String>, S: Into<String>>(source_name: N, reason: S) -> Self {
        HostmonError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn source_timeout<N: Into<String>>(source_name: N, after: Duration) -> Self {
        HostmonError::SourceTimeout {
            source_name: source_name.into(),
            after,
        }
    }

    pub fn sink_write<S: Into<String>>(msg: S) -> Self {
        HostmonError::SinkWrite(msg.into())
    }

    pub fn startup<S: Into<String>>(msg: S) -> Self {
        HostmonError::Startup(msg.into())
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        HostmonError::GpuNotAvailable(msg.into())
    }

    /// Whether this error is a per-tick source failure the loop recovers from locally
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            HostmonError::SourceUnavailable { .. } | HostmonError::SourceTimeout { .. }
        )
    }
}
