//! Sampling core.
//!
//! Drives periodic sampling of the configured metric sources, batches the
//! results in memory and persists them through a sink, with a single
//! coordinated flush on termination.

mod buffer;
mod flush;
mod runtime;
mod sample;
mod shutdown;
mod sink;
mod source;

pub use buffer::BatchBuffer;
pub use flush::Flusher;
pub use runtime::{SamplerConfig, SamplerLoop, SamplerStats};
pub use sample::{Sample, Value, STATIC_INFO_TIMESTAMP};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome};
pub use sink::PersistenceSink;
pub use source::{collect_static_info, MetricSource};
