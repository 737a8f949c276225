use std::sync::Arc;

use super::sample::Sample;
use crate::error::Result;

/// Durable, append-only store for samples.
///
/// `append` may be called from the sampler loop and from the shutdown
/// handler thread, so implementations must be `Sync` and must never rewrite
/// rows already persisted.
pub trait PersistenceSink: Send + Sync {
    /// Create the store and write the header plus the static-info rows.
    /// Called exactly once, before sampling starts.
    fn initialize(&self, static_info: &[Sample]) -> Result<()>;

    /// Append a whole batch. On error no guarantee is made about which rows
    /// reached storage; callers keep the batch and retry it later.
    fn append(&self, batch: &[Sample]) -> Result<()>;
}

impl<S: PersistenceSink + ?Sized> PersistenceSink for Arc<S> {
    fn initialize(&self, static_info: &[Sample]) -> Result<()> {
        (**self).initialize(static_info)
    }

    fn append(&self, batch: &[Sample]) -> Result<()> {
        (**self).append(batch)
    }
}
