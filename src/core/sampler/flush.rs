use std::sync::Arc;

use parking_lot::Mutex;

use super::buffer::BatchBuffer;
use super::sink::PersistenceSink;
use crate::error::Result;

/// Hands buffered samples to the sink.
///
/// Routine and final flushes serialize on `gate` for the whole
/// drain → write → restore sequence. Sampling only needs the buffer lock, so
/// a slow write never stalls it.
pub struct Flusher {
    buffer: Arc<BatchBuffer>,
    sink: Arc<dyn PersistenceSink>,
    gate: Mutex<()>,
}

impl Flusher {
    pub fn new(buffer: Arc<BatchBuffer>, sink: Arc<dyn PersistenceSink>) -> Self {
        Self {
            buffer,
            sink,
            gate: Mutex::new(()),
        }
    }

    pub fn buffer(&self) -> &Arc<BatchBuffer> {
        &self.buffer
    }

    /// Routine flush at a batch boundary.
    ///
    /// On a failed write the batch goes back into the buffer and is retried
    /// at the next boundary instead of being discarded.
    pub fn flush(&self) -> Result<usize> {
        let _gate = self.gate.lock();
        if self.buffer.is_closed() {
            // final flush already took everything
            return Ok(0);
        }

        let batch = self.buffer.drain();
        match self.sink.append(&batch) {
            Ok(()) => {
                log::info!("Flushed {} samples", batch.len());
                Ok(batch.len())
            }
            Err(e) => {
                log::error!(
                    "Failed to persist {} samples, keeping them for the next flush: {}",
                    batch.len(),
                    e
                );
                self.buffer.restore(batch);
                Err(e)
            }
        }
    }

    /// Last flush before exit. Closes the buffer, then writes whatever it
    /// held (possibly nothing). Not retried.
    pub fn final_flush(&self) -> Result<usize> {
        let _gate = self.gate.lock();
        let batch = self.buffer.close_and_drain();
        self.sink.append(&batch)?;
        log::info!("Final flush wrote {} samples", batch.len());
        Ok(batch.len())
    }
}
