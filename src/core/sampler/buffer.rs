use parking_lot::Mutex;

use super::sample::Sample;

#[derive(Debug, Default)]
struct BufferState {
    samples: Vec<Sample>,
    closed: bool,
}

/// In-memory accumulator for samples between flushes.
///
/// Every operation takes the same lock, so a drain never observes half of a
/// tick's samples and an append never lands in a batch that was already
/// handed off. No I/O happens under the lock.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    state: Mutex<BufferState>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tick's samples as a unit.
    ///
    /// Returns `false` once the buffer has been closed by the final flush;
    /// the samples are dropped in that case.
    pub fn append(&self, samples: Vec<Sample>) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.samples.extend(samples);
        true
    }

    /// Take the current contents, leaving the buffer empty
    pub fn drain(&self) -> Vec<Sample> {
        std::mem::take(&mut self.state.lock().samples)
    }

    /// Put a batch that failed to persist back in front of anything sampled
    /// since, so it is retried at the next flush in its original order.
    pub fn restore(&self, mut samples: Vec<Sample>) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        samples.append(&mut state.samples);
        state.samples = samples;
        true
    }

    /// Final drain: take the contents and refuse all later appends
    pub fn close_and_drain(&self) -> Vec<Sample> {
        let mut state = self.state.lock();
        state.closed = true;
        std::mem::take(&mut state.samples)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
