//! Termination handling.
//!
//! Exactly one final flush happens no matter how many termination signals
//! arrive or where the sampler loop is in its cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::flush::Flusher;
use crate::error::{HostmonError, Result};

type ExitFn = Box<dyn Fn(i32) + Send + Sync>;

/// Result of a shutdown request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Final flush persisted this many samples
    Flushed(usize),
    /// Final flush failed; the process exits anyway
    FlushFailed,
    /// Another request got there first; nothing was done
    AlreadyRequested,
}

pub struct ShutdownCoordinator {
    flusher: Arc<Flusher>,
    requested: AtomicBool,
    completed: Mutex<bool>,
    completed_cv: Condvar,
    exit: ExitFn,
}

impl ShutdownCoordinator {
    /// Coordinator that terminates the process after the final flush
    pub fn new(flusher: Arc<Flusher>) -> Self {
        Self::with_exit(flusher, |code| {
            std::process::exit(code);
        })
    }

    /// Coordinator with a custom exit action
    pub fn with_exit<F>(flusher: Arc<Flusher>, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        Self {
            flusher,
            requested: AtomicBool::new(false),
            completed: Mutex::new(false),
            completed_cv: Condvar::new(),
            exit: Box::new(exit),
        }
    }

    /// Register for SIGINT/SIGTERM (Ctrl+C and console close on Windows).
    ///
    /// Can only succeed once per process.
    pub fn install(self: &Arc<Self>) -> Result<()> {
        let coordinator = Arc::clone(self);
        ctrlc::set_handler(move || {
            coordinator.request_shutdown();
        })
        .map_err(|e| HostmonError::startup(format!("Failed to set termination handler: {}", e)))
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Perform the final flush and exit. Later calls are no-ops.
    ///
    /// A failed final write is logged, not retried: the exit happens either way.
    pub fn request_shutdown(&self) -> ShutdownOutcome {
        if self.requested.swap(true, Ordering::SeqCst) {
            log::debug!("Shutdown already in progress, ignoring repeated request");
            return ShutdownOutcome::AlreadyRequested;
        }

        log::info!("Termination requested, saving buffered samples");
        let outcome = match self.flusher.final_flush() {
            Ok(count) => ShutdownOutcome::Flushed(count),
            Err(e) => {
                log::error!("Final flush failed, buffered samples are lost: {}", e);
                ShutdownOutcome::FlushFailed
            }
        };

        *self.completed.lock() = true;
        self.completed_cv.notify_all();

        (self.exit)(0);
        outcome
    }

    /// Block until a request made on another thread has finished its
    /// final flush. Returns at once if that already happened.
    pub fn wait_until_complete(&self) {
        let mut completed = self.completed.lock();
        while !*completed {
            self.completed_cv.wait(&mut completed);
        }
    }
}
