use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token shared between the capture loop and the shutdown
/// handler. Starts running; once stopped it never runs again.
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Lock-free and allocation-free, callable from a signal handler.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}
