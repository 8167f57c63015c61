//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag.
///
/// Clones observe the same flag, so a handle can be given to another thread
/// (a timer, a signal handler, a UI) which requests the stop while the
/// verification polls [`is_stopped`][StopHandler::is_stopped] at its
/// iteration boundaries.
#[derive(Debug, Clone, Default)]
pub struct StopHandler {
    stopped: Arc<AtomicBool>,
}

impl StopHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Clears the flag so the handle can be used for another run.
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let handler = StopHandler::new();
        let remote = handler.clone();
        assert!(!handler.is_stopped());

        std::thread::spawn(move || remote.stop()).join().unwrap();
        assert!(handler.is_stopped());
        // Polling has no side effects
        assert!(handler.is_stopped());

        handler.reset();
        assert!(!handler.is_stopped());
    }
}
