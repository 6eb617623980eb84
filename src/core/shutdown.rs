//! Process-wide cooperative shutdown flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest stretch any loop sleeps without re-checking the flag.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Shared one-way flag: flips false→true exactly once, on the first
/// termination signal, and is then only ever read. Every loop checks it
/// cooperatively at iteration boundaries; nothing is interrupted mid-call.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Fresh flag in the not-requested state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for up to `duration`, waking early if shutdown is requested.
    /// Returns `true` when shutdown was observed.
    #[must_use]
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(WAIT_SLICE.min(deadline - now));
        }
    }

    /// Backing atomic, for handing to `signal_hook::flag::register`.
    #[must_use]
    pub fn atomic(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}
