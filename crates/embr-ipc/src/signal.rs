//! Binary completion signal.

use std::time::Duration;

#[cfg(not(loom))]
use crossbeam_channel::{Receiver, Sender};

#[cfg(loom)]
use crate::sync::{Arc, AtomicBool, Ordering};

/// Binary semaphore: `give` sets it (idempotently), `take` clears it.
#[cfg(not(loom))]
#[derive(Clone, Debug)]
pub struct CompletionSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

#[cfg(not(loom))]
impl CompletionSignal {
    /// Create a cleared signal.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        Self { tx, rx }
    }

    /// Raise the signal. Giving an already raised signal is a no-op.
    pub fn give(&self) {
        let _ = self.tx.try_send(());
    }

    /// Wait up to `timeout` for the signal and clear it.
    ///
    /// Returns false on timeout.
    pub fn take(&self, timeout: Duration) -> bool {
        self.rx.recv_timeout(timeout).is_ok()
    }

    /// Clear a stale signal without waiting.
    pub fn clear(&self) {
        let _ = self.rx.try_recv();
    }

    /// True if the signal is raised.
    pub fn is_raised(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Binary semaphore, model-checked build.
///
/// Time does not pass inside a loom model, so a non-zero `take` yields
/// until the signal is given.
#[cfg(loom)]
#[derive(Clone)]
pub struct CompletionSignal {
    raised: Arc<AtomicBool>,
}

#[cfg(loom)]
impl CompletionSignal {
    /// Create a cleared signal.
    pub fn new() -> Self {
        Self {
            raised: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Raise the signal.
    pub fn give(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Take the signal. A zero timeout never waits.
    pub fn take(&self, timeout: Duration) -> bool {
        loop {
            if self.raised.swap(false, Ordering::AcqRel) {
                return true;
            }
            if timeout.is_zero() {
                return false;
            }
            loom::thread::yield_now();
        }
    }

    /// Clear a stale signal without waiting.
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }

    /// True if the signal is raised.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

#[cfg(loom)]
impl std::fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("raised", &self.is_raised())
            .finish()
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_give_is_binary() {
        let signal = CompletionSignal::new();
        signal.give();
        signal.give();
        assert!(signal.take(Duration::ZERO));
        assert!(!signal.take(Duration::from_millis(5)));
    }

    #[test]
    fn test_clear_discards_stale_give() {
        let signal = CompletionSignal::new();
        signal.give();
        assert!(signal.is_raised());
        signal.clear();
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_take_across_threads() {
        let signal = CompletionSignal::new();
        let giver = signal.clone();
        let handle = std::thread::spawn(move || giver.give());
        assert!(signal.take(Duration::from_secs(2)));
        handle.join().unwrap();
    }
}
