//! Per-request reply slots.
//!
//! Every request that expects a result carries its own [`Reply`]. The
//! caller keeps the matching [`PendingReply`]. Because the slot belongs to
//! one request, a caller that timed out can never see another call's
//! result, and a result that arrives late lands in a slot nobody reads.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::PoisonError;
use std::time::Duration;

use crate::sync::{Arc, Mutex};
use crate::{BusError, CompletionSignal};

static NEXT_TOKEN: AtomicU32 = AtomicU32::new(1);

/// Correlation token stamped on a request and its reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u32);

impl RequestToken {
    /// Allocate a fresh process-wide token.
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot<T> {
    value: Mutex<Option<Result<T, BusError>>>,
    ready: CompletionSignal,
}

impl<T> Slot<T> {
    fn fill(&self, outcome: Result<T, BusError>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.ready.give();
    }

    fn take(&self) -> Option<Result<T, BusError>> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Create a connected reply slot for one request.
pub fn reply_pair<T>(token: RequestToken) -> (Reply<T>, PendingReply<T>) {
    let slot = Arc::new(Slot {
        value: Mutex::new(None),
        ready: CompletionSignal::new(),
    });
    (
        Reply {
            token,
            slot: Some(Arc::clone(&slot)),
        },
        PendingReply { token, slot },
    )
}

/// Server half: publishes exactly one result.
///
/// Dropping a `Reply` without publishing wakes the caller with
/// [`BusError::Abandoned`].
pub struct Reply<T> {
    token: RequestToken,
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Reply<T> {
    /// Token of the request this reply answers.
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// True while the caller still holds its [`PendingReply`].
    pub fn caller_waiting(&self) -> bool {
        self.slot
            .as_ref()
            .map_or(false, |slot| Arc::strong_count(slot) > 1)
    }

    /// Write the result and raise the completion signal.
    pub fn publish(mut self, value: T) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Ok(value));
        }
    }
}

impl<T> Drop for Reply<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.fill(Err(BusError::Abandoned));
        }
    }
}

impl<T> fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").field("token", &self.token).finish()
    }
}

/// Caller half: waits for the result of one request.
pub struct PendingReply<T> {
    token: RequestToken,
    slot: Arc<Slot<T>>,
}

impl<T> PendingReply<T> {
    /// Token of the request this waits on.
    pub fn token(&self) -> RequestToken {
        self.token
    }

    /// True if the result has already been published.
    pub fn is_ready(&self) -> bool {
        self.slot.ready.is_raised()
    }

    /// Block until the result is published or `timeout` elapses.
    ///
    /// # Returns
    /// * `Ok(value)` - The server published a result for this request
    /// * `Err(BusError::TimedOut)` - Nothing arrived in time; the server may
    ///   still complete the request later
    /// * `Err(BusError::Abandoned)` - The server dropped the request
    pub fn await_result(self, timeout: Duration) -> Result<T, BusError> {
        if !self.slot.ready.take(timeout) {
            return Err(BusError::TimedOut);
        }
        self.slot.take().unwrap_or(Err(BusError::Abandoned))
    }
}

impl<T> fmt::Debug for PendingReply<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingReply")
            .field("token", &self.token)
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_publish_then_await() {
        let (reply, pending) = reply_pair::<u32>(RequestToken::next());
        assert!(reply.caller_waiting());
        reply.publish(42);
        assert!(pending.is_ready());
        assert_eq!(pending.await_result(Duration::ZERO), Ok(42));
    }

    #[test]
    fn test_drop_without_publish_is_abandoned() {
        let (reply, pending) = reply_pair::<u32>(RequestToken::next());
        drop(reply);
        assert_eq!(
            pending.await_result(Duration::from_millis(50)),
            Err(BusError::Abandoned)
        );
    }

    #[test]
    fn test_await_times_out() {
        let (_reply, pending) = reply_pair::<u32>(RequestToken::next());
        assert_eq!(
            pending.await_result(Duration::from_millis(5)),
            Err(BusError::TimedOut)
        );
    }

    #[test]
    fn test_caller_gone_is_visible_to_server() {
        let (reply, pending) = reply_pair::<u32>(RequestToken::next());
        drop(pending);
        assert!(!reply.caller_waiting());
        reply.publish(1);
    }

    #[test]
    fn test_tokens_increase() {
        let a = RequestToken::next();
        let b = RequestToken::next();
        assert!(b > a);
        assert_eq!(format!("{}", a), format!("#{}", a.value()));
    }
}
