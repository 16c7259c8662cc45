//! Bounded request queues.

use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TryRecvError};

use crate::BusError;

/// Create a bounded FIFO queue holding at most `depth` items.
///
/// A depth of zero is raised to one; queues are never rendezvous channels.
pub fn queue<T>(depth: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer end of a queue. Clone one per caller.
#[derive(Debug)]
pub struct QueueSender<T> {
    tx: Sender<T>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue `item`, waiting at most `wait` for space.
    ///
    /// # Returns
    /// * `Ok(())` - Item enqueued
    /// * `Err(BusError::QueueFull)` - Still full after `wait`; the item is dropped
    /// * `Err(BusError::Disconnected)` - The receiver is gone
    pub fn send(&self, item: T, wait: Duration) -> Result<(), BusError> {
        match self.tx.send_timeout(item, wait) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => Err(BusError::QueueFull),
            Err(SendTimeoutError::Disconnected(_)) => Err(BusError::Disconnected),
        }
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// True if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Maximum number of waiting items.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(1)
    }
}

/// Consumer end of a queue. Owned by exactly one server task.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: Receiver<T>,
}

impl<T> QueueReceiver<T> {
    /// Non-blocking poll.
    pub fn try_receive(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Number of items waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_one_rejects_second_send() {
        let (tx, rx) = queue::<u32>(1);
        assert_eq!(tx.send(1, Duration::from_millis(1)), Ok(()));
        assert_eq!(tx.send(2, Duration::from_millis(5)), Err(BusError::QueueFull));
        assert_eq!(rx.try_receive(), Some(1));
        assert_eq!(rx.try_receive(), None);
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = queue::<&str>(4);
        for item in ["a", "b", "c"] {
            tx.send(item, Duration::ZERO).unwrap();
        }
        assert_eq!(rx.len(), 3);
        assert_eq!(rx.try_receive(), Some("a"));
        assert_eq!(rx.try_receive(), Some("b"));
        assert_eq!(rx.try_receive(), Some("c"));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = queue::<u8>(1);
        drop(rx);
        assert_eq!(tx.send(0, Duration::ZERO), Err(BusError::Disconnected));
    }

    #[test]
    fn test_zero_depth_is_raised() {
        let (tx, _rx) = queue::<u8>(0);
        assert_eq!(tx.capacity(), 1);
        assert!(tx.send(9, Duration::ZERO).is_ok());
    }
}
