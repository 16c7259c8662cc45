//! Bus error types.

use thiserror::Error;

/// Errors from request bus primitives.
///
/// `TimedOut` is an expected outcome of a bounded wait, not a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BusError {
    /// The target queue stayed full for the whole send wait
    #[error("queue full")]
    QueueFull,
    /// No result arrived within the await timeout
    #[error("timed out waiting for result")]
    TimedOut,
    /// The server dropped the request without publishing a result
    #[error("request abandoned by server")]
    Abandoned,
    /// The other end of the queue no longer exists
    #[error("peer disconnected")]
    Disconnected,
}
