//! Request bus for embr
//!
//! Services talk to each other only through the primitives in this crate:
//!
//! - **Queues** ([`queue`]): bounded FIFO, non-blocking receive, send with a
//!   short bounded wait that fails fast with [`BusError::QueueFull`]
//! - **Completion signals** ([`CompletionSignal`]): binary give/take
//! - **Reply slots** ([`reply_pair`]): a one-shot result cell plus signal,
//!   embedded in the request itself so the server answers the exact caller
//!   that asked
//! - **Status cells** ([`status_channel`]): single writer, copy-out readers
//! - **System log** ([`SysLog`]): the shared, non-blocking print channel
//!
//! # Call flow
//!
//! ```text
//!   caller                         queue (depth 1)                server
//!     │  reply_pair(token)              │                            │
//!     │  send(Request{.., reply}) ─────►│                            │
//!     │                                 │◄──── try_receive() ────────│
//!     │                                 │                            │ execute
//!     │◄──────────────── reply.publish(result) ──────────────────────│
//!     │  await_result(timeout)                                       │
//!     ▼  Ok(result) | Err(TimedOut)                                  ▼
//! ```
//!
//! Requests that carry no reply slot are fire-and-forget; the type of the
//! request says which kind it is.

mod error;
mod loom_tests;
mod queue;
mod reply;
mod signal;
mod status;
mod sync;
mod syslog;

pub use error::BusError;
pub use queue::{queue, QueueReceiver, QueueSender};
pub use reply::{reply_pair, PendingReply, Reply, RequestToken};
pub use signal::CompletionSignal;
pub use status::{status_channel, StatusReader, StatusWriter};
pub use syslog::{LogLevel, LogLine, SysLog};

/// Default depth of the system log channel.
pub const SYSLOG_DEPTH: usize = 32;
