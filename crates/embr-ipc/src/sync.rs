//! Synchronization primitives behind the reply slots and status cells.
//!
//! Under `--cfg loom` these are loom's instrumented types, so the loom
//! models exercise the production [`Reply`](crate::Reply),
//! [`CompletionSignal`](crate::CompletionSignal) and status cells.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::{Arc, Mutex, RwLock};

#[cfg(not(loom))]
pub(crate) use std::sync::{Arc, Mutex, RwLock};
