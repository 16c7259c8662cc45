//! Network types for embr
//!
//! This crate provides the vocabulary shared by the Network Manager and its
//! callers, plus the radio driver interface the manager consumes.
//!
//! # Architecture
//!
//! ```text
//!  shell ("net join")
//!        │
//!        │ NetworkAction::Join (fire-and-forget)
//!        ▼
//! ┌──────────────────┐  FileExists + DumpFile  ┌─────────────────┐
//! │  networkmanager  │ ──────────────────────► │ storagemanager  │
//! │   (one task)     │ ◄────────────────────── │                 │
//! └────────┬─────────┘      credentials        └─────────────────┘
//!          │ Radio: init, station mode, connect_async, poll
//!          ▼
//! ┌──────────────────┐
//! │   radio driver   │
//! └──────────────────┘
//!          │ link Up
//!          ▼
//!   LinkUpHook (name responder, status web server)
//! ```
//!
//! Outcomes are never returned to the caller; they are published through
//! [`NetworkStatus`] and the system log.

mod credentials;
mod error;
mod radio;
pub mod testing;
mod types;

pub use credentials::Credentials;
pub use error::NetworkError;
pub use radio::{LinkUpHook, Radio};
pub use types::{AuthMode, LinkState, NetworkAction, NetworkStatus};
