//! Storage layer for embr
//!
//! This crate defines everything callers and the Storage Manager share:
//!
//! - **Engine** ([`FlashFs`]): the flash filesystem engine the manager owns
//! - **Errors** ([`StorageError`]): the storage error taxonomy, remapped
//!   from engine codes, each with a short human phrase
//! - **Requests** ([`StorageRequest`]): queries that carry a reply slot and
//!   mutations that do not
//! - **Client** ([`StorageClient`]): send/await wrapper used by services
//!   and the shell
//! - **Testing** ([`testing::MemoryFs`]): RAM-backed engine for tests
//!
//! # Architecture
//!
//! ```text
//!  shell / networkmanager
//!        │
//!        │ StorageClient::query / mutate
//!        ▼
//!  ┌──────────────┐  depth-1 queue   ┌─────────────────┐
//!  │ StorageRequest│ ───────────────► │ storagemanager  │
//!  └──────────────┘                   │   (one task)    │
//!        ▲                            └────────┬────────┘
//!        │ Reply<StorageResult>                │ FlashFs
//!        └─────────────────────────────────────┤
//!                                              ▼
//!                                        flash engine
//! ```
//!
//! Only the Storage Manager ever holds the engine.

pub mod client;
pub mod core;
pub mod engine;
pub mod ipc;
pub mod testing;

pub use client::StorageClient;
pub use crate::core::error::{EngineError, StorageError};
pub use crate::core::path::{validate_path, DEFAULT_PATH_MAX};
pub use crate::core::text::TextBuffer;
pub use crate::core::types::{EntryInfo, EntryKind, FsGeometry, FsUsage, OpenFlags};
pub use engine::FlashFs;
pub use ipc::{StorageMutation, StorageOutput, StorageQuery, StorageRequest, StorageResult};
