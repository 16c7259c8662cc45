//! Core storage types shared by the engine, the manager and callers.

pub mod error;
pub mod path;
pub mod text;
pub mod types;
