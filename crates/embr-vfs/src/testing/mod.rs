//! Test doubles for the storage layer.

mod memory_fs;

pub use memory_fs::{MemDir, MemFile, MemoryFs, MemoryFsLimits, MemoryFsProbe};
