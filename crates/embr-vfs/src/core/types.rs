//! Directory entries, usage figures and open flags.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Type of a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Dir,
}

/// Metadata for one directory entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Entry name (last path component)
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u32,
}

impl EntryInfo {
    /// Create file metadata.
    pub fn file(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    /// Create directory metadata.
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Dir,
            size: 0,
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Fixed block device layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsGeometry {
    /// Erase block size in bytes
    pub block_size: u32,
    /// Number of blocks on the device
    pub block_count: u32,
}

impl FsGeometry {
    /// Device size in bytes.
    pub fn total_bytes(&self) -> u64 {
        u64::from(self.block_size) * u64::from(self.block_count)
    }
}

/// Filesystem usage snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsUsage {
    /// Blocks currently allocated
    pub used_blocks: u32,
    /// Device layout
    pub geometry: FsGeometry,
}

impl FsUsage {
    /// Bytes in allocated blocks.
    pub fn used_bytes(&self) -> u64 {
        u64::from(self.used_blocks) * u64::from(self.geometry.block_size)
    }
}

impl fmt::Display for FsUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Filesystem usage: {}/{} blocks ({}/{} bytes)",
            self.used_blocks,
            self.geometry.block_count,
            self.used_bytes(),
            self.geometry.total_bytes()
        )
    }
}

bitflags! {
    /// File open flags, numbered like the engine's.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open for reading
        const RDONLY = 0x0001;
        /// Open for writing
        const WRONLY = 0x0002;
        /// Open for reading and writing
        const RDWR = Self::RDONLY.bits() | Self::WRONLY.bits();
        /// Create the file if it does not exist
        const CREAT = 0x0100;
        /// Fail if the file already exists
        const EXCL = 0x0200;
        /// Truncate to zero length
        const TRUNC = 0x0400;
        /// Every write goes to the end of the file
        const APPEND = 0x0800;
    }
}

impl OpenFlags {
    /// True if the handle may be written.
    pub fn writable(self) -> bool {
        self.contains(OpenFlags::WRONLY)
    }

    /// True if the handle may be read.
    pub fn readable(self) -> bool {
        self.contains(OpenFlags::RDONLY)
    }
}
