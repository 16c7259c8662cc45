//! Flash filesystem engine interface.
//!
//! Mirrors the call surface of a littlefs-style engine: explicit mount and
//! format, directory iteration through an open handle, and file I/O through
//! open/seek/read/write/close. Every call returns a raw [`EngineError`] on
//! failure; the Storage Manager does the remapping.
//!
//! The engine is owned by exactly one task. Implementations do not need to
//! be `Sync`.

use crate::core::error::EngineResult;
use crate::core::types::{EntryInfo, FsGeometry, OpenFlags};

/// Flash filesystem engine.
pub trait FlashFs: Send + 'static {
    /// Open file handle
    type File: Send;
    /// Open directory iterator
    type Dir: Send;

    // === Volume ===

    /// Mount an existing filesystem.
    fn mount(&mut self) -> EngineResult<()>;

    /// Release the mounted filesystem.
    fn unmount(&mut self) -> EngineResult<()>;

    /// Erase the device and write an empty filesystem. Leaves it unmounted.
    fn format(&mut self) -> EngineResult<()>;

    /// Number of blocks currently allocated.
    fn fs_size(&mut self) -> EngineResult<u32>;

    /// Device layout.
    fn geometry(&self) -> FsGeometry;

    // === Namespace ===

    /// Create a directory.
    fn mkdir(&mut self, path: &str) -> EngineResult<()>;

    /// Remove a file or an empty directory.
    fn remove(&mut self, path: &str) -> EngineResult<()>;

    /// Look up an entry.
    fn stat(&mut self, path: &str) -> EngineResult<EntryInfo>;

    // === Directories ===

    /// Open a directory for iteration.
    fn dir_open(&mut self, path: &str) -> EngineResult<Self::Dir>;

    /// Next entry, `None` at the end.
    fn dir_read(&mut self, dir: &mut Self::Dir) -> EngineResult<Option<EntryInfo>>;

    /// Close a directory handle.
    fn dir_close(&mut self, dir: Self::Dir) -> EngineResult<()>;

    // === Files ===

    /// Open a file.
    fn file_open(&mut self, path: &str, flags: OpenFlags) -> EngineResult<Self::File>;

    /// Move the file position to an absolute offset. Returns the new position.
    fn file_seek(&mut self, file: &mut Self::File, offset: u32) -> EngineResult<u32>;

    /// Read from the current position. Returns the number of bytes read.
    fn file_read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> EngineResult<usize>;

    /// Write at the current position (or the end, with `APPEND`).
    fn file_write(&mut self, file: &mut Self::File, data: &[u8]) -> EngineResult<usize>;

    /// Current size of an open file.
    fn file_size(&mut self, file: &Self::File) -> EngineResult<u32>;

    /// Flush and close.
    fn file_close(&mut self, file: Self::File) -> EngineResult<()>;
}
