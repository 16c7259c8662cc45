//! Error types for the storage layer.
//!
//! Engine calls return raw [`EngineError`] codes in the engine's own
//! numbering. The Storage Manager remaps them into [`StorageError`], whose
//! `Display` is the short phrase shown to users.

use std::fmt;

use embr_ipc::BusError;
use thiserror::Error;

/// Raw error code from the flash filesystem engine (negative values).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineError(pub i32);

impl EngineError {
    /// Error during device operation
    pub const IO: EngineError = EngineError(-5);
    /// Corrupted
    pub const CORRUPT: EngineError = EngineError(-84);
    /// No directory entry
    pub const NOENT: EngineError = EngineError(-2);
    /// Entry already exists
    pub const EXIST: EngineError = EngineError(-17);
    /// Entry is not a dir
    pub const NOTDIR: EngineError = EngineError(-20);
    /// Entry is a dir
    pub const ISDIR: EngineError = EngineError(-21);
    /// Dir is not empty
    pub const NOTEMPTY: EngineError = EngineError(-39);
    /// Bad file number
    pub const BADF: EngineError = EngineError(-9);
    /// File too large
    pub const FBIG: EngineError = EngineError(-27);
    /// Invalid parameter
    pub const INVAL: EngineError = EngineError(-22);
    /// No space left on device
    pub const NOSPC: EngineError = EngineError(-28);
    /// No more memory available
    pub const NOMEM: EngineError = EngineError(-12);
    /// No data/attr available
    pub const NOATTR: EngineError = EngineError(-61);
    /// File name too long
    pub const NAMETOOLONG: EngineError = EngineError(-36);

    /// Raw code.
    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineError({})", self.0)
    }
}

/// Result of an engine call.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the storage layer.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Filesystem is not mounted (mount failed or was unmounted)
    #[error("filesystem not mounted")]
    NotMounted,
    /// Block device failure
    #[error("error during device operation")]
    IoFault,
    /// On-flash structures are corrupt
    #[error("corrupted")]
    Corrupt,
    /// Path does not exist
    #[error("entry does not exist")]
    NotFound,
    /// Path already exists
    #[error("entry already exists")]
    AlreadyExists,
    /// A path component is not a directory
    #[error("entry is not a dir")]
    NotADirectory,
    /// Operation needs a file but found a directory
    #[error("entry is a dir")]
    IsADirectory,
    /// Directory still has entries
    #[error("dir is not empty")]
    DirectoryNotEmpty,
    /// Stale or invalid file handle
    #[error("bad file number")]
    BadHandle,
    /// File would exceed the maximum file size
    #[error("file too large")]
    TooLarge,
    /// Invalid argument to the engine
    #[error("invalid parameter")]
    InvalidArgument,
    /// No free blocks left
    #[error("no space left on device")]
    OutOfSpace,
    /// Engine ran out of RAM
    #[error("no more memory available")]
    OutOfMemory,
    /// Attribute missing
    #[error("no data/attr available")]
    NoAttribute,
    /// Path or name exceeds the configured maximum
    #[error("file name too long")]
    NameTooLong,
    /// Engine code outside the known set
    #[error("unknown error ({0})")]
    Unknown(i32),
    /// The request never reached the manager or no result came back
    #[error("storage request failed: {0}")]
    Bus(#[from] BusError),
}

impl StorageError {
    /// True if the failure happened on the request bus rather than in the
    /// filesystem.
    pub fn is_bus(&self) -> bool {
        matches!(self, StorageError::Bus(_))
    }
}

impl From<EngineError> for StorageError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::IO => StorageError::IoFault,
            EngineError::CORRUPT => StorageError::Corrupt,
            EngineError::NOENT => StorageError::NotFound,
            EngineError::EXIST => StorageError::AlreadyExists,
            EngineError::NOTDIR => StorageError::NotADirectory,
            EngineError::ISDIR => StorageError::IsADirectory,
            EngineError::NOTEMPTY => StorageError::DirectoryNotEmpty,
            EngineError::BADF => StorageError::BadHandle,
            EngineError::FBIG => StorageError::TooLarge,
            EngineError::INVAL => StorageError::InvalidArgument,
            EngineError::NOSPC => StorageError::OutOfSpace,
            EngineError::NOMEM => StorageError::OutOfMemory,
            EngineError::NOATTR => StorageError::NoAttribute,
            EngineError::NAMETOOLONG => StorageError::NameTooLong,
            EngineError(code) => StorageError::Unknown(code),
        }
    }
}
