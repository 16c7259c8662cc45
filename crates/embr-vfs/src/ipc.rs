//! Storage request and result types.
//!
//! A request is either a [`StorageQuery`], which always carries a reply
//! slot and always gets exactly one result, or a [`StorageMutation`], which
//! carries none and is fire-and-forget. Failed mutations are reported on
//! the system log only.

use std::borrow::Cow;

use embr_ipc::Reply;

use crate::core::error::StorageError;
use crate::core::types::{EntryInfo, FsUsage};

/// Result delivered to a query's caller.
pub type StorageResult = Result<StorageOutput, StorageError>;

/// Actions that produce a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageQuery {
    /// Render a directory listing
    ListDir {
        /// Directory path ("" or "/" for the root)
        path: String,
    },
    /// Whole file contents
    DumpFile {
        /// File path
        path: String,
    },
    /// A byte range of a file
    ReadFile {
        /// File path
        path: String,
        /// Start offset in bytes
        offset: u32,
        /// Maximum bytes to return
        length: u32,
    },
    /// Entry metadata plus a "name: N bytes" line
    FileStat {
        /// Entry path
        path: String,
    },
    /// Existence check; a missing entry is a normal negative answer
    FileExists {
        /// Entry path
        path: String,
    },
    /// Block usage
    FsStat,
    /// Erase and remount the filesystem
    Format,
}

impl StorageQuery {
    /// Short action name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StorageQuery::ListDir { .. } => "lsdir",
            StorageQuery::DumpFile { .. } => "dumpfile",
            StorageQuery::ReadFile { .. } => "readfile",
            StorageQuery::FileStat { .. } => "filestat",
            StorageQuery::FileExists { .. } => "chkfile",
            StorageQuery::FsStat => "fsstat",
            StorageQuery::Format => "format",
        }
    }

    /// Target path, if the action has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            StorageQuery::ListDir { path }
            | StorageQuery::DumpFile { path }
            | StorageQuery::ReadFile { path, .. }
            | StorageQuery::FileStat { path }
            | StorageQuery::FileExists { path } => Some(path),
            StorageQuery::FsStat | StorageQuery::Format => None,
        }
    }
}

/// Actions that only change the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageMutation {
    /// Create a directory
    MakeDir {
        /// Directory path
        path: String,
    },
    /// Remove an empty directory
    RemoveDir {
        /// Directory path
        path: String,
    },
    /// Create an empty file; fails if it exists
    MakeFile {
        /// File path
        path: String,
    },
    /// Remove a file
    RemoveFile {
        /// File path
        path: String,
    },
    /// Create or overwrite a file
    WriteFile {
        /// File path
        path: String,
        /// New contents
        data: Vec<u8>,
    },
    /// Append to an existing file
    AppendFile {
        /// File path
        path: String,
        /// Bytes to append
        data: Vec<u8>,
    },
    /// Release the filesystem until the manager restarts
    Unmount,
}

impl StorageMutation {
    /// Short action name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StorageMutation::MakeDir { .. } => "mkdir",
            StorageMutation::RemoveDir { .. } => "rmdir",
            StorageMutation::MakeFile { .. } => "mkfile",
            StorageMutation::RemoveFile { .. } => "rmfile",
            StorageMutation::WriteFile { .. } => "writefile",
            StorageMutation::AppendFile { .. } => "appendfile",
            StorageMutation::Unmount => "unmount",
        }
    }

    /// Target path, if the action has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            StorageMutation::MakeDir { path }
            | StorageMutation::RemoveDir { path }
            | StorageMutation::MakeFile { path }
            | StorageMutation::RemoveFile { path }
            | StorageMutation::WriteFile { path, .. }
            | StorageMutation::AppendFile { path, .. } => Some(path),
            StorageMutation::Unmount => None,
        }
    }
}

/// Message on the Storage Manager's queue.
#[derive(Debug)]
pub enum StorageRequest {
    /// Query with the caller's reply slot
    Query {
        /// What to do
        query: StorageQuery,
        /// Where the result goes
        reply: Reply<StorageResult>,
    },
    /// Fire-and-forget mutation
    Mutate(StorageMutation),
}

impl StorageRequest {
    /// Short action name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StorageRequest::Query { query, .. } => query.name(),
            StorageRequest::Mutate(mutation) => mutation.name(),
        }
    }
}

/// Successful query output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageOutput {
    /// File bytes or rendered text
    pub data: Vec<u8>,
    /// Entry metadata (stat-like queries)
    pub info: Option<EntryInfo>,
    /// Block usage (fsstat)
    pub usage: Option<FsUsage>,
    /// Rendered text did not fit the output buffer and was cut
    pub truncated: bool,
}

impl StorageOutput {
    /// Output carrying text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: text.into().into_bytes(),
            ..Self::default()
        }
    }

    /// Output carrying raw bytes.
    pub fn bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Data as text (lossy for non-UTF-8 files).
    pub fn as_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// For `FileExists`: whether the entry was found.
    pub fn exists(&self) -> bool {
        self.info.is_some()
    }

    /// The data, refused if it was cut at the output capacity.
    ///
    /// # Returns
    /// * `Ok(data)` - Every requested byte fit the reply
    /// * `Err(StorageError::TooLarge)` - The reply holds only a prefix
    pub fn into_complete(self) -> Result<Vec<u8>, StorageError> {
        if self.truncated {
            return Err(StorageError::TooLarge);
        }
        Ok(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_and_paths() {
        let q = StorageQuery::ReadFile {
            path: "log.txt".into(),
            offset: 4,
            length: 8,
        };
        assert_eq!(q.name(), "readfile");
        assert_eq!(q.path(), Some("log.txt"));
        assert_eq!(StorageMutation::Unmount.path(), None);
        assert_eq!(StorageMutation::Unmount.name(), "unmount");
    }

    #[test]
    fn test_output_text() {
        let out = StorageOutput::text("formatting complete");
        assert_eq!(out.as_text(), "formatting complete");
        assert!(!out.exists());
    }
}
