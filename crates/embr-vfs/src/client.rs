//! Caller-side access to the Storage Manager.
//!
//! Wraps the request queue with the configured send wait and result
//! timeout. Queries block the calling task for at most the result timeout;
//! mutations return as soon as they are enqueued.

use std::time::Duration;

use embr_ipc::{reply_pair, PendingReply, QueueSender, RequestToken};
use log::debug;

use crate::core::error::StorageError;
use crate::core::types::{EntryInfo, FsUsage};
use crate::ipc::{StorageMutation, StorageOutput, StorageQuery, StorageRequest, StorageResult};

/// Handle used by services and the shell to reach the Storage Manager.
#[derive(Clone, Debug)]
pub struct StorageClient {
    tx: QueueSender<StorageRequest>,
    send_wait: Duration,
    result_timeout: Duration,
}

impl StorageClient {
    /// Create a client over the manager's request queue.
    pub fn new(tx: QueueSender<StorageRequest>, send_wait: Duration, result_timeout: Duration) -> Self {
        Self {
            tx,
            send_wait,
            result_timeout,
        }
    }

    /// Same client with a different result timeout.
    pub fn with_result_timeout(&self, result_timeout: Duration) -> Self {
        Self {
            result_timeout,
            ..self.clone()
        }
    }

    /// Same client with a different send wait.
    pub fn with_send_wait(&self, send_wait: Duration) -> Self {
        Self {
            send_wait,
            ..self.clone()
        }
    }

    /// Configured result timeout.
    pub fn result_timeout(&self) -> Duration {
        self.result_timeout
    }

    /// Enqueue a query and return its pending reply without waiting.
    pub fn submit(&self, query: StorageQuery) -> Result<PendingReply<StorageResult>, StorageError> {
        let token = RequestToken::next();
        debug!("storage client: {} {} queued", token, query.name());
        let (reply, pending) = reply_pair(token);
        self.tx
            .send(StorageRequest::Query { query, reply }, self.send_wait)?;
        Ok(pending)
    }

    /// Enqueue a query and wait for its result.
    ///
    /// # Returns
    /// * `Ok(output)` - The manager completed the query
    /// * `Err(StorageError::Bus(QueueFull))` - Another request is in flight
    /// * `Err(StorageError::Bus(TimedOut))` - No result within the timeout
    /// * `Err(other)` - The filesystem reported an error
    pub fn query(&self, query: StorageQuery) -> Result<StorageOutput, StorageError> {
        let pending = self.submit(query)?;
        pending.await_result(self.result_timeout)?
    }

    /// Enqueue a mutation. Errors during execution go to the system log.
    pub fn mutate(&self, mutation: StorageMutation) -> Result<(), StorageError> {
        debug!("storage client: {} queued", mutation.name());
        self.tx
            .send(StorageRequest::Mutate(mutation), self.send_wait)
            .map_err(StorageError::from)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Rendered listing of a directory.
    pub fn list_dir(&self, path: &str) -> Result<StorageOutput, StorageError> {
        self.query(StorageQuery::ListDir { path: path.into() })
    }

    /// Whole file contents. A file larger than the manager's output
    /// capacity fails with [`StorageError::TooLarge`].
    pub fn dump_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.query(StorageQuery::DumpFile { path: path.into() })?
            .into_complete()
    }

    /// Up to `length` bytes starting at `offset`. Fails with
    /// [`StorageError::TooLarge`] if the range does not fit one reply.
    pub fn read_file(&self, path: &str, offset: u32, length: u32) -> Result<Vec<u8>, StorageError> {
        let query = StorageQuery::ReadFile {
            path: path.into(),
            offset,
            length,
        };
        self.query(query)?.into_complete()
    }

    /// Entry metadata.
    pub fn file_stat(&self, path: &str) -> Result<EntryInfo, StorageError> {
        self.query(StorageQuery::FileStat { path: path.into() })?
            .info
            .ok_or(StorageError::NotFound)
    }

    /// Whether an entry exists.
    pub fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self
            .query(StorageQuery::FileExists { path: path.into() })?
            .exists())
    }

    /// Block usage.
    pub fn fs_stat(&self) -> Result<FsUsage, StorageError> {
        self.query(StorageQuery::FsStat)?
            .usage
            .ok_or(StorageError::InvalidArgument)
    }

    /// Erase and remount the filesystem.
    pub fn format(&self) -> Result<String, StorageError> {
        Ok(self.query(StorageQuery::Format)?.as_text().into_owned())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a directory.
    pub fn make_dir(&self, path: &str) -> Result<(), StorageError> {
        self.mutate(StorageMutation::MakeDir { path: path.into() })
    }

    /// Remove an empty directory.
    pub fn remove_dir(&self, path: &str) -> Result<(), StorageError> {
        self.mutate(StorageMutation::RemoveDir { path: path.into() })
    }

    /// Create an empty file.
    pub fn make_file(&self, path: &str) -> Result<(), StorageError> {
        self.mutate(StorageMutation::MakeFile { path: path.into() })
    }

    /// Remove a file.
    pub fn remove_file(&self, path: &str) -> Result<(), StorageError> {
        self.mutate(StorageMutation::RemoveFile { path: path.into() })
    }

    /// Create or overwrite a file.
    pub fn write_file(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<(), StorageError> {
        self.mutate(StorageMutation::WriteFile {
            path: path.into(),
            data: data.into(),
        })
    }

    /// Append to a file.
    pub fn append_file(&self, path: &str, data: impl Into<Vec<u8>>) -> Result<(), StorageError> {
        self.mutate(StorageMutation::AppendFile {
            path: path.into(),
            data: data.into(),
        })
    }

    /// Release the filesystem until the manager restarts.
    pub fn unmount(&self) -> Result<(), StorageError> {
        self.mutate(StorageMutation::Unmount)
    }
}
