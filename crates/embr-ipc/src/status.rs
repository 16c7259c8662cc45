//! Single-writer status cells.
//!
//! Status owned by one task (link state, mount state) is published through
//! a [`StatusWriter`] that cannot be cloned. Any number of readers take
//! copy-out snapshots, so nobody ever holds a reference into state that
//! the owner is rewriting.

use std::sync::PoisonError;

use crate::sync::{Arc, RwLock};

/// Create a status cell holding `initial`.
pub fn status_channel<T: Copy>(initial: T) -> (StatusWriter<T>, StatusReader<T>) {
    let cell = Arc::new(RwLock::new(initial));
    (
        StatusWriter {
            cell: Arc::clone(&cell),
        },
        StatusReader { cell },
    )
}

/// The only handle allowed to change the status.
#[derive(Debug)]
pub struct StatusWriter<T> {
    cell: Arc<RwLock<T>>,
}

impl<T: Copy> StatusWriter<T> {
    /// Replace the status.
    pub fn set(&self, value: T) {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Modify the status in place under the write lock.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut guard = self.cell.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    /// Current value as seen by the writer.
    pub fn get(&self) -> T {
        *self.cell.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// A new reader for this cell.
    pub fn reader(&self) -> StatusReader<T> {
        StatusReader {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// Read-only snapshot access.
#[derive(Debug)]
pub struct StatusReader<T> {
    cell: Arc<RwLock<T>>,
}

impl<T> Clone for StatusReader<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Copy> StatusReader<T> {
    /// Copy of the current status.
    pub fn snapshot(&self) -> T {
        *self.cell.read().unwrap_or_else(PoisonError::into_inner)
    }
}
