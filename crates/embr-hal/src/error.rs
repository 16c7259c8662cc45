//! HAL error types.

use thiserror::Error;

/// Errors from kernel primitives that can fail.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HalError {
    /// Task name is empty or longer than the kernel allows
    #[error("task name '{name}' must be 1-{max} characters")]
    NameTooLong {
        /// Rejected name
        name: String,
        /// Kernel limit
        max: usize,
    },
    /// A live task already uses this name
    #[error("a task named '{0}' is already running")]
    DuplicateName(String),
    /// The kernel could not create the task
    #[error("failed to create task '{name}': {reason}")]
    SpawnFailed {
        /// Task name
        name: String,
        /// Platform-specific reason
        reason: String,
    },
    /// The device is already owned by another task
    #[error("device '{0}' is owned by another task")]
    DeviceBusy(&'static str),
}

impl HalError {
    /// Create a spawn failure error.
    pub fn spawn_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
