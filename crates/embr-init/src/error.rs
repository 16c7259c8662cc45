//! Registry and control-plane errors.

use embr_hal::HalError;
use thiserror::Error;

/// Why a service entry failed to start its task.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StartError {
    /// The kernel refused to create the task or a device is taken
    #[error(transparent)]
    Hal(#[from] HalError),
    /// A service this one needs is not available
    #[error("required service {0} is not available")]
    MissingDependency(&'static str),
}

/// Invalid registry tables.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two descriptors share a name
    #[error("service {0} is registered twice")]
    DuplicateName(&'static str),
    /// Name does not fit a task name
    #[error("service name {0} is longer than {max} characters", max = embr_hal::MAX_TASK_NAME)]
    NameTooLong(&'static str),
}

/// Failures of the by-name control helpers, phrased for the shell.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The control queue stayed full for the whole send wait
    #[error("task manager is busy, try again")]
    QueueFull,
    /// The task manager is gone
    #[error("task manager is not running")]
    Disconnected,
    /// `kill` on a name with no live task
    #[error("{0} is not a currently running task")]
    NotATask(String),
    /// `suspend`/`resume` on a name with no live task
    #[error("{0} is not a running service, try 'service list'")]
    NotRunning(String),
    /// `start` on a service that already has a task
    #[error("{0} is already running")]
    AlreadyRunning(String),
    /// `start` on a name missing from the registry
    #[error("{0} is not an available service, try 'service list'")]
    UnknownService(String),
    /// The service entry failed
    #[error("could not start {name}: {source}")]
    Start {
        /// Service name
        name: String,
        /// Underlying failure
        #[source]
        source: StartError,
    },
}

impl From<embr_ipc::BusError> for ControlError {
    fn from(err: embr_ipc::BusError) -> Self {
        match err {
            embr_ipc::BusError::Disconnected => ControlError::Disconnected,
            _ => ControlError::QueueFull,
        }
    }
}
