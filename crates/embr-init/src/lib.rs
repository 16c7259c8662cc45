//! Service registry and task manager for embr
//!
//! - **Registry** ([`ServiceRegistry`]): the fixed, ordered table of
//!   [`ServiceDescriptor`]s built into the firmware. Table order is boot
//!   order; there is no dependency graph.
//! - **Task Manager** ([`TaskManager`]): the control-plane service. Boots
//!   every auto-start descriptor once, then drains a depth-1 queue of
//!   [`TaskControlRequest`]s (terminate/suspend/resume).
//! - **Control** ([`ControlPlane`]): by-name helpers used by the shell's
//!   `kill` and `service` commands. Starting a service never goes through
//!   the Task Manager; the caller runs the descriptor's entry itself.
//!
//! # Control flow
//!
//! ```text
//!  shell: kill storagemanager
//!        │ handle_by_name
//!        ▼
//!  ControlPlane ── TaskControlRequest{target, Terminate} ──► queue (depth 1)
//!                                                                │
//!                                          taskmanager (poll) ◄──┘
//!                                                │
//!                                                ▼
//!                                     Kernel::terminate(handle)
//! ```

mod control;
mod error;
mod registry;
mod taskman;

pub use control::{ControlPlane, ServiceStatus};
pub use error::{ControlError, RegistryError, StartError};
pub use registry::{BootReport, ServiceDescriptor, ServiceEntry, ServiceRegistry};
pub use taskman::{ControlAction, TaskControlRequest, TaskManager, TASK_MANAGER_NAME};
