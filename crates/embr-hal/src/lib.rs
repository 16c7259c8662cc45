//! Kernel abstraction layer for embr
//!
//! Services never talk to the real-time kernel directly. They are written
//! against the [`Kernel`] trait (task lifecycle primitives) and the
//! [`TaskContext`] handed to every task body (delays and scheduling points).
//!
//! # Platform Implementations
//!
//! - **Firmware**: thin wrapper over the RTOS task API (task create/delete,
//!   suspend/resume, name lookup, tick count)
//! - **Hosted**: [`hosted::HostedKernel`], one std thread per task, used by
//!   the simulator and by tests
//!
//! # Scheduling model
//!
//! ```text
//!   create_task(name, params, body)
//!          │
//!          ▼
//!   ┌──────────────┐   delay()/sched_update()   ┌─────────────┐
//!   │  task body   │ ─────────────────────────► │   kernel    │
//!   │ (loop + poll)│ ◄───────────────────────── │ (suspend /  │
//!   └──────────────┘   Schedule::Continue|Exit  │  terminate) │
//!                                               └─────────────┘
//! ```
//!
//! Every service loop must pass through a scheduling point on every
//! iteration, including iterations where no work was found.

mod device;
mod error;
pub mod hosted;
mod time;

pub use device::{DeviceGuard, DeviceSlot};
pub use error::HalError;
pub use time::{TickRate, Ticks};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a task name, matching the RTOS name field.
pub const MAX_TASK_NAME: usize = 15;

/// Boxed task entry point. Receives the task's own context.
pub type TaskBody<C> = Box<dyn FnOnce(C) + Send + 'static>;

// =============================================================================
// Task parameters and states
// =============================================================================

/// Static scheduling parameters of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParams {
    /// Kernel priority (higher runs first on the firmware kernel)
    pub priority: u8,
    /// Delay on every `repeat`-th tick in [`TaskContext::sched_update`]
    pub repeat: u32,
    /// Ticks to delay at each scheduling point
    pub delay: Ticks,
    /// Stack depth in words (firmware only, recorded on hosted)
    pub stack_words: u32,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            priority: 1,
            repeat: 1,
            delay: 100,
            stack_words: 512,
        }
    }
}

/// Lifecycle state of a live task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Scheduled normally
    Running,
    /// Parked until resumed
    Suspended,
}

impl TaskState {
    /// Lowercase label used in status tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Running => "running",
            TaskState::Suspended => "suspended",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a control primitive applied to a handle.
///
/// The kernel primitives themselves never fail loudly: a handle that no
/// longer resolves to a live task is a no-op reported as `TargetNotFound`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The action was applied to a live task
    Accepted,
    /// The handle did not resolve to a live task, nothing happened
    TargetNotFound,
}

/// What a task body should do after a scheduling point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Keep looping
    Continue,
    /// The task was terminated, return from the body
    Exit,
}

impl Schedule {
    /// True if the task should leave its loop.
    pub fn is_exit(self) -> bool {
        matches!(self, Schedule::Exit)
    }
}

// =============================================================================
// Kernel trait
// =============================================================================

/// Kernel task primitives consumed by the service layer.
///
/// # Associated Types
///
/// - `TaskHandle`: opaque reference to a created task. A handle may outlive
///   its task; every primitive must accept stale handles.
/// - `Context`: per-task scheduling context passed to the task body.
pub trait Kernel: Send + Sync + 'static {
    /// Handle to a created task
    type TaskHandle: Clone + Send + Sync + fmt::Debug + PartialEq + 'static;

    /// Scheduling context handed to a task body
    type Context: TaskContext;

    /// Create and start a task.
    ///
    /// # Returns
    /// * `Ok(handle)` - Task created and runnable
    /// * `Err(HalError::NameTooLong)` - Name exceeds [`MAX_TASK_NAME`]
    /// * `Err(HalError::DuplicateName)` - A live task already has this name
    /// * `Err(HalError::SpawnFailed)` - The kernel could not allocate the task
    fn create_task(
        &self,
        name: &str,
        params: TaskParams,
        body: TaskBody<Self::Context>,
    ) -> Result<Self::TaskHandle, HalError>;

    /// Delete a task. Takes effect at the task's next scheduling point.
    fn terminate(&self, handle: &Self::TaskHandle) -> ControlOutcome;

    /// Park a task at its next scheduling point.
    fn suspend(&self, handle: &Self::TaskHandle) -> ControlOutcome;

    /// Unpark a suspended task.
    fn resume(&self, handle: &Self::TaskHandle) -> ControlOutcome;

    /// Look up a live task by name.
    fn handle_by_name(&self, name: &str) -> Option<Self::TaskHandle>;

    /// State of a live task, `None` once it has been deleted or returned.
    fn task_state(&self, handle: &Self::TaskHandle) -> Option<TaskState>;

    /// Ticks since the kernel started.
    fn tick_count(&self) -> Ticks;

    /// Tick frequency.
    fn tick_rate(&self) -> TickRate;
}

/// Per-task view of the scheduler.
pub trait TaskContext: Send + 'static {
    /// Name the task was created with.
    fn name(&self) -> &str;

    /// Ticks since the kernel started.
    fn tick_count(&self) -> Ticks;

    /// Block for `ticks` (0 yields). Suspension and termination requests
    /// are applied here.
    fn delay(&mut self, ticks: Ticks) -> Schedule;

    /// End-of-pass scheduling point for service loops.
    ///
    /// Delays for `delay` ticks when the tick count is a multiple of
    /// `repeat`, otherwise yields. Either way the task passes through a
    /// scheduling point.
    fn sched_update(&mut self, repeat: u32, delay: Ticks) -> Schedule {
        let repeat = Ticks::from(repeat.max(1));
        if self.tick_count() % repeat == 0 {
            self.delay(delay)
        } else {
            self.delay(0)
        }
    }

    /// Scheduling point using the task's static parameters.
    fn sched(&mut self, params: &TaskParams) -> Schedule {
        self.sched_update(params.repeat, params.delay)
    }
}

/// Validate a task name against the kernel's limit.
pub fn validate_task_name(name: &str) -> Result<(), HalError> {
    if name.is_empty() || name.len() > MAX_TASK_NAME {
        return Err(HalError::NameTooLong {
            name: name.to_string(),
            max: MAX_TASK_NAME,
        });
    }
    Ok(())
}
