//! Hosted kernel: one std thread per task.
//!
//! Used by the simulator and by every test that needs real concurrency.
//! Priorities and stack sizes are recorded but not enforced; the host
//! scheduler decides who runs. Suspension and termination are applied at
//! the task's next scheduling point ([`TaskContext::delay`]), which every
//! service loop reaches at least once per pass.
//!
//! A terminated task leaves the task table immediately, so lookups by name
//! or handle stop resolving it before its thread has actually unwound.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::{
    validate_task_name, ControlOutcome, HalError, Kernel, Schedule, TaskBody, TaskContext,
    TaskParams, TaskState, TickRate, Ticks,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pending control request for a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Control {
    Run,
    Suspend,
    Terminate,
}

struct TaskCell {
    id: u32,
    name: String,
    params: TaskParams,
    control: Mutex<Control>,
    wake: Condvar,
    exited: Mutex<bool>,
    exit_signal: Condvar,
}

impl TaskCell {
    fn set_control(&self, next: Control) {
        let mut control = lock(&self.control);
        if *control != Control::Terminate {
            *control = next;
        }
        self.wake.notify_all();
    }
}

struct Shared {
    epoch: Instant,
    rate: TickRate,
    tasks: Mutex<HashMap<u32, Arc<TaskCell>>>,
    next_id: AtomicU32,
}

impl Shared {
    fn live(&self, id: u32) -> Option<Arc<TaskCell>> {
        lock(&self.tasks).get(&id).cloned()
    }

    fn ticks(&self) -> Ticks {
        self.rate.ticks_from_duration(self.epoch.elapsed())
    }
}

/// Kernel backed by host threads.
#[derive(Clone)]
pub struct HostedKernel {
    shared: Arc<Shared>,
}

impl HostedKernel {
    /// Create a kernel ticking at `rate`.
    pub fn new(rate: TickRate) -> Self {
        Self {
            shared: Arc::new(Shared {
                epoch: Instant::now(),
                rate,
                tasks: Mutex::new(HashMap::new()),
                next_id: AtomicU32::new(1),
            }),
        }
    }

    /// Wait until the task's body has returned (or unwound).
    ///
    /// Returns false if it is still running after `timeout`.
    pub fn wait_for_exit(&self, handle: &HostedTaskHandle, timeout: Duration) -> bool {
        let exited = lock(&handle.cell.exited);
        let (exited, _) = handle
            .cell
            .exit_signal
            .wait_timeout_while(exited, timeout, |done| !*done)
            .unwrap_or_else(PoisonError::into_inner);
        *exited
    }

    /// Snapshot of live tasks in creation order.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        let tasks = lock(&self.shared.tasks);
        let mut infos: Vec<TaskInfo> = tasks
            .values()
            .map(|cell| TaskInfo {
                id: cell.id,
                name: cell.name.clone(),
                params: cell.params,
                state: match *lock(&cell.control) {
                    Control::Suspend => TaskState::Suspended,
                    _ => TaskState::Running,
                },
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}

impl Default for HostedKernel {
    fn default() -> Self {
        Self::new(TickRate::MILLIS)
    }
}

/// Row of the hosted task table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInfo {
    /// Kernel-assigned id
    pub id: u32,
    /// Task name
    pub name: String,
    /// Parameters the task was created with
    pub params: TaskParams,
    /// Current state
    pub state: TaskState,
}

/// Handle to a hosted task.
#[derive(Clone)]
pub struct HostedTaskHandle {
    cell: Arc<TaskCell>,
}

impl HostedTaskHandle {
    /// Kernel-assigned id.
    pub fn id(&self) -> u32 {
        self.cell.id
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.cell.name
    }
}

impl PartialEq for HostedTaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.cell.id == other.cell.id
    }
}

impl fmt::Debug for HostedTaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedTaskHandle")
            .field("id", &self.cell.id)
            .field("name", &self.cell.name)
            .finish()
    }
}

/// Scheduling context of a hosted task.
pub struct HostedContext {
    cell: Arc<TaskCell>,
    shared: Arc<Shared>,
}

impl TaskContext for HostedContext {
    fn name(&self) -> &str {
        &self.cell.name
    }

    fn tick_count(&self) -> Ticks {
        self.shared.ticks()
    }

    fn delay(&mut self, ticks: Ticks) -> Schedule {
        if ticks == 0 {
            thread::yield_now();
        }
        let deadline = Instant::now() + self.shared.rate.duration(ticks);
        let mut control = lock(&self.cell.control);
        loop {
            match *control {
                Control::Terminate => return Schedule::Exit,
                Control::Suspend => {
                    control = self
                        .cell
                        .wake
                        .wait(control)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Control::Run => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Schedule::Continue;
                    }
                    control = self
                        .cell
                        .wake
                        .wait_timeout(control, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}

/// Removes the task from the table and flags exit when the body ends.
struct ExitGuard {
    cell: Arc<TaskCell>,
    shared: Arc<Shared>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("{}: task panicked", self.cell.name);
        }
        lock(&self.shared.tasks).remove(&self.cell.id);
        *lock(&self.cell.exited) = true;
        self.cell.exit_signal.notify_all();
        debug!("{}: task exited", self.cell.name);
    }
}

impl Kernel for HostedKernel {
    type TaskHandle = HostedTaskHandle;
    type Context = HostedContext;

    fn create_task(
        &self,
        name: &str,
        params: TaskParams,
        body: TaskBody<HostedContext>,
    ) -> Result<HostedTaskHandle, HalError> {
        validate_task_name(name)?;

        let cell = {
            let mut tasks = lock(&self.shared.tasks);
            if tasks.values().any(|cell| cell.name == name) {
                return Err(HalError::DuplicateName(name.to_string()));
            }
            let cell = Arc::new(TaskCell {
                id: self.shared.next_id.fetch_add(1, Ordering::Relaxed),
                name: name.to_string(),
                params,
                control: Mutex::new(Control::Run),
                wake: Condvar::new(),
                exited: Mutex::new(false),
                exit_signal: Condvar::new(),
            });
            tasks.insert(cell.id, Arc::clone(&cell));
            cell
        };

        let ctx = HostedContext {
            cell: Arc::clone(&cell),
            shared: Arc::clone(&self.shared),
        };
        let guard = ExitGuard {
            cell: Arc::clone(&cell),
            shared: Arc::clone(&self.shared),
        };
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _guard = guard;
                body(ctx);
            });

        match spawned {
            Ok(_) => {
                debug!("{}: task created (id {})", name, cell.id);
                Ok(HostedTaskHandle { cell })
            }
            Err(e) => {
                lock(&self.shared.tasks).remove(&cell.id);
                Err(HalError::spawn_failed(name, e.to_string()))
            }
        }
    }

    fn terminate(&self, handle: &HostedTaskHandle) -> ControlOutcome {
        match lock(&self.shared.tasks).remove(&handle.cell.id) {
            Some(cell) => {
                cell.set_control(Control::Terminate);
                ControlOutcome::Accepted
            }
            None => ControlOutcome::TargetNotFound,
        }
    }

    fn suspend(&self, handle: &HostedTaskHandle) -> ControlOutcome {
        match self.shared.live(handle.cell.id) {
            Some(cell) => {
                cell.set_control(Control::Suspend);
                ControlOutcome::Accepted
            }
            None => ControlOutcome::TargetNotFound,
        }
    }

    fn resume(&self, handle: &HostedTaskHandle) -> ControlOutcome {
        match self.shared.live(handle.cell.id) {
            Some(cell) => {
                cell.set_control(Control::Run);
                ControlOutcome::Accepted
            }
            None => ControlOutcome::TargetNotFound,
        }
    }

    fn handle_by_name(&self, name: &str) -> Option<HostedTaskHandle> {
        lock(&self.shared.tasks)
            .values()
            .find(|cell| cell.name == name)
            .map(|cell| HostedTaskHandle {
                cell: Arc::clone(cell),
            })
    }

    fn task_state(&self, handle: &HostedTaskHandle) -> Option<TaskState> {
        let cell = self.shared.live(handle.cell.id)?;
        let state = match *lock(&cell.control) {
            Control::Run => TaskState::Running,
            Control::Suspend => TaskState::Suspended,
            Control::Terminate => return None,
        };
        Some(state)
    }

    fn tick_count(&self) -> Ticks {
        self.shared.ticks()
    }

    fn tick_rate(&self) -> TickRate {
        self.shared.rate
    }
}
