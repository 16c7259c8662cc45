//! Task Manager control-plane service.

use std::fmt;

use embr_hal::{ControlOutcome, Kernel, TaskContext, TaskParams};
use embr_ipc::{QueueReceiver, SysLog};
use log::debug;

use crate::ServiceRegistry;

/// Task name of the task manager.
pub const TASK_MANAGER_NAME: &str = "taskmanager";

/// Lifecycle action applied to another task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    /// Delete the task
    Terminate,
    /// Park the task
    Suspend,
    /// Unpark the task
    Resume,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlAction::Terminate => "terminate",
            ControlAction::Suspend => "suspend",
            ControlAction::Resume => "resume",
        })
    }
}

/// Message on the task manager's queue. Consumed exactly once, no reply.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskControlRequest<H> {
    /// Target task; `None` when the caller's lookup found nothing
    pub target: Option<H>,
    /// What to do to it
    pub action: ControlAction,
}

impl<H> TaskControlRequest<H> {
    /// Build a request.
    pub fn new(target: Option<H>, action: ControlAction) -> Self {
        Self { target, action }
    }
}

/// The control-plane service.
///
/// Never produces an error: a request whose target does not resolve to a
/// live task is absorbed and reported internally as
/// [`ControlOutcome::TargetNotFound`].
pub struct TaskManager<K: Kernel> {
    kernel: K,
    requests: QueueReceiver<TaskControlRequest<K::TaskHandle>>,
    syslog: SysLog,
}

impl<K: Kernel> TaskManager<K> {
    /// Create the service over its request queue.
    pub fn new(
        kernel: K,
        requests: QueueReceiver<TaskControlRequest<K::TaskHandle>>,
        syslog: SysLog,
    ) -> Self {
        Self {
            kernel,
            requests,
            syslog,
        }
    }

    /// Apply one request to the kernel.
    pub fn apply(&self, request: TaskControlRequest<K::TaskHandle>) -> ControlOutcome {
        let Some(target) = request.target else {
            debug!("{}: {} with no target ignored", TASK_MANAGER_NAME, request.action);
            return ControlOutcome::TargetNotFound;
        };
        let outcome = match request.action {
            ControlAction::Terminate => self.kernel.terminate(&target),
            ControlAction::Suspend => self.kernel.suspend(&target),
            ControlAction::Resume => self.kernel.resume(&target),
        };
        debug!(
            "{}: {} {:?} -> {:?}",
            TASK_MANAGER_NAME, request.action, target, outcome
        );
        outcome
    }

    /// Handle at most one waiting request. `None` if the queue was empty.
    pub fn poll_once(&self) -> Option<ControlOutcome> {
        self.requests.try_receive().map(|request| self.apply(request))
    }

    /// Task body: boot the registry, then serve control requests until
    /// terminated.
    pub fn run<E>(
        &self,
        ctx: &mut K::Context,
        params: &TaskParams,
        registry: &ServiceRegistry<E>,
        env: &E,
    ) {
        self.syslog.info(TASK_MANAGER_NAME, "starting all bootup services...");
        let report = registry.boot(env);
        for (name, err) in &report.failed {
            self.syslog
                .error(TASK_MANAGER_NAME, format!("error starting {}: {}", name, err));
        }
        self.syslog
            .info(TASK_MANAGER_NAME, "all startup services launched");

        loop {
            self.poll_once();
            if ctx.sched(params).is_exit() {
                break;
            }
        }
    }
}
