//! By-name service control for the shell.

use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

use embr_hal::{Kernel, TaskState};
use embr_ipc::QueueSender;

use crate::{ControlAction, ControlError, ServiceRegistry, TaskControlRequest};

/// State of a registered service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Task exists and is scheduled
    Running,
    /// Task exists and is parked
    Suspended,
    /// No task with this name
    NotStarted,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Suspended => "suspended",
            ServiceStatus::NotStarted => "not started",
        })
    }
}

/// Caller-side access to the task manager.
pub struct ControlPlane<K: Kernel> {
    kernel: K,
    tx: QueueSender<TaskControlRequest<K::TaskHandle>>,
    send_wait: Duration,
}

impl<K: Kernel + Clone> Clone for ControlPlane<K> {
    fn clone(&self) -> Self {
        Self {
            kernel: self.kernel.clone(),
            tx: self.tx.clone(),
            send_wait: self.send_wait,
        }
    }
}

impl<K: Kernel> ControlPlane<K> {
    /// Create a control plane over the task manager's queue.
    pub fn new(
        kernel: K,
        tx: QueueSender<TaskControlRequest<K::TaskHandle>>,
        send_wait: Duration,
    ) -> Self {
        Self {
            kernel,
            tx,
            send_wait,
        }
    }

    /// Enqueue a raw request. Only fails if the queue stays full.
    pub fn request(
        &self,
        target: Option<K::TaskHandle>,
        action: ControlAction,
    ) -> Result<(), ControlError> {
        self.tx
            .send(TaskControlRequest::new(target, action), self.send_wait)?;
        Ok(())
    }

    /// `kill <name>`: terminate a running task.
    pub fn kill(&self, name: &str) -> Result<(), ControlError> {
        let handle = self
            .kernel
            .handle_by_name(name)
            .ok_or_else(|| ControlError::NotATask(name.to_string()))?;
        self.request(Some(handle), ControlAction::Terminate)
    }

    /// `service suspend <name>`.
    pub fn suspend(&self, name: &str) -> Result<String, ControlError> {
        let handle = self
            .kernel
            .handle_by_name(name)
            .ok_or_else(|| ControlError::NotRunning(name.to_string()))?;
        self.request(Some(handle), ControlAction::Suspend)?;
        Ok(format!("{} service suspended", name))
    }

    /// `service resume <name>`.
    pub fn resume(&self, name: &str) -> Result<String, ControlError> {
        let handle = self
            .kernel
            .handle_by_name(name)
            .ok_or_else(|| ControlError::NotRunning(name.to_string()))?;
        self.request(Some(handle), ControlAction::Resume)?;
        Ok(format!("{} service resumed", name))
    }

    /// `service start <name>`: run the descriptor's entry directly.
    pub fn start<E>(
        &self,
        registry: &ServiceRegistry<E>,
        env: &E,
        name: &str,
    ) -> Result<(), ControlError> {
        if self.kernel.handle_by_name(name).is_some() {
            return Err(ControlError::AlreadyRunning(name.to_string()));
        }
        let descriptor = registry
            .find(name)
            .ok_or_else(|| ControlError::UnknownService(name.to_string()))?;
        descriptor.start(env).map_err(|source| ControlError::Start {
            name: name.to_string(),
            source,
        })
    }

    /// Status of one service name.
    pub fn status(&self, name: &str) -> ServiceStatus {
        let state = self
            .kernel
            .handle_by_name(name)
            .and_then(|handle| self.kernel.task_state(&handle));
        match state {
            Some(TaskState::Running) => ServiceStatus::Running,
            Some(TaskState::Suspended) => ServiceStatus::Suspended,
            None => ServiceStatus::NotStarted,
        }
    }

    /// Status of every registered service, in table order.
    pub fn statuses<E>(&self, registry: &ServiceRegistry<E>) -> Vec<(&'static str, ServiceStatus)> {
        registry
            .iter()
            .map(|service| (service.name, self.status(service.name)))
            .collect()
    }

    /// `service list` table.
    pub fn list<E>(&self, registry: &ServiceRegistry<E>) -> String {
        let mut out = String::from("Available Services\tStatus\r\n");
        out.push_str("------------------------------------\r\n");
        for (name, status) in self.statuses(registry) {
            // Short names get an extra tab so the status column lines up.
            let pad = if name.len() < 8 { "\t" } else { "" };
            let _ = write!(out, "{}{}\t\t{}\r\n", name, pad, status);
        }
        out
    }
}
