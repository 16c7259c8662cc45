//! Service descriptor table.

use std::fmt;

use embr_hal::MAX_TASK_NAME;
use log::{info, warn};

use crate::{RegistryError, StartError};

/// Entry point of a service: creates and starts its task.
///
/// `E` is the environment the service is started in (kernel, buses,
/// devices). Entries must not block.
pub type ServiceEntry<E> = fn(&E) -> Result<(), StartError>;

/// Build-time description of a service.
pub struct ServiceDescriptor<E> {
    /// Unique name, also the task name
    pub name: &'static str,
    /// Starts the service's task
    pub entry: ServiceEntry<E>,
    /// Started by the task manager at boot
    pub auto_start: bool,
}

impl<E> ServiceDescriptor<E> {
    /// Describe a service.
    pub const fn new(name: &'static str, entry: ServiceEntry<E>, auto_start: bool) -> Self {
        Self {
            name,
            entry,
            auto_start,
        }
    }

    /// Run the entry point.
    pub fn start(&self, env: &E) -> Result<(), StartError> {
        (self.entry)(env)
    }
}

impl<E> Clone for ServiceDescriptor<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ServiceDescriptor<E> {}

impl<E> fmt::Debug for ServiceDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("auto_start", &self.auto_start)
            .finish()
    }
}

/// Outcome of the boot pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootReport {
    /// Auto-start services whose entry succeeded, in start order
    pub started: Vec<&'static str>,
    /// Services left for manual start
    pub skipped: Vec<&'static str>,
    /// Auto-start services whose entry failed
    pub failed: Vec<(&'static str, StartError)>,
}

impl BootReport {
    /// True if every auto-start service came up.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered, immutable table of services.
pub struct ServiceRegistry<E> {
    services: Vec<ServiceDescriptor<E>>,
}

impl<E> ServiceRegistry<E> {
    /// Build a registry, rejecting duplicate or over-long names.
    pub fn new(services: Vec<ServiceDescriptor<E>>) -> Result<Self, RegistryError> {
        for (i, service) in services.iter().enumerate() {
            if service.name.is_empty() || service.name.len() > MAX_TASK_NAME {
                return Err(RegistryError::NameTooLong(service.name));
            }
            if services[..i].iter().any(|s| s.name == service.name) {
                return Err(RegistryError::DuplicateName(service.name));
            }
        }
        Ok(Self { services })
    }

    /// Look up a descriptor by name.
    pub fn find(&self, name: &str) -> Option<&ServiceDescriptor<E>> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Descriptors in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor<E>> {
        self.services.iter()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Start every auto-start service once, in table order.
    ///
    /// A failing entry is logged and recorded; the pass continues.
    pub fn boot(&self, env: &E) -> BootReport {
        let mut report = BootReport::default();
        for service in &self.services {
            if !service.auto_start {
                report.skipped.push(service.name);
                continue;
            }
            match service.start(env) {
                Ok(()) => {
                    info!("taskmanager: started {}", service.name);
                    report.started.push(service.name);
                }
                Err(e) => {
                    warn!("taskmanager: failed to start {}: {}", service.name, e);
                    report.failed.push((service.name, e));
                }
            }
        }
        report
    }
}

impl<E> fmt::Debug for ServiceRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.services.iter()).finish()
    }
}
