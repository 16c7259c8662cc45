//! System wiring.
//!
//! Builds every queue, status cell and device slot, owns the service
//! table, and hands callers (the shell, tests, the simulator) one cloneable
//! [`System`] handle.
//!
//! ```text
//!                       System::boot()
//!                             │
//!                             ▼
//!                     ┌───────────────┐   registry.boot (table order)
//!                     │  taskmanager  │ ──────────────────────────────┐
//!                     └───────┬───────┘                               │
//!              control queue  │                                       ▼
//!   kill/suspend/resume ─────►│            storagemanager ◄── storage queue ◄── StorageClient
//!                                          networkmanager ◄── network queue ◄── join/leave
//!                                          heartbeat (manual)
//! ```

use std::fmt;
use std::sync::Arc;

use embr_hal::{DeviceSlot, Kernel};
use embr_init::{
    ControlError, ControlPlane, RegistryError, ServiceDescriptor, ServiceRegistry, ServiceStatus,
    StartError, TaskManager, TASK_MANAGER_NAME,
};
use embr_ipc::{queue, status_channel, BusError, QueueSender, StatusReader, SysLog};
use embr_network::{LinkUpHook, NetworkAction, NetworkStatus, Radio};
use embr_vfs::{FlashFs, StorageClient};
use thiserror::Error;

use crate::config::SystemConfig;
use crate::services::{
    Heartbeat, MountState, NetworkManager, NetworkParts, StorageManager, StorageParts,
    FLASH_DEVICE, HEARTBEAT_NAME, NETWORK_MANAGER_NAME, RADIO_DEVICE, STORAGE_MANAGER_NAME,
};

/// Depth of every service queue.
pub const SERVICE_QUEUE_DEPTH: usize = 1;

/// Errors building a [`System`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SystemError {
    /// The service table is invalid
    #[error("invalid service table: {0}")]
    Registry(#[from] RegistryError),
}

// =============================================================================
// Platform
// =============================================================================

/// The concrete kernel and drivers a system runs on.
pub trait Platform: Send + Sync + 'static {
    /// Task primitives
    type Kernel: Kernel + Clone;
    /// Flash engine
    type Fs: FlashFs;
    /// Radio driver
    type Radio: Radio;
}

/// Task handle type of a platform.
pub type TaskHandle<P> = <<P as Platform>::Kernel as Kernel>::TaskHandle;

type TaskBodyContext<P> = <<P as Platform>::Kernel as Kernel>::Context;

/// Devices handed to [`System::new`].
pub struct Devices<P: Platform> {
    /// Kernel
    pub kernel: P::Kernel,
    /// Flash engine, moved into the Storage Manager's slot
    pub fs: P::Fs,
    /// Radio, moved into the Network Manager's slot
    pub radio: P::Radio,
    /// Link services started after a successful join
    pub hooks: Vec<Box<dyn LinkUpHook>>,
}

// =============================================================================
// System
// =============================================================================

struct Inner<P: Platform> {
    config: SystemConfig,
    kernel: P::Kernel,
    syslog: SysLog,
    storage: StorageClient,
    network_tx: QueueSender<NetworkAction>,
    mount_state: StatusReader<MountState>,
    network_status: StatusReader<NetworkStatus>,
    control: ControlPlane<P::Kernel>,
    registry: ServiceRegistry<System<P>>,
    storage_slot: Arc<DeviceSlot<StorageParts<P::Fs>>>,
    network_slot: Arc<DeviceSlot<NetworkParts<P::Radio>>>,
    task_manager: Arc<DeviceSlot<TaskManager<P::Kernel>>>,
}

/// Handle to a wired system. Cheap to clone.
pub struct System<P: Platform> {
    inner: Arc<Inner<P>>,
}

impl<P: Platform> Clone for System<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Platform> fmt::Debug for System<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("mount_state", &self.mount_state())
            .field("network", &self.network_status())
            .field("services", &self.inner.registry)
            .finish()
    }
}

impl<P: Platform> System<P> {
    /// Wire a system with the default service table.
    pub fn new(config: SystemConfig, devices: Devices<P>) -> Result<Self, SystemError> {
        Self::with_services(config, devices, default_services())
    }

    /// Wire a system with a custom service table.
    pub fn with_services(
        config: SystemConfig,
        devices: Devices<P>,
        services: Vec<ServiceDescriptor<System<P>>>,
    ) -> Result<Self, SystemError> {
        let registry = ServiceRegistry::new(services)?;
        let kernel = devices.kernel;
        let clock = kernel.clone();
        let syslog = SysLog::new(config.log_depth, move || clock.tick_count());
        let send_wait = config.send_wait();

        let (storage_tx, storage_rx) = queue(SERVICE_QUEUE_DEPTH);
        let (mount_writer, mount_state) = status_channel(MountState::Unmounted);
        let storage = StorageClient::new(storage_tx, send_wait, config.storage_result_timeout());
        let storage_slot = DeviceSlot::new(
            FLASH_DEVICE,
            StorageParts {
                fs: devices.fs,
                requests: storage_rx,
                state: mount_writer,
            },
        );

        let (network_tx, network_rx) = queue(SERVICE_QUEUE_DEPTH);
        let (status_writer, network_status) = status_channel(NetworkStatus::down());
        let network_slot = DeviceSlot::new(
            RADIO_DEVICE,
            NetworkParts {
                radio: devices.radio,
                actions: network_rx,
                status: status_writer,
                hooks: devices.hooks,
            },
        );

        let (control_tx, control_rx) = queue(SERVICE_QUEUE_DEPTH);
        let control = ControlPlane::new(kernel.clone(), control_tx, send_wait);
        let task_manager = DeviceSlot::new(
            TASK_MANAGER_NAME,
            TaskManager::new(kernel.clone(), control_rx, syslog.clone()),
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                kernel,
                syslog,
                storage,
                network_tx,
                mount_state,
                network_status,
                control,
                registry,
                storage_slot,
                network_slot,
                task_manager,
            }),
        })
    }

    /// Start the task manager, which boots every auto-start service.
    pub fn boot(&self) -> Result<TaskHandle<P>, StartError> {
        let manager = self.inner.task_manager.claim()?;
        let params = self.inner.config.task_manager;
        let system = self.clone();
        let handle = self.inner.kernel.create_task(
            TASK_MANAGER_NAME,
            params,
            Box::new(move |mut ctx: TaskBodyContext<P>| {
                manager.run(&mut ctx, &params, &system.inner.registry, &system);
            }),
        )?;
        Ok(handle)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Configuration the system was wired with.
    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    /// Kernel the services run on.
    pub fn kernel(&self) -> &P::Kernel {
        &self.inner.kernel
    }

    /// The system log channel.
    pub fn syslog(&self) -> &SysLog {
        &self.inner.syslog
    }

    /// Client for the Storage Manager.
    pub fn storage(&self) -> &StorageClient {
        &self.inner.storage
    }

    /// Task manager control plane.
    pub fn control(&self) -> &ControlPlane<P::Kernel> {
        &self.inner.control
    }

    /// The service table.
    pub fn registry(&self) -> &ServiceRegistry<System<P>> {
        &self.inner.registry
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Latest Storage Manager state.
    pub fn mount_state(&self) -> MountState {
        self.inner.mount_state.snapshot()
    }

    /// Storage status line for the shell.
    pub fn storage_status(&self) -> String {
        crate::services::render_storage_status(&self.inner.mount_state)
    }

    /// Latest network status snapshot.
    pub fn network_status(&self) -> NetworkStatus {
        self.inner.network_status.snapshot()
    }

    /// Network status line for the shell.
    pub fn network_status_text(&self) -> String {
        crate::services::render_network_status(&self.inner.network_status)
    }

    // =========================================================================
    // Network actions
    // =========================================================================

    /// Ask the Network Manager to join. The outcome shows up in
    /// [`network_status`](Self::network_status).
    pub fn join(&self) -> Result<(), BusError> {
        self.network_action(NetworkAction::Join)
    }

    /// Ask the Network Manager to leave.
    pub fn leave(&self) -> Result<(), BusError> {
        self.network_action(NetworkAction::Leave)
    }

    fn network_action(&self, action: NetworkAction) -> Result<(), BusError> {
        self.inner
            .network_tx
            .send(action, self.inner.config.send_wait())
    }

    // =========================================================================
    // Service control
    // =========================================================================

    /// `service start <name>`.
    pub fn start_service(&self, name: &str) -> Result<(), ControlError> {
        self.inner.control.start(&self.inner.registry, self, name)
    }

    /// `kill <name>`.
    pub fn kill(&self, name: &str) -> Result<(), ControlError> {
        self.inner.control.kill(name)
    }

    /// `service suspend <name>`.
    pub fn suspend(&self, name: &str) -> Result<String, ControlError> {
        self.inner.control.suspend(name)
    }

    /// `service resume <name>`.
    pub fn resume(&self, name: &str) -> Result<String, ControlError> {
        self.inner.control.resume(name)
    }

    /// Running, suspended or not started.
    pub fn service_status(&self, name: &str) -> ServiceStatus {
        self.inner.control.status(name)
    }

    /// `service list` table.
    pub fn list_services(&self) -> String {
        self.inner.control.list(&self.inner.registry)
    }

    /// True once a stopped service's devices are back in their slot.
    pub fn devices_released(&self, name: &str) -> bool {
        match name {
            STORAGE_MANAGER_NAME => self.inner.storage_slot.is_available(),
            NETWORK_MANAGER_NAME => self.inner.network_slot.is_available(),
            _ => true,
        }
    }
}

// =============================================================================
// Service table
// =============================================================================

/// Boot order: storage first, the network manager reads its credentials
/// from it.
pub fn default_services<P: Platform>() -> Vec<ServiceDescriptor<System<P>>> {
    vec![
        ServiceDescriptor::new(STORAGE_MANAGER_NAME, start_storage_manager::<P>, true),
        ServiceDescriptor::new(NETWORK_MANAGER_NAME, start_network_manager::<P>, true),
        ServiceDescriptor::new(HEARTBEAT_NAME, start_heartbeat::<P>, false),
    ]
}

fn start_storage_manager<P: Platform>(system: &System<P>) -> Result<(), StartError> {
    let parts = system.inner.storage_slot.claim()?;
    let config = system.inner.config.storage.clone();
    let syslog = system.inner.syslog.clone();
    system.inner.kernel.create_task(
        STORAGE_MANAGER_NAME,
        config.task,
        Box::new(move |mut ctx: TaskBodyContext<P>| {
            StorageManager::new(parts, &config, syslog).run(&mut ctx, &config.task);
        }),
    )?;
    Ok(())
}

fn start_network_manager<P: Platform>(system: &System<P>) -> Result<(), StartError> {
    if system
        .inner
        .kernel
        .handle_by_name(STORAGE_MANAGER_NAME)
        .is_none()
    {
        return Err(StartError::MissingDependency(STORAGE_MANAGER_NAME));
    }
    let parts = system.inner.network_slot.claim()?;
    let config = system.inner.config.network.clone();
    let params = config.task;
    let manager = NetworkManager::new(
        parts,
        system.inner.storage.clone(),
        config,
        system.inner.config.join_timeout_ticks(),
        system.inner.syslog.clone(),
    );
    system.inner.kernel.create_task(
        NETWORK_MANAGER_NAME,
        params,
        Box::new(move |mut ctx: TaskBodyContext<P>| manager.run(&mut ctx, &params)),
    )?;
    Ok(())
}

fn start_heartbeat<P: Platform>(system: &System<P>) -> Result<(), StartError> {
    let params = system.inner.config.heartbeat;
    let heartbeat = Heartbeat::new(system.inner.syslog.clone());
    system.inner.kernel.create_task(
        HEARTBEAT_NAME,
        params,
        Box::new(move |mut ctx: TaskBodyContext<P>| heartbeat.run(&mut ctx, &params)),
    )?;
    Ok(())
}
