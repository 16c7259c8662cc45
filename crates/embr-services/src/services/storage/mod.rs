//! Storage Manager
//!
//! The only task that touches the flash filesystem. Other services and the
//! shell reach it through a [`StorageClient`](embr_vfs::StorageClient).
//!
//! # Lifecycle
//!
//! ```text
//!   Unmounted ──boot──► Mounting ──mount ok──────────────► Mounted ◄──┐
//!                          │                                  │       │
//!                          └─mount fails─► format + mount ────┤       │
//!                                               │ fails       │ request
//!                                               ▼             ▼       │
//!                                          MountFailed     Serving ───┘
//!                                        (format recovers)
//! ```
//!
//! # Protocol
//!
//! One request per service pass, taken with a non-blocking receive:
//!
//! - **Query**: executed, then exactly one result is published into the
//!   request's reply slot, success or failure.
//! - **Mutation**: executed; a failure is written to the system log as
//!   `"filesystem error: <phrase>"` and nothing is sent back.
//!
//! While the filesystem is not mounted every request fails with
//! [`StorageError::NotMounted`], except `Format`, which is how a device
//! that failed to mount is recovered. After an explicit `Unmount` even
//! `Format` is refused until the manager is restarted.

mod exec;
mod tests;

pub use exec::{FORMAT_COMPLETE, LISTING_HEADER};

use std::fmt;

use embr_hal::{DeviceGuard, TaskContext, TaskParams};
use embr_ipc::{QueueReceiver, StatusReader, StatusWriter, SysLog};
use embr_vfs::{FlashFs, StorageError, StorageMutation, StorageQuery, StorageRequest, StorageResult};
use log::{debug, warn};

use crate::config::StorageConfig;
use exec::Limits;

// =============================================================================
// Constants
// =============================================================================

/// Task and service name.
pub const STORAGE_MANAGER_NAME: &str = "storagemanager";

/// Device label of the flash chip.
pub const FLASH_DEVICE: &str = "flash0";

/// Log line after an unmount.
pub const UNMOUNT_NOTICE: &str = "/mnt folder unmounted, restart storagemanager service to re-mount";

// =============================================================================
// Mount state
// =============================================================================

/// Published state of the Storage Manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountState {
    /// Not mounted; the manager is not running or was told to unmount
    Unmounted,
    /// Boot in progress
    Mounting,
    /// Mounted and idle
    Mounted,
    /// Mounted, executing a request
    Serving,
    /// Mount and format both failed
    MountFailed,
}

impl MountState {
    /// True if requests can reach the filesystem.
    pub fn is_mounted(&self) -> bool {
        matches!(self, MountState::Mounted | MountState::Serving)
    }

    /// One-line render for the shell.
    pub fn render(&self) -> String {
        match self {
            MountState::Unmounted => format!("{} not mounted", FLASH_DEVICE),
            MountState::Mounting => format!("mounting {}...", FLASH_DEVICE),
            MountState::Mounted | MountState::Serving => format!("{} mounted in /mnt", FLASH_DEVICE),
            MountState::MountFailed => format!("{} mount failed, try 'format'", FLASH_DEVICE),
        }
    }
}

impl fmt::Display for MountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MountState::Unmounted => "unmounted",
            MountState::Mounting => "mounting",
            MountState::Mounted => "mounted",
            MountState::Serving => "serving",
            MountState::MountFailed => "mount failed",
        })
    }
}

/// Shell text for a storage status snapshot.
pub fn render_storage_status(state: &StatusReader<MountState>) -> String {
    state.snapshot().render()
}

// =============================================================================
// Device bundle
// =============================================================================

/// Everything the Storage Manager owns while it runs.
///
/// Parked in a [`DeviceSlot`](embr_hal::DeviceSlot) between runs, so a
/// restarted manager picks up the same engine and request queue.
pub struct StorageParts<F: FlashFs> {
    /// Flash engine
    pub fs: F,
    /// Request queue
    pub requests: QueueReceiver<StorageRequest>,
    /// Published mount state
    pub state: StatusWriter<MountState>,
}

impl<F: FlashFs> fmt::Debug for StorageParts<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageParts")
            .field("state", &self.state.get())
            .field("queued", &self.requests.len())
            .finish()
    }
}

// =============================================================================
// StorageManager
// =============================================================================

/// The Storage Manager service.
pub struct StorageManager<F: FlashFs> {
    parts: DeviceGuard<StorageParts<F>>,
    limits: Limits,
    syslog: SysLog,
    /// Set by an explicit unmount; cleared only by a restart
    released: bool,
}

impl<F: FlashFs> StorageManager<F> {
    /// Create the manager over its claimed devices.
    pub fn new(parts: DeviceGuard<StorageParts<F>>, config: &StorageConfig, syslog: SysLog) -> Self {
        Self {
            parts,
            limits: Limits {
                output_capacity: config.output_capacity,
                path_max: config.path_max,
            },
            syslog,
            released: false,
        }
    }

    /// Current mount state.
    pub fn state(&self) -> MountState {
        self.parts.state.get()
    }

    fn set_state(&self, state: MountState) {
        self.parts.state.set(state);
    }

    fn log_error(&self, err: &StorageError) {
        self.syslog
            .error(STORAGE_MANAGER_NAME, format!("filesystem error: {}", err));
    }

    /// Mount the filesystem, formatting once if the mount fails.
    pub fn boot(&mut self) -> MountState {
        self.set_state(MountState::Mounting);
        if self.parts.fs.mount().is_ok() {
            self.syslog
                .info(STORAGE_MANAGER_NAME, format!("{} mounted in /mnt", FLASH_DEVICE));
            self.set_state(MountState::Mounted);
            return MountState::Mounted;
        }

        self.syslog.warn(
            STORAGE_MANAGER_NAME,
            format!("no filesystem on {}, formatting...", FLASH_DEVICE),
        );
        let state = match self.parts.fs.format().and_then(|()| self.parts.fs.mount()) {
            Ok(()) => {
                self.syslog.info(
                    STORAGE_MANAGER_NAME,
                    format!("{} formatted and mounted in /mnt", FLASH_DEVICE),
                );
                MountState::Mounted
            }
            Err(err) => {
                self.syslog.error(
                    STORAGE_MANAGER_NAME,
                    format!("problem mounting {}: {}", FLASH_DEVICE, StorageError::from(err)),
                );
                MountState::MountFailed
            }
        };
        self.set_state(state);
        state
    }

    /// Handle at most one waiting request. Returns false if the queue was
    /// empty.
    pub fn serve_once(&mut self) -> bool {
        let Some(request) = self.parts.requests.try_receive() else {
            return false;
        };
        debug!("{}: {}", STORAGE_MANAGER_NAME, request.name());
        match request {
            StorageRequest::Query { query, reply } => {
                let token = reply.token();
                let result = self.query(&query);
                if !reply.caller_waiting() {
                    debug!(
                        "{}: {} {} finished after its caller gave up",
                        STORAGE_MANAGER_NAME,
                        token,
                        query.name()
                    );
                }
                reply.publish(result);
            }
            StorageRequest::Mutate(mutation) => {
                if let Err(err) = self.mutate(&mutation) {
                    self.log_error(&err);
                }
            }
        }
        true
    }

    /// Execute a query and produce its result.
    pub fn query(&mut self, query: &StorageQuery) -> StorageResult {
        if matches!(query, StorageQuery::Format) {
            if self.released {
                return Err(StorageError::NotMounted);
            }
            return self.format();
        }
        if !self.state().is_mounted() {
            return Err(StorageError::NotMounted);
        }
        self.set_state(MountState::Serving);
        let result = exec::execute_query(&mut self.parts.fs, self.limits, query);
        self.set_state(MountState::Mounted);

        match &result {
            Ok(output) if output.truncated => {
                self.syslog.warn(
                    STORAGE_MANAGER_NAME,
                    format!("{} output truncated at {} bytes", query.name(), output.data.len()),
                );
            }
            Err(err) => debug!("{}: {} failed: {}", STORAGE_MANAGER_NAME, query.name(), err),
            Ok(_) => {}
        }
        result
    }

    fn format(&mut self) -> StorageResult {
        self.set_state(MountState::Serving);
        let result = exec::execute_query(&mut self.parts.fs, self.limits, &StorageQuery::Format);
        match &result {
            Ok(_) => {
                self.syslog.info(
                    STORAGE_MANAGER_NAME,
                    format!("{} formatted and mounted in /mnt", FLASH_DEVICE),
                );
                self.set_state(MountState::Mounted);
            }
            Err(err) => {
                self.syslog.error(
                    STORAGE_MANAGER_NAME,
                    format!("problem formatting {}: {}", FLASH_DEVICE, err),
                );
                self.set_state(MountState::MountFailed);
            }
        }
        result
    }

    /// Execute a mutation.
    pub fn mutate(&mut self, mutation: &StorageMutation) -> Result<(), StorageError> {
        if !self.state().is_mounted() {
            return Err(StorageError::NotMounted);
        }
        if matches!(mutation, StorageMutation::Unmount) {
            self.parts.fs.unmount()?;
            self.released = true;
            self.set_state(MountState::Unmounted);
            self.syslog.info(STORAGE_MANAGER_NAME, UNMOUNT_NOTICE);
            return Ok(());
        }
        self.set_state(MountState::Serving);
        let result = exec::execute_mutation(&mut self.parts.fs, self.limits, mutation);
        self.set_state(MountState::Mounted);
        result
    }

    /// Task body: boot, then serve one request per pass until terminated.
    pub fn run(mut self, ctx: &mut impl TaskContext, params: &TaskParams) {
        self.boot();
        loop {
            self.serve_once();
            if ctx.sched(params).is_exit() {
                break;
            }
        }
        self.shutdown();
    }

    /// Release the filesystem before the devices go back to their slot.
    fn shutdown(&mut self) {
        if self.state().is_mounted() {
            if let Err(err) = self.parts.fs.unmount() {
                warn!(
                    "{}: unmount on shutdown failed: {}",
                    STORAGE_MANAGER_NAME,
                    StorageError::from(err)
                );
            }
        }
        self.set_state(MountState::Unmounted);
        debug!("{}: stopped", STORAGE_MANAGER_NAME);
    }
}
