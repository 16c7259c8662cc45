//! Network Manager
//!
//! Owns the radio. Consumes fire-and-forget [`NetworkAction`]s and
//! publishes every outcome through a [`NetworkStatus`] cell and the system
//! log.
//!
//! # Join
//!
//! ```text
//!   Join ──► already Up? ──yes──► "already connected", no hardware action
//!               │ no
//!               ▼
//!         load credentials ──missing/malformed──► Down + BadCredentials
//!               │                ──storage down──► Down + StorageUnavailable
//!               ▼
//!         init radio (once) ──fails──► Down + HardwareInitFailed
//!               │
//!               ▼
//!         connect_async ──refused──► Down + AssociationFailed
//!               │
//!               ▼
//!         poll every poll_interval ──terminal state──► reset, Down + error
//!               │                   ──join timeout───► reset, Down + Timeout
//!               ▼
//!         Up + address ──► link services
//! ```
//!
//! The manager task is blocked for the whole join; the poll delays are its
//! scheduling points, so it can still be suspended or terminated.

mod tests;

use std::fmt;
use std::net::Ipv4Addr;

use embr_hal::{DeviceGuard, Schedule, TaskContext, TaskParams, Ticks};
use embr_ipc::{QueueReceiver, StatusReader, StatusWriter, SysLog};
use embr_network::{Credentials, LinkState, LinkUpHook, NetworkAction, NetworkError, NetworkStatus, Radio};
use embr_vfs::{StorageClient, StorageError};
use log::debug;

use crate::config::NetworkConfig;

/// Task and service name.
pub const NETWORK_MANAGER_NAME: &str = "networkmanager";

/// Device label of the radio.
pub const RADIO_DEVICE: &str = "wifi0";

/// Shell text for a network status snapshot.
pub fn render_network_status(status: &StatusReader<NetworkStatus>) -> String {
    status.snapshot().render()
}

// =============================================================================
// Credential source
// =============================================================================

/// Where the manager reads its credentials from on every join.
pub trait CredentialStore: Send + 'static {
    /// Load and parse the credential file at `path`.
    ///
    /// # Returns
    /// * `Err(NetworkError::BadCredentials)` - File missing or malformed
    /// * `Err(NetworkError::StorageUnavailable)` - Storage did not answer
    fn load(&self, path: &str) -> Result<Credentials, NetworkError>;
}

impl CredentialStore for StorageClient {
    fn load(&self, path: &str) -> Result<Credentials, NetworkError> {
        let unavailable = |err: StorageError| {
            debug!("{}: credential read failed: {}", NETWORK_MANAGER_NAME, err);
            NetworkError::StorageUnavailable
        };
        if !self.file_exists(path).map_err(unavailable)? {
            return Err(NetworkError::BadCredentials);
        }
        let raw = self.dump_file(path).map_err(|err| match err {
            StorageError::NotFound | StorageError::TooLarge => NetworkError::BadCredentials,
            other => unavailable(other),
        })?;
        Credentials::parse(&raw)
    }
}

// =============================================================================
// Device bundle
// =============================================================================

/// Everything the Network Manager owns while it runs.
pub struct NetworkParts<R: Radio> {
    /// Radio driver
    pub radio: R,
    /// Action queue
    pub actions: QueueReceiver<NetworkAction>,
    /// Published status
    pub status: StatusWriter<NetworkStatus>,
    /// Services started once the link is up
    pub hooks: Vec<Box<dyn LinkUpHook>>,
}

impl<R: Radio> fmt::Debug for NetworkParts<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkParts")
            .field("status", &self.status.get())
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}

enum Polled {
    Up(Ipv4Addr),
    Terminated,
}

// =============================================================================
// NetworkManager
// =============================================================================

/// The Network Manager service.
pub struct NetworkManager<R: Radio, C: CredentialStore = StorageClient> {
    parts: DeviceGuard<NetworkParts<R>>,
    credentials: C,
    config: NetworkConfig,
    join_timeout: Ticks,
    radio_ready: bool,
    syslog: SysLog,
}

impl<R: Radio, C: CredentialStore> NetworkManager<R, C> {
    /// Create the manager over its claimed devices.
    ///
    /// `join_timeout` is the join deadline in kernel ticks.
    pub fn new(
        parts: DeviceGuard<NetworkParts<R>>,
        credentials: C,
        config: NetworkConfig,
        join_timeout: Ticks,
        syslog: SysLog,
    ) -> Self {
        Self {
            parts,
            credentials,
            config,
            join_timeout,
            radio_ready: false,
            syslog,
        }
    }

    /// Current status.
    pub fn status(&self) -> NetworkStatus {
        self.parts.status.get()
    }

    /// Execute one action.
    pub fn handle(&mut self, ctx: &mut impl TaskContext, action: NetworkAction) -> Schedule {
        debug!("{}: {:?}", NETWORK_MANAGER_NAME, action);
        match action {
            NetworkAction::Join => self.join(ctx),
            NetworkAction::Leave => {
                self.leave();
                Schedule::Continue
            }
        }
    }

    /// Associate using the stored credentials.
    ///
    /// Returns [`Schedule::Exit`] only if the task was terminated while
    /// waiting for the link.
    pub fn join(&mut self, ctx: &mut impl TaskContext) -> Schedule {
        if self.status().is_up() {
            self.syslog
                .info(NETWORK_MANAGER_NAME, "already connected to a network");
            return Schedule::Continue;
        }

        let credentials = match self.credentials.load(&self.config.credential_file) {
            Ok(credentials) => credentials,
            Err(err) => {
                self.fail(err);
                return Schedule::Continue;
            }
        };
        if let Err(err) = self.prepare_radio() {
            self.fail(err);
            return Schedule::Continue;
        }

        self.parts.status.set(NetworkStatus {
            link_state: LinkState::Joining,
            address: None,
            last_error: None,
        });
        self.syslog.info(
            NETWORK_MANAGER_NAME,
            format!("joining {}...", credentials.ssid),
        );
        if !self
            .parts
            .radio
            .connect_async(&credentials.ssid, &credentials.password, self.config.auth)
        {
            self.fail(NetworkError::AssociationFailed);
            return Schedule::Continue;
        }

        match self.await_link(ctx) {
            Ok(Polled::Up(address)) => {
                self.link_up(address);
                Schedule::Continue
            }
            Ok(Polled::Terminated) => {
                self.parts.radio.reset_connection();
                self.parts.status.set(NetworkStatus::down());
                Schedule::Exit
            }
            Err(err) => {
                self.parts.radio.reset_connection();
                self.fail(err);
                Schedule::Continue
            }
        }
    }

    /// Drop the association. A no-op if the link is not up.
    pub fn leave(&mut self) {
        if !self.status().is_up() {
            self.syslog
                .info(NETWORK_MANAGER_NAME, "not connected to a network");
            return;
        }
        self.parts.radio.disconnect();
        for hook in self.parts.hooks.iter_mut() {
            hook.on_link_down();
        }
        self.parts.status.set(NetworkStatus::down());
        self.syslog
            .info(NETWORK_MANAGER_NAME, "disconnected from network");
    }

    fn prepare_radio(&mut self) -> Result<(), NetworkError> {
        if self.radio_ready {
            return Ok(());
        }
        self.parts.radio.init()?;
        self.parts.radio.enable_station_mode();
        self.radio_ready = true;
        debug!("{}: {} in station mode", NETWORK_MANAGER_NAME, RADIO_DEVICE);
        Ok(())
    }

    fn await_link(&mut self, ctx: &mut impl TaskContext) -> Result<Polled, NetworkError> {
        let deadline = ctx.tick_count().saturating_add(self.join_timeout);
        let interval = self.config.poll_interval_ticks.max(1);
        loop {
            let state = self.parts.radio.link_status();
            if let Some(err) = state.failure() {
                return Err(err);
            }
            if state == LinkState::Up {
                if let Some(address) = self.parts.radio.resolved_address() {
                    return Ok(Polled::Up(address));
                }
                self.parts
                    .status
                    .update(|status| status.link_state = LinkState::NoAddress);
            }
            if ctx.tick_count() >= deadline {
                return Err(NetworkError::Timeout);
            }
            if ctx.delay(interval).is_exit() {
                return Ok(Polled::Terminated);
            }
        }
    }

    fn link_up(&mut self, address: Ipv4Addr) {
        self.parts.status.set(NetworkStatus {
            link_state: LinkState::Up,
            address: Some(address),
            last_error: None,
        });
        self.syslog
            .info(NETWORK_MANAGER_NAME, format!("wifi connected: {}", address));
        if !self.config.start_link_services {
            return;
        }
        for hook in self.parts.hooks.iter_mut() {
            hook.on_link_up(address);
            self.syslog
                .info(NETWORK_MANAGER_NAME, format!("{} started", hook.name()));
        }
    }

    fn fail(&mut self, err: NetworkError) {
        self.parts.status.set(NetworkStatus {
            link_state: LinkState::Down,
            address: None,
            last_error: Some(err),
        });
        self.syslog.error(
            NETWORK_MANAGER_NAME,
            format!("could not join network: {}", err),
        );
    }

    /// Task body: optionally join, then serve one action per pass until
    /// terminated.
    pub fn run(mut self, ctx: &mut impl TaskContext, params: &TaskParams) {
        if self.config.join_on_start && self.join(ctx).is_exit() {
            return;
        }
        loop {
            if let Some(action) = self.parts.actions.try_receive() {
                if self.handle(ctx, action).is_exit() {
                    break;
                }
            }
            if ctx.sched(params).is_exit() {
                break;
            }
        }
        // Leave the radio idle for the next owner.
        if self.status().is_up() {
            self.leave();
        }
    }
}
