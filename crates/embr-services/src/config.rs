//! System configuration.
//!
//! Every tunable the services read: tick rate, bus waits, per-service task
//! parameters, storage output limits and network join behavior. Loaded from
//! JSON; any field left out takes its default, so `{}` is a valid config.
//!
//! ```json
//! {
//!   "tick_hz": 1000,
//!   "storage": { "result_timeout_ticks": 200 },
//!   "network": { "credential_file": "wifi.cfg", "join_timeout_ms": 20000 }
//! }
//! ```

use std::time::Duration;

use embr_hal::{TaskParams, TickRate, Ticks};
use embr_ipc::SYSLOG_DEPTH;
use embr_network::AuthMode;
use embr_vfs::DEFAULT_PATH_MAX;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Defaults
// =============================================================================

/// Default kernel tick frequency.
pub const DEFAULT_TICK_HZ: u32 = 1000;

/// Default bounded wait when sending on a full queue, in ticks.
pub const DEFAULT_SEND_WAIT_TICKS: Ticks = 10;

/// Default credential file name on the flash filesystem.
pub const DEFAULT_CREDENTIAL_FILE: &str = "wifi.cfg";

/// Default capacity of rendered storage output (listings, dumps).
pub const DEFAULT_OUTPUT_CAPACITY: usize = 4096;

/// Errors loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON did not parse or had a field of the wrong type
    #[error("invalid system config: {0}")]
    Parse(#[from] serde_json::Error),
}

// =============================================================================
// Per-service sections
// =============================================================================

/// Storage Manager settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Task parameters
    pub task: TaskParams,
    /// How long a query caller waits for its result
    pub result_timeout_ticks: Ticks,
    /// Byte limit of listing and dump output
    pub output_capacity: usize,
    /// Longest accepted path
    pub path_max: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let task = TaskParams {
            priority: 3,
            repeat: 1,
            delay: 100,
            stack_words: 1024,
        };
        Self {
            task,
            // Two service passes
            result_timeout_ticks: task.delay * 2,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            path_max: DEFAULT_PATH_MAX,
        }
    }
}

/// Network Manager settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Task parameters
    pub task: TaskParams,
    /// Credential file read on every join
    pub credential_file: String,
    /// Give up on a join after this long
    pub join_timeout_ms: u64,
    /// Ticks between link status polls while joining
    pub poll_interval_ticks: Ticks,
    /// Security mode passed to the radio
    pub auth: AuthMode,
    /// Join as soon as the manager starts
    pub join_on_start: bool,
    /// Bring up link services once the link is up
    pub start_link_services: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            task: TaskParams {
                priority: 3,
                repeat: 1,
                delay: 100,
                stack_words: 1024,
            },
            credential_file: DEFAULT_CREDENTIAL_FILE.to_string(),
            join_timeout_ms: 20_000,
            poll_interval_ticks: 100,
            auth: AuthMode::Wpa2AesPsk,
            join_on_start: true,
            start_link_services: true,
        }
    }
}

// =============================================================================
// SystemConfig
// =============================================================================

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Kernel tick frequency
    pub tick_hz: u32,
    /// Bounded wait for a full queue before `QueueFull`
    pub send_wait_ticks: Ticks,
    /// Depth of the system log channel
    pub log_depth: usize,
    /// Task manager task
    pub task_manager: TaskParams,
    /// Storage Manager
    pub storage: StorageConfig,
    /// Network Manager
    pub network: NetworkConfig,
    /// Heartbeat task
    pub heartbeat: TaskParams,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            send_wait_ticks: DEFAULT_SEND_WAIT_TICKS,
            log_depth: SYSLOG_DEPTH,
            task_manager: TaskParams {
                priority: 1,
                repeat: 1,
                delay: 20,
                stack_words: 512,
            },
            storage: StorageConfig::default(),
            network: NetworkConfig::default(),
            heartbeat: TaskParams {
                priority: 1,
                repeat: 1,
                delay: 5000,
                stack_words: 256,
            },
        }
    }
}

impl SystemConfig {
    /// Parse from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_else(|_| b"{}".to_vec())
    }

    /// Tick rate as a [`TickRate`].
    pub fn tick_rate(&self) -> TickRate {
        TickRate::new(self.tick_hz)
    }

    /// Send wait as wall time.
    pub fn send_wait(&self) -> Duration {
        self.tick_rate().duration(self.send_wait_ticks)
    }

    /// Storage query result timeout as wall time.
    pub fn storage_result_timeout(&self) -> Duration {
        self.tick_rate().duration(self.storage.result_timeout_ticks)
    }

    /// Network join timeout in ticks.
    pub fn join_timeout_ticks(&self) -> Ticks {
        self.tick_rate().ticks_from_ms(self.network.join_timeout_ms)
    }
}
