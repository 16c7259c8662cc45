//! System services for embr
//!
//! The long-running services of the firmware and the wiring that connects
//! them over the request bus:
//!
//! - **Storage Manager** ([`services::storage`]): sole owner of the flash
//!   filesystem, serves queries and mutations one per pass
//! - **Network Manager** ([`services::network`]): sole owner of the radio,
//!   joins with credentials read through the Storage Manager
//! - **Heartbeat** ([`services::heartbeat`]): manual-start uptime logger
//! - **System** ([`System`]): queues, status cells, device slots and the
//!   service table, plus the caller-facing API used by the shell
//! - **Config** ([`SystemConfig`]): JSON-loadable tunables
//!
//! # Boot
//!
//! ```text
//!   System::new(config, devices)      wire queues and slots
//!         │
//!   System::boot()                    start taskmanager
//!         │
//!   taskmanager                       registry.boot(), table order:
//!         ├── storagemanager (auto)     mount, else format + mount
//!         ├── networkmanager (auto)     join if configured
//!         └── heartbeat      (manual)
//! ```

pub mod config;
pub mod hosted;
pub mod services;
pub mod system;

pub use config::{ConfigError, NetworkConfig, StorageConfig, SystemConfig};
pub use hosted::{wait_until, Hosted, HostedProbes};
pub use services::{MountState, HEARTBEAT_NAME, NETWORK_MANAGER_NAME, STORAGE_MANAGER_NAME};
pub use system::{default_services, Devices, Platform, System, SystemError, TaskHandle};
