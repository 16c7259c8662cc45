//! Service implementations.
//!
//! Each service is a plain struct with a `run` task body; the task wiring
//! and the descriptor table live in [`crate::system`].

pub mod heartbeat;
pub mod network;
pub mod storage;

pub use heartbeat::{Heartbeat, HEARTBEAT_NAME};
pub use network::{
    render_network_status, CredentialStore, NetworkManager, NetworkParts, NETWORK_MANAGER_NAME,
    RADIO_DEVICE,
};
pub use storage::{
    render_storage_status, MountState, StorageManager, StorageParts, FLASH_DEVICE,
    FORMAT_COMPLETE, LISTING_HEADER, STORAGE_MANAGER_NAME, UNMOUNT_NOTICE,
};
