//! Link state, status snapshot and actions.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::NetworkError;

// =============================================================================
// Link state
// =============================================================================

/// Radio association state as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    /// Not associated
    Down,
    /// Association in progress
    Joining,
    /// Associated, no address yet
    NoAddress,
    /// Associated with an address
    Up,
    /// Association failed
    Failed,
    /// Network not found
    NoNetwork,
    /// Authentication rejected
    BadAuth,
    /// Driver reported something else
    Unknown,
}

impl LinkState {
    /// Lowercase label used in status renders.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Down => "down",
            LinkState::Joining => "joining",
            LinkState::NoAddress => "no address",
            LinkState::Up => "up",
            LinkState::Failed => "failed",
            LinkState::NoNetwork => "no network",
            LinkState::BadAuth => "bad auth",
            LinkState::Unknown => "unknown",
        }
    }

    /// The failure this state means, if it is terminal.
    pub fn failure(&self) -> Option<NetworkError> {
        match self {
            LinkState::Failed => Some(NetworkError::AssociationFailed),
            LinkState::NoNetwork => Some(NetworkError::NoNetwork),
            LinkState::BadAuth => Some(NetworkError::AuthenticationFailed),
            _ => None,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Radio security mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No security
    Open,
    /// WPA with TKIP
    WpaTkipPsk,
    /// WPA2 with AES
    #[default]
    Wpa2AesPsk,
    /// WPA/WPA2 mixed
    Mixed,
}

// =============================================================================
// Status
// =============================================================================

/// Snapshot of the Network Manager's state.
///
/// Written only by the Network Manager task; everyone else reads copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkStatus {
    /// Current link state
    pub link_state: LinkState,
    /// Resolved address while `Up`
    pub address: Option<Ipv4Addr>,
    /// Outcome of the most recent failed action
    pub last_error: Option<NetworkError>,
}

impl NetworkStatus {
    /// Initial status: down, no address, no error.
    pub const fn down() -> Self {
        Self {
            link_state: LinkState::Down,
            address: None,
            last_error: None,
        }
    }

    /// Check if the link is up.
    pub fn is_up(&self) -> bool {
        self.link_state == LinkState::Up
    }

    /// One-line render for the shell.
    pub fn render(&self) -> String {
        let address = self
            .address
            .map_or_else(|| "none".to_string(), |addr| addr.to_string());
        match self.last_error {
            Some(err) => format!("link: {}, address: {}, last error: {}", self.link_state, address, err),
            None => format!("link: {}, address: {}", self.link_state, address),
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::down()
    }
}

/// Fire-and-forget request to the Network Manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkAction {
    /// Associate using the persisted credentials
    Join,
    /// Drop the association
    Leave,
}
