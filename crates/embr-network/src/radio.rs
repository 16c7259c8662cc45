//! Radio driver interface.

use std::net::Ipv4Addr;

use crate::{AuthMode, LinkState, NetworkError};

/// Station-mode radio driver.
///
/// Owned by exactly one task (the Network Manager).
pub trait Radio: Send + 'static {
    /// Power up and initialize the radio.
    fn init(&mut self) -> Result<(), NetworkError>;

    /// Switch to station (client) mode.
    fn enable_station_mode(&mut self);

    /// Start associating. Returns false if the driver refused to start.
    fn connect_async(&mut self, ssid: &str, password: &str, auth: AuthMode) -> bool;

    /// Current association state.
    fn link_status(&mut self) -> LinkState;

    /// Address assigned to the interface, if any.
    fn resolved_address(&mut self) -> Option<Ipv4Addr>;

    /// Abort a stuck association and return to a clean, retryable state.
    fn reset_connection(&mut self);

    /// Drop an established association.
    fn disconnect(&mut self);
}

/// Network service brought up once the link is `Up`.
pub trait LinkUpHook: Send + 'static {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Called once per successful join.
    fn on_link_up(&mut self, address: Ipv4Addr);

    /// Called when the link is left.
    fn on_link_down(&mut self) {}
}
