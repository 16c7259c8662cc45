//! Simulated radio.
//!
//! Joins after a configurable number of status polls and counts every
//! driver call so tests can assert which hardware actions happened.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{AuthMode, LinkState, LinkUpHook, NetworkError, Radio};

#[derive(Debug)]
struct SimState {
    // Behavior
    init_fails: bool,
    refuse_connect: bool,
    join_after_polls: Option<u32>,
    terminal_state: Option<LinkState>,
    address: Ipv4Addr,

    // Live state
    connecting: bool,
    polls: u32,
    joined: bool,

    // Counters
    init_calls: u32,
    connect_calls: u32,
    reset_calls: u32,
    disconnect_calls: u32,
    last_ssid: Option<String>,
    last_auth: Option<AuthMode>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            init_fails: false,
            refuse_connect: false,
            join_after_polls: Some(2),
            terminal_state: None,
            address: Ipv4Addr::new(192, 168, 4, 20),
            connecting: false,
            polls: 0,
            joined: false,
            init_calls: 0,
            connect_calls: 0,
            reset_calls: 0,
            disconnect_calls: 0,
            last_ssid: None,
            last_auth: None,
        }
    }
}

/// Simulated station-mode radio.
#[derive(Debug, Default)]
pub struct SimRadio {
    state: Arc<Mutex<SimState>>,
}

impl SimRadio {
    /// A radio that joins after two polls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe sharing this radio's state.
    pub fn probe(&self) -> SimRadioProbe {
        SimRadioProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Radio for SimRadio {
    fn init(&mut self) -> Result<(), NetworkError> {
        let mut state = self.state();
        state.init_calls += 1;
        if state.init_fails {
            return Err(NetworkError::HardwareInitFailed);
        }
        Ok(())
    }

    fn enable_station_mode(&mut self) {}

    fn connect_async(&mut self, ssid: &str, _password: &str, auth: AuthMode) -> bool {
        let mut state = self.state();
        state.connect_calls += 1;
        state.last_ssid = Some(ssid.to_string());
        state.last_auth = Some(auth);
        if state.refuse_connect {
            return false;
        }
        state.connecting = true;
        state.polls = 0;
        state.joined = false;
        true
    }

    fn link_status(&mut self) -> LinkState {
        let mut state = self.state();
        if state.joined {
            return LinkState::Up;
        }
        if !state.connecting {
            return LinkState::Down;
        }
        if let Some(terminal) = state.terminal_state {
            return terminal;
        }
        match state.join_after_polls {
            Some(after) if state.polls >= after => {
                state.joined = true;
                LinkState::Up
            }
            _ => {
                state.polls += 1;
                LinkState::Joining
            }
        }
    }

    fn resolved_address(&mut self) -> Option<Ipv4Addr> {
        let state = self.state();
        state.joined.then_some(state.address)
    }

    fn reset_connection(&mut self) {
        let mut state = self.state();
        state.reset_calls += 1;
        state.connecting = false;
        state.joined = false;
        state.polls = 0;
    }

    fn disconnect(&mut self) {
        let mut state = self.state();
        state.disconnect_calls += 1;
        state.connecting = false;
        state.joined = false;
    }
}

/// Test-side view of a [`SimRadio`].
#[derive(Clone, Debug)]
pub struct SimRadioProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimRadioProbe {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join after `polls` status polls; `None` never joins.
    pub fn join_after(&self, polls: Option<u32>) {
        self.state().join_after_polls = polls;
    }

    /// Report `state` instead of joining.
    pub fn fail_with(&self, state: LinkState) {
        self.state().terminal_state = Some(state);
    }

    /// Make `init` fail.
    pub fn fail_init(&self, fail: bool) {
        self.state().init_fails = fail;
    }

    /// Make `connect_async` return false.
    pub fn refuse_connect(&self, refuse: bool) {
        self.state().refuse_connect = refuse;
    }

    /// Address handed out on join.
    pub fn set_address(&self, address: Ipv4Addr) {
        self.state().address = address;
    }

    /// Number of `init` calls.
    pub fn init_calls(&self) -> u32 {
        self.state().init_calls
    }

    /// Number of `connect_async` calls.
    pub fn connect_calls(&self) -> u32 {
        self.state().connect_calls
    }

    /// Number of `reset_connection` calls.
    pub fn reset_calls(&self) -> u32 {
        self.state().reset_calls
    }

    /// Number of `disconnect` calls.
    pub fn disconnect_calls(&self) -> u32 {
        self.state().disconnect_calls
    }

    /// SSID of the last `connect_async`.
    pub fn last_ssid(&self) -> Option<String> {
        self.state().last_ssid.clone()
    }

    /// Auth mode of the last `connect_async`.
    pub fn last_auth(&self) -> Option<AuthMode> {
        self.state().last_auth
    }
}

/// Hook that records the addresses it was started with.
#[derive(Clone, Debug, Default)]
pub struct RecordingHook {
    events: Arc<Mutex<Vec<Option<Ipv4Addr>>>>,
}

impl RecordingHook {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(addr)` per link-up, `None` per link-down, in order.
    pub fn events(&self) -> Vec<Option<Ipv4Addr>> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LinkUpHook for RecordingHook {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_link_up(&mut self, address: Ipv4Addr) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Some(address));
    }

    fn on_link_down(&mut self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joins_after_configured_polls() {
        let mut radio = SimRadio::new();
        let probe = radio.probe();
        probe.join_after(Some(2));

        assert_eq!(radio.link_status(), LinkState::Down);
        assert!(radio.connect_async("lab", "pw", AuthMode::Wpa2AesPsk));
        assert_eq!(radio.link_status(), LinkState::Joining);
        assert_eq!(radio.resolved_address(), None);
        assert_eq!(radio.link_status(), LinkState::Joining);
        assert_eq!(radio.link_status(), LinkState::Up);
        assert!(radio.resolved_address().is_some());
        assert_eq!(probe.connect_calls(), 1);
        assert_eq!(probe.last_auth(), Some(AuthMode::Wpa2AesPsk));
    }

    #[test]
    fn test_terminal_failure_state() {
        let mut radio = SimRadio::new();
        let probe = radio.probe();
        probe.fail_with(LinkState::BadAuth);
        radio.connect_async("lab", "wrong", AuthMode::Mixed);
        assert_eq!(radio.link_status(), LinkState::BadAuth);
        radio.reset_connection();
        assert_eq!(radio.link_status(), LinkState::Down);
        assert_eq!(probe.reset_calls(), 1);
    }
}
