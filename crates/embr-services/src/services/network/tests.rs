//! Unit tests for NetworkManager
//!
//! Driven directly with a stepping clock and a fixed credential source, so
//! join timing is deterministic.
//!
//! # Test Categories
//!
//! - Join: success, idempotence while up, link services
//! - Failures: credentials, hardware, terminal link states, timeout
//! - Leave and termination during a join

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use embr_hal::{DeviceSlot, Schedule, TaskContext, Ticks};
    use embr_ipc::{queue, status_channel, SysLog};
    use embr_network::testing::{RecordingHook, SimRadio, SimRadioProbe};
    use embr_network::{AuthMode, Credentials, LinkState, NetworkError, NetworkStatus};

    use crate::config::NetworkConfig;
    use crate::services::network::{
        CredentialStore, NetworkManager, NetworkParts, RADIO_DEVICE,
    };

    /// Clock that advances by the requested delay.
    struct StepClock {
        ticks: Ticks,
        exit_at: Option<Ticks>,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                ticks: 0,
                exit_at: None,
            }
        }
    }

    impl TaskContext for StepClock {
        fn name(&self) -> &str {
            "networkmanager"
        }

        fn tick_count(&self) -> Ticks {
            self.ticks
        }

        fn delay(&mut self, ticks: Ticks) -> Schedule {
            self.ticks += ticks.max(1);
            match self.exit_at {
                Some(at) if self.ticks >= at => Schedule::Exit,
                _ => Schedule::Continue,
            }
        }
    }

    #[derive(Clone)]
    struct FixedStore {
        answer: Result<Credentials, NetworkError>,
        loads: Arc<AtomicU32>,
    }

    impl CredentialStore for FixedStore {
        fn load(&self, _path: &str) -> Result<Credentials, NetworkError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    struct Rig {
        manager: NetworkManager<SimRadio, FixedStore>,
        radio: SimRadioProbe,
        hook: RecordingHook,
        loads: Arc<AtomicU32>,
        syslog: SysLog,
        clock: StepClock,
    }

    impl Rig {
        fn texts(&self) -> Vec<String> {
            self.syslog.drain().into_iter().map(|line| line.text).collect()
        }
    }

    fn good_credentials() -> Result<Credentials, NetworkError> {
        Credentials::parse(b"labnet,secret")
    }

    fn rig(answer: Result<Credentials, NetworkError>) -> Rig {
        let _ = env_logger::builder().is_test(true).try_init();
        let radio = SimRadio::new();
        let probe = radio.probe();
        let hook = RecordingHook::new();
        let (_tx, actions) = queue(1);
        let (status, _reader) = status_channel(NetworkStatus::down());
        let slot = DeviceSlot::new(
            RADIO_DEVICE,
            NetworkParts {
                radio,
                actions,
                status,
                hooks: vec![Box::new(hook.clone())],
            },
        );
        let loads = Arc::new(AtomicU32::new(0));
        let store = FixedStore {
            answer,
            loads: Arc::clone(&loads),
        };
        let config = NetworkConfig {
            poll_interval_ticks: 100,
            ..NetworkConfig::default()
        };
        let syslog = SysLog::new(32, || 0);
        let manager = NetworkManager::new(slot.claim().unwrap(), store, config, 1_000, syslog.clone());
        Rig {
            manager,
            radio: probe,
            hook,
            loads,
            syslog,
            clock: StepClock::new(),
        }
    }

    // =========================================================================
    // Join
    // =========================================================================

    #[test]
    fn test_join_brings_link_up() {
        let mut rig = rig(good_credentials());
        rig.radio.set_address(Ipv4Addr::new(10, 0, 0, 7));

        assert_eq!(rig.manager.join(&mut rig.clock), Schedule::Continue);

        let status = rig.manager.status();
        assert_eq!(status.link_state, LinkState::Up);
        assert_eq!(status.address, Some(Ipv4Addr::new(10, 0, 0, 7)));
        assert_eq!(status.last_error, None);
        assert_eq!(rig.radio.last_ssid().as_deref(), Some("labnet"));
        assert_eq!(rig.radio.last_auth(), Some(AuthMode::Wpa2AesPsk));
        assert_eq!(rig.hook.events(), vec![Some(Ipv4Addr::new(10, 0, 0, 7))]);
        assert!(rig
            .texts()
            .contains(&"wifi connected: 10.0.0.7".to_string()));
        // Two polls of 100 ticks before the simulated radio reports Up.
        assert_eq!(rig.clock.ticks, 200);
    }

    #[test]
    fn test_join_while_up_does_nothing() {
        let mut rig = rig(good_credentials());
        rig.manager.join(&mut rig.clock);
        rig.syslog.drain();

        rig.manager.join(&mut rig.clock);

        assert_eq!(rig.radio.connect_calls(), 1);
        assert_eq!(rig.radio.init_calls(), 1);
        assert_eq!(rig.loads.load(Ordering::SeqCst), 1);
        assert_eq!(rig.hook.events().len(), 1);
        assert_eq!(rig.texts(), vec!["already connected to a network".to_string()]);
        assert!(rig.manager.status().is_up());
    }

    #[test]
    fn test_link_services_can_be_disabled() {
        let mut rig = rig(good_credentials());
        rig.manager.config.start_link_services = false;
        rig.manager.join(&mut rig.clock);
        assert!(rig.manager.status().is_up());
        assert!(rig.hook.events().is_empty());
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn test_missing_credentials_touch_no_hardware() {
        let mut rig = rig(Err(NetworkError::BadCredentials));

        rig.manager.join(&mut rig.clock);

        let status = rig.manager.status();
        assert_eq!(status.link_state, LinkState::Down);
        assert_eq!(status.last_error, Some(NetworkError::BadCredentials));
        assert_eq!(rig.radio.init_calls(), 0);
        assert_eq!(rig.radio.connect_calls(), 0);
        assert_eq!(
            rig.texts(),
            vec!["could not join network: bad or missing credentials".to_string()]
        );
    }

    #[test]
    fn test_storage_unavailable_is_reported() {
        let mut rig = rig(Err(NetworkError::StorageUnavailable));
        rig.manager.join(&mut rig.clock);
        assert_eq!(
            rig.manager.status().last_error,
            Some(NetworkError::StorageUnavailable)
        );
        assert_eq!(rig.radio.connect_calls(), 0);
    }

    #[test]
    fn test_radio_init_failure_is_retried_on_next_join() {
        let mut rig = rig(good_credentials());
        rig.radio.fail_init(true);
        rig.manager.join(&mut rig.clock);
        assert_eq!(
            rig.manager.status().last_error,
            Some(NetworkError::HardwareInitFailed)
        );
        assert_eq!(rig.radio.connect_calls(), 0);

        rig.radio.fail_init(false);
        rig.manager.join(&mut rig.clock);
        assert!(rig.manager.status().is_up());
        assert_eq!(rig.radio.init_calls(), 2);
    }

    #[test]
    fn test_refused_connect_is_association_failure() {
        let mut rig = rig(good_credentials());
        rig.radio.refuse_connect(true);
        rig.manager.join(&mut rig.clock);
        let status = rig.manager.status();
        assert_eq!(status.link_state, LinkState::Down);
        assert_eq!(status.last_error, Some(NetworkError::AssociationFailed));
    }

    #[test]
    fn test_terminal_link_state_fails_fast() {
        let mut rig = rig(good_credentials());
        rig.radio.fail_with(LinkState::BadAuth);

        rig.manager.join(&mut rig.clock);

        assert_eq!(
            rig.manager.status().last_error,
            Some(NetworkError::AuthenticationFailed)
        );
        assert_eq!(rig.radio.reset_calls(), 1);
        assert_eq!(rig.clock.ticks, 0);
    }

    #[test]
    fn test_timeout_resets_and_leaves_link_down() {
        let mut rig = rig(good_credentials());
        rig.radio.join_after(None);

        rig.manager.join(&mut rig.clock);

        let status = rig.manager.status();
        assert_eq!(status.link_state, LinkState::Down);
        assert_eq!(status.address, None);
        assert_eq!(status.last_error, Some(NetworkError::Timeout));
        assert_eq!(rig.radio.reset_calls(), 1);
        assert_eq!(rig.clock.ticks, 1_000);
        assert!(rig.hook.events().is_empty());

        // A later join starts from a clean radio.
        rig.radio.join_after(Some(1));
        rig.manager.join(&mut rig.clock);
        assert!(rig.manager.status().is_up());
    }

    // =========================================================================
    // Leave and termination
    // =========================================================================

    #[test]
    fn test_leave_drops_link_and_notifies_hooks() {
        let mut rig = rig(good_credentials());
        rig.manager.join(&mut rig.clock);
        rig.syslog.drain();

        rig.manager.leave();

        assert_eq!(rig.manager.status(), NetworkStatus::down());
        assert_eq!(rig.radio.disconnect_calls(), 1);
        assert_eq!(rig.hook.events().last(), Some(&None));
        assert_eq!(rig.texts(), vec!["disconnected from network".to_string()]);
    }

    #[test]
    fn test_leave_when_down_is_a_no_op() {
        let mut rig = rig(good_credentials());
        rig.manager.leave();
        assert_eq!(rig.radio.disconnect_calls(), 0);
        assert_eq!(rig.texts(), vec!["not connected to a network".to_string()]);
    }

    #[test]
    fn test_termination_during_join_exits() {
        let mut rig = rig(good_credentials());
        rig.radio.join_after(None);
        rig.clock.exit_at = Some(300);

        assert_eq!(rig.manager.join(&mut rig.clock), Schedule::Exit);
        assert_eq!(rig.manager.status(), NetworkStatus::down());
        assert_eq!(rig.radio.reset_calls(), 1);
    }
}
