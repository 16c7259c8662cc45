//! Hosted platform.
//!
//! Runs the whole system inside one process: [`HostedKernel`] (a thread per
//! task), a RAM-backed flash engine and a simulated radio. Used by the
//! simulator and the integration tests.

use std::thread;
use std::time::{Duration, Instant};

use embr_hal::hosted::HostedKernel;
use embr_network::testing::{SimRadio, SimRadioProbe};
use embr_network::LinkUpHook;
use embr_vfs::testing::{MemoryFs, MemoryFsProbe};

use crate::config::SystemConfig;
use crate::system::{Devices, Platform, System, SystemError};

/// In-process platform.
#[derive(Debug)]
pub struct Hosted;

impl Platform for Hosted {
    type Kernel = HostedKernel;
    type Fs = MemoryFs;
    type Radio = SimRadio;
}

/// Test-side handles to the simulated devices.
#[derive(Clone, Debug)]
pub struct HostedProbes {
    /// Flash contents and fault injection
    pub flash: MemoryFsProbe,
    /// Radio behavior and call counters
    pub radio: SimRadioProbe,
}

impl System<Hosted> {
    /// Wire a hosted system over the given devices.
    pub fn hosted(
        config: SystemConfig,
        fs: MemoryFs,
        radio: SimRadio,
        hooks: Vec<Box<dyn LinkUpHook>>,
    ) -> Result<(Self, HostedProbes), SystemError> {
        let probes = HostedProbes {
            flash: fs.probe(),
            radio: radio.probe(),
        };
        let kernel = HostedKernel::new(config.tick_rate());
        let system = System::new(
            config,
            Devices {
                kernel,
                fs,
                radio,
                hooks,
            },
        )?;
        Ok((system, probes))
    }
}

/// Poll `condition` until it holds or `timeout` passes.
///
/// Fire-and-forget actions report only through status cells; callers use
/// this to wait for the outcome.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}
