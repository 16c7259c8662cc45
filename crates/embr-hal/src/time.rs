//! Tick time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kernel tick count.
pub type Ticks = u64;

/// Kernel tick frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRate {
    hz: u32,
}

impl TickRate {
    /// 1 tick = 1 ms.
    pub const MILLIS: TickRate = TickRate { hz: 1000 };

    /// Create a tick rate. A zero frequency is treated as 1 Hz.
    pub fn new(hz: u32) -> Self {
        Self { hz: hz.max(1) }
    }

    /// Ticks per second.
    pub fn hz(&self) -> u32 {
        self.hz
    }

    /// Wall-clock duration of `ticks`.
    pub fn duration(&self, ticks: Ticks) -> Duration {
        Duration::from_micros(ticks.saturating_mul(1_000_000) / u64::from(self.hz))
    }

    /// Convert milliseconds to ticks, rounding down.
    pub fn ticks_from_ms(&self, ms: u64) -> Ticks {
        ms.saturating_mul(u64::from(self.hz)) / 1000
    }

    /// Convert an elapsed duration to ticks, rounding down.
    pub fn ticks_from_duration(&self, elapsed: Duration) -> Ticks {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        micros.saturating_mul(u64::from(self.hz)) / 1_000_000
    }
}

impl Default for TickRate {
    fn default() -> Self {
        Self::MILLIS
    }
}
