//! Heartbeat service.
//!
//! Writes an uptime line to the system log once per pass. Registered but
//! not started at boot; `service start heartbeat` brings it up.

use embr_hal::{TaskContext, TaskParams, Ticks};
use embr_ipc::SysLog;

/// Task and service name.
pub const HEARTBEAT_NAME: &str = "heartbeat";

/// The heartbeat service.
pub struct Heartbeat {
    syslog: SysLog,
    beats: u64,
}

impl Heartbeat {
    /// Create a heartbeat writing to `syslog`.
    pub fn new(syslog: SysLog) -> Self {
        Self { syslog, beats: 0 }
    }

    /// Number of lines written so far.
    pub fn beats(&self) -> u64 {
        self.beats
    }

    /// Write one heartbeat line.
    pub fn beat(&mut self, uptime: Ticks) {
        self.beats += 1;
        self.syslog
            .info(HEARTBEAT_NAME, format!("alive, uptime {} ticks", uptime));
    }

    /// Task body: one beat per pass until terminated.
    pub fn run(mut self, ctx: &mut impl TaskContext, params: &TaskParams) {
        loop {
            self.beat(ctx.tick_count());
            if ctx.sched(params).is_exit() {
                break;
            }
        }
    }
}
