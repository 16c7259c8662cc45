//! System log channel.
//!
//! The shared print channel every service writes human-readable status
//! lines to (boot messages, "filesystem error: ..." reports, network
//! outcomes). A console task drains it. Writers never block: when the
//! channel is full the line is dropped and counted.
//!
//! Every line is mirrored to the `log` facade as it is written.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Severity of a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal operation
    Info,
    /// Recoverable problem
    Warn,
    /// Failed operation
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// One line on the system log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Severity
    pub level: LogLevel,
    /// Kernel ticks at the time of writing
    pub uptime: u64,
    /// Service that wrote the line
    pub source: String,
    /// Message text
    pub text: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>10}] {}: {}", self.uptime, self.source, self.text)
    }
}

type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// Bounded, non-blocking system log.
#[derive(Clone)]
pub struct SysLog {
    tx: Sender<LogLine>,
    rx: Receiver<LogLine>,
    dropped: Arc<AtomicU64>,
    clock: Clock,
}

impl SysLog {
    /// Create a log holding at most `depth` undrained lines.
    ///
    /// `clock` supplies the uptime stamp (kernel ticks).
    pub fn new(depth: usize, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(depth.max(1));
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
            clock: Arc::new(clock),
        }
    }

    /// Write a line. Returns false if the channel was full.
    pub fn write(&self, level: LogLevel, source: &str, text: impl Into<String>) -> bool {
        let line = LogLine {
            level,
            uptime: (self.clock)(),
            source: source.to_string(),
            text: text.into(),
        };
        log::log!(level.into(), "{}: {}", line.source, line.text);
        if self.tx.try_send(line).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Write an info line.
    pub fn info(&self, source: &str, text: impl Into<String>) -> bool {
        self.write(LogLevel::Info, source, text)
    }

    /// Write a warning line.
    pub fn warn(&self, source: &str, text: impl Into<String>) -> bool {
        self.write(LogLevel::Warn, source, text)
    }

    /// Write an error line.
    pub fn error(&self, source: &str, text: impl Into<String>) -> bool {
        self.write(LogLevel::Error, source, text)
    }

    /// Take the oldest undrained line.
    pub fn try_next(&self) -> Option<LogLine> {
        self.rx.try_recv().ok()
    }

    /// Take every undrained line.
    pub fn drain(&self) -> Vec<LogLine> {
        self.rx.try_iter().collect()
    }

    /// Lines lost to a full channel since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of undrained lines.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl fmt::Debug for SysLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysLog")
            .field("pending", &self.rx.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_drain_in_order() {
        let log = SysLog::new(4, || 7);
        log.info("storagemanager", "flash0 mounted in /mnt");
        log.error("storagemanager", "filesystem error: entry already exists");

        let lines = log.drain();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].level, LogLevel::Info);
        assert_eq!(lines[1].text, "filesystem error: entry already exists");
        assert_eq!(lines[0].uptime, 7);
        assert!(log.is_empty());
    }

    #[test]
    fn test_full_log_drops_without_blocking() {
        let log = SysLog::new(2, || 0);
        assert!(log.info("a", "1"));
        assert!(log.info("a", "2"));
        assert!(!log.info("a", "3"));
        assert_eq!(log.dropped(), 1);
        assert_eq!(log.try_next().map(|l| l.text), Some("1".to_string()));
    }

    #[test]
    fn test_display_format() {
        let line = LogLine {
            level: LogLevel::Warn,
            uptime: 1500,
            source: "networkmanager".into(),
            text: "not connected".into(),
        };
        assert_eq!(line.to_string(), "[      1500] networkmanager: not connected");
    }
}
