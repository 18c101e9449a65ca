//! Pipeline log streaming.
//!
//! Every pipeline step reports progress through a process-wide broadcast
//! channel. Hosts embedding the library can [`LogBroadcaster::subscribe`]
//! to receive entries as they happen. Entries are also echoed to stderr,
//! which keeps stdout free for document output; the CLI turns the echo
//! off with `--quiet`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entries kept for a lagging subscriber before it starts missing some.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => " ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠️",
            LogLevel::Error => "❌",
        }
    }
}

/// One progress message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth; per-processor and per-table messages sit one level in.
    #[serde(default)]
    pub indent: u8,
    pub at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), indent: 0, at: Utc::now() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn indented(self, indent: u8) -> Self {
        Self { indent, ..self }
    }
}

/// The stderr rendering: three spaces per indent level, then the marker.
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = usize::from(self.indent + 1) * 3;
        write!(f, "{:pad$}{} {}", "", self.level.marker(), self.message)
    }
}

/// Shared by every pipeline in the process.
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to subscribers and optionally to stderr.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
    echo: AtomicBool,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, echo: AtomicBool::new(true) }
    }

    pub fn set_echo(&self, enabled: bool) {
        self.echo.store(enabled, Ordering::Relaxed);
    }

    pub fn log(&self, entry: LogEntry) {
        if self.echo.load(Ordering::Relaxed) {
            eprintln!("{entry}");
        }
        // Sending only fails when nobody subscribed.
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

fn emit(level: LogLevel, message: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(level, message).indented(indent));
}

pub fn log_info(msg: impl Into<String>) {
    emit(LogLevel::Info, msg, 0);
}

pub fn log_success(msg: impl Into<String>) {
    emit(LogLevel::Success, msg, 0);
}

pub fn log_warning(msg: impl Into<String>) {
    emit(LogLevel::Warning, msg, 0);
}

pub fn log_error(msg: impl Into<String>) {
    emit(LogLevel::Error, msg, 0);
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    emit(LogLevel::Info, msg, indent);
}

pub fn log_success_indent(msg: impl Into<String>, indent: u8) {
    emit(LogLevel::Success, msg, indent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_receives_entries() {
        let broadcaster = LogBroadcaster::new();
        broadcaster.set_echo(false);
        let mut rx = broadcaster.subscribe();

        broadcaster.log(LogEntry::success("3 documents").indented(1));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Success);
        assert_eq!(entry.message, "3 documents");
        assert_eq!(entry.indent, 1);
    }

    #[test]
    fn test_entry_wire_format() {
        let json = serde_json::to_value(LogEntry::warning("skipped")).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["indent"], 0);
        assert!(json["at"].is_string());
    }

    #[test]
    fn test_display() {
        assert_eq!(LogEntry::success("done").to_string(), "   ✓ done");
        assert_eq!(LogEntry::info("table").indented(1).to_string(), "        table");
    }

    #[test]
    fn test_log_without_subscribers() {
        let broadcaster = LogBroadcaster::default();
        broadcaster.set_echo(false);
        broadcaster.log(LogEntry::info("nobody listening"));
    }
}
