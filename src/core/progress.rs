use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub severity: Severity,
    pub message: String,
}

impl ProgressEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { severity: Severity::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives progress from a running pipeline.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

pub fn log_level(severity: Severity) -> log::Level {
    match severity {
        Severity::Info | Severity::Success => log::Level::Info,
        Severity::Warning => log::Level::Warn,
        Severity::Error => log::Level::Error,
    }
}

/// Mirrors an event to the `log` facade at its severity's level.
pub fn log_event(event: &ProgressEvent) {
    log::log!(log_level(event.severity), "{}", event.message);
}

/// Writes progress to the `log` facade.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: ProgressEvent) {
        log_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_follows_severity() {
        assert_eq!(log_level(Severity::Info), log::Level::Info);
        assert_eq!(log_level(Severity::Success), log::Level::Info);
        assert_eq!(log_level(Severity::Warning), log::Level::Warn);
        assert_eq!(log_level(Severity::Error), log::Level::Error);
    }
}
