use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::core::progress::{log_event, ProgressEvent, ProgressSink, Severity};

/// Terminal spinner that also prints every progress line with a timestamp
/// and mirrors it to the log.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_line(event: &ProgressEvent, time: &str) -> String {
    let marker = match event.severity {
        Severity::Info => "i",
        Severity::Success => "✓",
        Severity::Warning => "!",
        Severity::Error => "✗",
    };
    format!("[{}] {} {}", time, marker, event.message)
}

impl ProgressSink for SpinnerProgress {
    fn emit(&self, event: ProgressEvent) {
        log_event(&event);
        let time = Local::now().format("%H:%M:%S").to_string();
        self.bar.println(format_line(&event, &time));
        self.bar.set_message(event.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata, Record};
    use std::sync::Mutex;

    struct CaptureLogger {
        records: Mutex<Vec<(Level, String)>>,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            if let Ok(mut records) = self.records.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: CaptureLogger = CaptureLogger {
        records: Mutex::new(Vec::new()),
    };

    #[test]
    fn test_spinner_mirrors_events_to_log() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let spinner = SpinnerProgress::new();
        spinner.emit(ProgressEvent::warning("Could not delete temp narration file"));
        spinner.emit(ProgressEvent::error("Critical error: spinner mirror"));
        spinner.finish();

        let records = CAPTURE.records.lock().unwrap();
        assert!(records.contains(&(
            Level::Warn,
            "Could not delete temp narration file".to_string()
        )));
        assert!(records.contains(&(
            Level::Error,
            "Critical error: spinner mirror".to_string()
        )));
    }

    #[test]
    fn test_format_line_marks_severity() {
        assert_eq!(
            format_line(&ProgressEvent::error("Critical error: boom"), "12:00:01"),
            "[12:00:01] ✗ Critical error: boom"
        );
        assert_eq!(
            format_line(&ProgressEvent::success("Story saved."), "09:30:00"),
            "[09:30:00] ✓ Story saved."
        );
    }
}
