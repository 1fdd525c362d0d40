//! Tracing setup for the workflow server
//!
//! Console output by default; a daily-rolling file appender when a log
//! directory is configured. Workflow operations log structured fields
//! (booking_id, action, error) rather than formatted strings.

use std::path::Path;

/// Console-only logging at `info`.
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Logging with an optional level override and rolling file output.
///
/// An unparseable level falls back to `info`; a missing log directory
/// falls back to console only so a bad deployment still logs somewhere.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::INFO))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.exists() {
            if let Some(dir_str) = log_path.to_str() {
                let file_appender = tracing_appender::rolling::daily(dir_str, "agency-server");
                subscriber.with_writer(file_appender).init();
                return;
            }
        }
    }

    subscriber.init();
}
