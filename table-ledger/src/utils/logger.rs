//! Logging Infrastructure
//!
//! Structured logging setup with support for both development and production environments.

use std::path::Path;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// Safe to call more than once: the first subscriber stays installed and
/// later calls only leave a debug line through it.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::INFO))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    // Add file output if log_dir exists
    let file_dir = log_dir.filter(|dir| Path::new(dir).is_dir());
    let result = match file_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "table-ledger");
            subscriber.with_writer(file_appender).try_init()
        }
        None => subscriber.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed, keeping it");
        return;
    }
    if let (Some(dir), None) = (log_dir, file_dir) {
        tracing::warn!(log_dir = dir, "Log directory not found, logging to stdout only");
    }
}
