//! Logger module
//!
//! Provides logging utilities for the module server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Preload resolution logging
//! - Error and warning logging with a minimum level

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, StaticRoot};
use std::net::SocketAddr;

/// Log severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parse a configured level name; unknown names fall back to `Info`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
        Level::parse(&config.logging.level),
    )
}

fn enabled(level: Level) -> bool {
    level >= writer::get().map_or(Level::Info, writer::LogWriter::level)
}

/// Write to info/access log
fn write_info(message: &str) {
    if !enabled(Level::Info) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(level: Level, message: &str) {
    if !enabled(level) {
        return;
    }
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, root: &StaticRoot) {
    write_info("======================================");
    write_info("Module preload server started");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Static root: {}", root.dir().display()));
    if config.preload.enabled {
        write_info(&format!(
            "Preload: enabled for .{} (dynamic imports: {})",
            config.preload.extensions.join(", ."),
            if config.preload.follow_dynamic_imports { "followed" } else { "ignored" }
        ));
    } else {
        write_info("Preload: disabled");
    }
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

pub fn log_shutdown_requested(signal: &str) {
    write_info(&format!("\n[Shutdown] {signal} received, stopping server"));
}

pub fn log_server_stopped(active_connections: usize) {
    write_info(&format!(
        "[Shutdown] Listener closed, {active_connections} connection(s) still finishing"
    ));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(Level::Error, &format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_debug(message: &str) {
    if enabled(Level::Debug) {
        match writer::get() {
            Some(w) => w.write_info(&format!("[DEBUG] {message}")),
            None => println!("[DEBUG] {message}"),
        }
    }
}

pub fn log_headers_count(count: usize, show: bool) {
    if show {
        write_info(&format!("[Headers] Count: {count}"));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

pub fn log_preload_resolved(path: &str, modules: usize, externals: usize) {
    log_debug(&format!(
        "[PRELOAD] {path}: {} dependenc{} resolved, {externals} external",
        modules.saturating_sub(1),
        if modules == 2 { "y" } else { "ies" }
    ));
}

pub fn log_preload_failed(path: &str, err: &impl std::fmt::Display) {
    log_warning(&format!("[PRELOAD] {path}: skipping link header: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("debug"), Level::Debug);
        assert_eq!(Level::parse("WARN"), Level::Warn);
        assert_eq!(Level::parse("error"), Level::Error);
        assert_eq!(Level::parse("info"), Level::Info);
        assert_eq!(Level::parse("verbose"), Level::Info);
    }

    #[test]
    fn test_level_order() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Warn < Level::Error);
    }
}
