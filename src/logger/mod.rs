//! Structured logging system for TradePilot
//!
//! This module provides a small, ergonomic logging API with:
//! - Automatic debug mode filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + file persistence
//! - A `log` crate bridge so browser-driver and chat-transport records share the same sink
//!
//! ## Usage
//!
//! ```rust
//! use tradepilot::logger::{self, LogTag};
//!
//! logger::error(LogTag::Browser, "WebDriver connection refused");
//! logger::warning(LogTag::Resolver, "Falling back to positional locator");
//! logger::info(LogTag::Trade, "Trade submitted");
//! logger::debug(LogTag::Auth, "Checking challenge markers"); // Only if --debug-auth
//! logger::verbose(LogTag::Resolver, "Probe result: ..."); // Only if --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup (in main.rs):
//! ```rust,ignore
//! logger::init();
//! ```

mod bridge;
mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// This must be called once at application startup, before any logging occurs.
/// It will:
/// 1. Parse command-line arguments for debug flags
/// 2. Initialize file logging
/// 3. Route `log` crate records from dependencies into this logger
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
    bridge::install();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues)
///
/// Warnings are shown by default (unless --quiet is used).
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Debug logs are ONLY shown when --debug-<module> flag is provided.
///
/// # Example
/// ```rust
/// use tradepilot::logger::{self, LogTag};
///
/// // Only shown with --debug-resolver flag
/// logger::debug(LogTag::Resolver, "Strategy 2 matched");
/// ```
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing)
///
/// Verbose logs are ONLY shown when --verbose flag is provided.
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call this during shutdown to ensure all logs are written to disk.
pub fn flush() {
    file::flush_file_logging();
}
