//! Logger configuration derived from command-line flags

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,
    /// Tags with --debug-<tag>
    pub debug_tags: HashSet<String>,
    /// Tags with --verbose-<tag>
    pub verbose_tags: HashSet<String>,
    /// If non-empty, only these tags are printed (errors always pass)
    pub enabled_tags: HashSet<String>,
    pub console_enabled: bool,
    pub file_enabled: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            console_enabled: true,
            file_enabled: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    match LOGGER_CONFIG.read() {
        Ok(guard) => guard.clone(),
        Err(_) => LoggerConfig::default(),
    }
}

pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut guard) = LOGGER_CONFIG.write() {
        *guard = config;
    }
}

pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(f: F) {
    if let Ok(mut guard) = LOGGER_CONFIG.write() {
        f(&mut guard);
    }
}

/// Build the logger configuration from the process arguments
///
/// Recognized flags:
/// - `--debug-<tag>` / `--debug-all`
/// - `--verbose` / `--verbose-<tag>`
/// - `--quiet` (errors only)
/// - `--only-<tag>` (restrict console to listed tags)
/// - `--no-log-file`
pub fn init_from_args() {
    let args = arguments::get_cmd_args();
    let mut config = LoggerConfig::default();

    for arg in &args {
        if arg == "--verbose" {
            config.min_level = LogLevel::Verbose;
        } else if arg == "--quiet" {
            config.min_level = LogLevel::Error;
        } else if arg == "--no-log-file" {
            config.file_enabled = false;
        } else if arg == "--debug-all" {
            for key in LogTag::all_keys() {
                config.debug_tags.insert((*key).to_string());
            }
        } else if let Some(tag) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(tag.to_lowercase());
        } else if let Some(tag) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(tag.to_lowercase());
        } else if let Some(tag) = arg.strip_prefix("--only-") {
            config.enabled_tags.insert(tag.to_lowercase());
        }
    }

    set_logger_config(config);
}

pub(super) fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    let key = tag.to_debug_key();
    config.debug_tags.contains(&key) || config.verbose_tags.contains(&key)
}

pub(super) fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
        .verbose_tags
        .contains(&tag.to_debug_key())
}
