//! Centralized path resolution for TradePilot
//!
//! All file and directory paths are resolved through this module.
//!
//! ## Directory Structure
//!
//! ```text
//! <data_local_dir>/TradePilot/
//! ├── data/
//! │   └── config.toml
//! ├── logs/
//! │   └── tradepilot_*.log
//! ├── screenshots/
//! │   └── trade_<unix>.png
//! └── browser-profile/
//! ```

use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Lazy-initialized base directory (thread-safe)
static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(resolve_base_directory);

/// Platform application-data location, falling back to home and then cwd
fn resolve_base_directory() -> PathBuf {
    const APP_DIR: &str = "TradePilot";

    if let Ok(dir) = std::env::var("TRADEPILOT_HOME") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(APP_DIR);
    }

    PathBuf::from(APP_DIR)
}

pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

/// Trade screenshots (diagnostics and notification payload)
pub fn get_screenshots_directory() -> PathBuf {
    BASE_DIRECTORY.join("screenshots")
}

/// Default browser profile directory (cookies survive restarts)
pub fn get_browser_profile_directory() -> PathBuf {
    BASE_DIRECTORY.join("browser-profile")
}

pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.toml")
}

/// `screenshots/<prefix>_<unix>.png`
pub fn screenshot_path(prefix: &str, unix_ts: i64) -> PathBuf {
    get_screenshots_directory().join(format!("{}_{}.png", prefix, unix_ts))
}

/// Create every directory the bot writes into
pub fn ensure_all_directories() -> Result<(), String> {
    for dir in [
        get_data_directory(),
        get_logs_directory(),
        get_screenshots_directory(),
    ] {
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_path_layout() {
        let path = screenshot_path("trade", 1_700_000_000);
        assert!(path.ends_with("screenshots/trade_1700000000.png"));
        assert!(path.starts_with(get_base_directory()));
    }
}
