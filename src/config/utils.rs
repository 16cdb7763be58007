/// Configuration utilities - loading, environment overrides and access helpers
use super::schemas::Config;
use crate::{arguments, paths};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Served by `with_config` before `load_config` ran (tests, tools)
static FALLBACK: Lazy<Config> = Lazy::new(Config::default);

/// Environment variables that override secrets in the file
pub const ENV_PLATFORM_EMAIL: &str = "PLATFORM_EMAIL";
pub const ENV_PLATFORM_PASSWORD: &str = "PLATFORM_PASSWORD";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_ADMIN_USER_IDS: &str = "ADMIN_USER_IDS";
pub const ENV_PROXY_SERVER: &str = "PROXY_SERVER";

/// `--config <path>` when given, otherwise `data/config.toml` under the app directory
pub fn resolve_config_path() -> PathBuf {
    arguments::get_config_path_override()
        .map(PathBuf::from)
        .unwrap_or_else(paths::get_config_path)
}

/// Load configuration (file, then `.env` / environment) and initialize CONFIG
pub fn load_config() -> Result<(), String> {
    load_config_from_path(&resolve_config_path())
}

pub fn load_config_from_path(path: &Path) -> Result<(), String> {
    let mut config = read_config_file(path)?;

    #[cfg(feature = "env-file")]
    {
        let _ = dotenv::dotenv();
    }
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config)?;

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Parse a config file; a missing file yields defaults
pub fn read_config_file(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        eprintln!(
            "⚠️  Config file '{}' not found, using default values",
            path.display()
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

    parse_config(&contents)
        .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str::<Config>(contents).map_err(|e| e.to_string())
}

/// Apply secret overrides; `lookup` is the environment in production
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(email) = non_empty(ENV_PLATFORM_EMAIL) {
        config.auth.email = email;
    }
    if let Some(password) = non_empty(ENV_PLATFORM_PASSWORD) {
        config.auth.password = password;
    }
    if let Some(token) = non_empty(ENV_TELEGRAM_BOT_TOKEN) {
        config.telegram.bot_token = token;
    }
    if let Some(ids) = non_empty(ENV_ADMIN_USER_IDS) {
        let parsed: Vec<i64> = ids
            .split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .collect();
        if !parsed.is_empty() {
            config.telegram.admin_ids = parsed;
        }
    }
    if let Some(proxy) = non_empty(ENV_PROXY_SERVER) {
        config.browser.proxy = Some(proxy);
    }
}

/// Reject settings that would make the strategy or the loop misbehave
pub fn validate_config(config: &Config) -> Result<(), String> {
    let s = &config.strategy;
    if s.sma_period < 2 {
        return Err(format!("strategy.sma_period must be >= 2, got {}", s.sma_period));
    }
    if s.rsi_period == 0 {
        return Err("strategy.rsi_period must be >= 1".to_string());
    }
    if s.rsi_oversold >= s.rsi_overbought {
        return Err(format!(
            "strategy.rsi_oversold ({}) must be below rsi_overbought ({})",
            s.rsi_oversold, s.rsi_overbought
        ));
    }

    let r = &config.risk;
    if !(r.risk_fraction > 0.0 && r.risk_fraction <= 1.0) {
        return Err(format!("risk.risk_fraction must be in (0, 1], got {}", r.risk_fraction));
    }
    if r.history_capacity == 0 {
        return Err("risk.history_capacity must be >= 1".to_string());
    }

    let t = &config.trading;
    if t.cycle_delay_min_secs > t.cycle_delay_max_secs {
        return Err("trading.cycle_delay_min_secs exceeds cycle_delay_max_secs".to_string());
    }
    if t.settle_min_ms > t.settle_max_ms {
        return Err("trading.settle_min_ms exceeds settle_max_ms".to_string());
    }

    let p = &config.pacing;
    if p.action_delay_min_ms > p.action_delay_max_ms || p.keystroke_min_ms > p.keystroke_max_ms {
        return Err("pacing min bounds must not exceed max bounds".to_string());
    }
    if config.auth.settle_min_secs > config.auth.settle_max_secs {
        return Err("auth.settle_min_secs exceeds settle_max_secs".to_string());
    }

    Ok(())
}

/// Execute a function with read access to the configuration
///
/// ```
/// use tradepilot::config::with_config;
///
/// let period = with_config(|cfg| cfg.strategy.sma_period);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => f(&lock.read()),
        None => f(&FALLBACK),
    }
}

/// Clone of the whole configuration, for holding across await points
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

pub fn is_config_initialized() -> bool {
    CONFIG.get().is_some()
}

/// Write an example config with every default to `path`
pub fn write_default_config(path: &Path) -> Result<(), String> {
    let contents = toml::to_string_pretty(&Config::default())
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))
}
