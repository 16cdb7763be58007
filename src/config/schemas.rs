/// Configuration schemas - every section defined once with its defaults
use crate::config_struct;

// ============================================================================
// BROWSER
// ============================================================================

config_struct! {
    /// Browser session and anti-detection settings
    pub struct BrowserConfig {
        headless: bool = true,
        /// Fixed user agent; a random one from the built-in pool when empty
        user_agent: Option<String> = None,
        /// `host:port` or `user:pass@host:port`
        proxy: Option<String> = None,
        window_width: u32 = 1920,
        window_height: u32 = 1080,
        /// WebDriver endpoint the session connects to
        webdriver_url: String = "http://localhost:9515".to_string(),
        /// Spawn the driver binary before connecting
        spawn_driver: bool = true,
        driver_path: String = "chromedriver".to_string(),
        driver_startup_timeout_secs: u64 = 10,
        /// Persistent browser profile; cookies survive restarts
        profile_dir: Option<String> = None,
        /// Default resolve timeout for UI targets
        element_timeout_secs: u64 = 30,
    }
}

// ============================================================================
// PLATFORM
// ============================================================================

config_struct! {
    /// Trading platform URLs
    pub struct PlatformConfig {
        base_url: String = "https://quotex.com".to_string(),
        login_path: String = "/sign-in".to_string(),
        /// `{asset}` is replaced with the upper-cased asset symbol
        trading_path: String = "/trading/{asset}".to_string(),
        /// Any of these in the current URL means we are still on the login page
        login_url_markers: Vec<String> = vec!["/login".to_string(), "/sign-in".to_string()],
    }
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

config_struct! {
    /// Login flow settings
    pub struct AuthConfig {
        email: String = String::new(),
        password: String = String::new(),
        /// Overall verification timeout after submit
        timeout_secs: u64 = 30,
        challenge_title_markers: Vec<String> = vec!["Just a moment".to_string()],
        challenge_body_markers: Vec<String> = vec!["Checking your browser".to_string()],
        challenge_wait_secs: u64 = 15,
        challenge_max_checks: u32 = 3,
        settle_min_secs: u64 = 10,
        settle_max_secs: u64 = 15,
        dismiss_cookie_banner: bool = true,
        debug_screenshots: bool = false,
    }
}

// ============================================================================
// HUMAN PACING
// ============================================================================

config_struct! {
    /// Randomized delays between UI actions and keystrokes
    pub struct PacingConfig {
        enabled: bool = true,
        action_delay_min_ms: u64 = 1000,
        action_delay_max_ms: u64 = 3000,
        keystroke_min_ms: u64 = 50,
        keystroke_max_ms: u64 = 200,
    }
}

// ============================================================================
// STRATEGY
// ============================================================================

config_struct! {
    /// SMA/RSI signal parameters
    pub struct StrategyConfig {
        sma_period: usize = 20,
        rsi_period: usize = 14,
        rsi_overbought: f64 = 70.0,
        rsi_oversold: f64 = 30.0,
    }
}

// ============================================================================
// RISK
// ============================================================================

config_struct! {
    /// Position sizing and loss-streak circuit breaker
    pub struct RiskConfig {
        /// Fraction of balance risked per trade
        risk_fraction: f64 = 0.02,
        /// Platform minimum tradable amount
        min_trade_amount: f64 = 1.0,
        max_consecutive_losses: usize = 3,
        history_capacity: usize = 100,
    }
}

// ============================================================================
// TRADING LOOP
// ============================================================================

config_struct! {
    /// Decision loop timing and defaults
    pub struct TradingConfig {
        default_asset: String = "EURUSD".to_string(),
        default_trade_amount: f64 = 1.0,
        /// Start the decision loop right after a successful /start
        auto_trade: bool = true,
        cycle_delay_min_secs: u64 = 120,
        cycle_delay_max_secs: u64 = 300,
        error_retry_secs: u64 = 60,
        risk_cooldown_secs: u64 = 60,
        /// Seconds after submission before a pending trade is settled from the balance
        trade_expiry_secs: u64 = 60,
        settle_min_ms: u64 = 3000,
        settle_max_ms: u64 = 5000,
    }
}

// ============================================================================
// TELEGRAM
// ============================================================================

config_struct! {
    /// Telegram bot transport
    pub struct TelegramConfig {
        enabled: bool = true,
        bot_token: String = String::new(),
        /// Chat user ids allowed to issue commands; also notification recipients
        admin_ids: Vec<i64> = Vec::new(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Root configuration, one field per `[section]` of config.toml
    pub struct Config {
        browser: BrowserConfig = BrowserConfig::default(),
        platform: PlatformConfig = PlatformConfig::default(),
        auth: AuthConfig = AuthConfig::default(),
        pacing: PacingConfig = PacingConfig::default(),
        strategy: StrategyConfig = StrategyConfig::default(),
        risk: RiskConfig = RiskConfig::default(),
        trading: TradingConfig = TradingConfig::default(),
        telegram: TelegramConfig = TelegramConfig::default(),
    }
}

impl PlatformConfig {
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }

    pub fn trading_url(&self, asset: &str) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.trading_path.replace("{asset}", &asset.to_uppercase())
        )
    }
}
