//! Browser session lifecycle
//!
//! `SessionManager::initialize` optionally spawns the WebDriver binary,
//! connects a Chrome session with anti-automation capabilities and a randomized
//! user agent, and returns a Ready `Session`. `close` is idempotent.

use super::driver::Driver;
use super::humanize::HumanPacing;
use crate::config::BrowserConfig;
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

/// User agents picked at random when none is configured
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36 Edg/134.0.0.0",
];

/// Run after every navigation
pub const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        }
    }
}

/// Parsed `host:port` or `user:pass@host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    pub fn parse(raw: &str) -> BotResult<Self> {
        let raw = raw.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };
        let url = url::Url::parse(&with_scheme)
            .map_err(|e| BotError::Config(format!("Invalid proxy '{}': {}", raw, e)))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| BotError::Config(format!("Proxy '{}' has no host", raw)))?
            .to_string();
        let port = url
            .port()
            .ok_or_else(|| BotError::Config(format!("Proxy '{}' has no port", raw)))?;
        let username = Some(url.username().to_string()).filter(|u| !u.is_empty());
        let password = url.password().map(|p| p.to_string());

        Ok(Self {
            host,
            port,
            username,
            password,
        })
    }

    pub fn server_arg(&self) -> String {
        format!("--proxy-server=http://{}:{}", self.host, self.port)
    }
}

/// Everything a launcher needs to open the browser
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub webdriver_url: String,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_args: Vec<String>,
}

impl LaunchOptions {
    pub fn from_config(config: &BrowserConfig, user_agent: &str) -> BotResult<Self> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            format!("--window-size={},{}", config.window_width, config.window_height),
            format!("--user-agent={}", user_agent),
        ];
        if config.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(raw) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = ProxySettings::parse(raw)?;
            if proxy.username.is_some() {
                logger::warning(
                    LogTag::Browser,
                    "Proxy credentials are not passed to Chrome; the proxy must accept the connection without them",
                );
            }
            args.push(proxy.server_arg());
        }
        if let Some(dir) = config.profile_dir.as_deref().filter(|d| !d.is_empty()) {
            args.push(format!("--user-data-dir={}", dir));
        }

        Ok(Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: user_agent.to_string(),
            window_width: config.window_width,
            window_height: config.window_height,
            chrome_args: args,
        })
    }

    /// W3C capabilities with the automation flags switched off
    pub fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": self.chrome_args,
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }),
        );
        caps
    }
}

/// Opens a browser session and hands back its driver
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> BotResult<Box<dyn Driver>>;
}

pub struct Session {
    driver: Box<dyn Driver>,
    state: SessionState,
    user_agent: String,
    authenticated: bool,
    pacing: HumanPacing,
    driver_process: Option<Child>,
}

impl Session {
    /// Ready session around an already-connected driver
    pub fn new(driver: Box<dyn Driver>, user_agent: &str, pacing: HumanPacing) -> Self {
        Self {
            driver,
            state: SessionState::Ready,
            user_agent: user_agent.to_string(),
            authenticated: false,
            pacing,
            driver_process: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn pacing(&self) -> &HumanPacing {
        &self.pacing
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, value: bool) {
        self.authenticated = value;
    }

    /// Driver of a Ready session
    pub fn driver(&self) -> BotResult<&dyn Driver> {
        match self.state {
            SessionState::Ready => Ok(self.driver.as_ref()),
            _ => Err(BotError::SessionClosed),
        }
    }

    /// Navigate, then hide `navigator.webdriver` on the new document
    pub async fn goto(&self, url: &str) -> BotResult<()> {
        let driver = self.driver()?;
        driver.goto(url).await?;
        self.hide_automation().await;
        Ok(())
    }

    pub async fn hide_automation(&self) {
        if let Ok(driver) = self.driver() {
            if let Err(e) = driver.execute_script(HIDE_WEBDRIVER_SCRIPT).await {
                logger::debug(
                    LogTag::Browser,
                    &format!("Failed to hide navigator.webdriver: {}", e),
                );
            }
        }
    }

    /// Write a PNG of the viewport to `path`, creating parent directories
    pub async fn save_screenshot(&self, path: &Path) -> BotResult<()> {
        let png = self.driver()?.screenshot().await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, png).await?;
        logger::debug(
            LogTag::Browser,
            &format!("Screenshot saved to {}", path.display()),
        );
        Ok(())
    }

    fn attach_process(&mut self, child: Child) {
        self.driver_process = Some(child);
    }
}

#[derive(Clone)]
pub struct SessionManager {
    launcher: Arc<dyn SessionLauncher>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self { launcher }
    }

    /// Manager backed by the fantoccini WebDriver client
    pub fn webdriver() -> Self {
        Self::new(Arc::new(super::webdriver::FantocciniLauncher))
    }

    pub async fn initialize(
        &self,
        config: &BrowserConfig,
        pacing: HumanPacing,
    ) -> BotResult<Session> {
        let user_agent = pick_user_agent(config.user_agent.as_deref());
        let options = LaunchOptions::from_config(config, &user_agent)
            .map_err(|e| BotError::DriverInitFailed(e.to_string()))?;

        logger::info(
            LogTag::Browser,
            &format!(
                "Starting browser session (headless: {}, endpoint: {})",
                config.headless, options.webdriver_url
            ),
        );
        logger::debug(LogTag::Browser, &format!("User agent: {}", user_agent));

        let mut process = if config.spawn_driver {
            Some(spawn_driver_process(config)?)
        } else {
            None
        };

        let driver = match self.connect(config, &options, process.is_some()).await {
            Ok(driver) => driver,
            Err(e) => {
                if let Some(child) = process.as_mut() {
                    let _ = child.kill().await;
                }
                logger::error(LogTag::Browser, &format!("Browser session failed: {}", e));
                return Err(e);
            }
        };

        let mut session = Session::new(driver, &user_agent, pacing);
        if let Some(child) = process {
            session.attach_process(child);
        }
        session.hide_automation().await;

        logger::info(LogTag::Browser, "Browser session ready");
        Ok(session)
    }

    /// Connect, retrying while a freshly spawned driver is still starting
    async fn connect(
        &self,
        config: &BrowserConfig,
        options: &LaunchOptions,
        spawned: bool,
    ) -> BotResult<Box<dyn Driver>> {
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs(config.driver_startup_timeout_secs);

        loop {
            match self.launcher.launch(options).await {
                Ok(driver) => return Ok(driver),
                Err(e) if spawned && tokio::time::Instant::now() < deadline => {
                    logger::debug(
                        LogTag::Browser,
                        &format!("WebDriver not accepting sessions yet: {}", e),
                    );
                    tokio::time::sleep(Duration::from_millis(250)).await;
                }
                Err(BotError::DriverInitFailed(msg)) => return Err(BotError::DriverInitFailed(msg)),
                Err(e) => return Err(BotError::DriverInitFailed(e.to_string())),
            }
        }
    }

    /// Quit the browser and stop the driver; no-op for `None` or a closed session
    pub async fn close(session: Option<&mut Session>) {
        let Some(session) = session else {
            return;
        };
        if session.state == SessionState::Closed {
            return;
        }

        if session.state == SessionState::Ready {
            if let Err(e) = session.driver.quit().await {
                logger::warning(LogTag::Browser, &format!("Browser quit failed: {}", e));
            }
        }
        if let Some(mut child) = session.driver_process.take() {
            if let Err(e) = child.kill().await {
                logger::warning(LogTag::Browser, &format!("Failed to stop WebDriver: {}", e));
            }
        }

        session.state = SessionState::Closed;
        session.authenticated = false;
        logger::info(LogTag::Browser, "Browser session closed");
    }
}

pub fn pick_user_agent(configured: Option<&str>) -> String {
    if let Some(ua) = configured.filter(|ua| !ua.trim().is_empty()) {
        return ua.to_string();
    }
    USER_AGENT_POOL
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENT_POOL[0])
        .to_string()
}

fn spawn_driver_process(config: &BrowserConfig) -> BotResult<Child> {
    let port = url::Url::parse(&config.webdriver_url)
        .ok()
        .and_then(|u| u.port_or_known_default())
        .unwrap_or(9515);

    logger::debug(
        LogTag::Browser,
        &format!("Spawning {} on port {}", config.driver_path, port),
    );

    Command::new(&config.driver_path)
        .arg(format!("--port={}", port))
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            BotError::DriverInitFailed(format!("Failed to spawn '{}': {}", config.driver_path, e))
        })
}
