//! Bot controller
//!
//! Owns the optional browser session, the trading loop and the shared risk
//! manager. Every operator command ends up in one of the methods below; each
//! returns the HTML reply to send back, or a `BotError` that the command
//! dispatcher turns into a user message.

use crate::browser::{ElementResolver, HumanPacing, SessionHandle, SessionManager, SessionState};
use crate::config::Config;
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use crate::notifications::{dispatch, escape_html, Notification, Notifier, TradeOrigin};
use crate::paths;
use crate::platform::{
    account, AuthOutcome, AuthSettings, AuthenticationFlow, Credentials, Direction,
    MarketDataReader, TradeExecutor,
};
use crate::trading::{
    capture_trade_screenshot, LoopControl, LoopSettings, OperatorActivity, RiskManager,
    StrategyEngine, TradingLoop,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct ControllerState {
    session: Option<SessionHandle>,
    trading: Option<LoopControl>,
    last_auth: Option<AuthOutcome>,
}

pub struct BotController {
    config: Config,
    sessions: SessionManager,
    notifier: Arc<dyn Notifier>,
    resolver: ElementResolver,
    reader: MarketDataReader,
    executor: TradeExecutor,
    risk: Arc<Mutex<RiskManager>>,
    operator_activity: OperatorActivity,
    screenshot_dir: PathBuf,
    state: tokio::sync::Mutex<ControllerState>,
}

impl BotController {
    pub fn new(
        config: Config,
        sessions: SessionManager,
        notifier: Arc<dyn Notifier>,
        screenshot_dir: PathBuf,
    ) -> Self {
        let resolver = ElementResolver::default();
        Self {
            reader: MarketDataReader::from_config(&config, resolver.clone()),
            executor: TradeExecutor::from_config(&config, resolver.clone()),
            risk: Arc::new(Mutex::new(RiskManager::new(&config.risk))),
            operator_activity: OperatorActivity::default(),
            resolver,
            config,
            sessions,
            notifier,
            screenshot_dir,
            state: tokio::sync::Mutex::new(ControllerState::default()),
        }
    }

    /// Real browser, screenshots under the data directory
    pub fn from_config(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            config,
            SessionManager::webdriver(),
            notifier,
            paths::get_screenshots_directory(),
        )
    }

    pub fn risk(&self) -> Arc<Mutex<RiskManager>> {
        self.risk.clone()
    }

    fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.config.browser.element_timeout_secs)
    }

    /// Launch the browser if needed, log in and start the loop when enabled
    pub async fn start(&self) -> BotResult<String> {
        let mut state = self.state.lock().await;

        let live = state.session.as_ref().filter(|h| h.is_alive()).cloned();
        let handle = match live {
            Some(handle) if handle.snapshot().authenticated => {
                let loop_note = self.ensure_trading_loop(&mut state, &handle);
                return Ok(format!(
                    "✅ <b>Already connected</b>\n\n{}",
                    loop_note
                ));
            }
            Some(handle) => handle,
            None => {
                logger::info(LogTag::System, "Starting browser session");
                let session = self
                    .sessions
                    .initialize(
                        &self.config.browser,
                        HumanPacing::from_config(&self.config.pacing),
                    )
                    .await?;
                let handle = SessionHandle::spawn(session);
                state.session = Some(handle.clone());
                handle
            }
        };

        let Some(credentials) = Credentials::from_config(&self.config) else {
            logger::warning(LogTag::Auth, "No platform credentials configured");
            dispatch(
                self.notifier.clone(),
                Notification::SessionStarted {
                    authenticated: false,
                },
            );
            return Ok("🟡 <b>Browser started</b>\n\n\
                 No platform email/password configured, so login was skipped."
                .to_string());
        };

        let settings = AuthSettings::from_config(&self.config);
        let resolver = self.resolver.clone();
        let outcome = handle
            .run(move |session| {
                Box::pin(async move {
                    let mut flow = AuthenticationFlow::new(settings, resolver);
                    flow.login(session, &credentials).await;
                    Ok(flow.outcome())
                })
            })
            .await?;
        state.last_auth = Some(outcome.clone());

        dispatch(
            self.notifier.clone(),
            Notification::SessionStarted {
                authenticated: outcome.authenticated,
            },
        );

        if !outcome.authenticated {
            let reason = outcome
                .error
                .clone()
                .unwrap_or_else(|| "no login confirmation appeared".to_string());
            logger::warning(LogTag::Auth, &format!("Login failed: {}", reason));
            return Ok(format!(
                "❌ <b>Login failed</b>\n\n{}\n\n\
                 The browser stays open. Fix the problem and send /start again.",
                escape_html(&reason)
            ));
        }

        let signal = outcome
            .signal
            .map(|s| s.as_str())
            .unwrap_or("unknown signal");
        let loop_note = self.ensure_trading_loop(&mut state, &handle);
        Ok(format!(
            "✅ <b>Connected</b>\n\nLogged in (confirmed by {}).\n{}",
            signal, loop_note
        ))
    }

    fn ensure_trading_loop(&self, state: &mut ControllerState, handle: &SessionHandle) -> String {
        if !self.config.trading.auto_trade {
            return "Automatic trading is off.".to_string();
        }
        if state.trading.as_ref().map(|c| c.is_active()).unwrap_or(false) {
            return "Trading loop is running.".to_string();
        }

        let strategy = match StrategyEngine::new(&self.config.strategy) {
            Ok(strategy) => strategy,
            Err(e) => {
                logger::error(LogTag::Strategy, &format!("Trading loop not started: {}", e));
                return format!(
                    "Trading loop not started: {}",
                    escape_html(&e.user_message())
                );
            }
        };
        let trading = TradingLoop::new(
            handle.clone(),
            self.reader.clone(),
            self.executor.clone(),
            strategy,
            self.risk.clone(),
            self.notifier.clone(),
            LoopSettings::from_config(&self.config, self.screenshot_dir.clone()),
        )
        .with_operator_activity(self.operator_activity.clone());
        state.trading = Some(trading.spawn());
        "Trading loop started.".to_string()
    }

    pub async fn status(&self) -> String {
        let Ok(state) = self.state.try_lock() else {
            return "⏳ <b>Busy</b>\n\nA start or stop is in progress.".to_string();
        };

        let snapshot = state
            .session
            .as_ref()
            .filter(|h| h.is_alive())
            .map(|h| h.snapshot());
        let Some(snapshot) = snapshot else {
            return "🔴 <b>Not connected</b>\n\nUse /start to connect.".to_string();
        };

        let ready = snapshot.state == SessionState::Ready;
        let looping = state
            .trading
            .as_ref()
            .map(|c| c.is_active())
            .unwrap_or(false);
        let emoji = match (ready && snapshot.authenticated, looping) {
            (true, true) => "🟢",
            (true, false) => "🟡",
            _ => "🔴",
        };
        let mut text = format!(
            "{} <b>Status</b>\n\n\
             Browser: {}\n\
             Logged in: {}\n\
             Trading loop: {}\n\
             Trades recorded: {}",
            emoji,
            snapshot.state.as_str(),
            if snapshot.authenticated { "yes" } else { "no" },
            if looping { "running" } else { "stopped" },
            self.risk.lock().history_len()
        );
        if let Some(auth) = state.last_auth.as_ref().filter(|a| !a.authenticated) {
            text.push_str(&format!("\nLast login: {}", auth.state));
        }
        text
    }

    /// Live session handle, or `SessionClosed`
    async fn session(&self) -> BotResult<SessionHandle> {
        let state = self.state.lock().await;
        state
            .session
            .as_ref()
            .filter(|h| h.is_alive() && h.snapshot().state == SessionState::Ready)
            .cloned()
            .ok_or(BotError::SessionClosed)
    }

    pub async fn balance(&self) -> BotResult<String> {
        let handle = self.session().await?;
        let reader = self.reader.clone();
        let balance = handle
            .run(move |session| Box::pin(async move { reader.get_balance(session).await }))
            .await?;
        Ok(format!("💰 <b>Balance</b>\n\n${:.2}", balance))
    }

    pub async fn trade(&self, asset: &str, direction: Direction, amount: f64) -> BotResult<String> {
        let handle = self.session().await?;
        logger::info(
            LogTag::Commands,
            &format!("Operator trade: {} {} {:.2}", asset, direction, amount),
        );

        let executor = self.executor.clone();
        let dir = self.screenshot_dir.clone();
        let asset_owned = asset.to_string();
        let (order, screenshot) = handle
            .run(move |session| {
                Box::pin(async move {
                    let order = executor
                        .submit(session, &asset_owned, direction, amount)
                        .await?;
                    let screenshot = capture_trade_screenshot(session, &dir).await;
                    Ok((order, screenshot))
                })
            })
            .await?;
        self.operator_activity.record_trade();

        dispatch(
            self.notifier.clone(),
            Notification::TradePlaced {
                asset: order.asset().to_string(),
                direction: order.direction(),
                amount: order.amount(),
                price: None,
                origin: TradeOrigin::Operator,
                screenshot,
            },
        );

        Ok(format!(
            "✅ <b>Trade placed</b>\n\n\
             {} {} for ${:.2}\n\n\
             <i>Click sequence completed; not confirmed by the platform.</i>",
            escape_html(order.asset()),
            order.direction(),
            order.amount()
        ))
    }

    pub async fn demo(&self) -> BotResult<String> {
        let handle = self.session().await?;
        let resolver = self.resolver.clone();
        let timeout = self.element_timeout();
        handle
            .run(move |session| {
                Box::pin(async move { account::switch_to_demo(session, &resolver, timeout).await })
            })
            .await?;
        Ok("🧪 <b>Demo account selected</b>".to_string())
    }

    pub fn stats(&self) -> String {
        let stats = self.risk.lock().get_trade_stats();
        if stats.total_trades == 0 {
            return "📊 <b>No trades recorded yet</b>".to_string();
        }
        let profit_factor = if stats.profit_factor.is_infinite() {
            "∞".to_string()
        } else {
            format!("{:.2}", stats.profit_factor)
        };
        format!(
            "📊 <b>Trade statistics</b>\n\n\
             Trades: {}\n\
             Win rate: {:.2}%\n\
             Profit factor: {}\n\
             Average win: ${:.2}\n\
             Average loss: ${:.2}",
            stats.total_trades,
            stats.win_rate,
            profit_factor,
            stats.average_win,
            stats.average_loss
        )
    }

    pub fn help(&self) -> String {
        "🤖 <b>Commands</b>\n\n\
         /start - Open the browser and log in\n\
         /status - Session and trading loop state\n\
         /balance - Current account balance\n\
         /trade ASSET call|put [amount] - Place a trade\n\
         /stats - Win rate and profit factor\n\
         /demo - Switch to the demo account\n\
         /stop - Stop trading and close the browser\n\
         /help - This message"
            .to_string()
    }

    /// Stop the loop and close the browser
    pub async fn stop(&self) -> String {
        if self.teardown().await {
            dispatch(self.notifier.clone(), Notification::SessionStopped);
            "🛑 <b>Stopped</b>\n\nTrading stopped and connection closed.".to_string()
        } else {
            "ℹ️ Nothing to stop, the bot is not running.".to_string()
        }
    }

    /// Process exit path; same as `stop` without notifying
    pub async fn shutdown(&self) {
        self.teardown().await;
    }

    async fn teardown(&self) -> bool {
        let mut state = self.state.lock().await;
        let trading = state.trading.take();
        let session = state.session.take();
        state.last_auth = None;
        let had_anything = trading.is_some() || session.is_some();

        if let Some(trading) = trading {
            trading.stop_and_wait().await;
        }
        if let Some(handle) = session {
            if let Err(e) = handle.close().await {
                logger::debug(LogTag::Browser, &format!("Session already closed: {}", e));
            }
        }
        if had_anything {
            logger::info(LogTag::System, "Trading stopped and session closed");
        }
        had_anything
    }
}
