//! Continuous decision loop
//!
//! Each cycle reads the balance, asks the risk manager for permission, feeds
//! the current price to the strategy and submits a trade on a signal. Every
//! browser step is a job on the session owner, so operator commands slot in
//! between the loop's steps. Errors never end the loop: they are logged and
//! followed by the retry delay.
//!
//! Trades are settled from the balance: once `trade_expiry` has passed, the
//! next balance read turns the pending trade into a `TradeRecord`. An
//! unchanged balance is a draw, and a manual trade placed within one expiry
//! of the pending trade makes the change unattributable; neither is recorded.

use super::risk::RiskManager;
use super::strategy::StrategyEngine;
use super::types::{Settlement, Signal, TradeRecord, TradeResult};
use crate::browser::{DelayRange, SessionHandle};
use crate::config::Config;
use crate::errors::BotResult;
use crate::logger::{self, LogTag};
use crate::notifications::{dispatch, Notification, Notifier, TradeOrigin};
use crate::platform::{Direction, MarketDataReader, TradeExecutor, TradeOrder};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub asset: String,
    pub cycle_delay: DelayRange,
    pub error_retry: Duration,
    pub risk_cooldown: Duration,
    pub trade_expiry: Duration,
    pub screenshot_dir: PathBuf,
}

impl LoopSettings {
    pub fn from_config(config: &Config, screenshot_dir: PathBuf) -> Self {
        let trading = &config.trading;
        Self {
            asset: trading.default_asset.trim().to_uppercase(),
            cycle_delay: DelayRange::from_secs(
                trading.cycle_delay_min_secs,
                trading.cycle_delay_max_secs,
            ),
            error_retry: Duration::from_secs(trading.error_retry_secs),
            risk_cooldown: Duration::from_secs(trading.risk_cooldown_secs),
            trade_expiry: Duration::from_secs(trading.trade_expiry_secs),
            screenshot_dir,
        }
    }
}

/// Submitted but not yet settled
#[derive(Debug, Clone)]
struct PendingTrade {
    order: TradeOrder,
    balance_before: f64,
    submitted_at: Instant,
}

/// Last time a trade was placed outside the loop
#[derive(Debug, Clone, Default)]
pub struct OperatorActivity(Arc<Mutex<Option<Instant>>>);

impl OperatorActivity {
    pub fn record_trade(&self) {
        *self.0.lock() = Some(Instant::now());
    }

    pub fn last_trade(&self) -> Option<Instant> {
        *self.0.lock()
    }
}

enum CycleOutcome {
    Completed,
    Cooldown,
}

pub struct TradingLoop {
    handle: SessionHandle,
    reader: MarketDataReader,
    executor: TradeExecutor,
    strategy: StrategyEngine,
    risk: Arc<Mutex<RiskManager>>,
    notifier: Arc<dyn Notifier>,
    settings: LoopSettings,
    pending: Option<PendingTrade>,
    pause_notified: bool,
    operator_activity: OperatorActivity,
}

/// Owner-side control of a spawned loop
pub struct LoopControl {
    stop_tx: watch::Sender<bool>,
    active: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl LoopControl {
    /// Request a stop; an in-progress delay is cut short
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.join.is_finished()
    }

    /// Stop and wait for the current step to finish
    pub async fn stop_and_wait(self) {
        self.stop();
        if let Err(e) = self.join.await {
            logger::error(LogTag::Loop, &format!("Trading loop task failed: {}", e));
        }
    }
}

impl TradingLoop {
    pub fn new(
        handle: SessionHandle,
        reader: MarketDataReader,
        executor: TradeExecutor,
        strategy: StrategyEngine,
        risk: Arc<Mutex<RiskManager>>,
        notifier: Arc<dyn Notifier>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            handle,
            reader,
            executor,
            strategy,
            risk,
            notifier,
            settings,
            pending: None,
            pause_notified: false,
            operator_activity: OperatorActivity::default(),
        }
    }

    /// Share the marker that manual trades update
    pub fn with_operator_activity(mut self, activity: OperatorActivity) -> Self {
        self.operator_activity = activity;
        self
    }

    pub fn spawn(self) -> LoopControl {
        let (stop_tx, stop_rx) = watch::channel(false);
        let active = Arc::new(AtomicBool::new(true));
        let join = tokio::spawn(self.run(stop_rx, active.clone()));
        LoopControl {
            stop_tx,
            active,
            join,
        }
    }

    async fn run(mut self, mut stop_rx: watch::Receiver<bool>, active: Arc<AtomicBool>) {
        logger::info(
            LogTag::Loop,
            &format!("Trading loop started on {}", self.settings.asset),
        );

        loop {
            if !active.load(Ordering::SeqCst) || *stop_rx.borrow() {
                break;
            }

            let wait = match self.cycle().await {
                Ok(CycleOutcome::Completed) => {
                    let delay = self.settings.cycle_delay.sample();
                    logger::debug(
                        LogTag::Loop,
                        &format!("Next cycle in {}s", delay.as_secs()),
                    );
                    delay
                }
                Ok(CycleOutcome::Cooldown) => self.settings.risk_cooldown,
                Err(e) => {
                    logger::error(LogTag::Loop, &format!("Trading cycle failed: {}", e));
                    self.settings.error_retry
                }
            };

            if sleep_or_stop(wait, &mut stop_rx).await {
                break;
            }
        }

        active.store(false, Ordering::SeqCst);
        logger::info(LogTag::Loop, "Trading loop stopped");
    }

    async fn cycle(&mut self) -> BotResult<CycleOutcome> {
        let reader = self.reader.clone();
        let asset = self.settings.asset.clone();
        let balance = self
            .handle
            .run(move |session| {
                Box::pin(async move {
                    reader.open_asset(session, &asset).await?;
                    reader.get_balance(session).await
                })
            })
            .await?;

        self.settle_pending(balance);

        let (allowed, tripped) = {
            let risk = self.risk.lock();
            (risk.can_trade(balance), risk.loss_streak_tripped())
        };
        if !allowed {
            if tripped && !self.pause_notified {
                self.pause_notified = true;
                let consecutive_losses = self.consecutive_losses();
                dispatch(
                    self.notifier.clone(),
                    Notification::TradingPaused { consecutive_losses },
                );
            }
            logger::info(
                LogTag::Risk,
                &format!("Trading not allowed at balance {:.2}, cooling down", balance),
            );
            return Ok(CycleOutcome::Cooldown);
        }
        self.pause_notified = false;

        let reader = self.reader.clone();
        let price = self
            .handle
            .run(move |session| Box::pin(async move { reader.get_current_price(session).await }))
            .await?;

        self.strategy.add_price(price);
        let evaluation = match self.strategy.calculate_signals() {
            Some(evaluation) => evaluation,
            None => {
                logger::debug(
                    LogTag::Strategy,
                    &format!(
                        "Collecting prices ({} in window)",
                        self.strategy.window_len()
                    ),
                );
                return Ok(CycleOutcome::Completed);
            }
        };

        let direction = match evaluation.signal {
            Signal::Up => Direction::Up,
            Signal::Down => Direction::Down,
            Signal::None => return Ok(CycleOutcome::Completed),
        };

        if let Some(pending) = &self.pending {
            logger::debug(
                LogTag::Loop,
                &format!(
                    "{} signal ignored, {} trade still pending",
                    direction,
                    pending.order.direction()
                ),
            );
            return Ok(CycleOutcome::Completed);
        }

        let amount = self.risk.lock().calculate_position_size(balance);
        logger::info(
            LogTag::Strategy,
            &format!(
                "{} signal: price {} sma {:.5} rsi {:.2}, amount {:.2}",
                direction, evaluation.price, evaluation.sma, evaluation.rsi, amount
            ),
        );

        let executor = self.executor.clone();
        let asset = self.settings.asset.clone();
        let dir = self.settings.screenshot_dir.clone();
        let (order, screenshot) = self
            .handle
            .run(move |session| {
                Box::pin(async move {
                    let order = executor.submit(session, &asset, direction, amount).await?;
                    let screenshot = super::capture_trade_screenshot(session, &dir).await;
                    Ok((order, screenshot))
                })
            })
            .await?;

        dispatch(
            self.notifier.clone(),
            Notification::TradePlaced {
                asset: order.asset().to_string(),
                direction: order.direction(),
                amount: order.amount(),
                price: Some(evaluation.price),
                origin: TradeOrigin::Strategy,
                screenshot,
            },
        );
        self.pending = Some(PendingTrade {
            order,
            balance_before: balance,
            submitted_at: Instant::now(),
        });

        Ok(CycleOutcome::Completed)
    }

    fn settle_pending(&mut self, balance: f64) {
        let expired = self
            .pending
            .as_ref()
            .map(|p| p.submitted_at.elapsed() >= self.settings.trade_expiry)
            .unwrap_or(false);
        if !expired {
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };

        let delta = ((balance - pending.balance_before) * 100.0).round() / 100.0;
        let overlapped = self
            .operator_activity
            .last_trade()
            .map(|at| at + self.settings.trade_expiry > pending.submitted_at)
            .unwrap_or(false);
        let outcome = if overlapped {
            Settlement::Overlapped
        } else if delta > 0.0 {
            Settlement::Win
        } else if delta < 0.0 {
            Settlement::Loss
        } else {
            Settlement::Draw
        };
        logger::info(
            LogTag::Trade,
            &format!(
                "{} {} settled as {:?} ({:+.2})",
                pending.order.asset(),
                pending.order.direction(),
                outcome,
                delta
            ),
        );

        match outcome.result() {
            Some(TradeResult::Win) => self.risk.lock().add_trade(TradeRecord::win(delta)),
            Some(TradeResult::Loss) => self.risk.lock().add_trade(TradeRecord::loss(delta)),
            None => logger::info(
                LogTag::Risk,
                &format!("{:?} settlement not added to the trade history", outcome),
            ),
        }

        dispatch(
            self.notifier.clone(),
            Notification::TradeSettled {
                asset: pending.order.asset().to_string(),
                direction: pending.order.direction(),
                outcome,
                profit: delta,
            },
        );
    }

    fn consecutive_losses(&self) -> usize {
        let risk = self.risk.lock();
        let history: Vec<&TradeRecord> = risk.history().collect();
        let streak = history
            .iter()
            .rev()
            .take_while(|t| t.result == TradeResult::Loss)
            .count();
        streak
    }
}

/// Sleep for `duration`; `true` when a stop arrived first
async fn sleep_or_stop(duration: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{ready_session, FakeDriver, FakeElement};
    use crate::browser::{ElementResolver, Locator};
    use crate::config::{PlatformConfig, RiskConfig, StrategyConfig};
    use crate::notifications::testing::RecordingNotifier;

    const UP: &str = "//button[contains(@class,'up') or contains(@class,'call') or contains(text(),'Up') or contains(text(),'Call')]";
    const DOWN: &str = "//button[contains(@class,'down') or contains(@class,'put') or contains(text(),'Down') or contains(text(),'Put')]";
    const SUBMIT: &str = "//button[contains(text(),'Place Trade') or contains(text(),'Trade Now') or contains(@class,'trade')]";

    fn trading_page(balance: &str, price: &str) -> FakeDriver {
        let driver = FakeDriver::new();
        driver.add(
            FakeElement::new("balance", "div")
                .matches(&Locator::css(".balance"))
                .text(balance),
        );
        driver.add(
            FakeElement::new("price", "div")
                .matches(&Locator::css(".current-price"))
                .text(price),
        );
        driver.add(FakeElement::new("up", "button").matches(&Locator::xpath(UP)));
        driver.add(FakeElement::new("down", "button").matches(&Locator::xpath(DOWN)));
        driver.add(FakeElement::new("amount", "input").matches(&Locator::name("amount")));
        driver.add(FakeElement::new("submit", "button").matches(&Locator::xpath(SUBMIT)));
        driver
    }

    fn settings(dir: &std::path::Path) -> LoopSettings {
        LoopSettings {
            asset: "EURUSD".to_string(),
            cycle_delay: DelayRange::fixed(Duration::from_secs(10)),
            error_retry: Duration::from_secs(30),
            risk_cooldown: Duration::from_secs(60),
            trade_expiry: Duration::from_secs(60),
            screenshot_dir: dir.to_path_buf(),
        }
    }

    fn build(
        driver: FakeDriver,
        strategy: StrategyEngine,
        risk: Arc<Mutex<RiskManager>>,
        notifier: Arc<RecordingNotifier>,
        settings: LoopSettings,
    ) -> TradingLoop {
        let mut session = ready_session(driver);
        session.set_authenticated(true);
        let handle = SessionHandle::spawn(session);
        let timeout = Duration::from_secs(2);
        TradingLoop::new(
            handle,
            MarketDataReader::new(ElementResolver::default(), timeout, PlatformConfig::default()),
            TradeExecutor::new(
                ElementResolver::default(),
                timeout,
                DelayRange::fixed(Duration::ZERO),
                PlatformConfig::default(),
            ),
            strategy,
            risk,
            notifier,
            settings,
        )
    }

    /// 19 samples that make a page price of 59 an Up signal (rsi ~16, sma ~56.8)
    fn primed_strategy() -> StrategyEngine {
        let mut strategy = StrategyEngine::new(&StrategyConfig::default()).unwrap();
        strategy.add_price(100.0);
        for k in 0..18 {
            strategy.add_price(50.0 + 0.5 * k as f64);
        }
        strategy
    }

    fn risk() -> Arc<Mutex<RiskManager>> {
        Arc::new(Mutex::new(RiskManager::new(&RiskConfig::default())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_long_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.cycle_delay = DelayRange::fixed(Duration::from_secs(300));
        let notifier = Arc::new(RecordingNotifier::new(vec![1]));
        let control = build(
            trading_page("$1,000.00", "1.1"),
            StrategyEngine::new(&StrategyConfig::default()).unwrap(),
            risk(),
            notifier,
            s,
        )
        .spawn();

        sleep(Duration::from_secs(5)).await;
        assert!(control.is_active());

        let started = Instant::now();
        tokio::time::timeout(Duration::from_secs(1), control.stop_and_wait())
            .await
            .expect("loop did not stop promptly");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_places_trade_and_settles_from_balance() {
        let dir = tempfile::tempdir().unwrap();
        let driver = trading_page("$1,000.00", "59.0");
        let notifier = Arc::new(RecordingNotifier::new(vec![1]));
        let risk = risk();
        let control = build(
            driver.clone(),
            primed_strategy(),
            risk.clone(),
            notifier.clone(),
            settings(dir.path()),
        )
        .spawn();

        sleep(Duration::from_secs(5)).await;
        let actions = driver.actions();
        assert!(actions.contains(&"click:up".to_string()));
        assert!(actions.contains(&"click:submit".to_string()));
        assert_eq!(driver.typed_into("amount"), "20");

        let placed = notifier.delivered_to(1);
        assert_eq!(placed.len(), 1);
        match &placed[0] {
            Notification::TradePlaced {
                direction,
                amount,
                origin,
                screenshot,
                ..
            } => {
                assert_eq!(*direction, Direction::Up);
                assert_eq!(*amount, 20.0);
                assert_eq!(*origin, TradeOrigin::Strategy);
                let path = screenshot.as_ref().expect("screenshot captured");
                assert!(path.exists());
            }
            other => panic!("unexpected notification {:?}", other),
        }

        driver.set_text("balance", "$1,018.00");
        sleep(Duration::from_secs(70)).await;

        let history: Vec<TradeRecord> = risk.lock().history().copied().collect();
        assert!(!history.is_empty());
        assert_eq!(history[0].result, TradeResult::Win);
        assert_eq!(history[0].profit, 18.0);
        assert!(notifier
            .delivered_to(1)
            .iter()
            .any(|n| matches!(n, Notification::TradeSettled { outcome: Settlement::Win, .. })));

        control.stop_and_wait().await;
    }

    fn first_settlement(notifier: &RecordingNotifier) -> Option<Settlement> {
        notifier.delivered_to(1).into_iter().find_map(|n| match n {
            Notification::TradeSettled { outcome, .. } => Some(outcome),
            _ => None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_balance_settles_as_draw() {
        let dir = tempfile::tempdir().unwrap();
        let driver = trading_page("$1,000.00", "59.0");
        let notifier = Arc::new(RecordingNotifier::new(vec![1]));
        let risk = risk();
        let control = build(
            driver.clone(),
            primed_strategy(),
            risk.clone(),
            notifier.clone(),
            settings(dir.path()),
        )
        .spawn();

        sleep(Duration::from_secs(75)).await;
        assert_eq!(first_settlement(&notifier), Some(Settlement::Draw));
        assert_eq!(risk.lock().history().count(), 0);

        control.stop_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_trade_during_pending_window_is_not_attributed() {
        let dir = tempfile::tempdir().unwrap();
        let driver = trading_page("$1,000.00", "59.0");
        let notifier = Arc::new(RecordingNotifier::new(vec![1]));
        let risk = risk();
        let activity = OperatorActivity::default();
        let control = build(
            driver.clone(),
            primed_strategy(),
            risk.clone(),
            notifier.clone(),
            settings(dir.path()),
        )
        .with_operator_activity(activity.clone())
        .spawn();

        sleep(Duration::from_secs(5)).await;
        assert!(driver.actions().contains(&"click:submit".to_string()));
        activity.record_trade();
        driver.set_text("balance", "$1,018.00");

        sleep(Duration::from_secs(70)).await;
        assert_eq!(first_settlement(&notifier), Some(Settlement::Overlapped));
        assert_eq!(risk.lock().history().count(), 0);

        control.stop_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tripped_breaker_blocks_trading() {
        let dir = tempfile::tempdir().unwrap();
        let driver = trading_page("$1,000.00", "59.0");
        let notifier = Arc::new(RecordingNotifier::new(vec![1]));
        let risk = risk();
        for _ in 0..3 {
            risk.lock().add_trade(TradeRecord::loss(-20.0));
        }
        let control = build(
            driver.clone(),
            primed_strategy(),
            risk,
            notifier.clone(),
            settings(dir.path()),
        )
        .spawn();

        sleep(Duration::from_secs(200)).await;
        assert!(!driver.actions().iter().any(|a| a.starts_with("click:")));

        let paused: Vec<Notification> = notifier.delivered_to(1);
        assert_eq!(
            paused,
            vec![Notification::TradingPaused {
                consecutive_losses: 3
            }]
        );

        control.stop_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_end_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let driver = trading_page("$1,000.00", "1.1");
        driver.set_broken(true);
        let notifier = Arc::new(RecordingNotifier::new(vec![1]));
        let control = build(
            driver.clone(),
            StrategyEngine::new(&StrategyConfig::default()).unwrap(),
            risk(),
            notifier,
            settings(dir.path()),
        )
        .spawn();

        sleep(Duration::from_secs(95)).await;
        assert!(control.is_active());

        driver.set_broken(false);
        sleep(Duration::from_secs(40)).await;
        assert!(driver
            .actions()
            .contains(&"goto:https://quotex.com/trading/EURUSD".to_string()));

        tokio::time::timeout(Duration::from_secs(1), control.stop_and_wait())
            .await
            .expect("loop did not stop promptly");
    }
}
