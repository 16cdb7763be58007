//! Trade submission through the platform's trade panel
//!
//! A successful `submit` means the click sequence completed. The platform's
//! own confirmation is not parsed, so a returned `TradeOrder` is not proof
//! that the trade executed.

use super::targets;
use crate::browser::{DelayRange, ElementResolver, Session};
use crate::config::{Config, PlatformConfig};
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// `call`/`up` and `put`/`down`, case-insensitive
    pub fn parse(raw: &str) -> BotResult<Self> {
        match raw.trim().to_lowercase().as_str() {
            "call" | "up" => Ok(Direction::Up),
            "put" | "down" => Ok(Direction::Down),
            other => Err(BotError::InvalidCommand(format!(
                "Invalid direction '{}'. Use call/up or put/down.",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted trade; never modified after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrder {
    asset: String,
    direction: Direction,
    amount: f64,
    timestamp: DateTime<Utc>,
}

impl TradeOrder {
    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone)]
pub struct TradeExecutor {
    resolver: ElementResolver,
    timeout: Duration,
    settle: DelayRange,
    platform: PlatformConfig,
}

impl TradeExecutor {
    pub fn new(
        resolver: ElementResolver,
        timeout: Duration,
        settle: DelayRange,
        platform: PlatformConfig,
    ) -> Self {
        Self {
            resolver,
            timeout,
            settle,
            platform,
        }
    }

    pub fn from_config(config: &Config, resolver: ElementResolver) -> Self {
        Self::new(
            resolver,
            Duration::from_secs(config.browser.element_timeout_secs),
            DelayRange::from_millis(config.trading.settle_min_ms, config.trading.settle_max_ms),
            config.platform.clone(),
        )
    }

    /// Boolean form: `true` once the click sequence completed
    pub async fn place_trade(
        &self,
        session: &Session,
        asset: &str,
        direction: &str,
        amount: f64,
    ) -> bool {
        let direction = match Direction::parse(direction) {
            Ok(d) => d,
            Err(e) => {
                logger::warning(LogTag::Trade, &e.to_string());
                return false;
            }
        };
        match self.submit(session, asset, direction, amount).await {
            Ok(_) => true,
            Err(e) => {
                logger::error(LogTag::Trade, &e.to_string());
                false
            }
        }
    }

    pub async fn submit(
        &self,
        session: &Session,
        asset: &str,
        direction: Direction,
        amount: f64,
    ) -> BotResult<TradeOrder> {
        if !session.is_authenticated() {
            return Err(BotError::NotAuthenticated);
        }
        let asset = asset.trim().to_uppercase();
        if asset.is_empty() {
            return Err(BotError::InvalidCommand("Asset is required".to_string()));
        }
        if !(amount.is_finite() && amount > 0.0) {
            return Err(BotError::InvalidCommand(format!(
                "Invalid amount {}. Must be a positive number.",
                amount
            )));
        }

        logger::info(
            LogTag::Trade,
            &format!("Placing {} trade on {} for {:.2}", direction, asset, amount),
        );

        self.click_sequence(session, &asset, direction, amount)
            .await
            .map_err(|e| match e {
                BotError::LocatorNotFound { target, .. } => {
                    BotError::TradeSubmissionFailed(format!("{} not found", target))
                }
                BotError::Driver(msg) => BotError::TradeSubmissionFailed(msg),
                other => other,
            })?;

        let order = TradeOrder {
            asset,
            direction,
            amount,
            timestamp: Utc::now(),
        };
        logger::info(
            LogTag::Trade,
            &format!(
                "Trade sequence completed: {} {} {:.2} (not confirmed by platform)",
                order.asset, order.direction, order.amount
            ),
        );
        Ok(order)
    }

    async fn click_sequence(
        &self,
        session: &Session,
        asset: &str,
        direction: Direction,
        amount: f64,
    ) -> BotResult<()> {
        let driver = session.driver()?;
        let pacing = session.pacing();

        session.goto(&self.platform.trading_url(asset)).await?;
        pacing.action_pause().await;

        let control = match direction {
            Direction::Up => &*targets::UP_BUTTON,
            Direction::Down => &*targets::DOWN_BUTTON,
        };
        let button = self.resolver.resolve(session, control, self.timeout).await?;
        driver.click(button.element).await?;
        pacing.action_pause().await;

        let field = self
            .resolver
            .resolve(session, &targets::AMOUNT_FIELD, self.timeout)
            .await?;
        pacing
            .type_text(driver, field.element, &format_amount(amount))
            .await?;
        pacing.action_pause().await;

        let submit = self
            .resolver
            .resolve(session, &targets::TRADE_SUBMIT, self.timeout)
            .await?;
        driver.click(submit.element).await?;

        pacing.pause(self.settle).await;
        Ok(())
    }
}

/// `20` rather than `20.0`, `12.5` rather than `12.50`
fn format_amount(amount: f64) -> String {
    let text = format!("{:.2}", amount);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
