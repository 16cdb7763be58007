//! Balance and price reads from the page

use super::targets;
use crate::browser::{ElementResolver, LocatorTarget, Session};
use crate::config::{Config, PlatformConfig};
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Everything that is not part of a plain decimal: currency symbols and codes,
/// group separators, whitespace
static NON_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.\-]").expect("Invalid amount cleanup regex"));

/// Parse displayed money or price text such as `$1,234.56` or `USD 1 234.50`
pub fn parse_amount(text: &str) -> BotResult<f64> {
    let cleaned = NON_NUMERIC.replace_all(text.trim(), "");
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| BotError::ParseError {
            text: text.trim().to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct MarketDataReader {
    resolver: ElementResolver,
    timeout: Duration,
    platform: PlatformConfig,
}

impl MarketDataReader {
    pub fn new(resolver: ElementResolver, timeout: Duration, platform: PlatformConfig) -> Self {
        Self {
            resolver,
            timeout,
            platform,
        }
    }

    pub fn from_config(config: &Config, resolver: ElementResolver) -> Self {
        Self::new(
            resolver,
            Duration::from_secs(config.browser.element_timeout_secs),
            config.platform.clone(),
        )
    }

    pub async fn get_balance(&self, session: &Session) -> BotResult<f64> {
        let balance = self.read_number(session, &targets::BALANCE_INDICATOR).await?;
        logger::debug(LogTag::Market, &format!("Balance: {:.2}", balance));
        Ok(balance)
    }

    pub async fn get_current_price(&self, session: &Session) -> BotResult<f64> {
        let price = self.read_number(session, &targets::PRICE_DISPLAY).await?;
        logger::debug(LogTag::Market, &format!("Price: {}", price));
        Ok(price)
    }

    /// Navigate to the asset's trading view unless it is already open
    pub async fn open_asset(&self, session: &Session, asset: &str) -> BotResult<()> {
        let url = self.platform.trading_url(asset);
        let current = session.driver()?.current_url().await?;
        if current.trim_end_matches('/') != url.trim_end_matches('/') {
            logger::debug(LogTag::Market, &format!("Opening {}", url));
            session.goto(&url).await?;
            session.pacing().action_pause().await;
        }
        Ok(())
    }

    async fn read_number(&self, session: &Session, target: &LocatorTarget) -> BotResult<f64> {
        let found = self.resolver.resolve(session, target, self.timeout).await?;
        let text = session.driver()?.text(found.element).await?;
        parse_amount(&text)
    }
}
