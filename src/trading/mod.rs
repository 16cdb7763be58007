//! Trading decisions
//!
//! - `strategy`: SMA/RSI signal generator
//! - `risk`: position sizing, circuit breaker, statistics
//! - `trading_loop`: the cancellable decision loop tying them to the browser
//! - `types`: shared value types

pub mod risk;
pub mod strategy;
pub mod trading_loop;
pub mod types;

pub use risk::RiskManager;
pub use strategy::StrategyEngine;
pub use trading_loop::{LoopControl, LoopSettings, OperatorActivity, TradingLoop};
pub use types::{
    PriceSample, Settlement, Signal, StrategySignal, TradeRecord, TradeResult, TradeStats,
};

use crate::browser::Session;
use crate::logger::{self, LogTag};
use std::path::{Path, PathBuf};

/// `<dir>/trade_<unix>.png`; `None` when the capture fails
pub async fn capture_trade_screenshot(session: &Session, dir: &Path) -> Option<PathBuf> {
    let path = dir.join(format!("trade_{}.png", chrono::Utc::now().timestamp()));
    match session.save_screenshot(&path).await {
        Ok(()) => Some(path),
        Err(e) => {
            logger::warning(LogTag::Trade, &format!("Trade screenshot failed: {}", e));
            None
        }
    }
}
