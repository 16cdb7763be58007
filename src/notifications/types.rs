/// Notification payloads emitted by the controller and the trading loop
use crate::platform::Direction;
use crate::trading::types::Settlement;
use std::path::{Path, PathBuf};

/// Who asked for the trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOrigin {
    Operator,
    Strategy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TradePlaced {
        asset: String,
        direction: Direction,
        amount: f64,
        price: Option<f64>,
        origin: TradeOrigin,
        screenshot: Option<PathBuf>,
    },
    TradeSettled {
        asset: String,
        direction: Direction,
        outcome: Settlement,
        profit: f64,
    },
    TradingPaused {
        consecutive_losses: usize,
    },
    SessionStarted {
        authenticated: bool,
    },
    SessionStopped,
}

impl Notification {
    /// Image to attach, when one was captured
    pub fn screenshot(&self) -> Option<&Path> {
        match self {
            Notification::TradePlaced { screenshot, .. } => screenshot.as_deref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TradePlaced { .. } => "trade_placed",
            Notification::TradeSettled { .. } => "trade_settled",
            Notification::TradingPaused { .. } => "trading_paused",
            Notification::SessionStarted { .. } => "session_started",
            Notification::SessionStopped => "session_stopped",
        }
    }
}
