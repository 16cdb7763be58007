/// Value types shared by the strategy, risk manager and trading loop
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceSample {
    pub fn now(value: f64) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    None,
    Up,
    Down,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::None => write!(f, "NONE"),
            Signal::Up => write!(f, "UP"),
            Signal::Down => write!(f, "DOWN"),
        }
    }
}

/// One evaluation of the strategy; recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub signal: Signal,
    pub price: f64,
    pub sma: f64,
    pub rsi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeResult {
    Win,
    Loss,
}

/// How a pending trade was closed out from the balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Win,
    Loss,
    /// Balance unchanged (draw or refund)
    Draw,
    /// A manual trade overlapped the window, so the change cannot be attributed
    Overlapped,
}

impl Settlement {
    /// Result to add to the trade history; draws and overlaps are not counted
    pub fn result(&self) -> Option<TradeResult> {
        match self {
            Settlement::Win => Some(TradeResult::Win),
            Settlement::Loss => Some(TradeResult::Loss),
            Settlement::Draw | Settlement::Overlapped => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub result: TradeResult,
    /// Positive for wins; losses carry the (negative) balance change
    pub profit: f64,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    pub fn win(profit: f64) -> Self {
        Self {
            result: TradeResult::Win,
            profit,
            timestamp: Utc::now(),
        }
    }

    pub fn loss(profit: f64) -> Self {
        Self {
            result: TradeResult::Loss,
            profit,
            timestamp: Utc::now(),
        }
    }

    pub fn is_loss(&self) -> bool {
        self.result == TradeResult::Loss
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    /// Percent, 0..=100
    pub win_rate: f64,
    /// Mean win / mean loss; infinite without losses
    pub profit_factor: f64,
    pub average_win: f64,
    pub average_loss: f64,
}

impl Default for TradeStats {
    fn default() -> Self {
        Self {
            total_trades: 0,
            win_rate: 0.0,
            profit_factor: 0.0,
            average_win: 0.0,
            average_loss: 0.0,
        }
    }
}
