//! Position sizing, loss-streak circuit breaker and trade statistics

use super::types::{TradeRecord, TradeResult, TradeStats};
use crate::config::RiskConfig;
use crate::logger::{self, LogTag};
use std::collections::VecDeque;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    risk_fraction: f64,
    min_trade_amount: f64,
    max_consecutive_losses: usize,
    capacity: usize,
    history: VecDeque<TradeRecord>,
}

impl RiskManager {
    pub fn new(config: &RiskConfig) -> Self {
        let capacity = config.history_capacity.max(1);
        Self {
            risk_fraction: config.risk_fraction,
            min_trade_amount: config.min_trade_amount,
            max_consecutive_losses: config.max_consecutive_losses,
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// `balance × risk_fraction`, rounded to cents
    pub fn calculate_position_size(&self, balance: f64) -> f64 {
        if !balance.is_finite() || balance <= 0.0 {
            return 0.0;
        }
        round2(balance * self.risk_fraction)
    }

    /// Last `max_consecutive_losses` trades were all losses
    pub fn loss_streak_tripped(&self) -> bool {
        let n = self.max_consecutive_losses;
        n > 0 && self.history.len() >= n && self.history.iter().rev().take(n).all(|t| t.is_loss())
    }

    pub fn can_trade(&self, balance: f64) -> bool {
        let size = self.calculate_position_size(balance);
        if size < self.min_trade_amount {
            logger::debug(
                LogTag::Risk,
                &format!(
                    "Position size {:.2} below minimum {:.2}",
                    size, self.min_trade_amount
                ),
            );
            return false;
        }
        if self.loss_streak_tripped() {
            logger::debug(
                LogTag::Risk,
                &format!(
                    "Circuit breaker open after {} consecutive losses",
                    self.max_consecutive_losses
                ),
            );
            return false;
        }
        true
    }

    pub fn add_trade(&mut self, record: TradeRecord) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(record);

        if self.loss_streak_tripped() {
            logger::warning(
                LogTag::Risk,
                &format!(
                    "{} losses in a row, trading paused until a win",
                    self.max_consecutive_losses
                ),
            );
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &TradeRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn get_trade_stats(&self) -> TradeStats {
        let total = self.history.len();
        if total == 0 {
            return TradeStats::default();
        }

        let wins: Vec<f64> = self
            .history
            .iter()
            .filter(|t| t.result == TradeResult::Win)
            .map(|t| t.profit)
            .collect();
        let losses: Vec<f64> = self
            .history
            .iter()
            .filter(|t| t.result == TradeResult::Loss)
            .map(|t| t.profit.abs())
            .collect();

        let mean = |v: &[f64]| {
            if v.is_empty() {
                0.0
            } else {
                v.iter().sum::<f64>() / v.len() as f64
            }
        };
        let average_win = mean(&wins);
        let average_loss = mean(&losses);
        let profit_factor = if losses.is_empty() || average_loss == 0.0 {
            f64::INFINITY
        } else {
            round2(average_win / average_loss)
        };

        TradeStats {
            total_trades: total,
            win_rate: round2(wins.len() as f64 / total as f64 * 100.0),
            profit_factor,
            average_win: round2(average_win),
            average_loss: round2(average_loss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RiskManager {
        RiskManager::new(&RiskConfig::default())
    }

    #[test]
    fn test_position_size_and_monotonicity() {
        let risk = manager();
        assert_eq!(risk.calculate_position_size(1000.0), 20.0);
        assert_eq!(risk.calculate_position_size(-5.0), 0.0);

        let mut last = 0.0;
        for cents in (0..200_000).step_by(137) {
            let size = risk.calculate_position_size(cents as f64 / 100.0);
            assert!(size >= last);
            last = size;
        }
    }

    #[test]
    fn test_minimum_trade_amount() {
        let risk = manager();
        // 2% of 49 is 0.98
        assert!(!risk.can_trade(49.0));
        assert!(risk.can_trade(50.0));
    }

    #[test]
    fn test_circuit_breaker_resets_on_win() {
        let mut risk = manager();
        risk.add_trade(TradeRecord::loss(-1.0));
        risk.add_trade(TradeRecord::loss(-1.0));
        assert!(risk.can_trade(1000.0));
        risk.add_trade(TradeRecord::loss(-1.0));
        assert!(!risk.can_trade(1000.0));
        assert!(!risk.can_trade(1_000_000.0));

        risk.add_trade(TradeRecord::win(0.8));
        assert!(risk.can_trade(1000.0));
    }

    #[test]
    fn test_history_keeps_latest_hundred() {
        let mut risk = manager();
        for i in 0..101 {
            risk.add_trade(TradeRecord::win(i as f64));
        }
        assert_eq!(risk.history_len(), 100);
        let profits: Vec<f64> = risk.history().map(|t| t.profit).collect();
        assert_eq!(profits.first(), Some(&1.0));
        assert_eq!(profits.last(), Some(&100.0));
    }

    #[test]
    fn test_stats() {
        let mut risk = manager();
        assert_eq!(risk.get_trade_stats(), TradeStats::default());

        risk.add_trade(TradeRecord::win(8.0));
        let only_wins = risk.get_trade_stats();
        assert!(only_wins.profit_factor.is_infinite());
        assert_eq!(only_wins.win_rate, 100.0);

        risk.add_trade(TradeRecord::win(4.0));
        risk.add_trade(TradeRecord::loss(-3.0));
        let stats = risk.get_trade_stats();
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.win_rate, 66.67);
        assert_eq!(stats.average_win, 6.0);
        assert_eq!(stats.average_loss, 3.0);
        assert_eq!(stats.profit_factor, 2.0);
    }
}
