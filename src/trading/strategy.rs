//! SMA/RSI signal generator over a bounded price window
//!
//! The window holds `sma_period` samples (oldest evicted first) and no signal
//! is produced until it is full. RSI uses Wilder smoothing seeded with the
//! simple average of the first `rsi_period` changes in the window.

use super::types::{PriceSample, Signal, StrategySignal};
use crate::config::StrategyConfig;
use crate::errors::{BotError, BotResult};
use crate::logger::{self, LogTag};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct StrategyEngine {
    sma_period: usize,
    rsi_period: usize,
    overbought: f64,
    oversold: f64,
    window: VecDeque<PriceSample>,
}

impl StrategyEngine {
    /// Periods are taken as configured; out-of-range values are a config error
    pub fn new(config: &StrategyConfig) -> BotResult<Self> {
        if config.sma_period < 2 {
            return Err(BotError::Config(format!(
                "strategy.sma_period must be >= 2, got {}",
                config.sma_period
            )));
        }
        if config.rsi_period == 0 {
            return Err(BotError::Config(
                "strategy.rsi_period must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            sma_period: config.sma_period,
            rsi_period: config.rsi_period,
            overbought: config.rsi_overbought,
            oversold: config.rsi_oversold,
            window: VecDeque::with_capacity(config.sma_period),
        })
    }

    pub fn add_price(&mut self, price: f64) {
        self.add_sample(PriceSample::now(price));
    }

    pub fn add_sample(&mut self, sample: PriceSample) {
        if !sample.value.is_finite() {
            logger::warning(
                LogTag::Strategy,
                &format!("Ignoring non-finite price {}", sample.value),
            );
            return;
        }
        if self.window.len() == self.sma_period {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn is_ready(&self) -> bool {
        self.window.len() == self.sma_period
    }

    pub fn latest(&self) -> Option<&PriceSample> {
        self.window.back()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn calculate_signals(&self) -> Option<StrategySignal> {
        if !self.is_ready() {
            return None;
        }

        let prices: Vec<f64> = self.window.iter().map(|s| s.value).collect();
        let price = *prices.last()?;
        let sma = prices.iter().sum::<f64>() / prices.len() as f64;
        let rsi = wilder_rsi(&prices, self.rsi_period);

        let signal = if price > sma && rsi < self.oversold {
            Signal::Up
        } else if price < sma && rsi > self.overbought {
            Signal::Down
        } else {
            Signal::None
        };

        logger::debug(
            LogTag::Strategy,
            &format!(
                "price={:.5} sma={:.5} rsi={:.2} -> {}",
                price, sma, rsi, signal
            ),
        );

        Some(StrategySignal {
            signal,
            price,
            sma,
            rsi,
        })
    }
}

/// RSI of the last value; period shrinks to the available changes
pub fn wilder_rsi(prices: &[f64], period: usize) -> f64 {
    if prices.len() < 2 {
        return 50.0;
    }
    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let period = period.clamp(1, changes.len());

    let (mut avg_gain, mut avg_loss) = changes[..period]
        .iter()
        .fold((0.0, 0.0), |(g, l), &c| {
            if c > 0.0 {
                (g + c, l)
            } else {
                (g, l - c)
            }
        });
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    let n = period as f64;
    for &change in &changes[period..] {
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
    }

    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> StrategyEngine {
        StrategyEngine::new(&StrategyConfig::default()).unwrap()
    }

    fn feed(engine: &mut StrategyEngine, prices: &[f64]) {
        for &p in prices {
            engine.add_price(p);
        }
    }

    #[test]
    fn test_no_signal_until_window_full() {
        let mut engine = engine();
        for i in 1..20 {
            engine.add_price(i as f64);
            assert!(engine.calculate_signals().is_none());
        }
        engine.add_price(20.0);
        let s = engine.calculate_signals().unwrap();
        assert!((s.sma - 10.5).abs() < 1e-9);
        assert_eq!(s.price, 20.0);
        assert_eq!(s.rsi, 100.0);
        assert_eq!(s.signal, Signal::None);
    }

    #[test]
    fn test_window_is_bounded_fifo() {
        let mut engine = engine();
        for i in 1..=45 {
            engine.add_price(i as f64);
            assert!(engine.window_len() <= 20);
        }
        let s = engine.calculate_signals().unwrap();
        // 26..=45
        assert!((s.sma - 35.5).abs() < 1e-9);
    }

    #[test]
    fn test_up_signal_above_sma_with_low_rsi() {
        let mut engine = engine();
        let mut prices = vec![100.0];
        prices.extend((0..19).map(|k| 50.0 + 0.5 * k as f64));
        feed(&mut engine, &prices);

        let s = engine.calculate_signals().unwrap();
        assert!(s.price > s.sma);
        assert!(s.rsi < 30.0, "rsi {}", s.rsi);
        assert_eq!(s.signal, Signal::Up);
    }

    #[test]
    fn test_down_signal_below_sma_with_high_rsi() {
        let mut engine = engine();
        let mut prices = vec![50.0];
        prices.extend((0..19).map(|k| 100.0 - 0.5 * k as f64));
        feed(&mut engine, &prices);

        let s = engine.calculate_signals().unwrap();
        assert!(s.price < s.sma);
        assert!(s.rsi > 70.0, "rsi {}", s.rsi);
        assert_eq!(s.signal, Signal::Down);
    }

    #[test]
    fn test_rsi_edge_cases() {
        assert_eq!(wilder_rsi(&[5.0; 10], 14), 50.0);
        assert_eq!(wilder_rsi(&[1.0, 2.0, 3.0], 14), 100.0);
        assert_eq!(wilder_rsi(&[3.0, 2.0, 1.0], 14), 0.0);
        assert_eq!(wilder_rsi(&[1.0], 14), 50.0);
        let mixed = wilder_rsi(&[1.0, 2.0, 1.0, 2.0, 1.0], 2);
        assert!(mixed > 0.0 && mixed < 100.0);
    }

    #[test]
    fn test_thresholds_come_from_config() {
        // same series as the Up case, but with a stricter oversold level
        let config = StrategyConfig {
            rsi_oversold: 10.0,
            ..StrategyConfig::default()
        };
        let mut engine = StrategyEngine::new(&config).unwrap();
        let mut prices = vec![100.0];
        prices.extend((0..19).map(|k| 50.0 + 0.5 * k as f64));
        feed(&mut engine, &prices);

        let s = engine.calculate_signals().unwrap();
        assert!(s.rsi > 10.0 && s.rsi < 30.0);
        assert_eq!(s.signal, Signal::None);
    }

    #[test]
    fn test_non_finite_prices_ignored() {
        let mut engine = engine();
        engine.add_price(f64::NAN);
        engine.add_price(f64::INFINITY);
        assert_eq!(engine.window_len(), 0);
    }

    #[test]
    fn test_out_of_range_periods_are_rejected() {
        for sma_period in [0, 1] {
            let config = StrategyConfig {
                sma_period,
                ..StrategyConfig::default()
            };
            let err = StrategyEngine::new(&config).unwrap_err();
            assert!(matches!(err, BotError::Config(_)), "{}", err);
        }

        let config = StrategyConfig {
            rsi_period: 0,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            StrategyEngine::new(&config),
            Err(BotError::Config(_))
        ));
    }

    #[test]
    fn test_smallest_period_keeps_window_at_configured_size() {
        let config = StrategyConfig {
            sma_period: 2,
            rsi_period: 1,
            ..StrategyConfig::default()
        };
        let mut engine = StrategyEngine::new(&config).unwrap();
        for p in [1.0, 2.0, 3.0, 4.0] {
            engine.add_price(p);
            assert!(engine.window_len() <= 2);
        }
        let s = engine.calculate_signals().unwrap();
        assert!((s.sma - 3.5).abs() < 1e-9);
    }
}
