//! Human-paced delays and typing
//!
//! Randomized pauses between actions and keystrokes. A disabled policy types
//! whole strings at once and always waits the lower bound, so tests are
//! deterministic.

use super::driver::{Driver, ElementId};
use crate::config::PacingConfig;
use crate::errors::BotResult;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    pub fn fixed(d: Duration) -> Self {
        Self { min: d, max: d }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Uniform pick within the bounds
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let ms = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(ms as u64)
    }
}

#[derive(Debug, Clone)]
pub struct HumanPacing {
    enabled: bool,
    action: DelayRange,
    keystroke: DelayRange,
}

impl HumanPacing {
    pub fn new(action: DelayRange, keystroke: DelayRange) -> Self {
        Self {
            enabled: true,
            action,
            keystroke,
        }
    }

    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            enabled: config.enabled,
            action: DelayRange::from_millis(config.action_delay_min_ms, config.action_delay_max_ms),
            keystroke: DelayRange::from_millis(config.keystroke_min_ms, config.keystroke_max_ms),
        }
    }

    /// No jitter, no per-character typing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            action: DelayRange::fixed(Duration::ZERO),
            keystroke: DelayRange::fixed(Duration::ZERO),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Delay a caller would wait for `range` under this policy
    pub fn delay_for(&self, range: DelayRange) -> Duration {
        if self.enabled {
            range.sample()
        } else {
            range.min()
        }
    }

    pub async fn pause(&self, range: DelayRange) {
        let delay = self.delay_for(range);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Short pause between UI actions
    pub async fn action_pause(&self) {
        self.pause(self.action).await;
    }

    /// Clear the field and type `text`, one character at a time when enabled
    pub async fn type_text(
        &self,
        driver: &dyn Driver,
        element: ElementId,
        text: &str,
    ) -> BotResult<()> {
        driver.clear(element).await?;

        if !self.enabled {
            return driver.send_keys(element, text).await;
        }

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            driver.send_keys(element, ch.encode_utf8(&mut buf)).await?;
            self.pause(self.keystroke).await;
        }
        Ok(())
    }
}
