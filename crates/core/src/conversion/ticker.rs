//! Simulated progress ticker.

use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::config::ConversionConfig;

/// Emits `+step` every period, holding at `cap` until dropped.
///
/// The first tick fires one full period after creation, so a session reads
/// 0 until then. Once the cap is reached `tick` never completes and the
/// underlying timer stops waking the task.
#[derive(Debug)]
pub struct ProgressTicker {
    interval: Interval,
    value: u8,
    step: u8,
    cap: u8,
}

impl ProgressTicker {
    pub fn new(period: Duration, step: u8, cap: u8) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            value: 0,
            step,
            cap,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.tick_interval(), config.tick_step, config.progress_cap)
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_capped(&self) -> bool {
        self.value >= self.cap
    }

    /// Waits for the next tick and returns the new value.
    ///
    /// Cancel safe: dropping the future before it completes leaves the value untouched.
    pub async fn tick(&mut self) -> u8 {
        if self.is_capped() {
            std::future::pending::<()>().await;
        }
        self.interval.tick().await;
        self.value = self.value.saturating_add(self.step).min(self.cap);
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period_up_to_cap() {
        let start = Instant::now();
        let mut ticker = ProgressTicker::new(Duration::from_millis(200), 5, 95);
        assert_eq!(ticker.value(), 0);

        let mut values = Vec::new();
        while !ticker.is_capped() {
            values.push(ticker.tick().await);
        }

        let expected: Vec<u8> = (1..=19).map(|i| i * 5).collect();
        assert_eq!(values, expected);
        assert_eq!(start.elapsed(), Duration::from_millis(200 * 19));
    }

    #[tokio::test(start_paused = true)]
    async fn test_uneven_step_clamps_to_cap() {
        let mut ticker = ProgressTicker::new(Duration::from_millis(10), 40, 95);
        assert_eq!(ticker.tick().await, 40);
        assert_eq!(ticker.tick().await, 80);
        assert_eq!(ticker.tick().await, 95);
        assert!(ticker.is_capped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capped_ticker_never_fires() {
        let mut ticker = ProgressTicker::new(Duration::from_millis(10), 50, 50);
        assert_eq!(ticker.tick().await, 50);

        let next = time::timeout(Duration::from_secs(60), ticker.tick()).await;
        assert!(next.is_err());
        assert_eq!(ticker.value(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config() {
        let ticker = ProgressTicker::from_config(&ConversionConfig::default());
        assert_eq!(ticker.value(), 0);
        assert_eq!(ticker.step, 5);
        assert_eq!(ticker.cap, 95);
    }
}
