use std::time::Duration;

use anyhow::{Result, bail};
use rand::Rng;
use serde::Deserialize;

/// Half-open range a pause is drawn from. `max` itself is never produced.
#[derive(Debug, Clone, Copy)]
pub struct DurationRange {
    min: Duration,
    max: Duration,
}

impl DurationRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        DurationRange { min, max }
    }

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self::new(Duration::from_millis(min), Duration::from_millis(max))
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Uniform draw from `[min, max)`; collapses to `min` when the range
    /// is empty.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let span = (self.max - self.min).as_nanos() as u64;
        self.min + Duration::from_nanos(rand::rng().random_range(0..span))
    }
}

/// Everything one dinner run is parameterized by.
#[derive(Debug, Clone)]
pub struct DinnerConfig {
    pub visitors: u32,
    pub waiters: u32,
    pub portions: u64,
    pub serving_delay: Duration,
    pub discussion_range: DurationRange,
    pub eating_range: DurationRange,
}

impl Default for DinnerConfig {
    fn default() -> Self {
        DinnerConfig {
            visitors: 5,
            waiters: 2,
            portions: 100,
            serving_delay: Duration::from_millis(5),
            discussion_range: DurationRange::from_millis(10, 20),
            eating_range: DurationRange::from_millis(10, 20),
        }
    }
}

impl DinnerConfig {
    pub fn validate(&self) -> Result<()> {
        // A lone visitor would need the same spoon in both hands.
        if self.visitors < 2 {
            bail!("at least two visitors are required, got {}", self.visitors);
        }
        if self.waiters < 1 {
            bail!("at least one waiter is required");
        }
        if self.portions < 1 {
            bail!("at least one portion is required");
        }
        if self.discussion_range.max() < self.discussion_range.min() {
            bail!("discussion range is inverted");
        }
        if self.eating_range.max() < self.eating_range.min() {
            bail!("eating range is inverted");
        }
        Ok(())
    }
}

/// On-disk form of [`DinnerConfig`], all delays in milliseconds.
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub visitors: u32,
    pub waiters: u32,
    pub portions: u64,
    pub serving_delay_ms: u64,
    pub discussion_ms: [u64; 2],
    pub eating_ms: [u64; 2],
}

impl From<ConfigFile> for DinnerConfig {
    fn from(file: ConfigFile) -> Self {
        DinnerConfig {
            visitors: file.visitors,
            waiters: file.waiters,
            portions: file.portions,
            serving_delay: Duration::from_millis(file.serving_delay_ms),
            discussion_range: DurationRange::from_millis(file.discussion_ms[0], file.discussion_ms[1]),
            eating_range: DurationRange::from_millis(file.eating_ms[0], file.eating_ms[1]),
        }
    }
}
