// EMA Indicator - Incremental exponential moving average
// Seeded with the simple mean of the first `window_length` samples

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::core::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("window length must be positive, got {0}")]
    InvalidWindow(usize),
    #[error("decimal overflow while updating {0}")]
    Overflow(&'static str),
}

/// Streaming indicator fed one sample at a time.
pub trait Indicator: Send + Sync {
    /// Feed the next sample. Returns whether the indicator is ready afterwards.
    fn update(&mut self, timestamp: Timestamp, value: Decimal) -> Result<bool, IndicatorError>;

    /// Whether enough samples have been seen to produce a value.
    fn is_ready(&self) -> bool;

    /// Smoothed value; `None` until ready.
    fn current_value(&self) -> Option<Decimal>;

    fn window_length(&self) -> usize;

    fn sample_count(&self) -> u64;

    /// Return to the freshly constructed state.
    fn reset(&mut self);
}

/// Exponential moving average with `α = 2 / (window_length + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    window_length: usize,
    alpha: Decimal,

    sample_count: u64,
    // Running sum of the seed samples, only used until ready
    seed_sum: Decimal,
    current_value: Option<Decimal>,
    last_timestamp: Option<Timestamp>,
}

impl Ema {
    pub fn new(window_length: usize) -> Result<Self, IndicatorError> {
        if window_length == 0 {
            return Err(IndicatorError::InvalidWindow(window_length));
        }

        let alpha = Decimal::TWO
            .checked_div(Decimal::from(window_length) + Decimal::ONE)
            .ok_or(IndicatorError::Overflow("alpha"))?;

        Ok(Self {
            window_length,
            alpha,
            sample_count: 0,
            seed_sum: Decimal::ZERO,
            current_value: None,
            last_timestamp: None,
        })
    }

    pub fn alpha(&self) -> Decimal {
        self.alpha
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.last_timestamp
    }

    fn seed(&mut self, value: Decimal) -> Result<(), IndicatorError> {
        self.seed_sum = self
            .seed_sum
            .checked_add(value)
            .ok_or(IndicatorError::Overflow("seed sum"))?;

        if self.sample_count == self.window_length as u64 {
            let mean = self
                .seed_sum
                .checked_div(Decimal::from(self.window_length))
                .ok_or(IndicatorError::Overflow("seed mean"))?;
            self.current_value = Some(mean);
            self.seed_sum = Decimal::ZERO;
        }
        Ok(())
    }

    fn smooth(&mut self, value: Decimal) -> Result<(), IndicatorError> {
        // A seed lost to overflow restarts from the next sample
        let Some(current) = self.current_value else {
            self.current_value = Some(value);
            return Ok(());
        };

        // current + α·(value − current); exact when value == current
        let next = value
            .checked_sub(current)
            .and_then(|diff| diff.checked_mul(self.alpha))
            .and_then(|step| current.checked_add(step))
            .ok_or(IndicatorError::Overflow("ema"))?;
        self.current_value = Some(next);
        Ok(())
    }
}

impl Indicator for Ema {
    fn update(&mut self, timestamp: Timestamp, value: Decimal) -> Result<bool, IndicatorError> {
        self.sample_count += 1;
        self.last_timestamp = Some(timestamp);

        if self.sample_count <= self.window_length as u64 {
            self.seed(value)?;
        } else {
            self.smooth(value)?;
        }

        Ok(self.is_ready())
    }

    fn is_ready(&self) -> bool {
        self.sample_count >= self.window_length as u64
    }

    fn current_value(&self) -> Option<Decimal> {
        if self.is_ready() {
            self.current_value
        } else {
            None
        }
    }

    fn window_length(&self) -> usize {
        self.window_length
    }

    fn sample_count(&self) -> u64 {
        self.sample_count
    }

    fn reset(&mut self) {
        self.sample_count = 0;
        self.seed_sum = Decimal::ZERO;
        self.current_value = None;
        self.last_timestamp = None;
    }
}

impl fmt::Display for Ema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current_value() {
            Some(v) => write!(f, "EMA({})={}", self.window_length, v),
            None => write!(
                f,
                "EMA({}) warming up {}/{}",
                self.window_length, self.sample_count, self.window_length
            ),
        }
    }
}
