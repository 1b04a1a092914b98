// Entity Tracker - Fast/slow EMA pair for one entity
// Produces the crossover test and the normalized spread used for ranking

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use tracing::warn;

use super::ema::{Ema, Indicator, IndicatorError};
use crate::core::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("observation value {0} is not a finite number")]
    NonFiniteValue(String),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
}

/// EntityTracker pairs a fast and a slow EMA fed with the same samples
#[derive(Debug, Clone)]
pub struct EntityTracker {
    fast: Ema,
    slow: Ema,

    last_timestamp: Option<Timestamp>,

    // Statistics
    updates_processed: u64,
    out_of_order_count: u64,
}

impl EntityTracker {
    pub fn new(fast_window: usize, slow_window: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            fast: Ema::new(fast_window)?,
            slow: Ema::new(slow_window)?,
            last_timestamp: None,
            updates_processed: 0,
            out_of_order_count: 0,
        })
    }

    /// Feed one observation to both indicators.
    ///
    /// Non-finite values are rejected before either indicator is touched, so
    /// the pair never drifts apart. Both indicators are always updated, even
    /// when one of them reports an error.
    pub fn update(&mut self, timestamp: Timestamp, value: f64) -> Result<bool, TrackerError> {
        let value = Decimal::from_f64(value)
            .ok_or_else(|| TrackerError::NonFiniteValue(value.to_string()))?;
        self.update_decimal(timestamp, value)
    }

    pub fn update_decimal(&mut self, timestamp: Timestamp, value: Decimal) -> Result<bool, TrackerError> {
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                self.out_of_order_count += 1;
                warn!(
                    last_timestamp = last,
                    timestamp = timestamp,
                    "Out-of-order observation accepted"
                );
            }
        }
        self.last_timestamp = Some(self.last_timestamp.map_or(timestamp, |last| last.max(timestamp)));
        self.updates_processed += 1;

        let fast_ready = self.fast.update(timestamp, value);
        let slow_ready = self.slow.update(timestamp, value);
        Ok(fast_ready? & slow_ready?)
    }

    pub fn is_ready(&self) -> bool {
        self.fast.is_ready() && self.slow.is_ready()
    }

    /// `(fast − slow) / ((fast + slow) / 2)`.
    ///
    /// `None` until both indicators are ready, and when `fast + slow` is zero.
    pub fn scaled_delta(&self) -> Option<Decimal> {
        let fast = self.fast.current_value()?;
        let slow = self.slow.current_value()?;

        let mid = fast.checked_add(slow)?.checked_div(Decimal::TWO)?;
        if mid.is_zero() {
            return None;
        }
        fast.checked_sub(slow)?.checked_div(mid)
    }

    /// Ready, and fast exceeds slow by more than `threshold` (a fraction).
    pub fn is_crossed_above(&self, threshold: Decimal) -> bool {
        let (Some(fast), Some(slow)) = (self.fast.current_value(), self.slow.current_value()) else {
            return false;
        };
        match Decimal::ONE
            .checked_add(threshold)
            .and_then(|factor| slow.checked_mul(factor))
        {
            Some(bar) => fast > bar,
            None => false,
        }
    }

    /// Ranking score when this entity passes the crossover test
    pub fn candidate_score(&self, threshold: Decimal) -> Option<Decimal> {
        if self.is_crossed_above(threshold) {
            self.scaled_delta()
        } else {
            None
        }
    }

    pub fn fast(&self) -> &Ema {
        &self.fast
    }

    pub fn slow(&self) -> &Ema {
        &self.slow
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.last_timestamp
    }

    pub fn updates_processed(&self) -> u64 {
        self.updates_processed
    }

    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}

impl fmt::Display for EntityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityTracker(fast={}, slow={}", self.fast, self.slow)?;
        if let Some(delta) = self.scaled_delta() {
            write!(f, ", scaled_delta={}", delta.round_dp(6))?;
        }
        write!(f, ")")
    }
}
