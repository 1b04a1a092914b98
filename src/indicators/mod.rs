// Indicators - Incremental EMA and the per-entity fast/slow pair

pub mod ema;
pub mod entity_tracker;

// Re-exports
pub use ema::{Ema, Indicator, IndicatorError};
pub use entity_tracker::{EntityTracker, TrackerError};
