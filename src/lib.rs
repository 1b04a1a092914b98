//! Crossover screener.
//!
//! Tracks a fast and a slow exponential moving average per entity from
//! periodic observation batches, and on each batch returns the entities whose
//! fast average exceeds the slow one by a threshold, ranked by normalized
//! spread and capped to a maximum count.
//!
//! ```no_run
//! use crossover_screener::core::{Observation, SelectionConfig};
//! use crossover_screener::selection::SelectionPipeline;
//!
//! let pipeline = SelectionPipeline::new(SelectionConfig::default()).unwrap();
//! let batch = vec![Observation::new("AAPL".to_string(), 1_700_000_000_000, 187.5)];
//! let selected: Vec<String> = pipeline.select(&batch);
//! ```

pub mod core;
pub mod indicators;
pub mod store;
pub mod selection;

pub use crate::core::{ConfigError, MaxCount, Observation, SelectionConfig};
pub use crate::indicators::{EntityTracker, IndicatorError, TrackerError};
pub use crate::selection::{Candidate, SelectionPipeline};
pub use crate::store::TrackerStore;
