// Core Module - Foundational types, config, logging

pub mod types;
pub mod config;
pub mod logger;

// Re-export commonly used items for convenience
pub use types::{MaxCount, Observation, Timestamp};
pub use config::{ConfigError, ConfigManager, SelectionConfig};
pub use logger::setup_logging;
