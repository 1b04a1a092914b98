// Configuration Management for the Crossover Screener
// Defaults, JSON file overlay, environment overrides

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use super::types::MaxCount;

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// Configuration Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Smoothing window of the fast indicator
    pub fast_window: usize,
    /// Smoothing window of the slow indicator
    pub slow_window: usize,
    /// Required relative excess of fast over slow (0.01 = 1%)
    pub threshold: Decimal,
    /// Cap on returned entities
    pub max_count: MaxCount,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            fast_window: 12,
            slow_window: 26,
            threshold: Decimal::new(1, 2),
            max_count: MaxCount::Unbounded,
        }
    }
}

impl SelectionConfig {
    pub fn with_windows(mut self, fast_window: usize, slow_window: usize) -> Self {
        self.fast_window = fast_window;
        self.slow_window = slow_window;
        self
    }

    pub fn with_threshold(mut self, threshold: Decimal) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_count(mut self, max_count: MaxCount) -> Self {
        self.max_count = max_count;
        self
    }

    /// Check the preconditions the trackers rely on.
    ///
    /// Non-positive windows and negative thresholds are rejected. A fast
    /// window that is not shorter than the slow one is legal but logged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.fast_window == 0 {
            errors.push("fast_window must be positive".to_string());
        }
        if self.slow_window == 0 {
            errors.push("slow_window must be positive".to_string());
        }
        if self.threshold.is_sign_negative() && !self.threshold.is_zero() {
            errors.push(format!("threshold must be non-negative, got {}", self.threshold));
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors.join("; ")));
        }

        if self.fast_window >= self.slow_window {
            warn!(
                fast_window = self.fast_window,
                slow_window = self.slow_window,
                "fast_window is not shorter than slow_window"
            );
        }
        Ok(())
    }
}

// ============================================================================
// Configuration Manager
// ============================================================================

pub struct ConfigManager {
    selection: Arc<RwLock<SelectionConfig>>,
}

impl ConfigManager {
    pub fn new(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut manager = Self {
            selection: Arc::new(RwLock::new(SelectionConfig::default())),
        };

        if let Some(path) = config_path {
            manager.load_from_file(path)?;
        }

        manager.load_from_env();

        info!("Configuration initialized");
        Ok(manager)
    }

    /// Load configuration from JSON file
    pub fn load_from_file(&mut self, config_path: &str) -> Result<(), ConfigError> {
        let path = Path::new(config_path);
        if !path.exists() {
            warn!(path = config_path, "Config file not found");
            return Ok(());
        }

        let content = fs::read_to_string(path)?;
        let config_data: HashMap<String, serde_json::Value> = serde_json::from_str(&content)?;

        if let Some(selection_data) = config_data.get("selection") {
            let selection = serde_json::from_value::<SelectionConfig>(selection_data.clone())?;
            *self.selection.write() = selection;
        }

        info!(path = config_path, "Configuration loaded");
        Ok(())
    }

    /// Apply `SELECTION_*` environment overrides. Unparseable values are
    /// skipped with a warning so a bad variable cannot wipe a loaded file.
    pub fn load_from_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut selection = self.selection.write();

        if let Some(raw) = lookup("SELECTION_FAST_WINDOW") {
            match raw.trim().parse::<usize>() {
                Ok(v) => selection.fast_window = v,
                Err(_) => warn!(value = %raw, "Ignoring invalid SELECTION_FAST_WINDOW"),
            }
        }
        if let Some(raw) = lookup("SELECTION_SLOW_WINDOW") {
            match raw.trim().parse::<usize>() {
                Ok(v) => selection.slow_window = v,
                Err(_) => warn!(value = %raw, "Ignoring invalid SELECTION_SLOW_WINDOW"),
            }
        }
        if let Some(raw) = lookup("SELECTION_THRESHOLD") {
            let parsed = raw
                .trim()
                .parse::<Decimal>()
                .ok()
                .or_else(|| raw.trim().parse::<f64>().ok().and_then(Decimal::from_f64));
            match parsed {
                Some(v) => selection.threshold = v,
                None => warn!(value = %raw, "Ignoring invalid SELECTION_THRESHOLD"),
            }
        }
        if let Some(raw) = lookup("SELECTION_MAX_COUNT") {
            match raw.parse::<MaxCount>() {
                Ok(v) => selection.max_count = v,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid SELECTION_MAX_COUNT"),
            }
        }
    }

    /// Save configuration to JSON file
    pub fn save_to_file(&self, config_path: &str) -> Result<(), ConfigError> {
        let selection = self.selection.read();

        let mut config_map = HashMap::new();
        config_map.insert("selection", serde_json::to_value(&*selection)?);

        if let Some(parent) = Path::new(config_path).parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(&config_map)?;
        fs::write(config_path, json)?;

        info!(path = config_path, "Configuration saved");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.selection.read().validate()?;
        info!("Configuration validated successfully");
        Ok(())
    }

    pub fn selection(&self) -> SelectionConfig {
        self.selection.read().clone()
    }

    pub fn set_selection(&self, selection: SelectionConfig) {
        *self.selection.write() = selection;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SelectionConfig::default();
        assert_eq!(config.fast_window, 12);
        assert_eq!(config.slow_window, 26);
        assert_eq!(config.threshold, Decimal::new(1, 2));
        assert_eq!(config.max_count, MaxCount::Unbounded);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_windows() {
        let config = SelectionConfig::default().with_windows(0, 26);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = SelectionConfig::default().with_windows(12, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_negative_threshold() {
        let config = SelectionConfig::default().with_threshold(Decimal::new(-5, 2));
        assert!(config.validate().is_err());

        let config = SelectionConfig::default().with_threshold(Decimal::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SelectionConfig =
            serde_json::from_str(r#"{"fast_window": 3, "max_count": 5}"#).unwrap();
        assert_eq!(config.fast_window, 3);
        assert_eq!(config.slow_window, 26);
        assert_eq!(config.max_count, MaxCount::Limit(5));
    }

    #[test]
    fn test_overrides() {
        let mut manager = ConfigManager {
            selection: Arc::new(RwLock::new(SelectionConfig::default())),
        };
        manager.apply_overrides(|key| match key {
            "SELECTION_FAST_WINDOW" => Some("5".to_string()),
            "SELECTION_SLOW_WINDOW" => Some("not-a-number".to_string()),
            "SELECTION_THRESHOLD" => Some("0.02".to_string()),
            "SELECTION_MAX_COUNT" => Some("unbounded".to_string()),
            _ => None,
        });

        let selection = manager.selection();
        assert_eq!(selection.fast_window, 5);
        assert_eq!(selection.slow_window, 26);
        assert_eq!(selection.threshold, Decimal::new(2, 2));
        assert!(selection.max_count.is_unbounded());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let manager = ConfigManager::new(Some("/nonexistent/screener.json"));
        assert!(manager.is_ok());
    }
}
