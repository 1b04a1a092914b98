// Core Type Definitions for the Crossover Screener
// Observations fed in by the host and the selection cap

use serde::{Deserialize, Serialize};
use std::fmt;

/// Observation time in milliseconds since the Unix epoch
pub type Timestamp = i64;

// ============================================================================
// Observation
// ============================================================================

/// A single `(entity_id, timestamp, value)` sample delivered in a batch.
///
/// `value` is the raw feed quantity (a price, typically). It is converted to
/// fixed-point when it reaches the entity's tracker, which is where NaN and
/// infinities are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation<K> {
    pub entity_id: K,
    pub timestamp: Timestamp,
    pub value: f64,
}

impl<K> Observation<K> {
    pub fn new(entity_id: K, timestamp: Timestamp, value: f64) -> Self {
        Self {
            entity_id,
            timestamp,
            value,
        }
    }
}

impl<K: fmt::Display> fmt::Display for Observation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Observation(entity={}, ts={}, value={})",
            self.entity_id, self.timestamp, self.value
        )
    }
}

// ============================================================================
// MaxCount
// ============================================================================

/// Cap on the number of entities returned from one selection.
///
/// Serialized as `null` for no cap, or as the integer limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<usize>", into = "Option<usize>")]
pub enum MaxCount {
    #[default]
    Unbounded,
    Limit(usize),
}

impl MaxCount {
    /// Truncate a ranked list in place
    pub fn apply<T>(&self, ranked: &mut Vec<T>) {
        if let MaxCount::Limit(n) = *self {
            ranked.truncate(n);
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, MaxCount::Unbounded)
    }
}

impl From<Option<usize>> for MaxCount {
    fn from(value: Option<usize>) -> Self {
        match value {
            Some(n) => MaxCount::Limit(n),
            None => MaxCount::Unbounded,
        }
    }
}

impl From<MaxCount> for Option<usize> {
    fn from(value: MaxCount) -> Self {
        match value {
            MaxCount::Unbounded => None,
            MaxCount::Limit(n) => Some(n),
        }
    }
}

impl fmt::Display for MaxCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxCount::Unbounded => write!(f, "unbounded"),
            MaxCount::Limit(n) => write!(f, "{}", n),
        }
    }
}

impl std::str::FromStr for MaxCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unbounded") {
            return Ok(MaxCount::Unbounded);
        }
        trimmed
            .parse::<usize>()
            .map(MaxCount::Limit)
            .map_err(|_| format!("Invalid MaxCount: '{}'. Expected an integer or 'unbounded'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_count_apply() {
        let mut ranked = vec!["A", "B", "C"];
        MaxCount::Limit(2).apply(&mut ranked);
        assert_eq!(ranked, vec!["A", "B"]);

        let mut ranked = vec!["A", "B", "C"];
        MaxCount::Unbounded.apply(&mut ranked);
        assert_eq!(ranked.len(), 3);

        let mut ranked = vec!["A"];
        MaxCount::Limit(0).apply(&mut ranked);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_max_count_parse() {
        assert_eq!("unbounded".parse::<MaxCount>().unwrap(), MaxCount::Unbounded);
        assert_eq!("".parse::<MaxCount>().unwrap(), MaxCount::Unbounded);
        assert_eq!(" 5 ".parse::<MaxCount>().unwrap(), MaxCount::Limit(5));
        assert!("-1".parse::<MaxCount>().is_err());
    }

    #[test]
    fn test_max_count_serde() {
        assert_eq!(serde_json::to_string(&MaxCount::Unbounded).unwrap(), "null");
        assert_eq!(serde_json::to_string(&MaxCount::Limit(3)).unwrap(), "3");
        let parsed: MaxCount = serde_json::from_str("10").unwrap();
        assert_eq!(parsed, MaxCount::Limit(10));
    }

    #[test]
    fn test_observation_display() {
        let obs = Observation::new("AAPL", 1_000, 187.5);
        assert_eq!(obs.to_string(), "Observation(entity=AAPL, ts=1000, value=187.5)");
    }
}
