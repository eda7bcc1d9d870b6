//! Calculator configuration.
//!
//! The `CalculatorConfig` controls how a [`Calculator`](crate::Calculator)
//! applies updates. Missing keys take their default; unknown keys are
//! rejected.

use serde::{Deserialize, Serialize};

/// Settings of a [`Calculator`](crate::Calculator).
///
/// # Examples
///
/// ```rust
/// use statgraph::CalculatorConfig;
///
/// let config = CalculatorConfig::from_json(r#"{ "prune_after_update": false }"#).unwrap();
/// assert!(!config.prune_after_update);
/// assert!(config.buffer_events);
///
/// assert!(CalculatorConfig::from_json(r#"{ "prune": true }"#).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalculatorConfig {
    /// Remove nodes nothing listens to at the end of every update.
    pub prune_after_update: bool,

    /// Hold back external change notifications during an update and
    /// raise each at most once when it ends.
    pub buffer_events: bool,
}

impl CalculatorConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            prune_after_update: true,
            buffer_events: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CalculatorConfig::default();
        assert!(config.prune_after_update);
        assert!(config.buffer_events);
        assert_eq!(CalculatorConfig::from_json("{}").unwrap(), config);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = CalculatorConfig {
            prune_after_update: false,
            buffer_events: false,
        };
        let json = config.to_json().unwrap();
        assert_eq!(CalculatorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_types() {
        assert!(CalculatorConfig::from_json(r#"{ "buffer": true }"#).is_err());
        assert!(CalculatorConfig::from_json(r#"{ "buffer_events": "yes" }"#).is_err());
    }
}
