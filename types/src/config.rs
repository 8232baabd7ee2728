//! Placeholder rendering configuration.
//!
//! Loaded from TOML by hosts; every field has a default so an empty file is
//! a valid configuration.

use serde::{Deserialize, Serialize};

use crate::formatting::DurationFormatter;

/// Top-level placeholder settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaceholderConfig {
    /// How boolean results are rendered
    #[serde(default)]
    pub boolean: BooleanFormat,

    /// How expiry durations are rendered
    #[serde(default)]
    pub duration: DurationStyle,
}

/// The two literal strings used for boolean placeholder results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanFormat {
    #[serde(default = "default_true_value")]
    pub true_value: String,

    #[serde(default = "default_false_value")]
    pub false_value: String,
}

impl BooleanFormat {
    pub fn new(true_value: impl Into<String>, false_value: impl Into<String>) -> Self {
        Self {
            true_value: true_value.into(),
            false_value: false_value.into(),
        }
    }

    /// Pick the configured text for `value`.
    pub fn text(&self, value: bool) -> &str {
        if value {
            &self.true_value
        } else {
            &self.false_value
        }
    }
}

impl Default for BooleanFormat {
    fn default() -> Self {
        Self::new(default_true_value(), default_false_value())
    }
}

fn default_true_value() -> String {
    "yes".to_string()
}

fn default_false_value() -> String {
    "no".to_string()
}

/// Preset used when formatting remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationStyle {
    /// `1 day 2 hours 3 minutes`
    Long,
    /// `1d 2h 3m 4s`
    #[default]
    Concise,
    /// `1d 2h 3m`, at most three segments
    ConciseLowAccuracy,
}

impl DurationStyle {
    pub fn formatter(self) -> DurationFormatter {
        match self {
            Self::Long => DurationFormatter::LONG,
            Self::Concise => DurationFormatter::CONCISE,
            Self::ConciseLowAccuracy => DurationFormatter::CONCISE_LOW_ACCURACY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: PlaceholderConfig = toml::from_str("").unwrap();
        assert_eq!(config, PlaceholderConfig::default());
        assert_eq!(config.boolean.text(true), "yes");
        assert_eq!(config.boolean.text(false), "no");
        assert_eq!(config.duration, DurationStyle::Concise);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml = r#"
duration = "concise_low_accuracy"

[boolean]
true_value = "&aTrue"
false_value = "&cFalse"
"#;

        let config: PlaceholderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.boolean.text(true), "&aTrue");
        assert_eq!(config.boolean.text(false), "&cFalse");
        assert_eq!(config.duration.formatter(), DurationFormatter::CONCISE_LOW_ACCURACY);
    }

    #[test]
    fn test_partial_boolean_section() {
        let toml = r#"
[boolean]
false_value = "nope"
"#;

        let config: PlaceholderConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.boolean.text(true), "yes");
        assert_eq!(config.boolean.text(false), "nope");
    }
}
