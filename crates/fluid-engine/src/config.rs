#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`EngineConfig::default()`] reproduces the built-in behavior. With the
//! `config` feature, [`FluidConfig`] (parse and engine settings together)
//! loads from TOML or JSON:
//!
//! ```toml
//! [parse]
//! baseline_width = 320
//!
//! [engine]
//! repeat_tolerance = 0.5
//! priority_properties = ["font-size", "line-height"]
//!
//! [engine.property_redirects]
//! "--fluid-bg-size" = "background-size"
//! ```
//!
//! Missing fields keep their defaults.

use std::collections::BTreeMap;
#[cfg(feature = "config")]
use std::path::Path;

use fluid_parse::ParseConfig;
#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TICK_CACHE_CAPACITY;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize), serde(default))]
pub struct EngineConfig {
    /// Widths closer than this to the last update width reuse the applied
    /// value.
    pub repeat_tolerance: f64,
    /// Maximum cached reads per tick.
    pub tick_cache_capacity: usize,
    /// Properties resolved first among declarations of equal order.
    pub priority_properties: Vec<String>,
    /// Property name written instead of the declared one.
    pub property_redirects: BTreeMap<String, String>,
    /// Give newly hidden elements one final resolution pass.
    pub flush_hidden: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repeat_tolerance: 1.0,
            tick_cache_capacity: DEFAULT_TICK_CACHE_CAPACITY,
            priority_properties: vec!["font-size".to_owned(), "line-height".to_owned()],
            property_redirects: BTreeMap::from([(
                "--fluid-bg-size".to_owned(),
                "background-size".to_owned(),
            )]),
            flush_hidden: true,
        }
    }
}

impl EngineConfig {
    /// Name to write for `property`.
    #[must_use]
    pub fn redirect<'a>(&'a self, property: &'a str) -> &'a str {
        self.property_redirects
            .get(property)
            .map_or(property, String::as_str)
    }

    #[must_use]
    pub fn is_priority(&self, property: &str) -> bool {
        self.priority_properties.iter().any(|p| p == property)
    }

    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.repeat_tolerance.is_finite() || self.repeat_tolerance < 0.0 {
            errors.push(format!(
                "repeat_tolerance must be finite and non-negative, got {}",
                self.repeat_tolerance
            ));
        }
        if self.tick_cache_capacity == 0 {
            errors.push("tick_cache_capacity must be > 0".to_owned());
        }
        for (from, to) in &self.property_redirects {
            if from.trim().is_empty() || to.trim().is_empty() {
                errors.push(format!("property redirect `{from}` -> `{to}` has an empty side"));
            }
        }
        errors
    }
}

/// Parse and engine settings loaded together.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize), serde(default))]
pub struct FluidConfig {
    pub parse: ParseConfig,
    pub engine: EngineConfig,
}

impl FluidConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors: Vec<String> = self
            .parse
            .validate()
            .into_iter()
            .map(|e| format!("parse: {e}"))
            .collect();
        errors.extend(self.engine.validate().into_iter().map(|e| format!("engine: {e}")));
        errors
    }

    /// Validate and return `self`, or every problem found.
    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(feature = "config")]
impl FluidConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(s).map_err(ConfigError::Toml)?.into_validated()
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&text)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(s).map_err(ConfigError::Json)?.into_validated()
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(ConfigError::Json)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    Invalid(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Invalid(errors) => write!(f, "invalid configuration: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FluidConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.engine.repeat_tolerance, 1.0);
        assert!(config.engine.flush_hidden);
    }

    #[test]
    fn redirects_rename_only_listed_properties() {
        let config = EngineConfig::default();
        assert_eq!(config.redirect("--fluid-bg-size"), "background-size");
        assert_eq!(config.redirect("width"), "width");
    }

    #[test]
    fn invalid_values_are_collected() {
        let config = FluidConfig {
            engine: EngineConfig {
                repeat_tolerance: -1.0,
                tick_cache_capacity: 0,
                ..EngineConfig::default()
            },
            ..FluidConfig::default()
        };
        let Err(ConfigError::Invalid(errors)) = config.into_validated() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.starts_with("engine: ")));
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = FluidConfig::from_toml_str(
            r#"
            [parse]
            baseline_width = 320

            [engine]
            repeat_tolerance = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.parse.baseline_width, 320.0);
        assert_eq!(config.engine.repeat_tolerance, 0.5);
        assert_eq!(config.engine.tick_cache_capacity, DEFAULT_TICK_CACHE_CAPACITY);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_round_trips_and_rejects_invalid() {
        let json = FluidConfig::default().to_json().unwrap();
        assert_eq!(FluidConfig::from_json_str(&json).unwrap(), FluidConfig::default());
        assert!(matches!(
            FluidConfig::from_json_str(r#"{"engine": {"tick_cache_capacity": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
