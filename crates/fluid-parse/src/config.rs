#![forbid(unsafe_code)]

//! Parse-side configuration.
//!
//! [`ParseConfig::default()`] reproduces the built-in constants: a 375px
//! baseline, `--force` / `--lock` directive properties and the standard fluid
//! property name list.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width used for top-level rules when no sheet declares an empty media rule.
pub const DEFAULT_BASELINE_WIDTH: f64 = 375.0;

/// Properties that take part in fluid interpolation by default.
pub const FLUID_PROPERTY_NAMES: &[&str] = &[
    "font-size",
    "line-height",
    "letter-spacing",
    "word-spacing",
    "text-indent",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "border-top-left-radius",
    "border-top-right-radius",
    "border-bottom-right-radius",
    "border-bottom-left-radius",
    "width",
    "min-width",
    "max-width",
    "height",
    "min-height",
    "max-height",
    "grid-template-columns",
    "grid-template-rows",
    "background-position-x",
    "background-position-y",
    "--fluid-bg-size",
    "top",
    "left",
    "right",
    "bottom",
    "column-gap",
    "row-gap",
];

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ParseConfig {
    /// Baseline breakpoint width for rules outside any media query.
    pub baseline_width: f64,
    /// Custom property carrying the force directive.
    pub force_property: String,
    /// Custom property carrying the lock directive.
    pub lock_property: String,
    /// Accepted property names. Empty accepts every property.
    pub fluid_properties: BTreeSet<String>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            baseline_width: DEFAULT_BASELINE_WIDTH,
            force_property: "--force".to_owned(),
            lock_property: "--lock".to_owned(),
            fluid_properties: FLUID_PROPERTY_NAMES.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl ParseConfig {
    /// Accept every property name, not only the fluid list.
    #[must_use]
    pub fn accept_all_properties(mut self) -> Self {
        self.fluid_properties.clear();
        self
    }

    #[must_use]
    pub fn is_fluid_property(&self, property: &str) -> bool {
        self.fluid_properties.is_empty() || self.fluid_properties.contains(property)
    }

    /// Returns a list of problems; empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.baseline_width.is_finite() || self.baseline_width < 0.0 {
            errors.push(format!(
                "baseline_width must be a finite non-negative width, got {}",
                self.baseline_width
            ));
        }
        if self.force_property.trim().is_empty() {
            errors.push("force_property must not be empty".to_owned());
        }
        if self.lock_property.trim().is_empty() {
            errors.push("lock_property must not be empty".to_owned());
        }
        if self.force_property == self.lock_property {
            errors.push(format!(
                "force_property and lock_property must differ (both `{}`)",
                self.force_property
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ParseConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.baseline_width, 375.0);
        assert!(config.is_fluid_property("font-size"));
        assert!(config.is_fluid_property("--fluid-bg-size"));
        assert!(!config.is_fluid_property("color"));
    }

    #[test]
    fn empty_list_accepts_everything() {
        let config = ParseConfig::default().accept_all_properties();
        assert!(config.is_fluid_property("color"));
    }

    #[test]
    fn validation_reports_each_problem() {
        let config = ParseConfig {
            baseline_width: f64::NAN,
            force_property: "--x".into(),
            lock_property: "--x".into(),
            ..ParseConfig::default()
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_keeps_defaults() {
        let config: ParseConfig = serde_json::from_str(r#"{"baseline_width": 320}"#).unwrap();
        assert_eq!(config.baseline_width, 320.0);
        assert_eq!(config.force_property, "--force");
        assert!(config.is_fluid_property("width"));
    }
}
