//! Rule source records.
//!
//! Structured form of the style rules the range builder consumes: style
//! rules with their fluid declarations and directives, `(min-width)` media
//! rules, and the breakpoint batches built from them.

use std::sync::LazyLock;

use regex_lite::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ParseConfig;
use crate::directive::Directive;

static MIN_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*min-width:\s*(\d+(?:\.\d+)?)px\s*\)").expect("min-width pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

/// A style rule reduced to its fluid declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleRule {
    pub selector_text: String,
    pub declarations: Vec<Declaration>,
    pub force: Option<Directive>,
    pub lock: Option<Directive>,
}

impl StyleRule {
    #[must_use]
    pub fn new(selector_text: impl Into<String>) -> Self {
        Self {
            selector_text: selector_text.into(),
            ..Self::default()
        }
    }

    /// Build from raw `(property, value)` pairs.
    ///
    /// The configured force / lock properties become directives; other
    /// properties outside the fluid list are dropped.
    #[must_use]
    pub fn from_declarations<I, K, V>(
        selector_text: impl Into<String>,
        pairs: I,
        config: &ParseConfig,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut rule = Self::new(selector_text);
        for (property, value) in pairs {
            let (property, value) = (property.as_ref().trim(), value.as_ref().trim());
            if property == config.force_property {
                rule.force = Directive::parse(value);
            } else if property == config.lock_property {
                rule.lock = Directive::parse(value);
            } else if config.is_fluid_property(property) {
                rule.declarations.push(Declaration {
                    property: property.to_owned(),
                    value: value.to_owned(),
                });
            }
        }
        rule
    }

    #[must_use]
    pub fn declare(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.declarations.push(Declaration {
            property: property.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn with_force(mut self, raw: &str) -> Self {
        self.force = Directive::parse(raw);
        self
    }

    #[must_use]
    pub fn with_lock(mut self, raw: &str) -> Self {
        self.lock = Directive::parse(raw);
        self
    }

    /// Individual selectors of a comma-separated selector list.
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.selector_text.split(',').map(str::trim).filter(|s| !s.is_empty())
    }

    /// Value of `property`; the last declaration wins.
    #[must_use]
    pub fn value_of(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value.as_str())
    }

    #[must_use]
    pub fn has_selector(&self, selector: &str) -> bool {
        self.selectors().any(|s| s == selector)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MediaRule {
    pub min_width: f64,
    pub rules: Vec<StyleRule>,
}

impl MediaRule {
    #[must_use]
    pub fn new(min_width: f64, rules: Vec<StyleRule>) -> Self {
        Self { min_width, rules }
    }

    /// Build from a media condition. Only `(min-width: Npx)` is understood.
    #[must_use]
    pub fn from_condition(media_text: &str, rules: Vec<StyleRule>) -> Option<Self> {
        let caps = MIN_WIDTH.captures(media_text)?;
        let min_width = caps[1].parse().ok()?;
        Some(Self { min_width, rules })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SheetRule {
    Style(StyleRule),
    Media(MediaRule),
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleSheet {
    pub rules: Vec<SheetRule>,
}

impl StyleSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn style(mut self, rule: StyleRule) -> Self {
        self.rules.push(SheetRule::Style(rule));
        self
    }

    #[must_use]
    pub fn media(mut self, min_width: f64, rules: Vec<StyleRule>) -> Self {
        self.rules.push(SheetRule::Media(MediaRule::new(min_width, rules)));
        self
    }

    pub fn media_rules(&self) -> impl Iterator<Item = &MediaRule> {
        self.rules.iter().filter_map(|rule| match rule {
            SheetRule::Media(media) => Some(media),
            SheetRule::Style(_) => None,
        })
    }
}

/// Style rules that apply from one breakpoint width upward.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleBatch {
    pub width: f64,
    pub rules: Vec<StyleRule>,
    pub is_media_query: bool,
}

impl RuleBatch {
    #[must_use]
    pub fn new(width: f64, rules: Vec<StyleRule>) -> Self {
        Self {
            width,
            rules,
            is_media_query: true,
        }
    }

    #[must_use]
    pub fn baseline(width: f64, rules: Vec<StyleRule>) -> Self {
        Self {
            width,
            rules,
            is_media_query: false,
        }
    }
}
