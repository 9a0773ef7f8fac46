//! Force and lock directives.
//!
//! Both travel as sibling custom properties on a rule (`--force`, `--lock`
//! by default). The value is a space-separated list of property names, or
//! `all`. Lock entries may also address one component of a value as
//! `property/group` or `property/group/value`.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keyword that selects every property.
pub const ALL_KEYWORD: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Directive {
    All,
    Properties(BTreeSet<String>),
}

impl Directive {
    /// Parse a directive value. Returns `None` for an empty value.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let entries: BTreeSet<String> = raw.split_whitespace().map(str::to_owned).collect();
        if entries.is_empty() {
            None
        } else if entries.contains(ALL_KEYWORD) {
            Some(Self::All)
        } else {
            Some(Self::Properties(entries))
        }
    }

    /// Whether the directive names `property` as a whole.
    #[must_use]
    pub fn covers(&self, property: &str) -> bool {
        match self {
            Self::All => true,
            Self::Properties(entries) => entries.contains(property),
        }
    }

    /// Whether the component at `group`/`value` of `property` is locked.
    #[must_use]
    pub fn locks_component(&self, property: &str, group: usize, value: usize) -> bool {
        match self {
            Self::All => true,
            Self::Properties(entries) => {
                entries.contains(property)
                    || entries.contains(&format!("{property}/{group}"))
                    || entries.contains(&format!("{property}/{group}/{value}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_is_no_directive() {
        assert_eq!(Directive::parse(""), None);
        assert_eq!(Directive::parse("   "), None);
    }

    #[test]
    fn all_wins_over_names() {
        assert_eq!(Directive::parse("width all"), Some(Directive::All));
        assert!(Directive::All.covers("anything"));
    }

    #[test]
    fn property_list_covers_named_properties_only() {
        let directive = Directive::parse("width  font-size").unwrap();
        assert!(directive.covers("width"));
        assert!(directive.covers("font-size"));
        assert!(!directive.covers("height"));
    }

    #[test]
    fn component_paths_lock_narrowly() {
        let directive = Directive::parse("padding/0/1 margin/1").unwrap();
        assert!(directive.locks_component("padding", 0, 1));
        assert!(!directive.locks_component("padding", 0, 0));
        assert!(directive.locks_component("margin", 1, 3));
        assert!(!directive.locks_component("margin", 0, 0));
        assert!(!directive.covers("padding"));
    }
}
