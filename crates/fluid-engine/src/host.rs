#![forbid(unsafe_code)]

//! Host collaborator interface.
//!
//! The engine never owns a document. It asks the host to walk the element
//! tree, measure geometry and styles, apply resolved values and register
//! observation. Each concern is its own trait; [`Host`] is the blanket
//! combination the scheduler needs.
//!
//! Measurement takes `&self`. Only [`Apply`] and [`Observe`] take
//! `&mut self`.

use std::fmt;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Opaque handle for a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
pub struct ElementId(u32);

impl ElementId {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Result of measuring a keyword on an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Px(f64),
    /// The host could not reduce the keyword to pixels (e.g. `auto`).
    Text(String),
}

/// Lookup keys for an element: the anchors its selectors can index under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Anchors {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Anchors {
    /// Classes, id, lower-cased tag, then the universal anchor.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = self.classes.clone();
        tokens.extend(self.id.iter().cloned());
        if !self.tag.is_empty() {
            tokens.push(self.tag.to_ascii_lowercase());
        }
        tokens.push(fluid_parse::UNIVERSAL_ANCHOR.to_owned());
        tokens
    }
}

pub trait ElementTree {
    /// Root element; the basis for `rem` and the fallback parent.
    fn root(&self) -> ElementId;

    fn parent(&self, element: ElementId) -> Option<ElementId>;

    fn is_connected(&self, element: ElementId) -> bool;

    fn anchors(&self, element: ElementId) -> Anchors;

    /// Full selector match.
    fn matches(&self, element: ElementId, selector: &str) -> bool;
}

pub trait Measure {
    fn viewport(&self) -> Size;

    fn bounding_box(&self, element: ElementId) -> Size;

    /// Computed style value as the host would report it, e.g. `"16px"`.
    fn computed_style_value(&self, element: ElementId, property: &str) -> String;

    /// Resolve a keyword for `property` on `element`. The host may apply the
    /// keyword temporarily and must restore the element afterwards.
    fn measure_keyword(&self, element: ElementId, property: &str, keyword: &str) -> Resolved;

    /// Resolve a whole grid track list to pixel track sizes.
    fn measure_grid(&self, element: ElementId, property: &str, track_list: &str) -> Vec<f64>;
}

pub trait Apply {
    /// Write an inline value. An empty value clears the property.
    fn set_property(&mut self, element: ElementId, property: &str, value: &str);
}

pub trait Observe {
    fn observe_visibility(&mut self, element: ElementId);

    fn unobserve_visibility(&mut self, element: ElementId);

    /// Start reporting size/attribute changes of a percentage basis element.
    fn observe_dependency(&mut self, element: ElementId);

    fn unobserve_dependency(&mut self, element: ElementId);
}

/// Everything a tick needs from the host.
pub trait Host: ElementTree + Measure + Apply + Observe {}

impl<T: ElementTree + Measure + Apply + Observe> Host for T {}

/// Parent of `element`, or the root when it has none.
pub fn parent_or_root<T: ElementTree + ?Sized>(tree: &T, element: ElementId) -> ElementId {
    tree.parent(element).unwrap_or_else(|| tree.root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_ids_display_with_prefix() {
        assert_eq!(ElementId::from_raw(7).to_string(), "E7");
        assert_eq!(ElementId::from_raw(7).raw(), 7);
    }

    #[test]
    fn anchor_tokens_end_with_universal() {
        let anchors = Anchors {
            tag: "DIV".into(),
            id: Some("main".into()),
            classes: vec!["card".into(), "wide".into()],
        };
        assert_eq!(anchors.tokens(), vec!["card", "wide", "main", "div", "*"]);
    }
}
