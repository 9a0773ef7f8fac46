//! Fluid data model.
//!
//! Ranges are indexed `anchor → selector → property`. The anchor is a cheap
//! key derived from a selector's last compound part so elements can find
//! candidate selectors without testing every selector in the document.
//!
//! # Invariants
//!
//! 1. Every [`FluidRange`] has `min_index < max_index`, both valid indices
//!    into [`FluidModel::breakpoints`].
//! 2. A [`PropertyEntry`] keeps the order of the first declaration that
//!    created it; later ranges are appended without changing it.
//! 3. Selector and property maps iterate in a stable (sorted) order.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::directive::Directive;
use crate::value::FluidValue;

/// Anchor for selectors with no id, class or tag.
pub const UNIVERSAL_ANCHOR: &str = "*";

/// A pair of values interpolated between two breakpoints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FluidRange {
    pub min_value: FluidValue,
    pub max_value: FluidValue,
    pub min_index: usize,
    pub max_index: usize,
    pub locks: Option<Directive>,
}

impl FluidRange {
    /// Returns `None` unless `min_index < max_index`.
    #[must_use]
    pub fn new(
        min_value: FluidValue,
        max_value: FluidValue,
        min_index: usize,
        max_index: usize,
    ) -> Option<Self> {
        (min_index < max_index).then_some(Self {
            min_value,
            max_value,
            min_index,
            max_index,
            locks: None,
        })
    }

    #[must_use]
    pub fn with_locks(mut self, locks: Option<Directive>) -> Self {
        self.locks = locks;
        self
    }

    /// True when either endpoint contains a percentage anywhere.
    #[must_use]
    pub fn has_percent(&self) -> bool {
        self.min_value
            .iter()
            .chain(&self.max_value)
            .flatten()
            .any(crate::value::Node::has_percent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropertyMeta {
    pub order: u32,
    pub property: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PropertyEntry {
    pub meta: PropertyMeta,
    pub ranges: Vec<FluidRange>,
}

impl PropertyEntry {
    /// One slot per breakpoint, holding the first range starting there.
    #[must_use]
    pub fn slots(&self, breakpoint_count: usize) -> Vec<Option<FluidRange>> {
        let mut slots = vec![None; breakpoint_count];
        for range in &self.ranges {
            if let Some(slot) = slots.get_mut(range.min_index) {
                if slot.is_none() {
                    *slot = Some(range.clone());
                }
            }
        }
        slots
    }
}

/// `selector → property → entry` for one anchor.
pub type SelectorMap = BTreeMap<String, BTreeMap<String, PropertyEntry>>;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FluidModel {
    breakpoints: Vec<f64>,
    anchors: FxHashMap<String, SelectorMap>,
}

impl FluidModel {
    /// `breakpoints` must already be sorted and de-duplicated.
    #[must_use]
    pub fn new(breakpoints: Vec<f64>) -> Self {
        Self {
            breakpoints,
            anchors: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    /// Index of an exact breakpoint width.
    #[must_use]
    pub fn breakpoint_index(&self, width: f64) -> Option<usize> {
        self.breakpoints
            .iter()
            .position(|bp| (bp - width).abs() < f64::EPSILON)
    }

    pub fn insert(&mut self, selector: &str, property: &str, order: u32, range: FluidRange) {
        let entry = self
            .anchors
            .entry(anchor_of(selector))
            .or_default()
            .entry(selector.to_owned())
            .or_default()
            .entry(property.to_owned())
            .or_insert_with(|| PropertyEntry {
                meta: PropertyMeta {
                    order,
                    property: property.to_owned(),
                },
                ranges: Vec::new(),
            });
        entry.ranges.push(range);
    }

    #[must_use]
    pub fn anchor(&self, anchor: &str) -> Option<&SelectorMap> {
        self.anchors.get(anchor)
    }

    pub fn anchors(&self) -> impl Iterator<Item = (&str, &SelectorMap)> {
        self.anchors.iter().map(|(anchor, map)| (anchor.as_str(), map))
    }

    /// Entry for an exact `(selector, property)` pair.
    #[must_use]
    pub fn entry(&self, selector: &str, property: &str) -> Option<&PropertyEntry> {
        self.anchors
            .get(&anchor_of(selector))?
            .get(selector)?
            .get(property)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    #[must_use]
    pub fn range_count(&self) -> usize {
        self.anchors
            .values()
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(|entry| entry.ranges.len())
            .sum()
    }
}

impl fmt::Display for FluidModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FluidModel({} breakpoints, {} anchors, {} ranges)",
            self.breakpoints.len(),
            self.anchors.len(),
            self.range_count()
        )
    }
}

/// Anchor of a selector: id, else first class, else lower-cased tag, else `*`.
#[must_use]
pub fn anchor_of(selector: &str) -> String {
    let stripped = strip_groups(selector);
    let compound = stripped
        .split(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
        .filter(|part| !part.is_empty())
        .next_back()
        .unwrap_or_default();

    if let Some(id) = ident_after(compound, '#') {
        return id;
    }
    if let Some(class) = ident_after(compound, '.') {
        return class;
    }
    let tag: String = compound.chars().take_while(|c| is_ident_char(*c)).collect();
    if tag.is_empty() {
        UNIVERSAL_ANCHOR.to_owned()
    } else {
        tag.to_ascii_lowercase()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn ident_after(compound: &str, marker: char) -> Option<String> {
    let start = compound.find(marker)? + marker.len_utf8();
    let ident: String = compound[start..].chars().take_while(|c| is_ident_char(*c)).collect();
    (!ident.is_empty()).then_some(ident)
}

/// Drop `[...]` and `(...)` contents so attribute values and pseudo-class
/// arguments cannot be mistaken for combinators or class markers.
fn strip_groups(selector: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut depth = 0usize;
    for c in selector.chars() {
        match c {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::parse_value;

    fn range(min: usize, max: usize) -> FluidRange {
        FluidRange::new(parse_value("1px"), parse_value("2px"), min, max).unwrap()
    }

    #[test]
    fn anchors_prefer_id_then_class_then_tag() {
        assert_eq!(anchor_of("#hero"), "hero");
        assert_eq!(anchor_of("div.card#main"), "main");
        assert_eq!(anchor_of(".nav .item.active"), "item");
        assert_eq!(anchor_of("main > SECTION"), "section");
        assert_eq!(anchor_of("ul li:hover"), "li");
        assert_eq!(anchor_of("*"), UNIVERSAL_ANCHOR);
        assert_eq!(anchor_of("[data-x]"), UNIVERSAL_ANCHOR);
        assert_eq!(anchor_of("a[href$='.pdf']"), "a");
        assert_eq!(anchor_of("li:nth-child(2n + 1)"), "li");
    }

    #[test]
    fn ranges_require_increasing_indices() {
        assert!(FluidRange::new(Vec::new(), Vec::new(), 1, 1).is_none());
        assert!(FluidRange::new(Vec::new(), Vec::new(), 2, 1).is_none());
        assert!(FluidRange::new(Vec::new(), Vec::new(), 0, 1).is_some());
    }

    #[test]
    fn first_insert_fixes_the_order() {
        let mut model = FluidModel::new(vec![375.0, 768.0, 1440.0]);
        model.insert(".a", "width", 2, range(0, 1));
        model.insert(".a", "width", 9, range(1, 2));
        let entry = model.entry(".a", "width").unwrap();
        assert_eq!(entry.meta.order, 2);
        assert_eq!(entry.ranges.len(), 2);
        assert_eq!(model.range_count(), 2);
    }

    #[test]
    fn slots_keep_the_first_range_per_start_index() {
        let entry = PropertyEntry {
            meta: PropertyMeta {
                order: 0,
                property: "width".into(),
            },
            ranges: vec![range(0, 2), range(0, 1), range(1, 2)],
        };
        let slots = entry.slots(3);
        assert_eq!(slots[0].as_ref().map(|r| r.max_index), Some(2));
        assert_eq!(slots[1].as_ref().map(|r| r.max_index), Some(2));
        assert!(slots[2].is_none());
    }

    #[test]
    fn percent_detection_covers_both_endpoints() {
        let r = FluidRange::new(parse_value("10px"), parse_value("50%"), 0, 1).unwrap();
        assert!(r.has_percent());
        assert!(!range(0, 1).has_percent());
    }
}
