#![forbid(unsafe_code)]

//! In-memory document implementing every host trait.
//!
//! Element `E0` is the `html` root. Geometry is explicit: each element has a
//! fixed border box unless an inline `width`/`height` in pixels overrides
//! it, so values written by the engine feed back into later reads.
//!
//! Computed styles resolve in this order: inline value, author style,
//! inherited `font-size` (16px at the root), `0px` for paddings, else empty.

use std::cell::Cell;
use std::collections::BTreeMap;

use fluid_engine::{
    Anchors, Apply, ElementId, ElementTree, Measure, Observe, Resolved, Size, parse_px,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::selector::{Combinator, Compound, Selector};

pub const ROOT_FONT_SIZE: &str = "16px";
pub const DEFAULT_VIEWPORT: Size = Size::new(1024.0, 768.0);

/// A recorded `set_property` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleWrite {
    pub element: ElementId,
    pub property: String,
    pub value: String,
}

#[derive(Debug, Clone)]
struct MockElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    size: Size,
    styles: BTreeMap<String, String>,
    inline: BTreeMap<String, String>,
    connected: bool,
}

impl MockElement {
    fn new(tag: &str, parent: Option<ElementId>) -> Self {
        Self {
            tag: tag.to_owned(),
            id: None,
            classes: Vec::new(),
            parent,
            children: Vec::new(),
            size: Size::default(),
            styles: BTreeMap::new(),
            inline: BTreeMap::new(),
            connected: true,
        }
    }
}

#[derive(Debug)]
pub struct MockDocument {
    elements: Vec<MockElement>,
    viewport: Size,
    keywords: FxHashMap<(String, String), Resolved>,
    writes: Vec<StyleWrite>,
    visibility_observed: FxHashSet<ElementId>,
    dependency_observed: FxHashMap<ElementId, usize>,
    box_reads: Cell<usize>,
    style_reads: Cell<usize>,
}

impl Default for MockDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDocument {
    #[must_use]
    pub fn new() -> Self {
        let mut root = MockElement::new("html", None);
        root.size = DEFAULT_VIEWPORT;
        Self {
            elements: vec![root],
            viewport: DEFAULT_VIEWPORT,
            keywords: FxHashMap::default(),
            writes: Vec::new(),
            visibility_observed: FxHashSet::default(),
            dependency_observed: FxHashMap::default(),
            box_reads: Cell::new(0),
            style_reads: Cell::new(0),
        }
    }

    #[must_use]
    pub fn root_element(&self) -> ElementId {
        ElementId::from_raw(0)
    }

    /// Start building a child of `parent`.
    pub fn add(&mut self, parent: ElementId, tag: &str) -> ElementBuilder<'_> {
        let id = ElementId::from_raw(self.elements.len() as u32);
        self.elements.push(MockElement::new(tag, Some(parent)));
        if let Some(parent) = self.get_mut(parent) {
            parent.children.push(id);
        }
        ElementBuilder { doc: self, id }
    }

    /// Every element, root first, in creation order.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        (0..self.elements.len()).map(|raw| ElementId::from_raw(raw as u32))
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    pub fn set_size(&mut self, element: ElementId, width: f64, height: f64) {
        if let Some(el) = self.get_mut(element) {
            el.size = Size::new(width, height);
        }
    }

    pub fn set_style(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(el) = self.get_mut(element) {
            el.styles.insert(property.to_owned(), value.to_owned());
        }
    }

    /// Resolve `keyword` to `resolved` for every property.
    pub fn define_keyword(&mut self, keyword: &str, resolved: Resolved) {
        self.keywords.insert((String::new(), keyword.to_owned()), resolved);
    }

    /// Resolve `keyword` to `resolved` for `property` only.
    pub fn define_property_keyword(&mut self, property: &str, keyword: &str, resolved: Resolved) {
        self.keywords
            .insert((property.to_owned(), keyword.to_owned()), resolved);
    }

    /// Remove `element` and its subtree from the document.
    pub fn detach(&mut self, element: ElementId) {
        let mut stack = vec![element];
        while let Some(next) = stack.pop() {
            if let Some(el) = self.get_mut(next) {
                el.connected = false;
                stack.extend(el.children.iter().copied());
            }
        }
    }

    #[must_use]
    pub fn inline(&self, element: ElementId, property: &str) -> Option<&str> {
        self.get(element)?.inline.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn writes(&self) -> &[StyleWrite] {
        &self.writes
    }

    pub fn take_writes(&mut self) -> Vec<StyleWrite> {
        std::mem::take(&mut self.writes)
    }

    #[must_use]
    pub fn is_observing_visibility(&self, element: ElementId) -> bool {
        self.visibility_observed.contains(&element)
    }

    #[must_use]
    pub fn is_observing_dependency(&self, element: ElementId) -> bool {
        self.dependency_observed.contains_key(&element)
    }

    #[must_use]
    pub fn box_reads(&self) -> usize {
        self.box_reads.get()
    }

    #[must_use]
    pub fn style_reads(&self) -> usize {
        self.style_reads.get()
    }

    pub fn reset_reads(&self) {
        self.box_reads.set(0);
        self.style_reads.set(0);
    }

    fn get(&self, element: ElementId) -> Option<&MockElement> {
        self.elements.get(element.raw() as usize)
    }

    fn get_mut(&mut self, element: ElementId) -> Option<&mut MockElement> {
        self.elements.get_mut(element.raw() as usize)
    }

    fn compound_matches(&self, element: ElementId, compound: &Compound) -> bool {
        self.get(element)
            .is_some_and(|el| compound.matches(&el.tag, el.id.as_deref(), &el.classes))
    }

    /// Match `compounds[..=index]` with `compounds[index]` on `element`.
    fn matches_from(&self, element: ElementId, selector: &Selector, index: usize) -> bool {
        if !self.compound_matches(element, &selector.compounds[index]) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let mut ancestor = self.parent(element);
        match selector.combinators[index - 1] {
            Combinator::Child => {
                ancestor.is_some_and(|p| self.matches_from(p, selector, index - 1))
            }
            Combinator::Descendant => {
                while let Some(candidate) = ancestor {
                    if self.matches_from(candidate, selector, index - 1) {
                        return true;
                    }
                    ancestor = self.parent(candidate);
                }
                false
            }
        }
    }

    fn style_value(&self, element: ElementId, property: &str) -> String {
        let Some(el) = self.get(element) else {
            return String::new();
        };
        if let Some(value) = el.inline.get(property).filter(|v| !v.is_empty()) {
            return value.clone();
        }
        if let Some(value) = el.styles.get(property) {
            return value.clone();
        }
        match property {
            "font-size" => el
                .parent
                .map_or_else(|| ROOT_FONT_SIZE.to_owned(), |p| self.style_value(p, property)),
            p if p.starts_with("padding-") => "0px".to_owned(),
            _ => String::new(),
        }
    }

    fn content_width(&self, element: ElementId) -> f64 {
        let width = self.bounding_box_uncounted(element).width;
        let padding = |side| parse_px(&self.style_value(element, side)).unwrap_or(0.0);
        width - padding("padding-left") - padding("padding-right")
    }

    fn bounding_box_uncounted(&self, element: ElementId) -> Size {
        let Some(el) = self.get(element) else {
            return Size::default();
        };
        let inline_px = |property: &str| el.inline.get(property).and_then(|v| parse_px(v));
        Size::new(
            inline_px("width").unwrap_or(el.size.width),
            inline_px("height").unwrap_or(el.size.height),
        )
    }
}

impl ElementTree for MockDocument {
    fn root(&self) -> ElementId {
        self.root_element()
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.get(element)?.parent
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.get(element).is_some_and(|el| el.connected)
    }

    fn anchors(&self, element: ElementId) -> Anchors {
        self.get(element).map_or_else(Anchors::default, |el| Anchors {
            tag: el.tag.clone(),
            id: el.id.clone(),
            classes: el.classes.clone(),
        })
    }

    fn matches(&self, element: ElementId, selector: &str) -> bool {
        let Some(parsed) = Selector::parse(selector) else {
            return false;
        };
        self.matches_from(element, &parsed, parsed.compounds.len() - 1)
    }
}

impl Measure for MockDocument {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn bounding_box(&self, element: ElementId) -> Size {
        self.box_reads.set(self.box_reads.get() + 1);
        self.bounding_box_uncounted(element)
    }

    fn computed_style_value(&self, element: ElementId, property: &str) -> String {
        self.style_reads.set(self.style_reads.get() + 1);
        self.style_value(element, property)
    }

    fn measure_keyword(&self, _element: ElementId, property: &str, keyword: &str) -> Resolved {
        self.keywords
            .get(&(property.to_owned(), keyword.to_owned()))
            .or_else(|| self.keywords.get(&(String::new(), keyword.to_owned())))
            .cloned()
            .unwrap_or_else(|| Resolved::Text(keyword.to_owned()))
    }

    /// Pixel tracks keep their size; `fr` tracks share what is left of the
    /// content width. Other tracks measure as 0.
    fn measure_grid(&self, element: ElementId, _property: &str, track_list: &str) -> Vec<f64> {
        let tracks: Vec<&str> = track_list.split_whitespace().collect();
        let fixed: f64 = tracks.iter().filter_map(|t| parse_px(t)).sum();
        let fractions: f64 = tracks.iter().filter_map(|t| fraction(t)).sum();
        let free = (self.content_width(element) - fixed).max(0.0);
        tracks
            .iter()
            .map(|track| {
                if let Some(px) = parse_px(track) {
                    px
                } else if let Some(fr) = fraction(track) {
                    if fractions > 0.0 { free * fr / fractions } else { 0.0 }
                } else {
                    0.0
                }
            })
            .collect()
    }
}

fn fraction(track: &str) -> Option<f64> {
    track.strip_suffix("fr")?.parse().ok()
}

impl Apply for MockDocument {
    fn set_property(&mut self, element: ElementId, property: &str, value: &str) {
        if let Some(el) = self.get_mut(element) {
            if value.is_empty() {
                el.inline.remove(property);
            } else {
                el.inline.insert(property.to_owned(), value.to_owned());
            }
        }
        tracing::trace!(element = %element, property, value, "inline style written");
        self.writes.push(StyleWrite {
            element,
            property: property.to_owned(),
            value: value.to_owned(),
        });
    }
}

impl Observe for MockDocument {
    fn observe_visibility(&mut self, element: ElementId) {
        self.visibility_observed.insert(element);
    }

    fn unobserve_visibility(&mut self, element: ElementId) {
        self.visibility_observed.remove(&element);
    }

    fn observe_dependency(&mut self, element: ElementId) {
        *self.dependency_observed.entry(element).or_insert(0) += 1;
    }

    fn unobserve_dependency(&mut self, element: ElementId) {
        if let Some(count) = self.dependency_observed.get_mut(&element) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.dependency_observed.remove(&element);
            }
        }
    }
}

/// Fluent element construction returned by [`MockDocument::add`].
#[must_use]
pub struct ElementBuilder<'a> {
    doc: &'a mut MockDocument,
    id: ElementId,
}

impl ElementBuilder<'_> {
    fn element(&mut self) -> &mut MockElement {
        let index = self.id.raw() as usize;
        &mut self.doc.elements[index]
    }

    pub fn class(mut self, class: &str) -> Self {
        self.element().classes.push(class.to_owned());
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.element().id = Some(id.to_owned());
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.element().size = Size::new(width, height);
        self
    }

    /// Same padding on all four sides.
    pub fn padding(mut self, px: f64) -> Self {
        for side in ["padding-top", "padding-right", "padding-bottom", "padding-left"] {
            self.element().styles.insert(side.to_owned(), format!("{px}px"));
        }
        self
    }

    pub fn font_size(self, px: f64) -> Self {
        self.style("font-size", &format!("{px}px"))
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.element()
            .styles
            .insert(property.to_owned(), value.to_owned());
        self
    }

    pub fn build(self) -> ElementId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> (MockDocument, ElementId, ElementId) {
        let mut doc = MockDocument::new();
        let root = doc.root_element();
        let nav = doc
            .add(root, "nav")
            .class("nav")
            .size(800.0, 100.0)
            .padding(10.0)
            .font_size(20.0)
            .build();
        let item = doc.add(nav, "a").class("link").id("home").size(100.0, 20.0).build();
        (doc, nav, item)
    }

    #[test]
    fn selectors_match_through_combinators() {
        let (doc, nav, item) = doc();
        assert!(doc.matches(item, ".link"));
        assert!(doc.matches(item, "a#home.link"));
        assert!(doc.matches(item, ".nav > a"));
        assert!(doc.matches(item, "html a"));
        assert!(doc.matches(item, "*"));
        assert!(!doc.matches(item, "html > a"));
        assert!(!doc.matches(nav, ".link"));
        assert!(!doc.matches(item, "a:hover"));
    }

    #[test]
    fn font_size_inherits_and_inline_wins() {
        let (mut doc, nav, item) = doc();
        assert_eq!(doc.computed_style_value(doc.root_element(), "font-size"), "16px");
        assert_eq!(doc.computed_style_value(item, "font-size"), "20px");
        doc.set_property(nav, "font-size", "30px");
        assert_eq!(doc.computed_style_value(item, "font-size"), "30px");
        doc.set_property(nav, "font-size", "");
        assert_eq!(doc.computed_style_value(item, "font-size"), "20px");
        assert_eq!(doc.writes().len(), 2);
    }

    #[test]
    fn inline_lengths_override_the_box() {
        let (mut doc, nav, _) = doc();
        assert_eq!(doc.bounding_box(nav), Size::new(800.0, 100.0));
        doc.set_property(nav, "width", "500px");
        assert_eq!(doc.bounding_box(nav), Size::new(500.0, 100.0));
        assert_eq!(doc.box_reads(), 2);
    }

    #[test]
    fn grid_tracks_share_free_space() {
        let (doc, nav, _) = doc();
        assert_eq!(
            doc.measure_grid(nav, "grid-template-columns", "100px 1fr 3fr"),
            vec![100.0, 170.0, 510.0]
        );
        assert_eq!(
            doc.measure_grid(nav, "grid-template-columns", "auto 50px"),
            vec![0.0, 50.0]
        );
    }

    #[test]
    fn keywords_prefer_property_specific_entries() {
        let (mut doc, _, item) = doc();
        doc.define_keyword("thin", Resolved::Px(1.0));
        doc.define_property_keyword("outline-width", "thin", Resolved::Px(2.0));
        assert_eq!(doc.measure_keyword(item, "border-top-width", "thin"), Resolved::Px(1.0));
        assert_eq!(doc.measure_keyword(item, "outline-width", "thin"), Resolved::Px(2.0));
        assert_eq!(
            doc.measure_keyword(item, "width", "auto"),
            Resolved::Text("auto".into())
        );
    }

    #[test]
    fn detaching_disconnects_the_subtree() {
        let (mut doc, nav, item) = doc();
        doc.detach(nav);
        assert!(!doc.is_connected(nav));
        assert!(!doc.is_connected(item));
        assert!(doc.is_connected(doc.root_element()));
    }
}
