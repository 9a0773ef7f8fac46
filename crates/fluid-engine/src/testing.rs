//! Minimal in-crate host for unit tests.

use std::cell::Cell;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::host::{Anchors, Apply, ElementId, ElementTree, Measure, Observe, Resolved, Size};

pub(crate) const ROOT: ElementId = ElementId::from_raw(0);

#[derive(Debug)]
pub(crate) struct StubHost {
    pub viewport: Size,
    pub parents: FxHashMap<ElementId, ElementId>,
    pub boxes: FxHashMap<ElementId, Size>,
    pub styles: FxHashMap<(ElementId, String), String>,
    pub classes: FxHashMap<ElementId, Vec<String>>,
    pub keywords: FxHashMap<String, Resolved>,
    pub disconnected: FxHashSet<ElementId>,
    pub writes: Vec<(ElementId, String, String)>,
    pub visible_observed: FxHashSet<ElementId>,
    pub dependency_observed: FxHashMap<ElementId, u32>,
    reads: Cell<usize>,
}

impl StubHost {
    pub fn new() -> Self {
        Self {
            viewport: Size::new(1000.0, 800.0),
            parents: FxHashMap::default(),
            boxes: FxHashMap::default(),
            styles: FxHashMap::default(),
            classes: FxHashMap::default(),
            keywords: FxHashMap::default(),
            disconnected: FxHashSet::default(),
            writes: Vec::new(),
            visible_observed: FxHashSet::default(),
            dependency_observed: FxHashMap::default(),
            reads: Cell::new(0),
        }
    }

    pub fn with_parent(mut self, child: u32, parent: u32) -> Self {
        self.parents
            .insert(ElementId::from_raw(child), ElementId::from_raw(parent));
        self
    }

    pub fn with_box(mut self, element: u32, width: f64, height: f64) -> Self {
        self.boxes
            .insert(ElementId::from_raw(element), Size::new(width, height));
        self
    }

    pub fn with_style(mut self, element: u32, property: &str, value: &str) -> Self {
        self.styles
            .insert((ElementId::from_raw(element), property.to_owned()), value.to_owned());
        self
    }

    pub fn with_class(mut self, element: u32, class: &str) -> Self {
        self.classes
            .entry(ElementId::from_raw(element))
            .or_default()
            .push(class.to_owned());
        self
    }

    pub fn with_keyword(mut self, keyword: &str, resolved: Resolved) -> Self {
        self.keywords.insert(keyword.to_owned(), resolved);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn last_write(&self, element: ElementId, property: &str) -> Option<&str> {
        self.writes
            .iter()
            .rev()
            .find(|(e, p, _)| *e == element && p == property)
            .map(|(_, _, v)| v.as_str())
    }
}

impl ElementTree for StubHost {
    fn root(&self) -> ElementId {
        ROOT
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.parents.get(&element).copied()
    }

    fn is_connected(&self, element: ElementId) -> bool {
        !self.disconnected.contains(&element)
    }

    fn anchors(&self, element: ElementId) -> Anchors {
        Anchors {
            tag: "div".to_owned(),
            id: None,
            classes: self.classes.get(&element).cloned().unwrap_or_default(),
        }
    }

    fn matches(&self, element: ElementId, selector: &str) -> bool {
        selector.strip_prefix('.').is_some_and(|class| {
            self.classes
                .get(&element)
                .is_some_and(|c| c.iter().any(|x| x == class))
        })
    }
}

impl Measure for StubHost {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn bounding_box(&self, element: ElementId) -> Size {
        self.reads.set(self.reads.get() + 1);
        self.boxes
            .get(&element)
            .copied()
            .unwrap_or(Size::new(1000.0, 500.0))
    }

    fn computed_style_value(&self, element: ElementId, property: &str) -> String {
        self.reads.set(self.reads.get() + 1);
        if let Some(value) = self.styles.get(&(element, property.to_owned())) {
            return value.clone();
        }
        match property {
            "font-size" if element == ROOT => "16px".to_owned(),
            "font-size" => "20px".to_owned(),
            p if p.starts_with("padding-") => "0px".to_owned(),
            _ => String::new(),
        }
    }

    fn measure_keyword(&self, _element: ElementId, _property: &str, keyword: &str) -> Resolved {
        self.keywords
            .get(keyword)
            .cloned()
            .unwrap_or_else(|| Resolved::Text(keyword.to_owned()))
    }

    fn measure_grid(&self, _element: ElementId, _property: &str, track_list: &str) -> Vec<f64> {
        track_list
            .split_whitespace()
            .map(|track| track.trim_end_matches("px").parse().unwrap_or(0.0))
            .collect()
    }
}

impl Apply for StubHost {
    fn set_property(&mut self, element: ElementId, property: &str, value: &str) {
        self.writes
            .push((element, property.to_owned(), value.to_owned()));
    }
}

impl Observe for StubHost {
    fn observe_visibility(&mut self, element: ElementId) {
        self.visible_observed.insert(element);
    }

    fn unobserve_visibility(&mut self, element: ElementId) {
        self.visible_observed.remove(&element);
    }

    fn observe_dependency(&mut self, element: ElementId) {
        *self.dependency_observed.entry(element).or_default() += 1;
    }

    fn unobserve_dependency(&mut self, element: ElementId) {
        if let Some(count) = self.dependency_observed.get_mut(&element) {
            *count -= 1;
            if *count == 0 {
                self.dependency_observed.remove(&element);
            }
        }
    }
}
