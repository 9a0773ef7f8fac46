//! Fluid property runtime object.
//!
//! A [`FluidProperty`] binds one `(selector, property)` model entry to one
//! element. It owns the entry's ranges laid out by breakpoint index, knows
//! which element its percentages resolve against, and decides each tick
//! whether its last applied value can be repeated or must be recomputed.
//!
//! # Repeat rule
//!
//! The applied value for a property is reused without recomputation only
//! when all of these hold:
//!
//! 1. this object's order is not greater than the applied order,
//! 2. the element has a last update width,
//! 3. this object's percentage basis did not change this tick (when the
//!    applied or active range uses percentages),
//! 4. the viewport width is within the repeat tolerance of the last update
//!    width.
//!
//! Anything else recomputes.

use std::collections::hash_map::Entry;

use fluid_parse::{Directive, FluidRange, PropertyEntry, PropertyMeta};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::compute::{
    Component, ComputeContext, ComputedValue, compute_value, format_computed, progress,
};
use crate::error::Result;
use crate::host::{ElementId, ElementTree, Measure};
use crate::percent::PercentBasis;

/// Last value written for a property on an element.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedState {
    pub order: u32,
    pub value: String,
    /// Range slot that produced the value; `None` for the empty value.
    pub range_index: Option<usize>,
    /// Position of the producing [`FluidProperty`] in the element's list.
    pub source: usize,
}

/// Outcome of [`FluidProperty::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The applied value stands; nothing to write.
    Repeat,
    Computed {
        value: String,
        range_index: Option<usize>,
    },
}

/// Tick-wide inputs shared by every property.
#[derive(Debug, Clone, Copy)]
pub struct TickView<'a> {
    pub breakpoints: &'a [f64],
    pub breakpoint_index: usize,
    pub viewport_width: f64,
    pub repeat_tolerance: f64,
    /// Elements whose size or layout attributes changed since the last tick.
    pub changed: &'a FxHashSet<ElementId>,
}

type LockKey = (usize, usize, usize);

#[derive(Debug, Clone)]
pub struct FluidProperty {
    meta: PropertyMeta,
    ranges: Vec<Option<FluidRange>>,
    percent_ranges: Vec<bool>,
    percent_target: Option<ElementId>,
    locked: FxHashMap<LockKey, Component>,
}

impl FluidProperty {
    /// `ranges` holds one slot per breakpoint.
    pub fn new<T>(
        tree: &T,
        element: ElementId,
        meta: PropertyMeta,
        ranges: Vec<Option<FluidRange>>,
    ) -> Self
    where
        T: ElementTree + ?Sized,
    {
        let percent_ranges = ranges
            .iter()
            .map(|slot| slot.as_ref().is_some_and(FluidRange::has_percent))
            .collect();
        let percent_target =
            PercentBasis::for_property(&meta.property).map(|basis| basis.target(tree, element));
        Self {
            meta,
            ranges,
            percent_ranges,
            percent_target,
            locked: FxHashMap::default(),
        }
    }

    pub fn from_entry<T>(
        tree: &T,
        element: ElementId,
        entry: &PropertyEntry,
        breakpoint_count: usize,
    ) -> Self
    where
        T: ElementTree + ?Sized,
    {
        Self::new(tree, element, entry.meta.clone(), entry.slots(breakpoint_count))
    }

    #[must_use]
    pub fn meta(&self) -> &PropertyMeta {
        &self.meta
    }

    #[must_use]
    pub fn property(&self) -> &str {
        &self.meta.property
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.meta.order
    }

    #[must_use]
    pub fn ranges(&self) -> &[Option<FluidRange>] {
        &self.ranges
    }

    /// Basis element for percentages, whether or not any range uses them.
    #[must_use]
    pub fn percent_target(&self) -> Option<ElementId> {
        self.percent_target
    }

    #[must_use]
    pub fn depends_on_percent(&self) -> bool {
        self.percent_ranges.iter().any(|p| *p)
    }

    /// Basis element that needs dependency observation.
    #[must_use]
    pub fn observed_target(&self) -> Option<ElementId> {
        self.percent_target.filter(|_| self.depends_on_percent())
    }

    /// Range in effect at `index`: the slot starting there, else the
    /// nearest earlier range still covering it.
    #[must_use]
    pub fn active_range(&self, index: usize) -> Option<(usize, &FluidRange)> {
        if let Some(Some(range)) = self.ranges.get(index) {
            return Some((index, range));
        }
        let upper = index.min(self.ranges.len());
        self.ranges[..upper]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, slot)| slot.as_ref().filter(|r| r.max_index >= index).map(|r| (i, r)))
    }

    #[must_use]
    pub fn can_repeat(
        &self,
        slot: usize,
        applied: &AppliedState,
        update_width: Option<f64>,
        view: &TickView<'_>,
    ) -> bool {
        if self.order() > applied.order {
            return false;
        }
        let Some(update_width) = update_width else {
            return false;
        };
        if self.percent_basis_changed(slot, applied, view) {
            return false;
        }
        (update_width - view.viewport_width).abs() < view.repeat_tolerance
    }

    fn percent_basis_changed(
        &self,
        slot: usize,
        applied: &AppliedState,
        view: &TickView<'_>,
    ) -> bool {
        let Some(target) = self.percent_target else {
            return false;
        };
        if !view.changed.contains(&target) {
            return false;
        }
        if applied.source != slot {
            return self.depends_on_percent();
        }
        let flag = |index: usize| self.percent_ranges.get(index).copied().unwrap_or(false);
        let applied_percent = applied.range_index.is_some_and(flag);
        let active_percent = self
            .active_range(view.breakpoint_index)
            .is_some_and(|(index, _)| flag(index));
        applied_percent || active_percent
    }

    /// Repeat or compute this property's value for the current tick.
    pub fn resolve<H>(
        &mut self,
        slot: usize,
        applied: Option<&AppliedState>,
        update_width: Option<f64>,
        view: &TickView<'_>,
        ctx: &mut ComputeContext<'_, H>,
    ) -> Result<Resolution>
    where
        H: ElementTree + Measure + ?Sized,
    {
        if applied.is_some_and(|applied| self.can_repeat(slot, applied, update_width, view)) {
            return Ok(Resolution::Repeat);
        }
        let empty = Resolution::Computed {
            value: String::new(),
            range_index: None,
        };
        let Some((range_index, _)) = self.active_range(view.breakpoint_index) else {
            return Ok(empty);
        };
        let Some(range) = self.ranges.get(range_index).and_then(Option::as_ref) else {
            return Ok(empty);
        };
        let progress = progress(view.breakpoints, range, view.viewport_width);
        let mut computed = compute_value(range, progress, ctx)?;
        if let Some(locks) = &range.locks {
            freeze_locked(&mut self.locked, &self.meta.property, range_index, locks, &mut computed);
        }
        Ok(Resolution::Computed {
            value: format_computed(&computed),
            range_index: Some(range_index),
        })
    }
}

/// Replace locked components with their first computed value, recording
/// it on first sight.
fn freeze_locked(
    locked: &mut FxHashMap<LockKey, Component>,
    property: &str,
    range_index: usize,
    locks: &Directive,
    computed: &mut ComputedValue,
) {
    for (g, group) in computed.iter_mut().enumerate() {
        for (v, component) in group.iter_mut().enumerate() {
            if !locks.locks_component(property, g, v) {
                continue;
            }
            match locked.entry((range_index, g, v)) {
                Entry::Occupied(first) => *component = first.get().clone(),
                Entry::Vacant(slot) => {
                    slot.insert(component.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TickCache;
    use crate::host::Size;
    use crate::testing::StubHost;
    use fluid_parse::parse_value;

    const BREAKPOINTS: &[f64] = &[320.0, 768.0, 1440.0];

    fn el(raw: u32) -> ElementId {
        ElementId::from_raw(raw)
    }

    fn range(min: &str, max: &str, from: usize, to: usize) -> FluidRange {
        FluidRange::new(parse_value(min), parse_value(max), from, to).unwrap()
    }

    fn property(
        host: &StubHost,
        name: &str,
        order: u32,
        ranges: Vec<Option<FluidRange>>,
    ) -> FluidProperty {
        FluidProperty::new(
            host,
            el(2),
            PropertyMeta {
                order,
                property: name.to_owned(),
            },
            ranges,
        )
    }

    fn view<'a>(changed: &'a FxHashSet<ElementId>, width: f64) -> TickView<'a> {
        let breakpoint_index = BREAKPOINTS.iter().rposition(|bp| width >= *bp).unwrap_or(0);
        TickView {
            breakpoints: BREAKPOINTS,
            breakpoint_index,
            viewport_width: width,
            repeat_tolerance: 1.0,
            changed,
        }
    }

    fn resolve(
        host: &StubHost,
        fp: &mut FluidProperty,
        applied: Option<&AppliedState>,
        update: Option<f64>,
        view: &TickView<'_>,
    ) -> Resolution {
        let name = fp.property().to_owned();
        let mut cache = TickCache::default();
        let mut ctx = ComputeContext {
            host,
            cache: &mut cache,
            element: el(2),
            property: &name,
            viewport: Size::new(view.viewport_width, 800.0),
        };
        fp.resolve(0, applied, update, view, &mut ctx).unwrap()
    }

    fn applied(order: u32, range_index: Option<usize>) -> AppliedState {
        AppliedState {
            order,
            value: "x".into(),
            range_index,
            source: 0,
        }
    }

    #[test]
    fn active_range_prefers_exact_slot_then_covering_earlier_slot() {
        let host = StubHost::new();
        let fp = property(&host, "width", 0, vec![Some(range("1px", "2px", 0, 2)), None, None]);
        assert_eq!(fp.active_range(0).map(|(i, _)| i), Some(0));
        assert_eq!(fp.active_range(1).map(|(i, _)| i), Some(0));
        assert_eq!(fp.active_range(2).map(|(i, _)| i), Some(0));

        let fp = property(&host, "width", 0, vec![Some(range("1px", "2px", 0, 1)), None, None]);
        assert!(fp.active_range(2).is_none());
    }

    #[test]
    fn repeat_requires_matching_width_and_order() {
        let host = StubHost::new();
        let changed = FxHashSet::default();
        let fp = property(&host, "width", 3, vec![Some(range("1px", "2px", 0, 1)), None, None]);
        let v = view(&changed, 500.0);
        assert!(fp.can_repeat(0, &applied(3, Some(0)), Some(500.5), &v));
        assert!(!fp.can_repeat(0, &applied(3, Some(0)), Some(502.0), &v));
        assert!(!fp.can_repeat(0, &applied(3, Some(0)), None, &v));
        assert!(!fp.can_repeat(0, &applied(2, Some(0)), Some(500.0), &v));
        assert!(fp.can_repeat(0, &applied(9, Some(0)), Some(500.0), &v));
    }

    #[test]
    fn changed_percent_basis_forces_recompute() {
        let host = StubHost::new().with_parent(2, 1);
        let mut changed = FxHashSet::default();
        let percent = property(
            &host,
            "width",
            0,
            vec![Some(range("10%", "50%", 0, 1)), None, None],
        );
        let fixed = property(
            &host,
            "width",
            0,
            vec![Some(range("10px", "50px", 0, 1)), None, None],
        );
        assert_eq!(percent.observed_target(), Some(el(1)));
        assert_eq!(fixed.observed_target(), None);

        changed.insert(el(1));
        let v = view(&changed, 500.0);
        assert!(!percent.can_repeat(0, &applied(0, Some(0)), Some(500.0), &v));
        assert!(fixed.can_repeat(0, &applied(0, Some(0)), Some(500.0), &v));
    }

    #[test]
    fn resolve_repeats_or_computes() {
        let host = StubHost::new();
        let changed = FxHashSet::default();
        let mut fp = property(
            &host,
            "font-size",
            0,
            vec![Some(range("16px", "18px", 0, 1)), None, None],
        );
        let v = view(&changed, 544.0);
        assert_eq!(
            resolve(&host, &mut fp, None, None, &v),
            Resolution::Computed {
                value: "17px".into(),
                range_index: Some(0)
            }
        );
        assert_eq!(
            resolve(&host, &mut fp, Some(&applied(0, Some(0))), Some(544.0), &v),
            Resolution::Repeat
        );
    }

    #[test]
    fn no_active_range_resolves_to_the_empty_value() {
        let host = StubHost::new();
        let changed = FxHashSet::default();
        let mut fp = property(&host, "width", 0, vec![Some(range("1px", "2px", 0, 1)), None, None]);
        assert_eq!(
            resolve(&host, &mut fp, None, None, &view(&changed, 1600.0)),
            Resolution::Computed {
                value: String::new(),
                range_index: None
            }
        );
    }

    #[test]
    fn locked_components_keep_their_first_value() {
        let host = StubHost::new();
        let changed = FxHashSet::default();
        let locked = range("10px 100px", "20px 200px", 0, 1)
            .with_locks(Directive::parse("padding-top/0/1"));
        let mut fp = property(&host, "padding-top", 0, vec![Some(locked), None, None]);

        let first = resolve(&host, &mut fp, None, None, &view(&changed, 320.0));
        assert_eq!(
            first,
            Resolution::Computed {
                value: "10px 100px".into(),
                range_index: Some(0)
            }
        );
        let later = resolve(&host, &mut fp, None, None, &view(&changed, 544.0));
        assert_eq!(
            later,
            Resolution::Computed {
                value: "15px 100px".into(),
                range_index: Some(0)
            }
        );
    }
}
