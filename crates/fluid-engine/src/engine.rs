#![forbid(unsafe_code)]

//! Update scheduler.
//!
//! [`Engine`] owns every piece of tracking state for one document session:
//! the bound [`FluidProperty`] objects per element, the applied values, the
//! visible and pending-hidden sets, dependency observation refcounts, and
//! the per-tick read cache. Hosts drive it by calling [`Engine::tick`] after
//! a resize, scroll or explicit refresh, and by feeding
//! [`ObservationEvent`]s between ticks.
//!
//! # Tick order
//!
//! 1. Drain observation events.
//! 2. Flush elements that became hidden (one last resolution each).
//! 3. Resolve every visible element in tracking order. Tracked, visible
//!    percentage bases are resolved before their dependents.
//! 4. Clear the read cache and the changed-dependency set.
//!
//! # Invariants
//!
//! - Within an element, properties are visited by descending declaration
//!   order, priority properties first on ties. A property already applied
//!   with a higher order is never overridden by a lower one.
//! - A value equal to the applied one is never written again.
//! - A failed resolution leaves the applied value untouched and never
//!   stops the tick.
//!
//! # Failure Modes
//!
//! - Disconnected element: detached at its next tick visit.
//! - [`ComputeError`](crate::ComputeError): logged at `warn` on target
//!   `fluid.engine` and counted in [`TickReport::failures`].

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};
use web_time::Instant;

use fluid_parse::FluidModel;

use crate::cache::{TickCache, TickCacheStats};
use crate::compute::ComputeContext;
use crate::config::EngineConfig;
use crate::events::{EventQueue, EventSender, ObservationEvent};
use crate::host::{ElementId, ElementTree, Host, Observe, Size};
use crate::property::{AppliedState, FluidProperty, Resolution, TickView};

/// Counts for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub breakpoint_index: usize,
    /// Elements resolved, flushed ones included.
    pub elements: usize,
    /// Newly hidden elements given their final pass.
    pub flushed: usize,
    pub detached: usize,
    pub recomputed: usize,
    pub repeated: usize,
    pub writes: usize,
    pub failures: usize,
}

/// Totals across every tick since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub elements: u64,
    pub flushed: u64,
    pub detached: u64,
    pub recomputed: u64,
    pub repeated: u64,
    pub writes: u64,
    pub failures: u64,
}

impl EngineStats {
    fn accumulate(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.elements += report.elements as u64;
        self.flushed += report.flushed as u64;
        self.detached += report.detached as u64;
        self.recomputed += report.recomputed as u64;
        self.repeated += report.repeated as u64;
        self.writes += report.writes as u64;
        self.failures += report.failures as u64;
    }
}

#[derive(Debug)]
struct ElementState {
    properties: Vec<FluidProperty>,
    applied: FxHashMap<String, AppliedState>,
    visible: bool,
    /// Viewport width of the last visible resolution.
    update_width: Option<f64>,
    seq: u64,
}

/// Greatest breakpoint index whose width is `<= width`, else 0.
#[must_use]
pub fn breakpoint_index(breakpoints: &[f64], width: f64) -> usize {
    breakpoints.iter().rposition(|bp| width >= *bp).unwrap_or(0)
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    model: FluidModel,
    elements: FxHashMap<ElementId, ElementState>,
    /// Visible elements in tracking order.
    active: Vec<ElementId>,
    pending_hidden: Vec<ElementId>,
    dependency_refs: FxHashMap<ElementId, usize>,
    changed: FxHashSet<ElementId>,
    cache: TickCache,
    events: EventQueue,
    viewport: Size,
    breakpoint_index: usize,
    next_seq: u64,
    stats: EngineStats,
}

impl Engine {
    #[must_use]
    pub fn new(model: FluidModel, config: EngineConfig) -> Self {
        let cache = TickCache::new(config.tick_cache_capacity);
        Self {
            config,
            model,
            elements: FxHashMap::default(),
            active: Vec::new(),
            pending_hidden: Vec::new(),
            dependency_refs: FxHashMap::default(),
            changed: FxHashSet::default(),
            cache,
            events: EventQueue::new(),
            viewport: Size::default(),
            breakpoint_index: 0,
            next_seq: 0,
            stats: EngineStats::default(),
        }
    }

    #[must_use]
    pub fn with_defaults(model: FluidModel) -> Self {
        Self::new(model, EngineConfig::default())
    }

    /// Sender for host observers. Events apply at the next tick.
    #[must_use]
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Queue an event for the next tick.
    pub fn notify(&self, event: ObservationEvent) {
        self.events.push(event);
    }

    /// Start tracking elements that have at least one fluid property.
    ///
    /// Returns how many were newly tracked. Tracked elements stay inactive
    /// until a [`ObservationEvent::BecameVisible`] arrives.
    pub fn track<H, I>(&mut self, host: &mut H, elements: I) -> usize
    where
        H: Host + ?Sized,
        I: IntoIterator<Item = ElementId>,
    {
        let mut tracked = 0;
        for element in elements {
            if self.elements.contains_key(&element) {
                continue;
            }
            let properties = self.bind_properties(&*host, element);
            if properties.is_empty() {
                continue;
            }
            for target in properties.iter().filter_map(FluidProperty::observed_target) {
                self.retain_dependency(host, target);
            }
            host.observe_visibility(element);
            debug!(
                target: "fluid.engine",
                element = %element,
                properties = properties.len(),
                "tracking element"
            );
            let seq = self.next_seq;
            self.next_seq += 1;
            self.elements.insert(
                element,
                ElementState {
                    properties,
                    applied: FxHashMap::default(),
                    visible: false,
                    update_width: None,
                    seq,
                },
            );
            tracked += 1;
        }
        tracked
    }

    /// Stop tracking `element`. Returns `false` if it was not tracked.
    pub fn untrack<H: Host + ?Sized>(&mut self, host: &mut H, element: ElementId) -> bool {
        self.detach(host, element)
    }

    /// Replace the model and rebind every tracked element.
    ///
    /// Visibility and tracking order survive; applied values and locks are
    /// reset so the next tick recomputes everything.
    pub fn reparse<H: Host + ?Sized>(&mut self, host: &mut H, model: FluidModel) {
        self.model = model;
        let mut tracked: Vec<(u64, ElementId)> =
            self.elements.iter().map(|(element, state)| (state.seq, *element)).collect();
        tracked.sort_unstable();
        for (_, element) in tracked {
            let Some(mut state) = self.elements.remove(&element) else {
                continue;
            };
            for target in state.properties.iter().filter_map(FluidProperty::observed_target) {
                self.release_dependency(host, target);
            }
            state.properties = self.bind_properties(&*host, element);
            for target in state.properties.iter().filter_map(FluidProperty::observed_target) {
                self.retain_dependency(host, target);
            }
            state.applied.clear();
            state.update_width = None;
            self.elements.insert(element, state);
        }
        debug!(
            target: "fluid.engine",
            elements = self.elements.len(),
            breakpoints = self.model.breakpoints().len(),
            "model replaced"
        );
    }

    /// Run one update pass.
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H) -> TickReport {
        let start = Instant::now();
        self.viewport = host.viewport();
        self.breakpoint_index = breakpoint_index(self.model.breakpoints(), self.viewport.width);
        let span = tracing::debug_span!(
            "fluid.tick",
            viewport_width = self.viewport.width,
            breakpoint_index = self.breakpoint_index,
            duration_us = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut report = TickReport {
            breakpoint_index: self.breakpoint_index,
            ..TickReport::default()
        };
        self.drain_events();

        let mut done = FxHashSet::default();
        let mut flushing = std::mem::take(&mut self.pending_hidden);
        flushing.sort_by_key(|element| self.elements.get(element).map_or(u64::MAX, |s| s.seq));
        for element in flushing {
            if self.update_element(host, element, &mut report, &mut done) {
                report.flushed += 1;
            }
        }
        let active = self.active.clone();
        for element in active {
            self.update_element(host, element, &mut report, &mut done);
        }

        self.cache.clear();
        self.changed.clear();
        self.stats.accumulate(&report);
        let duration_us = start.elapsed().as_micros() as u64;
        span.record("duration_us", duration_us);
        debug!(
            target: "fluid.engine",
            elements = report.elements,
            writes = report.writes,
            failures = report.failures,
            duration_us,
            "tick complete"
        );
        report
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.events.try_next() {
            match event {
                ObservationEvent::BecameVisible(element) => {
                    let Some(state) = self.elements.get_mut(&element) else {
                        continue;
                    };
                    state.visible = true;
                    let seq = state.seq;
                    self.pending_hidden.retain(|e| *e != element);
                    if !self.active.contains(&element) {
                        let elements = &self.elements;
                        let at = self
                            .active
                            .partition_point(|e| elements.get(e).is_some_and(|s| s.seq < seq));
                        self.active.insert(at, element);
                    }
                }
                ObservationEvent::BecameHidden(element) => {
                    let Some(state) = self.elements.get_mut(&element) else {
                        continue;
                    };
                    let was_visible = std::mem::replace(&mut state.visible, false);
                    self.active.retain(|e| *e != element);
                    if !self.config.flush_hidden {
                        state.update_width = None;
                    } else if was_visible && !self.pending_hidden.contains(&element) {
                        self.pending_hidden.push(element);
                    }
                }
                ObservationEvent::DependencyChanged(element) => {
                    self.changed.insert(element);
                }
            }
        }
    }

    /// Resolve one element, bringing its tracked visible percentage bases
    /// up to date first. Returns whether the element was resolved.
    fn update_element<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        element: ElementId,
        report: &mut TickReport,
        done: &mut FxHashSet<ElementId>,
    ) -> bool {
        if !done.insert(element) || !self.elements.contains_key(&element) {
            return false;
        }
        if !host.is_connected(element) {
            if self.detach(host, element) {
                report.detached += 1;
            }
            return false;
        }
        let Some(mut state) = self.elements.remove(&element) else {
            return false;
        };

        let targets: SmallVec<[ElementId; 4]> = state
            .properties
            .iter()
            .filter_map(FluidProperty::observed_target)
            .filter(|target| *target != element && !done.contains(target))
            .filter(|target| self.elements.get(target).is_some_and(|s| s.visible))
            .collect();
        for target in targets {
            self.update_element(host, target, report, done);
        }

        let wrote = self.resolve_element(host, element, &mut state, report);
        state.update_width = state.visible.then_some(self.viewport.width);
        self.elements.insert(element, state);
        if wrote {
            self.changed.insert(element);
        }
        report.elements += 1;
        true
    }

    /// Resolve every property of one element. Returns whether anything was
    /// written.
    fn resolve_element<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        element: ElementId,
        state: &mut ElementState,
        report: &mut TickReport,
    ) -> bool {
        let view = TickView {
            breakpoints: self.model.breakpoints(),
            breakpoint_index: self.breakpoint_index,
            viewport_width: self.viewport.width,
            repeat_tolerance: self.config.repeat_tolerance,
            changed: &self.changed,
        };
        let mut claimed: FxHashSet<String> = FxHashSet::default();
        let mut wrote = false;

        for slot in 0..state.properties.len() {
            let property = &mut state.properties[slot];
            let name = property.property().to_owned();
            if claimed.contains(&name) {
                continue;
            }
            let applied = state.applied.get(&name);
            if applied.is_some_and(|applied| property.order() < applied.order) {
                continue;
            }
            let order = property.order();
            let resolution = {
                let mut ctx = ComputeContext {
                    host: &*host,
                    cache: &mut self.cache,
                    element,
                    property: &name,
                    viewport: self.viewport,
                };
                property.resolve(slot, applied, state.update_width, &view, &mut ctx)
            };
            match resolution {
                Ok(Resolution::Repeat) => report.repeated += 1,
                Ok(Resolution::Computed { value, range_index }) => {
                    report.recomputed += 1;
                    let previous = state.applied.get(&name).map_or("", |a| a.value.as_str());
                    if value != previous {
                        host.set_property(element, self.config.redirect(&name), &value);
                        self.cache.invalidate(element);
                        report.writes += 1;
                        wrote = true;
                    }
                    state.applied.insert(
                        name.clone(),
                        AppliedState {
                            order,
                            value,
                            range_index,
                            source: slot,
                        },
                    );
                }
                Err(error) => {
                    report.failures += 1;
                    warn!(
                        target: "fluid.engine",
                        element = %element,
                        property = %name,
                        error = %error,
                        "property resolution failed"
                    );
                }
            }
            claimed.insert(name);
        }
        wrote
    }

    /// Drop `element` from every set and release its registrations.
    fn detach<H: Observe + ?Sized>(&mut self, host: &mut H, element: ElementId) -> bool {
        let Some(state) = self.elements.remove(&element) else {
            return false;
        };
        self.active.retain(|e| *e != element);
        self.pending_hidden.retain(|e| *e != element);
        for target in state.properties.iter().filter_map(FluidProperty::observed_target) {
            self.release_dependency(host, target);
        }
        host.unobserve_visibility(element);
        debug!(
            target: "fluid.engine",
            element = %element,
            properties = state.properties.len(),
            "element detached"
        );
        true
    }

    fn bind_properties<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        element: ElementId,
    ) -> Vec<FluidProperty> {
        let breakpoint_count = self.model.breakpoints().len();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut properties = Vec::new();
        for token in tree.anchors(element).tokens() {
            let Some(selectors) = self.model.anchor(&token) else {
                continue;
            };
            for (selector, entries) in selectors {
                if !seen.insert(selector.as_str()) || !tree.matches(element, selector) {
                    continue;
                }
                properties.extend(entries.values().map(|entry| {
                    FluidProperty::from_entry(tree, element, entry, breakpoint_count)
                }));
            }
        }
        properties.sort_by(|a, b| {
            b.order().cmp(&a.order()).then_with(|| {
                self.config
                    .is_priority(b.property())
                    .cmp(&self.config.is_priority(a.property()))
            })
        });
        properties
    }

    fn retain_dependency<H: Observe + ?Sized>(&mut self, host: &mut H, target: ElementId) {
        let count = self.dependency_refs.entry(target).or_insert(0);
        *count += 1;
        if *count == 1 {
            host.observe_dependency(target);
            trace!(target: "fluid.engine", element = %target, "observing dependency");
        }
    }

    fn release_dependency<H: Observe + ?Sized>(&mut self, host: &mut H, target: ElementId) {
        let Some(count) = self.dependency_refs.get_mut(&target) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.dependency_refs.remove(&target);
            host.unobserve_dependency(target);
            trace!(target: "fluid.engine", element = %target, "released dependency");
        }
    }

    #[must_use]
    pub fn applied(&self, element: ElementId, property: &str) -> Option<&AppliedState> {
        self.elements.get(&element)?.applied.get(property)
    }

    #[must_use]
    pub fn is_tracked(&self, element: ElementId) -> bool {
        self.elements.contains_key(&element)
    }

    #[must_use]
    pub fn is_active(&self, element: ElementId) -> bool {
        self.active.contains(&element)
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.elements.len()
    }

    /// Visible elements in tracking order.
    #[must_use]
    pub fn active_elements(&self) -> &[ElementId] {
        &self.active
    }

    /// Bound properties of `element`, in visiting order.
    #[must_use]
    pub fn properties(&self, element: ElementId) -> Option<&[FluidProperty]> {
        self.elements.get(&element).map(|state| state.properties.as_slice())
    }

    /// Number of tracked properties using `target` as a percentage basis.
    #[must_use]
    pub fn dependency_observers(&self, target: ElementId) -> usize {
        self.dependency_refs.get(&target).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    #[must_use]
    pub fn cache_stats(&self) -> TickCacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> &FluidModel {
        &self.model
    }

    /// Breakpoint index of the last tick.
    #[must_use]
    pub fn breakpoint_index(&self) -> usize {
        self.breakpoint_index
    }

    /// Viewport of the last tick.
    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }
}
