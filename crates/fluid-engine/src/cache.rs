//! Per-tick measurement cache.
//!
//! [`TickCache`] memoizes bounding boxes and computed style reads for the
//! duration of one tick. Many properties on many elements read the same
//! parent boxes and font sizes; the cache collapses those reads to one host
//! call each.
//!
//! # Invalidation
//!
//! - [`TickCache::clear`] at the end of every tick.
//! - [`TickCache::invalidate`] for an element whose inline styles the engine
//!   just wrote, so later readers in the same tick see the new geometry.
//!
//! # Capacity
//!
//! At capacity new reads are served straight from the host and not stored.
//! Nothing is evicted mid-tick.

use rustc_hash::FxHashMap;

use crate::host::{ElementId, Measure, Size};

/// Default number of cached reads per tick.
pub const DEFAULT_TICK_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 before any read.
    pub hit_rate: f64,
}

#[derive(Debug)]
pub struct TickCache {
    boxes: FxHashMap<ElementId, Size>,
    styles: FxHashMap<ElementId, FxHashMap<String, String>>,
    entries: usize,
    max_entries: usize,
    hits: u64,
    misses: u64,
}

impl TickCache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            boxes: FxHashMap::default(),
            styles: FxHashMap::default(),
            entries: 0,
            max_entries,
            hits: 0,
            misses: 0,
        }
    }

    pub fn bounding_box<H: Measure + ?Sized>(&mut self, host: &H, element: ElementId) -> Size {
        if let Some(size) = self.boxes.get(&element) {
            self.hits += 1;
            return *size;
        }
        self.misses += 1;
        let size = host.bounding_box(element);
        if self.entries < self.max_entries {
            self.boxes.insert(element, size);
            self.entries += 1;
        }
        size
    }

    pub fn computed_style<H: Measure + ?Sized>(
        &mut self,
        host: &H,
        element: ElementId,
        property: &str,
    ) -> String {
        if let Some(value) = self.styles.get(&element).and_then(|styles| styles.get(property)) {
            self.hits += 1;
            return value.clone();
        }
        self.misses += 1;
        let value = host.computed_style_value(element, property);
        if self.entries < self.max_entries {
            self.styles
                .entry(element)
                .or_default()
                .insert(property.to_owned(), value.clone());
            self.entries += 1;
        }
        value
    }

    /// Forget everything read from `element`.
    pub fn invalidate(&mut self, element: ElementId) {
        if self.boxes.remove(&element).is_some() {
            self.entries -= 1;
        }
        if let Some(styles) = self.styles.remove(&element) {
            self.entries -= styles.len();
        }
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
        self.styles.clear();
        self.entries = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    #[must_use]
    pub fn stats(&self) -> TickCacheStats {
        let total = self.hits + self.misses;
        TickCacheStats {
            entries: self.entries,
            hits: self.hits,
            misses: self.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                self.hits as f64 / total as f64
            },
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }
}

impl Default for TickCache {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubHost;

    fn el(raw: u32) -> ElementId {
        ElementId::from_raw(raw)
    }

    #[test]
    fn repeated_reads_hit_the_cache() {
        let host = StubHost::new();
        let mut cache = TickCache::new(16);
        cache.bounding_box(&host, el(1));
        cache.bounding_box(&host, el(1));
        cache.computed_style(&host, el(1), "font-size");
        cache.computed_style(&host, el(1), "font-size");
        assert_eq!(host.reads(), 2);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (2, 2, 2));
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalidate_drops_one_element_only() {
        let host = StubHost::new();
        let mut cache = TickCache::new(16);
        cache.bounding_box(&host, el(1));
        cache.computed_style(&host, el(1), "padding-left");
        cache.bounding_box(&host, el(2));
        cache.invalidate(el(1));
        assert_eq!(cache.len(), 1);
        cache.bounding_box(&host, el(2));
        assert_eq!(host.reads(), 3);
        cache.bounding_box(&host, el(1));
        assert_eq!(host.reads(), 4);
    }

    #[test]
    fn reads_past_capacity_fall_through() {
        let host = StubHost::new();
        let mut cache = TickCache::new(1);
        cache.bounding_box(&host, el(1));
        cache.bounding_box(&host, el(2));
        cache.bounding_box(&host, el(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(host.reads(), 3);
    }

    #[test]
    fn clear_empties_but_keeps_stats() {
        let host = StubHost::new();
        let mut cache = TickCache::default();
        cache.bounding_box(&host, el(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
        cache.reset_stats();
        assert_eq!(cache.stats(), TickCacheStats::default());
    }
}
