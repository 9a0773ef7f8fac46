//! Range builder.
//!
//! Walks breakpoint batches in order and pairs every fluid declaration with
//! the next declaration of the same property for the same selector in a
//! later batch. Each pair becomes a [`FluidRange`] in the [`FluidModel`].
//!
//! # Usage
//!
//! ```
//! use fluid_parse::{RangeBuilder, RuleBatch, StyleRule};
//!
//! let batches = vec![
//!     RuleBatch::baseline(375.0, vec![StyleRule::new(".a").declare("width", "100px")]),
//!     RuleBatch::new(768.0, vec![StyleRule::new(".a").declare("width", "200px")]),
//! ];
//! let mut builder = RangeBuilder::new(vec![375.0, 768.0]);
//! builder.process_batches(&batches);
//! let model = builder.finish();
//! assert_eq!(model.entry(".a", "width").unwrap().ranges.len(), 1);
//! ```
//!
//! # Invariants
//!
//! - The order counter advances once per style rule, across every sheet fed
//!   to the same builder.
//! - Only the first later match produces a range; the declaration at the
//!   matched breakpoint starts its own range when its batch is processed.
//! - A forced declaration spans from its own breakpoint to the last one with
//!   equal endpoints. At the last breakpoint it has no span and is skipped.

use crate::model::{FluidModel, FluidRange};
use crate::rules::{Declaration, RuleBatch, StyleRule};
use crate::value::parse_value;

#[derive(Debug, Clone)]
pub struct RangeBuilder {
    model: FluidModel,
    order: u32,
}

impl RangeBuilder {
    /// `breakpoints` must be sorted and de-duplicated.
    #[must_use]
    pub fn new(breakpoints: Vec<f64>) -> Self {
        Self {
            model: FluidModel::new(breakpoints),
            order: 0,
        }
    }

    /// Next order value to be assigned.
    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Process one sheet's batches.
    pub fn process_batches(&mut self, batches: &[RuleBatch]) {
        for (batch_index, batch) in batches.iter().enumerate() {
            for rule in &batch.rules {
                self.process_rule(batches, batch_index, rule);
                self.order = self.order.saturating_add(1);
            }
        }
    }

    #[must_use]
    pub fn finish(self) -> FluidModel {
        tracing::debug!(
            target: "fluid.parse",
            rules = self.order,
            ranges = self.model.range_count(),
            "fluid model built"
        );
        self.model
    }

    fn process_rule(&mut self, batches: &[RuleBatch], batch_index: usize, rule: &StyleRule) {
        let width = batches[batch_index].width;
        let Some(min_index) = self.model.breakpoint_index(width) else {
            tracing::debug!(
                target: "fluid.parse",
                width,
                "batch width is not a breakpoint; rule skipped"
            );
            return;
        };

        for selector in rule.selectors() {
            for decl in &rule.declarations {
                let forced = rule.force.as_ref().is_some_and(|force| force.covers(&decl.property));
                let range = if forced {
                    self.forced_range(decl, min_index)
                } else {
                    self.scan_forward(&batches[batch_index + 1..], selector, decl, min_index)
                };
                if let Some(range) = range {
                    let range = range.with_locks(rule.lock.clone());
                    self.model.insert(selector, &decl.property, self.order, range);
                }
            }
        }
    }

    fn forced_range(&self, decl: &Declaration, min_index: usize) -> Option<FluidRange> {
        let last = self.model.breakpoints().len().checked_sub(1)?;
        let value = parse_value(&decl.value);
        let range = FluidRange::new(value.clone(), value, min_index, last);
        if range.is_none() {
            tracing::debug!(
                target: "fluid.parse",
                property = %decl.property,
                "forced declaration at the last breakpoint has no span"
            );
        }
        range
    }

    fn scan_forward(
        &self,
        later: &[RuleBatch],
        selector: &str,
        decl: &Declaration,
        min_index: usize,
    ) -> Option<FluidRange> {
        for batch in later {
            let Some(max_index) = self.model.breakpoint_index(batch.width) else {
                continue;
            };
            if max_index <= min_index {
                continue;
            }
            let max_value = batch
                .rules
                .iter()
                .filter(|rule| rule.has_selector(selector))
                .find_map(|rule| rule.value_of(&decl.property));
            if let Some(max_value) = max_value {
                return FluidRange::new(
                    parse_value(&decl.value),
                    parse_value(max_value),
                    min_index,
                    max_index,
                );
            }
        }
        None
    }
}
