#![forbid(unsafe_code)]

//! Fluid value parsing and range model.
//!
//! This crate turns per-breakpoint style declarations into a
//! [`FluidModel`]: for every `(selector, property)` pair, the list of
//! [`FluidRange`]s whose values are interpolated between two breakpoints.
//!
//! It is pure data. Nothing here touches a document; measuring and applying
//! values is `fluid-engine`'s job.
//!
//! # Pipeline
//!
//! 1. [`StyleSheet`]s of [`StyleRule`]s and `(min-width)` [`MediaRule`]s.
//! 2. [`batch_document`] groups them into breakpoint [`RuleBatch`]es and
//!    collects the breakpoint list.
//! 3. [`RangeBuilder`] pairs declarations across batches into ranges.
//!
//! [`build_model`] runs the whole pipeline.

pub mod batch;
pub mod config;
pub mod directive;
pub mod model;
pub mod patcher;
pub mod rules;
pub mod value;

pub use batch::{BatchedDocument, batch_document, batch_sheet};
pub use config::{DEFAULT_BASELINE_WIDTH, FLUID_PROPERTY_NAMES, ParseConfig};
pub use directive::Directive;
pub use model::{
    FluidModel, FluidRange, PropertyEntry, PropertyMeta, SelectorMap, UNIVERSAL_ANCHOR, anchor_of,
};
pub use patcher::RangeBuilder;
pub use rules::{Declaration, MediaRule, RuleBatch, SheetRule, StyleRule, StyleSheet};
pub use value::{
    ArithOp, FluidValue, FunctionKind, Node, Operand, Unit, ValueGroup, format_value, parse_node,
    parse_value,
};

/// Batch every sheet and build the model with one shared order counter.
#[must_use]
pub fn build_model(sheets: &[StyleSheet], config: &ParseConfig) -> FluidModel {
    let batched = batch_document(sheets, config);
    let mut builder = RangeBuilder::new(batched.breakpoints);
    for batches in &batched.sheets {
        builder.process_batches(batches);
    }
    builder.finish()
}
