//! Breakpoint batching.
//!
//! Groups each sheet's rules into [`RuleBatch`]es, one per media rule plus a
//! baseline batch for top-level style rules, and collects the document's
//! sorted breakpoint list.
//!
//! # Invariants
//!
//! - Breakpoints are finite, ascending and de-duplicated.
//! - Every batch width is present in the breakpoint list.
//! - Batches keep document order within a sheet.

use crate::config::ParseConfig;
use crate::rules::{RuleBatch, SheetRule, StyleSheet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchedDocument {
    pub breakpoints: Vec<f64>,
    /// Batches per sheet, in sheet order.
    pub sheets: Vec<Vec<RuleBatch>>,
}

#[must_use]
pub fn batch_document(sheets: &[StyleSheet], config: &ParseConfig) -> BatchedDocument {
    let global_baseline = global_baseline_width(sheets).unwrap_or(config.baseline_width);
    let mut breakpoints = Vec::new();
    let mut batched = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        let baseline = sheet_baseline_width(sheet).unwrap_or(global_baseline);
        let batches = batch_sheet(sheet, baseline);
        breakpoints.extend(batches.iter().map(|batch| batch.width));
        batched.push(batches);
    }

    normalize_breakpoints(&mut breakpoints);
    tracing::debug!(
        target: "fluid.parse",
        sheets = sheets.len(),
        breakpoints = breakpoints.len(),
        baseline = global_baseline,
        "document batched"
    );
    BatchedDocument {
        breakpoints,
        sheets: batched,
    }
}

/// Batch a single sheet against `baseline`.
#[must_use]
pub fn batch_sheet(sheet: &StyleSheet, baseline: f64) -> Vec<RuleBatch> {
    let mut batches: Vec<RuleBatch> = Vec::new();
    let mut baseline_slot: Option<usize> = None;

    for rule in &sheet.rules {
        match rule {
            SheetRule::Style(style) => match baseline_slot {
                Some(slot) => batches[slot].rules.push(style.clone()),
                None => {
                    baseline_slot = Some(batches.len());
                    batches.push(RuleBatch::baseline(baseline, vec![style.clone()]));
                }
            },
            SheetRule::Media(media) => {
                batches.push(RuleBatch::new(media.min_width, media.rules.clone()));
            }
        }
    }
    batches
}

/// Width of the last empty media rule across all sheets.
fn global_baseline_width(sheets: &[StyleSheet]) -> Option<f64> {
    sheets
        .iter()
        .flat_map(StyleSheet::media_rules)
        .filter(|media| media.rules.is_empty())
        .last()
        .map(|media| media.min_width)
}

/// Width of the sheet's first empty media rule.
fn sheet_baseline_width(sheet: &StyleSheet) -> Option<f64> {
    sheet
        .media_rules()
        .find(|media| media.rules.is_empty())
        .map(|media| media.min_width)
}

fn normalize_breakpoints(breakpoints: &mut Vec<f64>) {
    breakpoints.retain(|width| width.is_finite());
    breakpoints.sort_by(f64::total_cmp);
    breakpoints.dedup_by(|a, b| (*a - *b).abs() < f64::EPSILON);
}
