//! Property tests for range evaluation.
//!
//! - Progress at or beyond the edges returns the endpoint exactly.
//! - Between the edges, numeric components move monotonically from min to
//!   max.

use fluid_engine::{Component, ComputeContext, ComputedValue, Measure, TickCache, compute_value};
use fluid_harness::MockDocument;
use fluid_parse::{FluidRange, parse_value};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

fn px_list() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-500.0f64..500.0, 1..4)
}

fn css(values: &[f64]) -> String {
    values.iter().map(|v| format!("{v}px")).collect::<Vec<_>>().join(" ")
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn evaluate(doc: &MockDocument, range: &FluidRange, progress: f64) -> ComputedValue {
    let mut cache = TickCache::default();
    let mut ctx = ComputeContext {
        host: doc,
        cache: &mut cache,
        element: doc.root_element(),
        property: "padding-top",
        viewport: doc.viewport(),
    };
    compute_value(range, progress, &mut ctx).expect("pixel values evaluate")
}

fn pixels(value: &ComputedValue) -> Vec<f64> {
    value[0]
        .iter()
        .map(|c| match c {
            Component::Px(px) => *px,
            Component::Text(text) => panic!("unexpected text component {text}"),
        })
        .collect()
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn edges_return_endpoints_exactly(
        min in px_list(),
        max in px_list(),
        below in -10.0f64..=0.0,
        above in 1.0f64..10.0,
    ) {
        let doc = MockDocument::new();
        let range =
            FluidRange::new(parse_value(&css(&min)), parse_value(&css(&max)), 0, 1).unwrap();
        prop_assert_eq!(pixels(&evaluate(&doc, &range, below)), min.clone());
        prop_assert_eq!(pixels(&evaluate(&doc, &range, above)), max.clone());
    }

    #[test]
    fn interpolation_is_monotonic(
        a in -500.0f64..500.0,
        b in -500.0f64..500.0,
        p1 in 0.01f64..0.99,
        p2 in 0.01f64..0.99,
    ) {
        prop_assume!((a - b).abs() > 1e-6);
        prop_assume!((p1 - p2).abs() > 1e-6);
        let (p1, p2) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
        let doc = MockDocument::new();
        let range =
            FluidRange::new(parse_value(&css(&[a])), parse_value(&css(&[b])), 0, 1).unwrap();
        let v1 = pixels(&evaluate(&doc, &range, p1))[0];
        let v2 = pixels(&evaluate(&doc, &range, p2))[0];

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        prop_assert!(lo <= v1 && v1 <= hi);
        prop_assert!((v1 - a).abs() <= (v2 - a).abs());
    }
}
