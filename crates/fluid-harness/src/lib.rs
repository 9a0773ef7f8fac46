#![forbid(unsafe_code)]

//! Reference host for the fluid engine.
//!
//! [`MockDocument`] is a small in-memory element tree that implements every
//! host trait: naive selector matching, explicit geometry, inherited font
//! sizes, keyword and grid measurement, a write log and observation
//! registries. Integration tests drive a real [`fluid_engine::Engine`]
//! against it.
//!
//! # Usage
//!
//! ```ignore
//! let mut doc = MockDocument::new();
//! let card = doc.add(doc.root_element(), "div").class("card").size(600.0, 200.0).build();
//! let mut engine = Engine::with_defaults(model);
//! engine.track(&mut doc, [card]);
//! engine.notify(ObservationEvent::BecameVisible(card));
//! engine.tick(&mut doc);
//! assert_eq!(doc.inline(card, "font-size"), Some("17px"));
//! ```

pub mod document;
pub mod jsonl;
pub mod selector;

pub use document::{DEFAULT_VIEWPORT, ElementBuilder, MockDocument, ROOT_FONT_SIZE, StyleWrite};
pub use jsonl::JsonlLog;
pub use selector::{Combinator, Compound, Selector};

use fluid_engine::{Engine, FluidConfig, ObservationEvent};
use fluid_parse::{ParseConfig, StyleRule, StyleSheet, build_model};

/// Style rule from `(property, value)` pairs under the default parse config.
#[must_use]
pub fn rule(selector: &str, pairs: &[(&str, &str)]) -> StyleRule {
    StyleRule::from_declarations(selector, pairs.iter().copied(), &ParseConfig::default())
}

/// Build the model for `sheets` and an engine around it.
#[must_use]
pub fn engine_for(sheets: &[StyleSheet], config: &FluidConfig) -> Engine {
    Engine::new(build_model(sheets, &config.parse), config.engine.clone())
}

/// Track `elements` and mark them visible for the next tick.
pub fn track_visible<I>(engine: &mut Engine, doc: &mut MockDocument, elements: I) -> usize
where
    I: IntoIterator<Item = fluid_engine::ElementId>,
{
    let elements: Vec<_> = elements.into_iter().collect();
    let tracked = engine.track(doc, elements.iter().copied());
    for element in elements {
        engine.notify(ObservationEvent::BecameVisible(element));
    }
    tracked
}
