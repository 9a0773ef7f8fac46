#![forbid(unsafe_code)]

//! Fluid value runtime.
//!
//! Resolves the ranges of a [`fluid_parse::FluidModel`] against live
//! elements: converts units to pixels, evaluates math functions with a safe
//! left-to-right calculator, interpolates between breakpoints and writes
//! changed values back through the host.
//!
//! The engine never owns a document. Everything it reads or writes goes
//! through the [`host`] traits, and observation reaches it as queued
//! [`ObservationEvent`]s consumed at the start of each [`Engine::tick`].
//!
//! # Usage
//!
//! ```ignore
//! let model = fluid_parse::build_model(&sheets, &ParseConfig::default());
//! let mut engine = Engine::with_defaults(model);
//! engine.track(&mut host, host.all_elements());
//! engine.notify(ObservationEvent::BecameVisible(element));
//! let report = engine.tick(&mut host);
//! ```

pub mod cache;
pub mod compute;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod expr;
pub mod host;
pub mod percent;
pub mod property;
pub mod units;

#[cfg(test)]
mod testing;

pub use cache::{DEFAULT_TICK_CACHE_CAPACITY, TickCache, TickCacheStats};
pub use compute::{
    Component, ComputeContext, ComputedValue, GRID_PROPERTIES, compute_value, format_computed,
    interpolate, is_grid_property, progress,
};
pub use config::{ConfigError, EngineConfig, FluidConfig};
pub use engine::{Engine, EngineStats, TickReport, breakpoint_index};
pub use error::{ComputeError, Result};
pub use events::{EventSender, ObservationEvent};
pub use host::{
    Anchors, Apply, ElementId, ElementTree, Host, Measure, Observe, Resolved, Size, parent_or_root,
};
pub use percent::{Axis, PercentBasis};
pub use property::{AppliedState, FluidProperty, Resolution, TickView};
pub use units::{convert_to_px, parse_px};
