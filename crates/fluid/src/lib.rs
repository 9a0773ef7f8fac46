#![forbid(unsafe_code)]

//! Fluid public facade crate.
//!
//! Re-exports the parsing and runtime types most hosts need and offers a
//! prelude. [`Fluid`] bundles configuration and model building into one
//! entry point.

use std::fmt;

// --- Parse re-exports ------------------------------------------------------

pub use fluid_parse::{
    Directive, FluidModel, FluidRange, FluidValue, MediaRule, Node, ParseConfig, SheetRule,
    StyleRule, StyleSheet, Unit, build_model, parse_value,
};

// --- Engine re-exports -----------------------------------------------------

pub use fluid_engine::{
    Anchors, Apply, ComputeError, ConfigError, ElementId, ElementTree, Engine, EngineConfig,
    EngineStats, EventSender, FluidConfig, Host, Measure, Observe, ObservationEvent, Resolved,
    Size, TickReport,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for fluid hosts.
#[derive(Debug)]
pub enum Error {
    /// A value could not be computed.
    Compute(ComputeError),
    /// Configuration failed to load or validate.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compute(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<ComputeError> for Error {
    fn from(err: ComputeError) -> Self {
        Self::Compute(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for fluid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Entry point ----------------------------------------------------------

/// Validated configuration that builds engines from style sheets.
#[derive(Debug, Clone, Default)]
pub struct Fluid {
    config: FluidConfig,
}

impl Fluid {
    /// Wrap `config` after validating it.
    pub fn new(config: FluidConfig) -> Result<Self> {
        Ok(Self {
            config: config.into_validated()?,
        })
    }

    /// Load and validate a TOML configuration file.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self {
            config: FluidConfig::from_toml_file(path)?,
        })
    }

    #[must_use]
    pub fn config(&self) -> &FluidConfig {
        &self.config
    }

    /// Build the model for `sheets`.
    #[must_use]
    pub fn model(&self, sheets: &[StyleSheet]) -> FluidModel {
        build_model(sheets, &self.config.parse)
    }

    /// Build an engine for `sheets`.
    #[must_use]
    pub fn engine(&self, sheets: &[StyleSheet]) -> Engine {
        let model = self.model(sheets);
        tracing::debug!(
            target: "fluid.engine",
            breakpoints = model.breakpoints().len(),
            ranges = model.range_count(),
            "engine created"
        );
        Engine::new(model, self.config.engine.clone())
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ElementId, Engine, Error, Fluid, FluidConfig, Host, ObservationEvent, Result, StyleRule,
        StyleSheet, TickReport,
    };

    pub use crate::{engine, parse};
}

pub use fluid_engine as engine;
pub use fluid_parse as parse;
