//! Computation errors.
//!
//! Every evaluation step returns `Result<_, ComputeError>`. The scheduler
//! catches errors per property: it logs them, counts them in the tick report
//! and keeps the property's previous applied state.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("calc expression `{expression}` contains characters outside the arithmetic set")]
    UnsafeExpression { expression: String },

    #[error("malformed calc expression `{expression}`")]
    MalformedExpression { expression: String },

    #[error("division by zero in calc expression `{expression}`")]
    DivisionByZero { expression: String },

    #[error("`none` cannot be used inside calc()")]
    NoneInCalc,

    #[error("unsupported unit `{unit}`")]
    UnknownUnit { unit: String },

    #[error("property `{property}` has no percentage basis")]
    UnsupportedPercentProperty { property: String },

    #[error("{function}() expects {expected} operands, found {found}")]
    InvalidArity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{function}() operand `{value}` is not numeric")]
    NonNumericOperand { function: &'static str, value: String },

    #[error("computed `{property}` value `{value}` is not a pixel length")]
    UnreadableStyle { property: String, value: String },
}

pub type Result<T> = std::result::Result<T, ComputeError>;
