//! Value computation.
//!
//! Evaluates a [`FluidRange`] at a viewport width: each endpoint is resolved
//! to pixel [`Component`]s, then interpolated component by component.
//!
//! # Invariants
//!
//! - Progress `<= 0` returns the min endpoint exactly, `>= 1` the max
//!   endpoint exactly; in between, `min + (max - min) * progress`.
//! - A component that is text on either side, or has no counterpart on the
//!   max side, keeps its min-side value.
//! - Grid track lists are measured whole by the host, never per track.
//!
//! # Failure Modes
//!
//! Any [`ComputeError`] aborts the whole value; nothing partial is returned.

use std::fmt::Write as _;

use fluid_parse::{FluidRange, FluidValue, FunctionKind, Node, Operand};

use crate::cache::TickCache;
use crate::error::{ComputeError, Result};
use crate::expr;
use crate::host::{ElementId, ElementTree, Measure, Resolved, Size};
use crate::units::convert_to_px;

/// Grid properties whose track lists are resolved as a whole.
pub const GRID_PROPERTIES: &[&str] = &["grid-template-columns", "grid-template-rows"];

/// A resolved value component.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Px(f64),
    Text(String),
}

/// Resolved groups of components, shaped like the source [`FluidValue`].
pub type ComputedValue = Vec<Vec<Component>>;

/// Everything one evaluation reads from.
pub struct ComputeContext<'a, H: ?Sized> {
    pub host: &'a H,
    pub cache: &'a mut TickCache,
    pub element: ElementId,
    pub property: &'a str,
    pub viewport: Size,
}

#[must_use]
pub fn is_grid_property(property: &str) -> bool {
    GRID_PROPERTIES.contains(&property)
}

/// Fraction of the way from the range's min breakpoint to its max.
#[must_use]
pub fn progress(breakpoints: &[f64], range: &FluidRange, width: f64) -> f64 {
    let (Some(min), Some(max)) = (
        breakpoints.get(range.min_index),
        breakpoints.get(range.max_index),
    ) else {
        return 0.0;
    };
    let span = max - min;
    if span <= 0.0 {
        return 1.0;
    }
    (width - min) / span
}

pub fn compute_value<H>(
    range: &FluidRange,
    progress: f64,
    ctx: &mut ComputeContext<'_, H>,
) -> Result<ComputedValue>
where
    H: ElementTree + Measure + ?Sized,
{
    if progress.is_nan() || progress <= 0.0 {
        return eval_value(&range.min_value, ctx);
    }
    if progress >= 1.0 {
        return eval_value(&range.max_value, ctx);
    }
    let min = eval_value(&range.min_value, ctx)?;
    let max = eval_value(&range.max_value, ctx)?;
    Ok(interpolate(&min, &max, progress))
}

#[must_use]
pub fn interpolate(min: &ComputedValue, max: &ComputedValue, progress: f64) -> ComputedValue {
    min.iter()
        .enumerate()
        .map(|(g, group)| {
            group
                .iter()
                .enumerate()
                .map(|(v, component)| {
                    match (component, max.get(g).and_then(|group| group.get(v))) {
                        (Component::Px(a), Some(Component::Px(b))) => {
                            Component::Px(a + (b - a) * progress)
                        }
                        (component, _) => component.clone(),
                    }
                })
                .collect()
        })
        .collect()
}

pub fn eval_value<H>(value: &FluidValue, ctx: &mut ComputeContext<'_, H>) -> Result<ComputedValue>
where
    H: ElementTree + Measure + ?Sized,
{
    let mut computed = Vec::with_capacity(value.len());
    if is_grid_property(ctx.property) {
        for group in value {
            let tracks = group.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
            let sizes = ctx.host.measure_grid(ctx.element, ctx.property, &tracks);
            computed.push(sizes.into_iter().map(Component::Px).collect());
        }
        return Ok(computed);
    }
    for group in value {
        let mut components = Vec::with_capacity(group.len());
        for node in group {
            components.push(eval_node(node, ctx)?);
        }
        computed.push(components);
    }
    Ok(computed)
}

pub fn eval_node<H>(node: &Node, ctx: &mut ComputeContext<'_, H>) -> Result<Component>
where
    H: ElementTree + Measure + ?Sized,
{
    match node {
        Node::Length { value, unit } => convert_to_px(*value, unit, ctx).map(Component::Px),
        Node::Keyword(keyword) => Ok(measure_keyword(keyword, ctx)),
        Node::Function { kind, operands } => eval_function(*kind, operands, ctx).map(Component::Px),
    }
}

fn measure_keyword<H>(keyword: &str, ctx: &mut ComputeContext<'_, H>) -> Component
where
    H: ElementTree + Measure + ?Sized,
{
    if ctx.property.starts_with("margin-") && keyword.eq_ignore_ascii_case("auto") {
        return Component::Text("auto".to_owned());
    }
    match ctx.host.measure_keyword(ctx.element, ctx.property, keyword) {
        Resolved::Px(px) => Component::Px(px),
        Resolved::Text(text) => Component::Text(text),
    }
}

fn eval_function<H>(
    kind: FunctionKind,
    operands: &[Operand],
    ctx: &mut ComputeContext<'_, H>,
) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    if kind == FunctionKind::Calc {
        return eval_calc(operands, ctx);
    }
    let values = numeric_operands(kind, operands, ctx)?;
    let arity = |expected| ComputeError::InvalidArity {
        function: kind.name(),
        expected,
        found: values.len(),
    };
    match (kind, values.as_slice()) {
        (FunctionKind::Min, [first, rest @ ..]) => {
            Ok(rest.iter().fold(*first, |acc, v| acc.min(*v)))
        }
        (FunctionKind::Max, [first, rest @ ..]) => {
            Ok(rest.iter().fold(*first, |acc, v| acc.max(*v)))
        }
        (FunctionKind::Min | FunctionKind::Max, []) => Err(arity("at least 1")),
        (FunctionKind::Clamp, [floor, value, ceiling]) => Ok(value.min(*ceiling).max(*floor)),
        (FunctionKind::MinMax, [a, b, c]) => Ok(a.max(*b).min(*c)),
        _ => Err(arity("3")),
    }
}

fn numeric_operands<H>(
    kind: FunctionKind,
    operands: &[Operand],
    ctx: &mut ComputeContext<'_, H>,
) -> Result<Vec<f64>>
where
    H: ElementTree + Measure + ?Sized,
{
    let mut values = Vec::with_capacity(operands.len());
    for operand in operands {
        let value = match operand {
            Operand::Node(node) => match eval_node(node, ctx)? {
                Component::Px(px) => px,
                Component::Text(text) => {
                    return Err(ComputeError::NonNumericOperand {
                        function: kind.name(),
                        value: text,
                    });
                }
            },
            Operand::Op(op) => {
                return Err(ComputeError::NonNumericOperand {
                    function: kind.name(),
                    value: op.symbol().to_string(),
                });
            }
        };
        values.push(value);
    }
    Ok(values)
}

fn eval_calc<H>(operands: &[Operand], ctx: &mut ComputeContext<'_, H>) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    let mut expression = String::new();
    for operand in operands {
        if !expression.is_empty() {
            expression.push(' ');
        }
        match operand {
            Operand::Op(op) => expression.push(op.symbol()),
            Operand::Node(Node::Keyword(keyword)) if keyword.eq_ignore_ascii_case("none") => {
                return Err(ComputeError::NoneInCalc);
            }
            Operand::Node(node) => match eval_node(node, ctx)? {
                Component::Px(px) => {
                    let _ = write!(expression, "{px}");
                }
                Component::Text(text) => expression.push_str(&text),
            },
        }
    }
    expr::evaluate(&expression)
}

/// Render a computed value: `{n}px` components joined by spaces, groups by
/// commas.
#[must_use]
pub fn format_computed(value: &ComputedValue) -> String {
    let mut out = String::new();
    for (g, group) in value.iter().enumerate() {
        if g > 0 {
            out.push(',');
        }
        for (v, component) in group.iter().enumerate() {
            if v > 0 {
                out.push(' ');
            }
            match component {
                Component::Px(px) => {
                    let _ = write!(out, "{px}px");
                }
                Component::Text(text) => out.push_str(text),
            }
        }
    }
    out
}
