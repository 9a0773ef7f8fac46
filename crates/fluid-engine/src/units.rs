//! Unit conversion to pixels.
//!
//! | Unit | Basis |
//! |------|-------|
//! | `px` | as is |
//! | `em` | parent font size for `font-size`, else the element's own |
//! | `rem` | root font size |
//! | `vw` / `vh` | 1% of the viewport width / height |
//! | `%` | [`PercentBasis`] of the property |

use fluid_parse::{Node, Unit, parse_node};

use crate::compute::ComputeContext;
use crate::error::{ComputeError, Result};
use crate::host::{ElementId, ElementTree, Measure, parent_or_root};
use crate::percent::{Axis, PercentBasis};

/// Leading pixel length of a computed style value (`"16px"` → 16).
#[must_use]
pub fn parse_px(raw: &str) -> Option<f64> {
    match parse_node(raw) {
        Node::Length {
            value,
            unit: Unit::Px,
        } => Some(value),
        _ => None,
    }
}

pub fn convert_to_px<H>(value: f64, unit: &Unit, ctx: &mut ComputeContext<'_, H>) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    match unit {
        Unit::Px => Ok(value),
        Unit::Em => {
            let basis = if ctx.property == "font-size" {
                parent_or_root(ctx.host, ctx.element)
            } else {
                ctx.element
            };
            Ok(value * font_size(ctx, basis)?)
        }
        Unit::Rem => {
            let root = ctx.host.root();
            Ok(value * font_size(ctx, root)?)
        }
        Unit::Vw => Ok(value * ctx.viewport.width / 100.0),
        Unit::Vh => Ok(value * ctx.viewport.height / 100.0),
        Unit::Percent => percent_to_px(value, ctx),
        Unit::Other(unit) => Err(ComputeError::UnknownUnit { unit: unit.clone() }),
    }
}

fn percent_to_px<H>(value: f64, ctx: &mut ComputeContext<'_, H>) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    let basis = PercentBasis::for_property(ctx.property).ok_or_else(|| {
        ComputeError::UnsupportedPercentProperty {
            property: ctx.property.to_owned(),
        }
    })?;
    let target = basis.target(ctx.host, ctx.element);
    let basis_px = match basis {
        PercentBasis::ParentContent(axis) | PercentBasis::OwnContent(axis) => {
            content_extent(ctx, target, axis)?
        }
        PercentBasis::ParentFontSize | PercentBasis::OwnFontSize => font_size(ctx, target)?,
    };
    Ok(value / 100.0 * basis_px)
}

fn content_extent<H>(ctx: &mut ComputeContext<'_, H>, target: ElementId, axis: Axis) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    let size = ctx.cache.bounding_box(ctx.host, target);
    let (extent, start, end) = match axis {
        Axis::Horizontal => (size.width, "padding-left", "padding-right"),
        Axis::Vertical => (size.height, "padding-top", "padding-bottom"),
    };
    Ok(extent - read_px(ctx, target, start)? - read_px(ctx, target, end)?)
}

fn font_size<H>(ctx: &mut ComputeContext<'_, H>, element: ElementId) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    read_px(ctx, element, "font-size")
}

fn read_px<H>(ctx: &mut ComputeContext<'_, H>, element: ElementId, property: &str) -> Result<f64>
where
    H: ElementTree + Measure + ?Sized,
{
    let raw = ctx.cache.computed_style(ctx.host, element, property);
    parse_px(&raw).ok_or_else(|| ComputeError::UnreadableStyle {
        property: property.to_owned(),
        value: raw,
    })
}
