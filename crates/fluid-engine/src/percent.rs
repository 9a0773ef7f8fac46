//! Percentage bases.
//!
//! A percentage resolves against a property-specific basis: the parent's
//! content box on one axis, the element's own content box, or a font size.
//! Properties missing from the table cannot take percentages.

use crate::host::{ElementId, ElementTree, parent_or_root};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PercentBasis {
    /// Parent content box (bounding box minus padding) on an axis.
    ParentContent(Axis),
    /// The element's own content box on an axis.
    OwnContent(Axis),
    ParentFontSize,
    OwnFontSize,
}

impl PercentBasis {
    #[must_use]
    pub fn for_property(property: &str) -> Option<Self> {
        use Axis::{Horizontal, Vertical};

        let basis = match property {
            "width" | "min-width" | "max-width" | "left" | "right" | "margin-left"
            | "margin-right" | "padding-left" | "padding-right" | "border-left-width"
            | "border-right-width" | "text-indent" => Self::ParentContent(Horizontal),
            "height" | "min-height" | "max-height" | "top" | "bottom" | "margin-top"
            | "margin-bottom" | "padding-top" | "padding-bottom" | "border-top-width"
            | "border-bottom-width" => Self::ParentContent(Vertical),
            "background-position-x" | "column-gap" => Self::OwnContent(Horizontal),
            "background-position-y" | "row-gap" => Self::OwnContent(Vertical),
            "font-size" => Self::ParentFontSize,
            "line-height" => Self::OwnFontSize,
            _ => return None,
        };
        Some(basis)
    }

    /// Element whose geometry or font size is the basis.
    pub fn target<T: ElementTree + ?Sized>(self, tree: &T, element: ElementId) -> ElementId {
        match self {
            Self::ParentContent(_) | Self::ParentFontSize => parent_or_root(tree, element),
            Self::OwnContent(_) | Self::OwnFontSize => element,
        }
    }
}
