//! Layout pass.
//!
//! Each pass translates every node's tagged style map into a fresh taffy
//! Style, solves the flexbox tree at the terminal size, then walks the
//! tree writing absolute screen rects back onto the nodes. Translating
//! from scratch each pass keeps the style map the single source of truth;
//! there is no incremental taffy-style mutation to drift out of sync.

use taffy::prelude::*;
use taffy::style_helpers::{auto, length, percent};
use taffy::{Dimension, LengthPercentage, LengthPercentageAuto};

use crate::error::ReefError;
use crate::style::{StyleProperty, StyleSetting, StyleValue};
use crate::tree::Tree;
use crate::types::{Node, Rect};

/// Solve layout for the whole tree at the given terminal size and refresh
/// every node's `screen_rect`.
pub fn solve(tree: &mut Tree, width: u16, height: u16) -> Result<(), ReefError> {
    let root = tree.root().ok_or(ReefError::NoRoot)?;

    let handles = tree.preorder();
    for &handle in &handles {
        let style = translate(tree.get(handle)?);
        let taffy_node = tree.get(handle)?.taffy_node;
        tree.taffy
            .set_style(taffy_node, style)
            .map_err(|e| ReefError::Layout(e.to_string()))?;
    }

    let root_taffy = tree.get(root)?.taffy_node;
    tree.taffy
        .compute_layout(
            root_taffy,
            Size {
                width: AvailableSpace::Definite(width as f32),
                height: AvailableSpace::Definite(height as f32),
            },
        )
        .map_err(|e| ReefError::Layout(e.to_string()))?;

    place(tree, root, 0.0, 0.0)?;
    Ok(())
}

fn place(tree: &mut Tree, handle: u32, offset_x: f32, offset_y: f32) -> Result<(), ReefError> {
    let taffy_node = tree.get(handle)?.taffy_node;
    let layout = tree
        .taffy
        .layout(taffy_node)
        .map_err(|e| ReefError::Layout(e.to_string()))?;
    let abs_x = offset_x + layout.location.x;
    let abs_y = offset_y + layout.location.y;
    let rect = Rect::new(
        abs_x as i32,
        abs_y as i32,
        layout.size.width as i32,
        layout.size.height as i32,
    );

    let children = {
        let node = tree.get_mut(handle)?;
        node.screen_rect = rect;
        node.children.clone()
    };
    for child in children {
        place(tree, child, abs_x, abs_y)?;
    }
    Ok(())
}

/// Build a taffy Style from a node's tagged style map. Unspecified and
/// Reverted both fall to the taffy default for the property.
fn translate(node: &Node) -> Style {
    use StyleProperty as P;
    let mut style = Style {
        display: Display::Flex,
        ..Default::default()
    };

    style.size.width = dimension(node, P::Width);
    style.size.height = dimension(node, P::Height);
    style.min_size.width = dimension(node, P::MinWidth);
    style.min_size.height = dimension(node, P::MinHeight);
    style.max_size.width = dimension(node, P::MaxWidth);
    style.max_size.height = dimension(node, P::MaxHeight);

    style.margin = taffy::geometry::Rect {
        top: margin(node, P::MarginTop),
        right: margin(node, P::MarginRight),
        bottom: margin(node, P::MarginBottom),
        left: margin(node, P::MarginLeft),
    };
    style.padding = taffy::geometry::Rect {
        top: padding(node, P::PaddingTop),
        right: padding(node, P::PaddingRight),
        bottom: padding(node, P::PaddingBottom),
        left: padding(node, P::PaddingLeft),
    };

    // A visible border occupies one cell per edge, so children lay out
    // inside the frame.
    if matches!(
        node.style(P::Border),
        StyleSetting::Explicit(StyleValue::Ident(name)) if name != "none"
    ) {
        style.border = taffy::geometry::Rect {
            top: length(1.0),
            right: length(1.0),
            bottom: length(1.0),
            left: length(1.0),
        };
    }

    if let StyleSetting::Explicit(StyleValue::Ident(dir)) = node.style(P::FlexDirection) {
        style.flex_direction = match dir.as_str() {
            "column" => FlexDirection::Column,
            "row-reverse" => FlexDirection::RowReverse,
            "column-reverse" => FlexDirection::ColumnReverse,
            _ => FlexDirection::Row,
        };
    }
    if let StyleSetting::Explicit(StyleValue::Number(g)) = node.style(P::FlexGrow) {
        style.flex_grow = *g;
    }
    if let StyleSetting::Explicit(StyleValue::Number(s)) = node.style(P::FlexShrink) {
        style.flex_shrink = *s;
    }
    style.flex_basis = dimension(node, P::FlexBasis);

    if let StyleSetting::Explicit(StyleValue::Ident(a)) = node.style(P::AlignItems) {
        style.align_items = match a.as_str() {
            "start" => Some(AlignItems::Start),
            "end" => Some(AlignItems::End),
            "center" => Some(AlignItems::Center),
            "stretch" => Some(AlignItems::Stretch),
            _ => None,
        };
    }
    if let StyleSetting::Explicit(StyleValue::Ident(j)) = node.style(P::JustifyContent) {
        style.justify_content = match j.as_str() {
            "start" => Some(JustifyContent::Start),
            "end" => Some(JustifyContent::End),
            "center" => Some(JustifyContent::Center),
            "space-between" => Some(JustifyContent::SpaceBetween),
            "space-around" => Some(JustifyContent::SpaceAround),
            "space-evenly" => Some(JustifyContent::SpaceEvenly),
            _ => None,
        };
    }
    if let StyleSetting::Explicit(StyleValue::Cells(g)) = node.style(P::Gap) {
        style.gap = Size {
            width: length(*g as f32),
            height: length(*g as f32),
        };
    }
    let (hx, hy) = crate::style::hidden_axes(node);
    let overflow = |hidden: bool| {
        if hidden {
            taffy::Overflow::Hidden
        } else {
            taffy::Overflow::Visible
        }
    };
    style.overflow = taffy::Point {
        x: overflow(hx),
        y: overflow(hy),
    };

    style
}

fn dimension(node: &Node, prop: StyleProperty) -> Dimension {
    match node.style(prop) {
        StyleSetting::Explicit(StyleValue::Cells(n)) => length(*n as f32),
        StyleSetting::Explicit(StyleValue::Percent(p)) => percent(p / 100.0),
        _ => auto(),
    }
}

fn margin(node: &Node, prop: StyleProperty) -> LengthPercentageAuto {
    match node.style(prop) {
        StyleSetting::Explicit(StyleValue::Cells(n)) => length(*n as f32),
        StyleSetting::Explicit(StyleValue::Percent(p)) => percent(p / 100.0),
        StyleSetting::Explicit(StyleValue::Auto) => auto(),
        _ => length(0.0),
    }
}

fn padding(node: &Node, prop: StyleProperty) -> LengthPercentage {
    match node.style(prop) {
        StyleSetting::Explicit(StyleValue::Cells(n)) => length(*n as f32),
        StyleSetting::Explicit(StyleValue::Percent(p)) => percent(p / 100.0),
        _ => length(0.0),
    }
}
