//! Style model.
//!
//! Every style value is tagged: `Unspecified` (never set), `Explicit`
//! (application-provided), or `Reverted` (explicitly reset to the default).
//! Reverted beats inheritance, so a revert on a child shows the terminal
//! default even under a styled ancestor.
//!
//! Property and value parsing is lenient: unknown property names and
//! unparseable values are ignored, never errors.

use std::collections::HashMap;

use crate::types::{BorderKind, Color, Node, TextAttrs};

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    FlexDirection,
    FlexGrow,
    FlexShrink,
    FlexBasis,
    AlignItems,
    JustifyContent,
    Gap,
    Overflow,
    OverflowX,
    OverflowY,
    Color,
    Background,
    Effects,
    Border,
    ZIndex,
}

impl StyleProperty {
    /// Whether mutating this property invalidates geometry (requires a
    /// layout solve) as opposed to repaint only.
    pub fn is_layout_affecting(self) -> bool {
        !matches!(
            self,
            Self::Color | Self::Background | Self::Effects | Self::ZIndex
        )
    }

    /// Sizing properties re-enter the layout solver even when the stored
    /// value looks unchanged: percentages and auto sizes resolve against a
    /// container that may itself have moved.
    pub fn is_dimension(self) -> bool {
        matches!(
            self,
            Self::Width | Self::Height | Self::MinWidth | Self::MinHeight
        )
    }
}

/// Resolve a property name to the concrete properties it sets. Shorthands
/// (`margin`, `padding_x`, ...) expand to their edges.
pub fn expand_property(name: &str) -> &'static [StyleProperty] {
    use StyleProperty::*;
    match name {
        "width" => &[Width],
        "height" => &[Height],
        "min_width" => &[MinWidth],
        "min_height" => &[MinHeight],
        "max_width" => &[MaxWidth],
        "max_height" => &[MaxHeight],
        "margin" => &[MarginTop, MarginRight, MarginBottom, MarginLeft],
        "margin_x" => &[MarginLeft, MarginRight],
        "margin_y" => &[MarginTop, MarginBottom],
        "margin_top" => &[MarginTop],
        "margin_right" => &[MarginRight],
        "margin_bottom" => &[MarginBottom],
        "margin_left" => &[MarginLeft],
        "padding" => &[PaddingTop, PaddingRight, PaddingBottom, PaddingLeft],
        "padding_x" => &[PaddingLeft, PaddingRight],
        "padding_y" => &[PaddingTop, PaddingBottom],
        "padding_top" => &[PaddingTop],
        "padding_right" => &[PaddingRight],
        "padding_bottom" => &[PaddingBottom],
        "padding_left" => &[PaddingLeft],
        "flex_direction" => &[FlexDirection],
        "flex_grow" => &[FlexGrow],
        "flex_shrink" => &[FlexShrink],
        "flex_basis" => &[FlexBasis],
        "align_items" => &[AlignItems],
        "justify_content" => &[JustifyContent],
        "gap" => &[Gap],
        "overflow" => &[Overflow],
        "overflow_x" => &[OverflowX],
        "overflow_y" => &[OverflowY],
        "color" => &[Color],
        "background" | "background_color" => &[Background],
        "effects" => &[Effects],
        "border" => &[Border],
        "z_index" => &[ZIndex],
        _ => &[],
    }
}

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Absolute size in terminal cells.
    Cells(i32),
    /// Percentage of the containing block, 0.0..=100.0.
    Percent(f32),
    Auto,
    Number(f32),
    Ident(String),
    Color(Color),
    Attrs(TextAttrs),
}

/// Tagged setting for one property on one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StyleSetting {
    #[default]
    Unspecified,
    Explicit(StyleValue),
    Reverted,
}

/// Parse a raw value string for a given property. None means the value is
/// not meaningful for the property and the write is dropped.
pub fn parse_value(prop: StyleProperty, raw: &str) -> Option<StyleValue> {
    use StyleProperty::*;
    let raw = raw.trim();
    match prop {
        Width | Height | MinWidth | MinHeight | MaxWidth | MaxHeight | MarginTop | MarginRight
        | MarginBottom | MarginLeft | PaddingTop | PaddingRight | PaddingBottom | PaddingLeft
        | Gap | FlexBasis => parse_length(raw),
        FlexGrow | FlexShrink => raw.parse::<f32>().ok().map(StyleValue::Number),
        FlexDirection => match raw {
            "row" | "column" | "row-reverse" | "column-reverse" => {
                Some(StyleValue::Ident(raw.to_string()))
            }
            _ => None,
        },
        AlignItems | JustifyContent => match raw {
            "start" | "end" | "center" | "stretch" | "space-between" | "space-around"
            | "space-evenly" => Some(StyleValue::Ident(raw.to_string())),
            _ => None,
        },
        Overflow | OverflowX | OverflowY => match raw {
            "visible" | "hidden" => Some(StyleValue::Ident(raw.to_string())),
            _ => None,
        },
        Color | Background => crate::types::Color::parse(raw).map(StyleValue::Color),
        Effects => {
            let mut attrs = TextAttrs::empty();
            for part in raw.split([',', ' ']).filter(|p| !p.is_empty()) {
                attrs |= TextAttrs::from_effect_name(part)?;
            }
            Some(StyleValue::Attrs(attrs))
        }
        Border => BorderKind::from_name(raw).map(|_| StyleValue::Ident(raw.to_string())),
        ZIndex => raw.parse::<i32>().ok().map(StyleValue::Cells),
    }
}

fn parse_length(raw: &str) -> Option<StyleValue> {
    if raw == "auto" {
        return Some(StyleValue::Auto);
    }
    if let Some(pct) = raw.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(StyleValue::Percent);
    }
    raw.parse::<i32>().ok().map(StyleValue::Cells)
}

// ============================================================================
// Mutation
// ============================================================================

/// Outcome of a style write, as seen by the scheduling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleOutcome {
    /// Unknown property or unparseable value; nothing stored.
    Ignored,
    /// Value equal to what was already stored; no invalidation.
    Unchanged,
    /// Stored value changed. `layout` is true when geometry must be solved
    /// again before the next paint.
    Changed { layout: bool },
}

/// Apply one property write to a node. `value` of "revert" stores the
/// Reverted tag. Shorthands write each expanded edge only where no explicit
/// longhand is already present, so longhands always win.
pub fn apply_style(node: &mut Node, name: &str, value: &str) -> StyleOutcome {
    let props = expand_property(name);
    if props.is_empty() {
        return StyleOutcome::Ignored;
    }
    let shorthand = props.len() > 1;

    let mut changed = false;
    let mut layout = false;
    for &prop in props {
        let next = if value.trim() == "revert" {
            StyleSetting::Reverted
        } else {
            match parse_value(prop, value) {
                Some(v) => StyleSetting::Explicit(v),
                None => return StyleOutcome::Ignored,
            }
        };

        if shorthand && matches!(node.style(prop), StyleSetting::Explicit(_)) {
            continue;
        }

        // Sizing properties always count as changed: their resolved pixels
        // depend on the container, not just the stored value.
        if prop.is_dimension() || *node.style(prop) != next {
            node.styles.insert(prop, next);
            changed = true;
            layout |= prop.is_layout_affecting();
        }
    }

    if changed {
        StyleOutcome::Changed { layout }
    } else {
        StyleOutcome::Unchanged
    }
}

// ============================================================================
// Effective paint style
// ============================================================================

/// Fully resolved paint-time style for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintStyle {
    pub fg: Color,
    /// None when neither the node nor the resolution produced a background;
    /// Some(Default) never occurs (a revert resolves to None).
    pub bg: Option<Color>,
    pub attrs: TextAttrs,
    pub border: BorderKind,
}

/// Resolve the paint style for `handle`. Foreground color and text
/// attributes inherit from the nearest styled ancestor; background and
/// border never inherit. A Reverted tag resolves to the terminal default
/// even when an ancestor is styled.
pub fn resolve_paint_style(nodes: &HashMap<u32, Node>, handle: u32) -> PaintStyle {
    let mut out = PaintStyle::default();
    let node = match nodes.get(&handle) {
        Some(n) => n,
        None => return out,
    };

    out.fg = resolve_inherited(nodes, handle, StyleProperty::Color, |v| match v {
        StyleValue::Color(c) => Some(*c),
        _ => None,
    })
    .unwrap_or(Color::Default);

    out.attrs = resolve_inherited(nodes, handle, StyleProperty::Effects, |v| match v {
        StyleValue::Attrs(a) => Some(*a),
        _ => None,
    })
    .unwrap_or_default();

    if let StyleSetting::Explicit(StyleValue::Color(c)) = node.style(StyleProperty::Background) {
        out.bg = Some(*c);
    }
    if let StyleSetting::Explicit(StyleValue::Ident(name)) = node.style(StyleProperty::Border) {
        out.border = BorderKind::from_name(name).unwrap_or_default();
    }
    out
}

/// Walk ancestors until a tagged value decides the property: Explicit wins,
/// Reverted resolves to the default.
fn resolve_inherited<T>(
    nodes: &HashMap<u32, Node>,
    handle: u32,
    prop: StyleProperty,
    extract: impl Fn(&StyleValue) -> Option<T>,
) -> Option<T> {
    let mut cursor = Some(handle);
    while let Some(h) = cursor {
        let node = nodes.get(&h)?;
        match node.style(prop) {
            StyleSetting::Explicit(v) => return extract(v),
            StyleSetting::Reverted => return None,
            StyleSetting::Unspecified => cursor = node.parent,
        }
    }
    None
}

/// Which axes clip descendant painting to this node's rect: `(x, y)`.
/// `overflow` covers both axes; `overflow_x`/`overflow_y` override it per
/// axis. Default is visible.
pub fn hidden_axes(node: &Node) -> (bool, bool) {
    let both = overflow_hidden(node, StyleProperty::Overflow).unwrap_or(false);
    let x = overflow_hidden(node, StyleProperty::OverflowX).unwrap_or(both);
    let y = overflow_hidden(node, StyleProperty::OverflowY).unwrap_or(both);
    (x, y)
}

fn overflow_hidden(node: &Node, prop: StyleProperty) -> Option<bool> {
    match node.style(prop) {
        StyleSetting::Explicit(StyleValue::Ident(o)) => Some(o == "hidden"),
        StyleSetting::Reverted => Some(false),
        _ => None,
    }
}

/// The z-index in effect for a node: its own explicit value, else the
/// nearest ancestor's, else 0.
pub fn resolve_z(nodes: &HashMap<u32, Node>, handle: u32) -> i32 {
    let mut cursor = Some(handle);
    while let Some(h) = cursor {
        let node = match nodes.get(&h) {
            Some(n) => n,
            None => break,
        };
        if let StyleSetting::Explicit(StyleValue::Cells(z)) = node.style(StyleProperty::ZIndex) {
            return *z;
        }
        cursor = node.parent;
    }
    0
}

/// Pre-render the SGR prefix for a paint style. Plain text yields an empty
/// run so unstyled cells stay outside any escape sequence.
pub fn style_run(style: &PaintStyle) -> String {
    let mut run = String::new();
    style.attrs.push_sgr(&mut run);
    if style.fg != Color::Default {
        style.fg.push_fg_sgr(&mut run);
    }
    if let Some(bg) = style.bg {
        if bg != Color::Default {
            bg.push_bg_sgr(&mut run);
        }
    }
    run
}
