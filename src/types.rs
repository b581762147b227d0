//! Shared types, enums, and constants.
//!
//! All types that cross module boundaries live here.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bitflags::bitflags;

use crate::style::{StyleProperty, StyleSetting};

// ============================================================================
// Node Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Box,
    Text,
    Canvas,
    LayoutNode,
    List,
    Pages,
}

impl NodeKind {
    /// Whether this kind contributes glyphs/background to the grid itself.
    /// LayoutNode is a pure geometry node: it positions children but paints
    /// nothing of its own.
    pub fn paints(self) -> bool {
        !matches!(self, Self::LayoutNode)
    }

    /// Whether this kind carries text content painted cell-by-cell.
    pub fn has_text(self) -> bool {
        matches!(self, Self::Text | Self::Canvas)
    }

    /// Whether this kind accepts child elements.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Box | Self::LayoutNode | Self::List | Self::Pages)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Text => "text",
            Self::Canvas => "canvas",
            Self::LayoutNode => "layout-node",
            Self::List => "list",
            Self::Pages => "pages",
        }
    }
}

// ============================================================================
// Color
// ============================================================================
//
// Parsed from strings at the style surface: named colors, "#rgb"/"#rrggbb"
// hex, or "rgb(r, g, b)" notation. Unparseable input is ignored by the
// caller, never an error.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// Terminal default (SGR 39/49).
    #[default]
    Default,
    /// 256-color palette index. Named colors map to indices 0-15.
    Indexed(u8),
    /// Truecolor.
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        if let Some(body) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            let mut parts = body.split(',').map(|p| p.trim().parse::<u8>());
            let r = parts.next()?.ok()?;
            let g = parts.next()?.ok()?;
            let b = parts.next()?.ok()?;
            if parts.next().is_some() {
                return None;
            }
            return Some(Self::Rgb { r, g, b });
        }

        // Named colors follow the ANSI 16-color layout: dark variants in
        // 0-7, bright variants in 8-15.
        let idx = match s.to_ascii_lowercase().as_str() {
            "black" => 0,
            "dark_red" | "darkred" => 1,
            "dark_green" | "darkgreen" => 2,
            "dark_yellow" | "darkyellow" => 3,
            "dark_blue" | "darkblue" => 4,
            "dark_magenta" | "darkmagenta" => 5,
            "dark_cyan" | "darkcyan" => 6,
            "grey" | "gray" => 7,
            "dark_grey" | "dark_gray" | "darkgrey" | "darkgray" => 8,
            "red" => 9,
            "green" => 10,
            "yellow" => 11,
            "blue" => 12,
            "magenta" => 13,
            "cyan" => 14,
            "white" => 15,
            _ => return None,
        };
        Some(Self::Indexed(idx))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Self::Rgb { r, g, b })
            }
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Self::Rgb {
                    r: r * 17,
                    g: g * 17,
                    b: b * 17,
                })
            }
            _ => None,
        }
    }

    /// Append the SGR foreground fragment for this color.
    pub fn push_fg_sgr(self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Self::Default => out.push_str("\x1b[39m"),
            Self::Indexed(i) if i < 8 => {
                let _ = write!(out, "\x1b[{}m", 30 + i as u16);
            }
            Self::Indexed(i) if i < 16 => {
                let _ = write!(out, "\x1b[{}m", 90 + (i - 8) as u16);
            }
            Self::Indexed(i) => {
                let _ = write!(out, "\x1b[38;5;{i}m");
            }
            Self::Rgb { r, g, b } => {
                let _ = write!(out, "\x1b[38;2;{r};{g};{b}m");
            }
        }
    }

    /// Append the SGR background fragment for this color.
    pub fn push_bg_sgr(self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Self::Default => out.push_str("\x1b[49m"),
            Self::Indexed(i) if i < 8 => {
                let _ = write!(out, "\x1b[{}m", 40 + i as u16);
            }
            Self::Indexed(i) if i < 16 => {
                let _ = write!(out, "\x1b[{}m", 100 + (i - 8) as u16);
            }
            Self::Indexed(i) => {
                let _ = write!(out, "\x1b[48;5;{i}m");
            }
            Self::Rgb { r, g, b } => {
                let _ = write!(out, "\x1b[48;2;{r};{g};{b}m");
            }
        }
    }
}

// ============================================================================
// Text Attributes (bitflags)
// ============================================================================

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextAttrs: u8 {
        const BOLD          = 0b0000_0001;
        const DIM           = 0b0000_0010;
        const ITALIC        = 0b0000_0100;
        const UNDERLINE     = 0b0000_1000;
        const BLINK         = 0b0001_0000;
        const INVERSE       = 0b0010_0000;
        const STRIKETHROUGH = 0b0100_0000;
    }
}

impl TextAttrs {
    /// Map an effect name from the style surface. Unrecognized names yield
    /// None and are ignored by the caller.
    pub fn from_effect_name(name: &str) -> Option<Self> {
        match name {
            "bold" => Some(Self::BOLD),
            "dim" => Some(Self::DIM),
            "italic" => Some(Self::ITALIC),
            "underline" => Some(Self::UNDERLINE),
            "blink" => Some(Self::BLINK),
            "inverse" => Some(Self::INVERSE),
            "strikethrough" => Some(Self::STRIKETHROUGH),
            _ => None,
        }
    }

    /// Append one combined SGR fragment for the set attributes, e.g.
    /// BOLD|UNDERLINE -> "\x1b[1;4m".
    pub fn push_sgr(self, out: &mut String) {
        use std::fmt::Write;
        if self.is_empty() {
            return;
        }
        out.push_str("\x1b[");
        let mut first = true;
        for (flag, code) in [
            (Self::BOLD, 1),
            (Self::DIM, 2),
            (Self::ITALIC, 3),
            (Self::UNDERLINE, 4),
            (Self::BLINK, 5),
            (Self::INVERSE, 7),
            (Self::STRIKETHROUGH, 9),
        ] {
            if self.contains(flag) {
                if !first {
                    out.push(';');
                }
                let _ = write!(out, "{code}");
                first = false;
            }
        }
        out.push('m');
    }
}

// ============================================================================
// Border Kind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderKind {
    #[default]
    None,
    Single,
    Round,
    Bold,
    Double,
}

impl BorderKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(Self::None),
            "single" => Some(Self::Single),
            "round" => Some(Self::Round),
            "bold" => Some(Self::Bold),
            "double" => Some(Self::Double),
            _ => None,
        }
    }

    /// Returns the border characters:
    /// (top-left, top-right, bottom-left, bottom-right, horizontal, vertical)
    pub fn chars(self) -> Option<(char, char, char, char, char, char)> {
        match self {
            Self::None => None,
            Self::Single => Some(('┌', '┐', '└', '┘', '─', '│')),
            Self::Round => Some(('╭', '╮', '╰', '╯', '─', '│')),
            Self::Bold => Some(('┏', '┓', '┗', '┛', '━', '┃')),
            Self::Double => Some(('╔', '╗', '╚', '╝', '═', '║')),
        }
    }
}

// ============================================================================
// Rect
// ============================================================================

/// Axis-aligned rectangle in absolute screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Full-screen rect for the given terminal size.
    pub fn screen(width: u16, height: u16) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn contains(self, sx: i32, sy: i32) -> bool {
        sx >= self.x && sx < self.x + self.width && sy >= self.y && sy < self.y + self.height
    }

    /// Intersect with another rect, producing the tighter bound.
    pub fn intersect(self, other: Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);
        Rect {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0),
            height: (y2 - y1).max(0),
        }
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

// ============================================================================
// Pointer Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Click,
    MouseDown,
    MouseUp,
    Move,
    ScrollUp,
    ScrollDown,
}

impl PointerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "click" => Some(Self::Click),
            "mousedown" => Some(Self::MouseDown),
            "mouseup" => Some(Self::MouseUp),
            "mousemove" => Some(Self::Move),
            "scrollup" => Some(Self::ScrollUp),
            "scrolldown" => Some(Self::ScrollDown),
            _ => None,
        }
    }
}

/// A decoded pointer event in screen coordinates. Immutable during dispatch;
/// handlers control propagation through their return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: u16,
    pub y: u16,
}

/// Handler return value: continue to the next handler in depth order, or
/// stop the entire dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Stop,
}

pub type PointerHandler = Rc<RefCell<dyn FnMut(&PointerEvent) -> EventFlow>>;

// ============================================================================
// Terminal Input Events (backend boundary)
// ============================================================================

/// Structured input delivered by the backend. Pointer events feed the
/// router; key events pass through to the application; resize re-enters
/// the normal scheduling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key {
        code: u32,
        modifiers: u32,
        character: char,
    },
    Resize {
        width: u16,
        height: u16,
    },
}

pub mod key {
    pub const BACKSPACE: u32 = 0x0100;
    pub const ENTER: u32 = 0x0101;
    pub const LEFT: u32 = 0x0102;
    pub const RIGHT: u32 = 0x0103;
    pub const UP: u32 = 0x0104;
    pub const DOWN: u32 = 0x0105;
    pub const TAB: u32 = 0x010A;
    pub const ESCAPE: u32 = 0x010E;
}

pub mod modifier {
    pub const SHIFT: u32 = 0x01;
    pub const CTRL: u32 = 0x02;
    pub const ALT: u32 = 0x04;
}

// ============================================================================
// Node
// ============================================================================

/// A node in the retained element tree.
///
/// `screen_rect` is valid only between a completed layout pass and the next
/// mutation that invalidates layout; readers must not assume it stays valid
/// across mutations.
pub struct Node {
    pub kind: NodeKind,
    pub taffy_node: taffy::NodeId,
    pub content: String,
    pub children: Vec<u32>,
    pub parent: Option<u32>,
    pub styles: HashMap<StyleProperty, StyleSetting>,
    pub screen_rect: Rect,
    pub handlers: HashMap<PointerKind, Vec<PointerHandler>>,
    pub dirty: bool,
}

impl Node {
    pub fn new(kind: NodeKind, taffy_node: taffy::NodeId) -> Self {
        Self {
            kind,
            taffy_node,
            content: String::new(),
            children: Vec::new(),
            parent: None,
            styles: HashMap::new(),
            screen_rect: Rect::default(),
            handlers: HashMap::new(),
            dirty: true,
        }
    }

    /// Read a style setting; a missing key is Unspecified (never set),
    /// distinct from an explicit revert.
    pub fn style(&self, prop: StyleProperty) -> &StyleSetting {
        static UNSPECIFIED: StyleSetting = StyleSetting::Unspecified;
        self.styles.get(&prop).unwrap_or(&UNSPECIFIED)
    }
}
