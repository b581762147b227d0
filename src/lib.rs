//! reef-tui: a retained-tree terminal rendering engine.
//!
//! Applications build a tree of styled elements, mutate it freely, and let
//! the engine decide when and what to draw: mutations are coalesced behind
//! a debounce, the tree is composed into a character grid in z order, the
//! grid is diffed against the previous frame, and only the changed spans
//! reach the terminal, batched inside a synchronized-update bracket.
//!
//! ```no_run
//! use reef_tui::{CrosstermBackend, NodeKind, Reef, ReefConfig};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), reef_tui::ReefError> {
//! let mut reef = Reef::new(Box::new(CrosstermBackend::new()), ReefConfig::default())?;
//! let root = reef.create_node(NodeKind::Box)?;
//! reef.set_style(root, "width", "100%")?;
//! reef.set_style(root, "height", "100%")?;
//! reef.set_style(root, "border", "round")?;
//! reef.set_root(root)?;
//!
//! let label = reef.create_node(NodeKind::Text)?;
//! reef.set_text(label, "hello")?;
//! reef.append_child(root, label)?;
//!
//! loop {
//!     let keys = reef.pump(Duration::from_millis(50))?;
//!     if !keys.is_empty() {
//!         break;
//!     }
//! }
//! reef.teardown()?;
//! # Ok(())
//! # }
//! ```

mod compose;
mod context;
mod error;
mod events;
mod grid;
mod layout;
mod scheduler;
mod style;
mod terminal;
mod tree;
mod types;
mod writer;

pub use context::{Reef, ReefConfig};
pub use error::ReefError;
pub use grid::{Frame, Grid, GridToken, RESET};
pub use scheduler::RenderScheduler;
pub use style::{PaintStyle, StyleOutcome, StyleProperty, StyleSetting, StyleValue};
pub use terminal::{Backend, CrosstermBackend};
pub use types::{
    key, modifier, BorderKind, Color, EventFlow, InputEvent, NodeKind, PointerEvent,
    PointerHandler, PointerKind, Rect, TextAttrs,
};
pub use writer::{CommandBuffer, CursorCommand, OutputWriter, WriteStrategy};
