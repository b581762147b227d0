//! Output writers.
//!
//! Turns composed frames into escape-sequence batches. Two strategies:
//!
//! * `Precise` diffs the new grid against the previous one and rewrites
//!   only the changed spans of each row. This is the default.
//! * `Refresh` rewrites the occupied block of the screen whenever the
//!   serialized text differs, and can interleave side-channel log text
//!   above the frame. Suited to inline (non-alternate-screen) use.
//!
//! Either way an unchanged frame produces zero bytes, and every non-empty
//! batch is wrapped in a synchronized-update bracket so the terminal
//! applies it atomically.

use std::fmt::Write as _;

use crate::grid::{stringify_span, Frame, Grid, GridToken};

pub const SYNC_BEGIN: &str = "\x1b[?2026h";
pub const SYNC_END: &str = "\x1b[?2026l";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteStrategy {
    /// Minimal per-row diff spans.
    #[default]
    Precise,
    /// Whole-block rewrite with side-text interleaving.
    Refresh,
}

/// One cursor-addressed output step. Coordinates are zero-based; the
/// escape encoding is one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorCommand {
    MoveTo(u16, u16),
    Print(String),
    /// Erase from the cursor to the end of the line.
    ClearToLineEnd,
    /// Erase the whole line the cursor is on.
    ClearLine,
}

/// An ordered batch of cursor commands for one frame.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<CursorCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: CursorCommand) {
        self.commands.push(cmd);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Serialize to bytes. An empty batch encodes to zero bytes; anything
    /// else is wrapped in the synchronized-update bracket.
    pub fn encode(&self) -> Vec<u8> {
        if self.commands.is_empty() {
            return Vec::new();
        }
        let mut out = String::from(SYNC_BEGIN);
        for cmd in &self.commands {
            match cmd {
                CursorCommand::MoveTo(x, y) => {
                    let _ = write!(out, "\x1b[{};{}H", y + 1, x + 1);
                }
                CursorCommand::Print(s) => out.push_str(s),
                CursorCommand::ClearToLineEnd => out.push_str("\x1b[K"),
                CursorCommand::ClearLine => out.push_str("\x1b[2K"),
            }
        }
        out.push_str(SYNC_END);
        out.into_bytes()
    }
}

/// Compute the changed spans of a row as half-open cell ranges. A cell
/// with no counterpart in the old row counts as changed. A span that
/// starts on a pruned continuation cell is widened left to re-print the
/// wide glyph that owns it.
pub fn diff_row_spans(old: &[GridToken], new: &[GridToken]) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < new.len() {
        if old.get(i) == Some(&new[i]) {
            i += 1;
            continue;
        }
        let mut start = i;
        let mut end = i + 1;
        while end < new.len() && old.get(end) != Some(&new[end]) {
            end += 1;
        }
        while start > 0 && new[start].is_pruned() {
            start -= 1;
        }
        if let Some(last) = spans.last_mut() {
            if start <= last.1 {
                last.1 = end;
                i = end;
                continue;
            }
        }
        spans.push((start, end));
        i = end;
    }
    spans
}

/// Frame-to-bytes converter holding the previous-frame baseline. The
/// strategy is fixed at construction; a root never switches mid-run.
pub struct OutputWriter {
    strategy: WriteStrategy,
    last_grid: Option<Grid>,
    last_text: String,
    last_occupied: u16,
    /// Top row of the live frame region (refresh only). Emitted log lines
    /// push the region down so they stay visible above it.
    frame_row: u16,
}

impl OutputWriter {
    pub fn new(strategy: WriteStrategy) -> Self {
        Self {
            strategy,
            last_grid: None,
            last_text: String::new(),
            last_occupied: 0,
            frame_row: 0,
        }
    }

    pub fn strategy(&self) -> WriteStrategy {
        self.strategy
    }

    /// Drop all baselines so the next frame repaints from scratch. Called
    /// on resize, when the previous screen content can no longer be
    /// trusted.
    pub fn reset(&mut self) {
        self.last_grid = None;
        self.last_text.clear();
        self.last_occupied = 0;
        self.frame_row = 0;
    }

    /// Serialize one frame against the stored baseline.
    pub fn emit(&mut self, frame: &Frame) -> Vec<u8> {
        match self.strategy {
            WriteStrategy::Precise => self.emit_precise(frame),
            WriteStrategy::Refresh => self.emit_refresh(frame),
        }
    }

    fn emit_precise(&mut self, frame: &Frame) -> Vec<u8> {
        let grid = &frame.grid;
        let mut buf = CommandBuffer::new();

        match &self.last_grid {
            None => {
                for y in 0..grid.height {
                    buf.push(CursorCommand::MoveTo(0, y));
                    buf.push(CursorCommand::Print(grid.stringify_row(y)));
                }
            }
            Some(old) if old.width == grid.width && old.height == grid.height => {
                for y in 0..grid.height {
                    for (start, end) in diff_row_spans(old.row(y), grid.row(y)) {
                        buf.push(CursorCommand::MoveTo(start as u16, y));
                        buf.push(CursorCommand::Print(stringify_span(
                            &grid.row(y)[start..end],
                        )));
                    }
                }
            }
            Some(old) => {
                // Dimensions changed: rewrite everything, clear to the
                // right of every row, and clear rows that no longer exist.
                for y in 0..grid.height {
                    buf.push(CursorCommand::MoveTo(0, y));
                    buf.push(CursorCommand::Print(grid.stringify_row(y)));
                    if old.width > grid.width {
                        buf.push(CursorCommand::ClearToLineEnd);
                    }
                }
                for y in grid.height..old.height {
                    buf.push(CursorCommand::MoveTo(0, y));
                    buf.push(CursorCommand::ClearLine);
                }
            }
        }

        self.last_grid = Some(grid.clone());
        buf.encode()
    }

    fn emit_refresh(&mut self, frame: &Frame) -> Vec<u8> {
        let grid = &frame.grid;
        // Rows past the last non-blank row are never painted or cleared.
        let occupied = (0..grid.height)
            .rev()
            .find(|&y| !grid.row_is_blank(y))
            .map(|y| y + 1)
            .unwrap_or(0);
        let text: String = (0..occupied)
            .map(|y| grid.stringify_row(y))
            .collect::<Vec<_>>()
            .join("\r\n");

        if text == self.last_text && frame.side_text.is_empty() {
            return Vec::new();
        }

        let mut buf = CommandBuffer::new();

        if !frame.side_text.is_empty() {
            // Clear the old frame block so log lines land on clean rows,
            // print the logs there, and push the frame region down past
            // them; the frame is rewritten below and never covers them.
            for y in 0..self.last_occupied {
                buf.push(CursorCommand::MoveTo(0, self.frame_row + y));
                buf.push(CursorCommand::ClearLine);
            }
            buf.push(CursorCommand::MoveTo(0, self.frame_row));
            let mut side = frame.side_text.replace('\n', "\r\n");
            if !side.ends_with("\r\n") {
                side.push_str("\r\n");
            }
            self.frame_row += side.matches("\r\n").count() as u16;
            buf.push(CursorCommand::Print(side));
            self.last_text.clear();
        }

        if text != self.last_text {
            for y in 0..occupied {
                buf.push(CursorCommand::MoveTo(0, self.frame_row + y));
                buf.push(CursorCommand::Print(grid.stringify_row(y)));
                buf.push(CursorCommand::ClearToLineEnd);
            }
            for y in occupied..self.last_occupied {
                buf.push(CursorCommand::MoveTo(0, self.frame_row + y));
                buf.push(CursorCommand::ClearLine);
            }
        }

        self.last_text = text;
        self.last_occupied = occupied;
        buf.encode()
    }
}
