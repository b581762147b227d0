//! Character grid and styled tokens.
//!
//! The compositor paints into a `Grid` of `GridToken`s; the output writer
//! diffs grids and serializes rows. Each token pairs a pre-rendered SGR
//! prefix with a glyph, so equality checks between frames are plain string
//! comparisons with no style model in sight.

/// Reset-all-attributes sequence closing every styled run.
pub const RESET: &str = "\x1b[0m";

/// One terminal cell: a pre-rendered SGR prefix (`run`) and the glyph that
/// occupies the cell.
///
/// An empty `run` means reset/plain; it compares equal only to other empty
/// runs, so plain cells never merge into styled runs. An empty `glyph`
/// marks the continuation cell of a double-width character; the terminal
/// advances the cursor past it on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridToken {
    pub run: String,
    pub glyph: String,
}

impl GridToken {
    pub fn new(run: String, glyph: String) -> Self {
        Self { run, glyph }
    }

    /// Plain cell with the given glyph and no styling.
    pub fn plain(glyph: impl Into<String>) -> Self {
        Self {
            run: String::new(),
            glyph: glyph.into(),
        }
    }

    /// Continuation cell behind a double-width glyph.
    pub fn pruned() -> Self {
        Self {
            run: String::new(),
            glyph: String::new(),
        }
    }

    pub fn is_pruned(&self) -> bool {
        self.glyph.is_empty()
    }
}

impl Default for GridToken {
    fn default() -> Self {
        Self::plain(" ")
    }
}

/// A fixed-size grid of tokens, one per terminal cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub width: u16,
    pub height: u16,
    rows: Vec<Vec<GridToken>>,
}

impl Grid {
    /// A grid filled with plain spaces.
    pub fn new(width: u16, height: u16) -> Self {
        let rows = (0..height)
            .map(|_| vec![GridToken::default(); width as usize])
            .collect();
        Self {
            width,
            height,
            rows,
        }
    }

    /// Write a token. Out-of-bounds coordinates are silently dropped, so
    /// paint code never bounds-checks.
    pub fn set(&mut self, x: i32, y: i32, token: GridToken) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        self.rows[y as usize][x as usize] = token;
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&GridToken> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(&self.rows[y as usize][x as usize])
    }

    pub fn row(&self, y: u16) -> &[GridToken] {
        &self.rows[y as usize]
    }

    /// Whether a row is entirely plain spaces.
    pub fn row_is_blank(&self, y: u16) -> bool {
        let blank = GridToken::default();
        self.rows[y as usize].iter().all(|t| *t == blank)
    }

    /// Serialize one full row to text with escape sequences.
    pub fn stringify_row(&self, y: u16) -> String {
        stringify_span(&self.rows[y as usize])
    }
}

/// Serialize a span of tokens: adjacent cells sharing the same run collapse
/// under one SGR open and one reset, pruned cells emit nothing, plain cells
/// sit outside any run.
pub fn stringify_span(tokens: &[GridToken]) -> String {
    let mut out = String::new();
    let mut open: Option<&str> = None;
    for tok in tokens {
        if tok.is_pruned() {
            continue;
        }
        let want = if tok.run.is_empty() {
            None
        } else {
            Some(tok.run.as_str())
        };
        if open != want {
            if open.is_some() {
                out.push_str(RESET);
            }
            if let Some(run) = want {
                out.push_str(run);
            }
            open = want;
        }
        out.push_str(&tok.glyph);
    }
    if open.is_some() {
        out.push_str(RESET);
    }
    out
}

/// A composed frame: the grid plus any side-channel text accumulated since
/// the previous frame (application log lines destined for scrollback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub grid: Grid,
    pub side_text: String,
}

impl Frame {
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            side_text: String::new(),
        }
    }
}
