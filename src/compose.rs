//! Compositor.
//!
//! Walks the laid-out tree, orders paintable elements by effective z-index
//! (document order breaking ties), and paints each into the grid: occlusion
//! wipe, background, border frame, then text cells. Clipping rects from
//! overflow:hidden ancestors bound every write.

use unicode_width::UnicodeWidthChar;

use crate::grid::{Grid, GridToken};
use crate::style::{self, StyleProperty, StyleSetting, StyleValue};
use crate::tree::Tree;
use crate::types::Rect;

struct PaintEntry {
    handle: u32,
    z: i32,
    seq: usize,
    clip: Rect,
}

/// Compose the whole tree into a fresh grid of the given size.
pub fn compose(tree: &Tree, width: u16, height: u16) -> Grid {
    let mut grid = Grid::new(width, height);
    let root = match tree.root() {
        Some(r) => r,
        None => return grid,
    };

    let mut entries = Vec::new();
    collect(tree, root, 0, Rect::screen(width, height), &mut entries);
    // Stable z order: higher z paints later, document order breaks ties.
    entries.sort_by_key(|e| (e.z, e.seq));

    let z_floor = entries.first().map(|e| e.z).unwrap_or(0);
    for entry in &entries {
        paint(tree, entry, z_floor, &mut grid);
    }
    grid
}

fn collect(tree: &Tree, handle: u32, parent_z: i32, clip: Rect, out: &mut Vec<PaintEntry>) {
    let node = match tree.nodes.get(&handle) {
        Some(n) => n,
        None => return,
    };

    let z = match node.style(StyleProperty::ZIndex) {
        StyleSetting::Explicit(StyleValue::Cells(z)) => *z,
        _ => parent_z,
    };

    if node.kind.paints() {
        out.push(PaintEntry {
            handle,
            z,
            seq: out.len(),
            clip,
        });
    }

    // overflow:hidden bounds descendants to this node's rect, per axis.
    let (hx, hy) = style::hidden_axes(node);
    let mut child_clip = clip;
    if hx || hy {
        let axis_bound = Rect::new(
            if hx { node.screen_rect.x } else { clip.x },
            if hy { node.screen_rect.y } else { clip.y },
            if hx { node.screen_rect.width } else { clip.width },
            if hy { node.screen_rect.height } else { clip.height },
        );
        child_clip = clip.intersect(axis_bound);
    }
    for &child in &node.children {
        collect(tree, child, z, child_clip, out);
    }
}

fn paint(tree: &Tree, entry: &PaintEntry, z_floor: i32, grid: &mut Grid) {
    let node = match tree.nodes.get(&entry.handle) {
        Some(n) => n,
        None => return,
    };
    let rect = node.screen_rect;
    let visible = rect.intersect(entry.clip);
    if visible.is_empty() {
        return;
    }

    let ps = style::resolve_paint_style(&tree.nodes, entry.handle);
    let run = style::style_run(&ps);

    // An element raised above the base layer, or one with an explicit
    // background, must erase whatever lower layers left in its rect.
    if ps.bg.is_some() || entry.z > z_floor {
        fill_rect(grid, visible, &run);
    }

    let mut content = rect;
    if let Some(chars) = ps.border.chars() {
        draw_border(grid, rect, entry.clip, &run, chars);
        content = Rect::new(rect.x + 1, rect.y + 1, rect.width - 2, rect.height - 2);
    }

    if node.kind.has_text() && !node.content.is_empty() {
        draw_text(grid, content, entry.clip, &run, &node.content);
    }
}

fn fill_rect(grid: &mut Grid, rect: Rect, run: &str) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            grid.set(x, y, GridToken::new(run.to_string(), " ".to_string()));
        }
    }
}

fn draw_border(
    grid: &mut Grid,
    rect: Rect,
    clip: Rect,
    run: &str,
    chars: (char, char, char, char, char, char),
) {
    if rect.width < 2 || rect.height < 2 {
        return;
    }
    let (tl, tr, bl, br, h, v) = chars;
    let (x0, y0) = (rect.x, rect.y);
    let (x1, y1) = (rect.x + rect.width - 1, rect.y + rect.height - 1);

    let mut put = |x: i32, y: i32, c: char| {
        if clip.contains(x, y) {
            grid.set(x, y, GridToken::new(run.to_string(), c.to_string()));
        }
    };

    put(x0, y0, tl);
    put(x1, y0, tr);
    put(x0, y1, bl);
    put(x1, y1, br);
    for x in x0 + 1..x1 {
        put(x, y0, h);
        put(x, y1, h);
    }
    for y in y0 + 1..y1 {
        put(x0, y, v);
        put(x1, y, v);
    }
}

/// Paint text cell-by-cell. Double-width glyphs occupy their cell plus a
/// pruned continuation cell; a wide glyph that would straddle the right
/// edge of the content box or the clip is dropped entirely.
fn draw_text(grid: &mut Grid, content: Rect, clip: Rect, run: &str, text: &str) {
    if content.is_empty() {
        return;
    }
    let bounds = content.intersect(clip);
    if bounds.is_empty() {
        return;
    }

    let mut y = content.y;
    for line in text.split('\n') {
        if y >= content.y + content.height {
            break;
        }
        let mut x = content.x;
        for ch in line.chars() {
            let w = ch.width().unwrap_or(0) as i32;
            if w == 0 {
                continue;
            }
            if x + w > content.x + content.width {
                break;
            }
            let fits = bounds.contains(x, y) && (w == 1 || bounds.contains(x + 1, y));
            if fits {
                grid.set(x, y, GridToken::new(run.to_string(), ch.to_string()));
                if w == 2 {
                    grid.set(x + 1, y, GridToken::pruned());
                }
            }
            x += w;
        }
        y += 1;
    }
}
