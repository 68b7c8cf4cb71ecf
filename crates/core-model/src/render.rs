//! Drawing the current buffer through the terminal collaborator.
//!
//! The view is addressed, not line-numbered: a buffer keeps the address of
//! its first visible line (`view_start`) and a horizontal scroll in byte
//! columns. [`follow_cursor`] moves both so the cursor stays visible, then
//! [`draw`] paints the text rows. Rows past the end of the buffer show `~`.
//! Columns are byte columns; tabs and control bytes take one cell.

use anyhow::Result;
use core_state::Buffer;
use core_terminal::Terminal;
use core_text::scan::{ByteCursor, line_index, line_start, line_to_address};
use tracing::trace;

/// First visible line that keeps `cursor_line` inside the view, keeping
/// `margin` rows (at most half the view) between it and either edge.
/// `None` when no scroll is needed.
pub fn compute_scroll_intent(first: usize, cursor_line: usize, rows: usize, margin: usize) -> Option<usize> {
    if rows == 0 {
        return None;
    }
    let m = margin.min(rows / 2);
    let new_first = if cursor_line < first + m {
        cursor_line.saturating_sub(m)
    } else if cursor_line + m >= first + rows {
        cursor_line + m + 1 - rows
    } else {
        return None;
    };
    (new_first != first).then_some(new_first)
}

/// Horizontal counterpart of [`compute_scroll_intent`], without a margin.
fn compute_xscroll(xscroll: usize, column: usize, cols: usize) -> usize {
    if column < xscroll {
        column
    } else if column >= xscroll + cols.max(1) {
        column + 1 - cols.max(1)
    } else {
        xscroll
    }
}

/// Scroll the buffer's view so its cursor is visible. Returns true when the
/// view moved.
pub fn follow_cursor(buffer: &mut Buffer, rows: usize, cols: usize, margin: usize) -> bool {
    let (vertical, column) = {
        let t = buffer.table();
        let cursor = buffer.cursor();
        let first = line_index(t, buffer.view_start());
        let vertical = compute_scroll_intent(first, line_index(t, cursor), rows, margin)
            .map(|line| line_to_address(t, line));
        (vertical, cursor - line_start(t, cursor))
    };
    let xscroll = compute_xscroll(buffer.view_xscroll(), column, cols);
    let moved = vertical.is_some() || xscroll != buffer.view_xscroll();
    if let Some(start) = vertical {
        buffer.set_view_start(start);
    }
    buffer.set_view_xscroll(xscroll);
    if moved {
        trace!(target: "editor", view_start = buffer.view_start(), xscroll, "scroll");
    }
    moved
}

fn cell(b: u8) -> u8 {
    match b {
        b'\t' => b' ',
        0x00..=0x1f | 0x7f => b'?',
        _ => b,
    }
}

/// Paint `rows` text rows of `buffer` (or an empty screen) and place the
/// terminal cursor on the buffer cursor.
pub fn draw(buffer: Option<&Buffer>, term: &mut dyn Terminal, rows: usize) -> Result<()> {
    let cols = usize::from(term.size().0);
    let Some(buffer) = buffer else {
        for y in 0..rows {
            term.clear_line(clamp_u16(y))?;
            term.put_char(b'~')?;
        }
        return term.flush();
    };

    let t = buffer.table();
    let xscroll = buffer.view_xscroll();
    let mut line = Some(buffer.view_start());
    for y in 0..rows {
        term.clear_line(clamp_u16(y))?;
        let Some(start) = line else {
            term.put_char(b'~')?;
            continue;
        };
        let mut c = ByteCursor::new(t, start);
        let mut col = 0;
        line = None;
        while let Some(b) = c.next_byte() {
            if b == b'\n' {
                line = (c.pos() < t.len()).then_some(c.pos());
                break;
            }
            if col >= xscroll && col - xscroll < cols {
                term.put_char(cell(b))?;
            }
            col += 1;
        }
    }

    let cursor = buffer.cursor();
    let y = line_index(t, cursor).saturating_sub(line_index(t, buffer.view_start()));
    let x = (cursor - line_start(t, cursor)).saturating_sub(xscroll);
    term.set_cursor(clamp_u16(x), clamp_u16(y))?;
    term.flush()
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
