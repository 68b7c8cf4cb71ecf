//! Terminal collaborator and its adapters.
//!
//! The editing core never talks to a terminal directly. A renderer draws
//! through [`Terminal`], which an embedding implements for its display:
//! [`CrosstermTerminal`] queues crossterm commands into any `Write`, and
//! [`CaptureTerminal`] keeps a byte grid in memory for tests and headless
//! hosts. Coordinates are zero-based `(x, y)` cells.

use anyhow::Result;
use crossterm::{
    cursor::{MoveLeft, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, ScrollDown, ScrollUp,
        disable_raw_mode, enable_raw_mode,
    },
};
use std::io::{Write, stdout};

mod capture;
pub use capture::CaptureTerminal;

pub trait Terminal {
    /// `(columns, rows)`, status line included.
    fn size(&self) -> (u16, u16);
    fn clear(&mut self) -> Result<()>;
    fn clear_line(&mut self, row: u16) -> Result<()>;
    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()>;
    /// Write one byte at the cursor and advance it.
    fn put_char(&mut self, c: u8) -> Result<()>;
    fn put_char_at(&mut self, x: u16, y: u16, c: u8) -> Result<()> {
        self.set_cursor(x, y)?;
        self.put_char(c)
    }
    /// Shift the screen up by `lines` (down when negative).
    fn scroll(&mut self, lines: i32) -> Result<()>;
    /// Erase the cell left of the cursor, pulling the rest of the row in.
    fn delete_back(&mut self) -> Result<()>;
    /// Erase the cell under the cursor, pulling the rest of the row in.
    fn delete_forward(&mut self) -> Result<()>;
    /// Replace the status line.
    fn show_status(&mut self, text: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    /// Adopt a new size after the display changed. Fixed-size terminals
    /// ignore it.
    fn resize(&mut self, _cols: u16, _rows: u16) {}
}

/// Queues crossterm commands into `W`; nothing reaches the device until
/// [`Terminal::flush`].
pub struct CrosstermTerminal<W: Write> {
    out: W,
    cols: u16,
    rows: u16,
    x: u16,
    y: u16,
}

impl CrosstermTerminal<std::io::Stdout> {
    /// Stdout sized from the controlling terminal.
    pub fn stdout() -> Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        Ok(Self::new(stdout(), cols, rows))
    }
}

impl<W: Write> CrosstermTerminal<W> {
    pub fn new(out: W, cols: u16, rows: u16) -> Self {
        Self {
            out,
            cols,
            rows,
            x: 0,
            y: 0,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Terminal for CrosstermTerminal<W> {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn clear(&mut self) -> Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        (self.x, self.y) = (0, 0);
        Ok(())
    }

    fn clear_line(&mut self, row: u16) -> Result<()> {
        queue!(self.out, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
        (self.x, self.y) = (0, row);
        Ok(())
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        queue!(self.out, MoveTo(x, y))?;
        (self.x, self.y) = (x, y);
        Ok(())
    }

    fn put_char(&mut self, c: u8) -> Result<()> {
        self.out.write_all(&[c])?;
        self.x = self.x.saturating_add(1);
        Ok(())
    }

    fn scroll(&mut self, lines: i32) -> Result<()> {
        let n = u16::try_from(lines.unsigned_abs()).unwrap_or(u16::MAX);
        match lines {
            0 => {}
            l if l > 0 => queue!(self.out, ScrollUp(n))?,
            _ => queue!(self.out, ScrollDown(n))?,
        }
        Ok(())
    }

    fn delete_back(&mut self) -> Result<()> {
        if self.x == 0 {
            return Ok(());
        }
        queue!(self.out, MoveLeft(1))?;
        self.x -= 1;
        self.delete_forward()
    }

    fn delete_forward(&mut self) -> Result<()> {
        // DCH: crossterm has no command for it.
        queue!(self.out, Print("\x1b[P"))?;
        Ok(())
    }

    fn show_status(&mut self, text: &str) -> Result<()> {
        let row = self.rows.saturating_sub(1);
        let shown: String = text.chars().take(usize::from(self.cols)).collect();
        queue!(
            self.out,
            MoveTo(0, row),
            Clear(ClearType::CurrentLine),
            Print(shown),
            MoveTo(self.x, self.y)
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }
}

/// Raw mode on the alternate screen for as long as the guard lives.
pub struct RawMode {
    active: bool,
}

impl RawMode {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Show)?;
        Ok(Self { active: true })
    }

    pub fn leave(&mut self) -> Result<()> {
        if self.active {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.active = false;
        }
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(f: impl FnOnce(&mut CrosstermTerminal<Vec<u8>>) -> Result<()>) -> String {
        let mut term = CrosstermTerminal::new(Vec::new(), 20, 5);
        f(&mut term).unwrap();
        String::from_utf8(term.into_inner()).unwrap()
    }

    #[test]
    fn nothing_is_written_for_an_empty_scroll() {
        assert_eq!(emitted(|t| t.scroll(0)), "");
    }

    #[test]
    fn put_char_at_moves_then_writes() {
        let out = emitted(|t| t.put_char_at(3, 1, b'x'));
        // CSI rows and columns are one-based.
        assert_eq!(out, "\x1b[2;4Hx");
    }

    #[test]
    fn status_returns_to_the_cursor() {
        let out = emitted(|t| {
            t.set_cursor(2, 2)?;
            t.show_status("saved")
        });
        assert!(out.starts_with("\x1b[3;3H\x1b[5;1H"));
        assert!(out.ends_with("saved\x1b[3;3H"));
    }

    #[test]
    fn status_lands_on_the_last_row_after_a_resize() {
        let out = emitted(|t| {
            t.resize(20, 8);
            t.show_status("x")
        });
        assert!(out.starts_with("\x1b[8;1H"));
    }

    #[test]
    fn delete_back_at_column_zero_is_a_no_op() {
        assert_eq!(emitted(|t| t.delete_back()), "");
    }
}
