use crate::Terminal;
use anyhow::Result;
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory screen: a grid of bytes plus a separate status line.
///
/// The last row is reserved for the status line, so the grid holds
/// `rows - 1` text rows. Writes past the right edge are dropped. Clones
/// share one screen, so a caller can keep a handle after giving the
/// terminal away.
#[derive(Debug, Clone)]
pub struct CaptureTerminal {
    screen: Rc<RefCell<Screen>>,
}

#[derive(Debug)]
struct Screen {
    cols: u16,
    rows: u16,
    grid: Vec<Vec<u8>>,
    status: String,
    cursor: (u16, u16),
    flushes: usize,
}

impl Screen {
    fn blank_row(&self) -> Vec<u8> {
        vec![b' '; usize::from(self.cols)]
    }

    fn row(&self, y: u16) -> String {
        self.grid
            .get(usize::from(y))
            .map(|r| String::from_utf8_lossy(r).trim_end().to_owned())
            .unwrap_or_default()
    }
}

impl CaptureTerminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        let text_rows = usize::from(rows.saturating_sub(1));
        let screen = Screen {
            cols,
            rows,
            grid: vec![vec![b' '; usize::from(cols)]; text_rows],
            status: String::new(),
            cursor: (0, 0),
            flushes: 0,
        };
        Self {
            screen: Rc::new(RefCell::new(screen)),
        }
    }

    /// Row `y` with trailing blanks trimmed.
    pub fn row(&self, y: u16) -> String {
        self.screen.borrow().row(y)
    }

    /// All text rows, trimmed, joined by newlines.
    pub fn screen(&self) -> String {
        let screen = self.screen.borrow();
        (0..screen.grid.len())
            .map(|y| screen.row(y as u16))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn status(&self) -> String {
        self.screen.borrow().status.clone()
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.screen.borrow().cursor
    }

    pub fn flushes(&self) -> usize {
        self.screen.borrow().flushes
    }
}

impl Terminal for CaptureTerminal {
    fn size(&self) -> (u16, u16) {
        let screen = self.screen.borrow();
        (screen.cols, screen.rows)
    }

    fn clear(&mut self) -> Result<()> {
        let mut screen = self.screen.borrow_mut();
        for row in &mut screen.grid {
            row.fill(b' ');
        }
        screen.cursor = (0, 0);
        Ok(())
    }

    fn clear_line(&mut self, row: u16) -> Result<()> {
        let mut screen = self.screen.borrow_mut();
        if let Some(r) = screen.grid.get_mut(usize::from(row)) {
            r.fill(b' ');
        }
        screen.cursor = (0, row);
        Ok(())
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<()> {
        self.screen.borrow_mut().cursor = (x, y);
        Ok(())
    }

    fn put_char(&mut self, c: u8) -> Result<()> {
        let mut screen = self.screen.borrow_mut();
        let (x, y) = screen.cursor;
        if let Some(cell) = screen
            .grid
            .get_mut(usize::from(y))
            .and_then(|r| r.get_mut(usize::from(x)))
        {
            *cell = c;
        }
        screen.cursor.0 = x.saturating_add(1);
        Ok(())
    }

    fn scroll(&mut self, lines: i32) -> Result<()> {
        let mut screen = self.screen.borrow_mut();
        let n = (lines.unsigned_abs() as usize).min(screen.grid.len());
        if lines > 0 {
            screen.grid.drain(..n);
            for _ in 0..n {
                let row = screen.blank_row();
                screen.grid.push(row);
            }
        } else if lines < 0 {
            let keep = screen.grid.len() - n;
            screen.grid.truncate(keep);
            for _ in 0..n {
                let row = screen.blank_row();
                screen.grid.insert(0, row);
            }
        }
        Ok(())
    }

    fn delete_back(&mut self) -> Result<()> {
        {
            let mut screen = self.screen.borrow_mut();
            if screen.cursor.0 == 0 {
                return Ok(());
            }
            screen.cursor.0 -= 1;
        }
        self.delete_forward()
    }

    fn delete_forward(&mut self) -> Result<()> {
        let mut screen = self.screen.borrow_mut();
        let (x, y) = screen.cursor;
        if let Some(row) = screen.grid.get_mut(usize::from(y)) {
            if usize::from(x) < row.len() {
                row.remove(usize::from(x));
                row.push(b' ');
            }
        }
        Ok(())
    }

    fn show_status(&mut self, text: &str) -> Result<()> {
        let mut screen = self.screen.borrow_mut();
        let cols = usize::from(screen.cols);
        screen.status = text.chars().take(cols).collect();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.screen.borrow_mut().flushes += 1;
        Ok(())
    }
}
