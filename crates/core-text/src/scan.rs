//! Byte-level scanning over a piece table.
//!
//! Motion resolution never linearizes a buffer. It walks bytes through a
//! [`ByteCursor`], which is seeded with `find` and then steps from span to
//! span using `text`, so crossing a span boundary costs nothing extra.

use crate::Address;
use crate::piece_table::PieceTable;

/// Bidirectional byte cursor. `pos` ranges over `0..=len`; at `len` there is
/// no current byte.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    table: &'a PieceTable,
    pos: Address,
    index: usize,
    chunk_start: Address,
    chunk: &'a [u8],
}

impl<'a> ByteCursor<'a> {
    pub fn new(table: &'a PieceTable, at: Address) -> Self {
        let mut cursor = Self {
            table,
            pos: 0,
            index: 0,
            chunk_start: 0,
            chunk: &[],
        };
        cursor.seek(at);
        cursor
    }

    /// Reposition (clamped to `0..=len`).
    pub fn seek(&mut self, at: Address) {
        let at = at.min(self.table.len());
        self.pos = at;
        match self.table.find(at) {
            Some(loc) => self.load(loc.index, loc.start),
            None => self.load(self.table.span_count(), self.table.len()),
        }
    }

    fn load(&mut self, index: usize, start: Address) {
        let table = self.table;
        self.index = index;
        self.chunk_start = start;
        self.chunk = table
            .spans()
            .get(index)
            .map(|span| table.text(span))
            .unwrap_or(&[]);
    }

    pub fn pos(&self) -> Address {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.table.len()
    }

    /// Byte under the cursor.
    pub fn peek(&self) -> Option<u8> {
        self.chunk.get(self.pos - self.chunk_start).copied()
    }

    /// Byte just before the cursor, without moving.
    pub fn peek_prev(&self) -> Option<u8> {
        if self.pos == 0 {
            return None;
        }
        if self.pos > self.chunk_start {
            return self.chunk.get(self.pos - self.chunk_start - 1).copied();
        }
        let span = self.table.spans().get(self.index.checked_sub(1)?)?;
        self.table.text(span).last().copied()
    }

    /// Return the byte under the cursor and step forward.
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        let chunk_end = self.chunk_start + self.chunk.len();
        if self.pos >= chunk_end {
            self.load(self.index + 1, chunk_end);
        }
        Some(b)
    }

    /// Step back one byte and return the byte now under the cursor.
    pub fn prev_byte(&mut self) -> Option<u8> {
        if self.pos == 0 {
            return None;
        }
        self.pos -= 1;
        while self.pos < self.chunk_start {
            let index = self.index - 1;
            let len = self.table.spans()[index].len;
            self.load(index, self.chunk_start - len);
        }
        self.peek()
    }
}

/// Character classes used by word motions and word text objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Blank,
    Punct,
    Word,
}

/// Classify a byte. With `big` set (WORD motions) everything that is not
/// whitespace is a word byte. Bytes >= 0x80 count as word bytes so UTF-8
/// sequences never split a word.
pub fn class_of(b: u8, big: bool) -> Class {
    if b.is_ascii_whitespace() {
        Class::Blank
    } else if big || b == b'_' || b.is_ascii_alphanumeric() || b >= 0x80 {
        Class::Word
    } else {
        Class::Punct
    }
}

pub fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Address of the first byte of the line containing `at`.
pub fn line_start(table: &PieceTable, at: Address) -> Address {
    let mut c = ByteCursor::new(table, at);
    while let Some(b) = c.peek_prev() {
        if b == b'\n' {
            break;
        }
        c.prev_byte();
    }
    c.pos()
}

/// Address of the newline ending the line containing `at`, or `len()` for
/// an unterminated last line.
pub fn line_end(table: &PieceTable, at: Address) -> Address {
    let mut c = ByteCursor::new(table, at);
    while let Some(b) = c.peek() {
        if b == b'\n' {
            break;
        }
        c.next_byte();
    }
    c.pos()
}

/// First non-blank byte of the line starting at or containing `at`
/// (line end when the line is all blanks).
pub fn first_non_blank(table: &PieceTable, at: Address) -> Address {
    let mut c = ByteCursor::new(table, line_start(table, at));
    while let Some(b) = c.peek() {
        if !is_blank(b) {
            break;
        }
        c.next_byte();
    }
    c.pos()
}

/// Start of the line following the one containing `at`, if there is one.
pub fn next_line_start(table: &PieceTable, at: Address) -> Option<Address> {
    let end = line_end(table, at);
    (end < table.len()).then_some(end + 1)
}

/// Start of the line preceding the one containing `at`, if there is one.
pub fn prev_line_start(table: &PieceTable, at: Address) -> Option<Address> {
    let start = line_start(table, at);
    (start > 0).then(|| line_start(table, start - 1))
}

/// Zero-based line number of `at`.
pub fn line_index(table: &PieceTable, at: Address) -> usize {
    table
        .chunks(0..at)
        .map(|chunk| chunk.iter().filter(|b| **b == b'\n').count())
        .sum()
}

/// Number of lines. An empty table has one (empty) line; a trailing newline
/// does not open an extra line.
pub fn line_count(table: &PieceTable) -> usize {
    let len = table.len();
    if len == 0 {
        return 1;
    }
    let newlines = line_index(table, len);
    if table.byte(len - 1) == Some(b'\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Start address of zero-based line `line`, clamped to the last line.
pub fn line_to_address(table: &PieceTable, line: usize) -> Address {
    let mut at = 0;
    for _ in 0..line {
        match next_line_start(table, at) {
            Some(next) if next < table.len() => at = next,
            _ => break,
        }
    }
    at
}
