//! Text objects: the ranges selected by `iw`, `a"`, `i(` and friends.
//!
//! Word and quote objects never leave the cursor's line. Bracket objects
//! may span lines and take a count selecting the n-th enclosing pair.

use core_text::scan::{ByteCursor, Class, class_of, is_blank, line_end, line_start};
use core_text::{Address, PieceTable};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObject {
    Word,
    BigWord,
    Quote(u8),
    Bracket { open: u8, close: u8 },
}

impl TextObject {
    /// Object named by the key typed after `i` or `a`.
    pub fn from_key(key: u8) -> Option<Self> {
        let object = match key {
            b'w' => TextObject::Word,
            b'W' => TextObject::BigWord,
            b'"' | b'\'' | b'`' => TextObject::Quote(key),
            b'(' | b')' | b'b' => TextObject::Bracket { open: b'(', close: b')' },
            b'[' | b']' => TextObject::Bracket { open: b'[', close: b']' },
            b'{' | b'}' | b'B' => TextObject::Bracket { open: b'{', close: b'}' },
            b'<' | b'>' => TextObject::Bracket { open: b'<', close: b'>' },
            _ => return None,
        };
        Some(object)
    }
}

pub(crate) fn inner(t: &PieceTable, at: Address, object: TextObject, n: usize) -> Option<Range<Address>> {
    match object {
        TextObject::Word => inner_word(t, at, false, n),
        TextObject::BigWord => inner_word(t, at, true, n),
        TextObject::Quote(q) => {
            let (open, close) = quote_pair(t, at, q)?;
            // A count widens the inner object to the quotes themselves.
            if n > 1 {
                Some(open..close + 1)
            } else {
                Some(open + 1..close)
            }
        }
        TextObject::Bracket { open, close } => {
            let (o, c) = enclosing(t, at, open, close, n)?;
            Some(o + 1..c)
        }
    }
}

pub(crate) fn outer(t: &PieceTable, at: Address, object: TextObject, n: usize) -> Option<Range<Address>> {
    match object {
        TextObject::Word => outer_word(t, at, false, n),
        TextObject::BigWord => outer_word(t, at, true, n),
        TextObject::Quote(q) => {
            let (open, close) = quote_pair(t, at, q)?;
            Some(with_blanks(t, open..close + 1))
        }
        TextObject::Bracket { open, close } => {
            let (o, c) = enclosing(t, at, open, close, n)?;
            Some(o..c + 1)
        }
    }
}

/// Class of a byte inside a line; `None` at the newline.
fn unit(b: u8, big: bool) -> Option<Class> {
    (b != b'\n').then(|| class_of(b, big))
}

/// Maximal same-class run around `at`, bounded by the line.
fn run_at(t: &PieceTable, at: Address, big: bool) -> Option<(Range<Address>, Class)> {
    let cursor = ByteCursor::new(t, at);
    let class = unit(cursor.peek()?, big)?;
    let mut start = cursor.clone();
    while start.peek_prev().and_then(|p| unit(p, big)) == Some(class) {
        start.prev_byte();
    }
    let mut end = cursor;
    while end.peek().and_then(|b| unit(b, big)) == Some(class) {
        end.next_byte();
    }
    Some((start.pos()..end.pos(), class))
}

fn inner_word(t: &PieceTable, at: Address, big: bool, n: usize) -> Option<Range<Address>> {
    let (mut range, _) = run_at(t, at, big)?;
    for _ in 1..n {
        match run_at(t, range.end, big) {
            Some((next, _)) => range.end = next.end,
            None => break,
        }
    }
    Some(range)
}

fn outer_word(t: &PieceTable, at: Address, big: bool, n: usize) -> Option<Range<Address>> {
    let (mut range, class) = run_at(t, at, big)?;
    if class == Class::Blank {
        // Leading blanks plus the words that follow.
        for i in 0..n {
            if i > 0 {
                if let Some((blank, Class::Blank)) = run_at(t, range.end, big) {
                    range.end = blank.end;
                }
            }
            match run_at(t, range.end, big) {
                Some((word, c)) if c != Class::Blank => range.end = word.end,
                _ => break,
            }
        }
        return Some(range);
    }
    let mut trailing = false;
    for i in 0..n {
        if i > 0 {
            match run_at(t, range.end, big) {
                Some((word, c)) if c != Class::Blank => range.end = word.end,
                _ => break,
            }
        }
        if let Some((blank, Class::Blank)) = run_at(t, range.end, big) {
            range.end = blank.end;
            trailing = true;
        }
    }
    if !trailing && range.start > 0 {
        if let Some((blank, Class::Blank)) = run_at(t, range.start - 1, big) {
            range.start = blank.start;
        }
    }
    Some(range)
}

/// Extend a range over trailing blanks, or leading blanks when there are
/// none after it.
fn with_blanks(t: &PieceTable, mut range: Range<Address>) -> Range<Address> {
    let mut c = ByteCursor::new(t, range.end);
    while c.peek().is_some_and(is_blank) {
        c.next_byte();
    }
    if c.pos() > range.end {
        range.end = c.pos();
        return range;
    }
    let mut c = ByteCursor::new(t, range.start);
    while c.peek_prev().is_some_and(is_blank) {
        c.prev_byte();
    }
    range.start = c.pos();
    range
}

/// Quote pair on the cursor's line: the first pair whose closing quote is
/// at or after the cursor. Quotes preceded by a backslash do not count.
fn quote_pair(t: &PieceTable, at: Address, q: u8) -> Option<(Address, Address)> {
    let end = line_end(t, at);
    let mut c = ByteCursor::new(t, line_start(t, at));
    let mut open = None;
    let mut escaped = false;
    while c.pos() < end {
        let pos = c.pos();
        let b = c.next_byte()?;
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == q {
            match open.take() {
                None => open = Some(pos),
                Some(o) if pos >= at => return Some((o, pos)),
                Some(_) => {}
            }
        }
    }
    None
}

/// Positions of the `n`-th bracket pair enclosing `at`. A cursor on either
/// bracket counts as inside that pair.
fn enclosing(t: &PieceTable, at: Address, open: u8, close: u8, n: usize) -> Option<(Address, Address)> {
    let mut back = ByteCursor::new(t, at);
    let mut remaining = n.max(1);
    let mut open_at = None;
    if back.peek() == Some(open) {
        remaining -= 1;
        if remaining == 0 {
            open_at = Some(at);
        }
    }
    let open_at = match open_at {
        Some(pos) => pos,
        None => {
            let mut depth = 0usize;
            loop {
                let b = back.prev_byte()?;
                if b == close {
                    depth += 1;
                } else if b == open {
                    if depth == 0 {
                        remaining -= 1;
                        if remaining == 0 {
                            break back.pos();
                        }
                    } else {
                        depth -= 1;
                    }
                }
            }
        }
    };
    let mut fwd = ByteCursor::new(t, open_at + 1);
    let mut depth = 0usize;
    loop {
        let pos = fwd.pos();
        let b = fwd.next_byte()?;
        if b == open {
            depth += 1;
        } else if b == close {
            if depth == 0 {
                return Some((open_at, pos));
            }
            depth -= 1;
        }
    }
}
