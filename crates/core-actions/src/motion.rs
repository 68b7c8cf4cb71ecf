//! Motion resolution.
//!
//! A [`Motion`] names a cursor movement or text object plus a repeat count.
//! [`resolve`] turns it into a [`Target`] for a given buffer without touching
//! the buffer: a point for cursor motions, a range for text objects. Content
//! is read exclusively through `core_text::scan`, so every scan crosses span
//! boundaries without linearizing the buffer.
//!
//! Conventions:
//! * Addresses are byte offsets; "columns" are byte columns within a line.
//! * A count of 0 means no count was given. Repeating motions treat it as 1;
//!   `G` treats it as "last line".
//! * Motions clamp at buffer boundaries and never fail, except find motions
//!   with no match and text objects with nothing to select, which resolve to
//!   `None` (no movement, empty operator range).
//! * Point targets may rest on a line's newline (or at end of buffer) so that
//!   exclusive operator ranges can reach the end of a line; [`clamp_normal`]
//!   pulls such a position back onto the last byte for Normal-mode cursors.

use crate::text_object::{self, TextObject};
use core_state::Buffer;
use core_text::scan::{
    ByteCursor, Class, class_of, first_non_blank, line_count, line_end, line_index, line_start,
    line_to_address, next_line_start, prev_line_start,
};
use core_text::{Address, PieceTable};
use std::ops::Range;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// `h`
    Left,
    /// `l`
    Right,
    /// `k`
    Up,
    /// `j`
    Down,
    /// `w`
    WordForward,
    /// `e`
    WordEnd,
    /// `b`
    WordBackward,
    /// `W`
    BigWordForward,
    /// `E`
    BigWordEnd,
    /// `B`
    BigWordBackward,
    /// `0`
    LineStart,
    /// `^`
    FirstNonBlank,
    /// `$`
    LineEnd,
    /// `(`
    SentenceBackward,
    /// `)`
    SentenceForward,
    /// `{`
    ParagraphBackward,
    /// `}`
    ParagraphForward,
    /// `[[`
    SectionBackward,
    /// `]]`
    SectionForward,
    /// `f{byte}`
    FindForward(u8),
    /// `F{byte}`
    FindBackward(u8),
    /// `t{byte}`
    TillForward(u8),
    /// `T{byte}`
    TillBackward(u8),
    /// `G`
    GotoLine,
    /// `_`: first non-blank `count - 1` lines down. Doubled operators
    /// (`dd`, `yy`) use it to take `count` whole lines.
    Lines,
    /// `H`
    ViewTop,
    /// `M`
    ViewMiddle,
    /// `L`
    ViewBottom,
    /// `i{object}`
    Inner(TextObject),
    /// `a{object}`
    Outer(TextObject),
}

impl MotionKind {
    /// Operator ranges include the target byte.
    pub fn is_inclusive(self) -> bool {
        matches!(
            self,
            MotionKind::WordEnd
                | MotionKind::BigWordEnd
                | MotionKind::FindForward(_)
                | MotionKind::TillForward(_)
                | MotionKind::LineEnd
        )
    }

    /// Operator ranges cover whole lines.
    pub fn is_linewise(self) -> bool {
        matches!(
            self,
            MotionKind::Up
                | MotionKind::Down
                | MotionKind::GotoLine
                | MotionKind::Lines
                | MotionKind::ViewTop
                | MotionKind::ViewMiddle
                | MotionKind::ViewBottom
        )
    }

    pub fn is_text_object(self) -> bool {
        matches!(self, MotionKind::Inner(_) | MotionKind::Outer(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motion {
    pub kind: MotionKind,
    /// 0 when no count was typed.
    pub count: usize,
}

impl Motion {
    pub fn new(kind: MotionKind) -> Self {
        Self { kind, count: 0 }
    }

    pub fn with_count(kind: MotionKind, count: usize) -> Self {
        Self { kind, count }
    }

    /// Repetitions for repeating motions.
    pub fn times(&self) -> usize {
        self.count.max(1)
    }
}

impl From<MotionKind> for Motion {
    fn from(kind: MotionKind) -> Self {
        Motion::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Point(Address),
    Range(Range<Address>),
}

/// Resolve `motion` from the buffer's cursor. `rows` is the view height used
/// by `H`/`M`/`L`.
pub fn resolve(buffer: &Buffer, motion: Motion, rows: usize) -> Option<Target> {
    let t = buffer.table();
    let at = buffer.cursor().min(t.len());
    let n = motion.times();
    let target = match motion.kind {
        MotionKind::Left => Target::Point(at.saturating_sub(n).max(line_start(t, at))),
        MotionKind::Right => Target::Point(at.saturating_add(n).min(line_end(t, at))),
        MotionKind::Up => Target::Point(vertical(t, at, n, prev_line_start)),
        MotionKind::Down => Target::Point(vertical(t, at, n, next_line_start)),
        MotionKind::WordForward => Target::Point(repeat(n, at, |p| word_forward(t, p, false))),
        MotionKind::BigWordForward => Target::Point(repeat(n, at, |p| word_forward(t, p, true))),
        MotionKind::WordEnd => Target::Point(repeat(n, at, |p| word_end(t, p, false))),
        MotionKind::BigWordEnd => Target::Point(repeat(n, at, |p| word_end(t, p, true))),
        MotionKind::WordBackward => Target::Point(repeat(n, at, |p| word_backward(t, p, false))),
        MotionKind::BigWordBackward => {
            Target::Point(repeat(n, at, |p| word_backward(t, p, true)))
        }
        MotionKind::LineStart => Target::Point(line_start(t, at)),
        MotionKind::FirstNonBlank => Target::Point(first_non_blank(t, at)),
        MotionKind::LineEnd => {
            let line = vertical(t, at, n - 1, next_line_start);
            Target::Point(last_byte_of_line(t, line))
        }
        MotionKind::SentenceForward => Target::Point(repeat(n, at, |p| sentence_forward(t, p))),
        MotionKind::SentenceBackward => Target::Point(repeat(n, at, |p| sentence_backward(t, p))),
        MotionKind::ParagraphForward => Target::Point(repeat(n, at, |p| paragraph_forward(t, p))),
        MotionKind::ParagraphBackward => {
            Target::Point(repeat(n, at, |p| paragraph_backward(t, p)))
        }
        MotionKind::SectionForward => Target::Point(repeat(n, at, |p| section_forward(t, p))),
        MotionKind::SectionBackward => Target::Point(repeat(n, at, |p| section_backward(t, p))),
        MotionKind::FindForward(b) => Target::Point(find_forward(t, at, b, n)?),
        MotionKind::TillForward(b) => Target::Point(find_forward(t, at, b, n)? - 1),
        MotionKind::FindBackward(b) => Target::Point(find_backward(t, at, b, n)?),
        MotionKind::TillBackward(b) => Target::Point(find_backward(t, at, b, n)? + 1),
        MotionKind::GotoLine => {
            let last = line_count(t) - 1;
            let line = match motion.count {
                0 => last,
                count => (count - 1).min(last),
            };
            Target::Point(first_non_blank(t, line_to_address(t, line)))
        }
        MotionKind::Lines => {
            Target::Point(first_non_blank(t, vertical(t, at, n - 1, next_line_start)))
        }
        MotionKind::ViewTop | MotionKind::ViewMiddle | MotionKind::ViewBottom => {
            Target::Point(view_line(t, buffer.view_start(), rows, motion))
        }
        MotionKind::Inner(object) => Target::Range(text_object::inner(t, at, object, n)?),
        MotionKind::Outer(object) => Target::Range(text_object::outer(t, at, object, n)?),
    };
    trace!(target: "actions.motion", ?motion, from = at, ?target, "resolve");
    Some(target)
}

/// Normal-mode cursor rule: the cursor rests on a byte of the line, never on
/// its newline or past the end, unless the line is empty.
pub fn clamp_normal(t: &PieceTable, at: Address) -> Address {
    let at = at.min(t.len());
    let on_line_end = at == t.len() || t.byte(at) == Some(b'\n');
    if on_line_end && at > line_start(t, at) {
        at - 1
    } else {
        at
    }
}

fn repeat(n: usize, at: Address, mut step: impl FnMut(Address) -> Address) -> Address {
    let mut at = at;
    for _ in 0..n {
        let next = step(at);
        if next == at {
            break;
        }
        at = next;
    }
    at
}

/// Move `n` lines with `step`, keeping the byte column (clamped to the
/// destination line's end).
fn vertical(
    t: &PieceTable,
    at: Address,
    n: usize,
    step: fn(&PieceTable, Address) -> Option<Address>,
) -> Address {
    let start = line_start(t, at);
    let column = at - start;
    let mut line = start;
    for _ in 0..n {
        match step(t, line) {
            // A trailing newline does not open another line.
            Some(next) if next < t.len() => line = next,
            _ => break,
        }
    }
    (line + column).min(line_end(t, line))
}

fn last_byte_of_line(t: &PieceTable, at: Address) -> Address {
    let start = line_start(t, at);
    let end = line_end(t, at);
    if end > start { end - 1 } else { start }
}

/// An empty line starts at `at`: a newline directly after another newline
/// (or at the start of the buffer).
pub(crate) fn is_empty_line(t: &PieceTable, at: Address) -> bool {
    t.byte(at) == Some(b'\n') && (at == 0 || t.byte(at - 1) == Some(b'\n'))
}

fn word_forward(t: &PieceTable, at: Address, big: bool) -> Address {
    let mut c = ByteCursor::new(t, at);
    let Some(b) = c.peek() else {
        return at;
    };
    let class = class_of(b, big);
    if class != Class::Blank {
        while c.peek().is_some_and(|b| class_of(b, big) == class) {
            c.next_byte();
        }
    }
    while let Some(b) = c.peek() {
        if !b.is_ascii_whitespace() {
            break;
        }
        // Empty lines are words of their own.
        if b == b'\n' && c.pos() != at && c.peek_prev() == Some(b'\n') {
            break;
        }
        c.next_byte();
    }
    c.pos()
}

fn word_end(t: &PieceTable, at: Address, big: bool) -> Address {
    let mut c = ByteCursor::new(t, at);
    if c.next_byte().is_none() {
        return at;
    }
    while c.peek().is_some_and(|b| b.is_ascii_whitespace()) {
        c.next_byte();
    }
    let Some(b) = c.peek() else {
        return t.len().saturating_sub(1).max(at);
    };
    let class = class_of(b, big);
    loop {
        let here = c.pos();
        c.next_byte();
        match c.peek() {
            Some(next) if class_of(next, big) == class => {}
            _ => return here,
        }
    }
}

fn word_backward(t: &PieceTable, at: Address, big: bool) -> Address {
    let mut c = ByteCursor::new(t, at);
    let class = loop {
        match c.prev_byte() {
            None => return 0,
            Some(b'\n') if c.peek_prev().is_none_or(|p| p == b'\n') => {
                return c.pos();
            }
            Some(b) if b.is_ascii_whitespace() => {}
            Some(b) => break class_of(b, big),
        }
    };
    while c.peek_prev().is_some_and(|p| class_of(p, big) == class) {
        c.prev_byte();
    }
    c.pos()
}

fn is_closer(b: u8) -> bool {
    matches!(b, b')' | b']' | b'"' | b'\'')
}

/// The cursor sits on the first byte of a sentence: after `.`/`!`/`?`, any
/// closers and at least one whitespace byte; after an empty line; at the
/// start of the buffer. Empty lines are sentences of their own.
fn at_sentence_start(c: &ByteCursor<'_>) -> bool {
    let Some(b) = c.peek() else {
        return false;
    };
    if b == b'\n' {
        return c.peek_prev().is_none_or(|p| p == b'\n');
    }
    if b.is_ascii_whitespace() {
        return false;
    }
    let mut back = c.clone();
    let mut spaced = false;
    loop {
        match back.prev_byte() {
            None => return true,
            Some(b'\n') if back.peek_prev().is_none_or(|p| p == b'\n') => return true,
            Some(p) if p.is_ascii_whitespace() => spaced = true,
            Some(mut p) => {
                if !spaced {
                    return false;
                }
                while is_closer(p) {
                    match back.prev_byte() {
                        Some(q) => p = q,
                        None => return false,
                    }
                }
                return matches!(p, b'.' | b'!' | b'?');
            }
        }
    }
}

fn sentence_forward(t: &PieceTable, at: Address) -> Address {
    let mut c = ByteCursor::new(t, at);
    if c.next_byte().is_none() {
        return at;
    }
    while !c.at_end() && !at_sentence_start(&c) {
        c.next_byte();
    }
    c.pos()
}

fn sentence_backward(t: &PieceTable, at: Address) -> Address {
    let mut c = ByteCursor::new(t, at);
    if c.prev_byte().is_none() {
        return 0;
    }
    while c.pos() > 0 && !at_sentence_start(&c) {
        c.prev_byte();
    }
    c.pos()
}

fn paragraph_forward(t: &PieceTable, at: Address) -> Address {
    let mut line = line_start(t, at);
    while is_empty_line(t, line) {
        match next_line_start(t, line) {
            Some(next) => line = next,
            None => return t.len(),
        }
    }
    loop {
        match next_line_start(t, line) {
            Some(next) if next < t.len() => {
                line = next;
                if is_empty_line(t, line) {
                    return line;
                }
            }
            _ => return t.len(),
        }
    }
}

fn paragraph_backward(t: &PieceTable, at: Address) -> Address {
    let mut line = line_start(t, at);
    while is_empty_line(t, line) {
        match prev_line_start(t, line) {
            Some(prev) => line = prev,
            None => return 0,
        }
    }
    loop {
        match prev_line_start(t, line) {
            Some(prev) => {
                line = prev;
                if is_empty_line(t, line) {
                    return line;
                }
            }
            None => return 0,
        }
    }
}

fn is_section_start(t: &PieceTable, line: Address) -> bool {
    matches!(t.byte(line), Some(b'{') | Some(b'\x0c'))
}

fn section_forward(t: &PieceTable, at: Address) -> Address {
    let mut line = line_start(t, at);
    loop {
        match next_line_start(t, line) {
            Some(next) if next < t.len() => {
                line = next;
                if is_section_start(t, line) {
                    return line;
                }
            }
            _ => return t.len(),
        }
    }
}

fn section_backward(t: &PieceTable, at: Address) -> Address {
    let mut line = line_start(t, at);
    loop {
        match prev_line_start(t, line) {
            Some(prev) => {
                line = prev;
                if is_section_start(t, line) {
                    return line;
                }
            }
            None => return 0,
        }
    }
}

/// Address of the `n`-th `target` after `at` on the same line.
fn find_forward(t: &PieceTable, at: Address, target: u8, n: usize) -> Option<Address> {
    let mut c = ByteCursor::new(t, at);
    c.next_byte()?;
    let mut left = n;
    while let Some(b) = c.peek() {
        if b == b'\n' {
            return None;
        }
        if b == target {
            left -= 1;
            if left == 0 {
                return Some(c.pos());
            }
        }
        c.next_byte();
    }
    None
}

/// Address of the `n`-th `target` before `at` on the same line.
fn find_backward(t: &PieceTable, at: Address, target: u8, n: usize) -> Option<Address> {
    let mut c = ByteCursor::new(t, at);
    let mut left = n;
    while let Some(b) = c.prev_byte() {
        if b == b'\n' {
            return None;
        }
        if b == target {
            left -= 1;
            if left == 0 {
                return Some(c.pos());
            }
        }
    }
    None
}

fn view_line(t: &PieceTable, view_start: Address, rows: usize, motion: Motion) -> Address {
    let top = line_index(t, line_start(t, view_start));
    let total = line_count(t);
    let visible = rows.max(1).min(total.saturating_sub(top).max(1));
    let offset = motion.count.saturating_sub(1).min(visible - 1);
    let line = match motion.kind {
        MotionKind::ViewTop => top + offset,
        MotionKind::ViewBottom => top + visible - 1 - offset,
        _ => top + (visible - 1) / 2,
    };
    first_non_blank(t, line_to_address(t, line))
}
