//! Operator span resolver.
//!
//! Turns a motion into the byte range an operator (delete, yank) acts on,
//! following vi's rules:
//! * Exclusive motions cover `[min(cursor, target), max(cursor, target))`.
//! * Inclusive motions (`e`, `E`, `f`, `t`, `$`) also take the target byte.
//! * Linewise motions (`j`, `k`, `_`, `G`, `H`, `M`, `L`) cover whole lines with
//!   their newline. On an unterminated last line the preceding newline is
//!   taken instead, so no empty line is left behind.
//! * `w`/`W` never carry an operator past the end of the cursor's line.
//! * Text objects are used as resolved.
//!
//! Like `motion::resolve`, this is read-only: nothing in the buffer moves.

use crate::motion::{Motion, MotionKind, Target, resolve};
use core_state::Buffer;
use core_text::Address;
use core_text::scan::{line_end, line_start, next_line_start};
use std::ops::Range;

/// Range an operator applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSpan {
    pub range: Range<Address>,
    pub linewise: bool,
}

/// `None` when the motion fails or selects nothing.
pub fn resolve_operator(buffer: &Buffer, motion: Motion, rows: usize) -> Option<OperatorSpan> {
    let t = buffer.table();
    let from = buffer.cursor().min(t.len());
    let to = match resolve(buffer, motion, rows)? {
        Target::Range(range) => {
            return (!range.is_empty()).then_some(OperatorSpan {
                range,
                linewise: false,
            });
        }
        Target::Point(to) => to,
    };
    let kind = motion.kind;

    if kind.is_linewise() {
        if matches!(kind, MotionKind::Up | MotionKind::Down)
            && line_start(t, to) == line_start(t, from)
        {
            return None;
        }
        let (first, last) = (from.min(to), from.max(to));
        let mut start = line_start(t, first);
        let end = match next_line_start(t, last) {
            Some(next) => next,
            None => {
                start = start.saturating_sub(1);
                t.len()
            }
        };
        return (start < end).then_some(OperatorSpan {
            range: start..end,
            linewise: true,
        });
    }

    let (start, mut end) = if to < from { (to, from) } else { (from, to) };
    if kind.is_inclusive() && to >= from {
        end = (to + 1).min(t.len());
    }
    if matches!(kind, MotionKind::WordForward | MotionKind::BigWordForward) {
        let eol = line_end(t, start);
        if end > eol && start < eol {
            end = eol;
        }
    }
    (start < end).then_some(OperatorSpan {
        range: start..end,
        linewise: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_object::TextObject;
    use core_state::Tuning;
    use core_text::alloc::system;

    fn buffer(text: &str, cursor: Address) -> Buffer {
        let mut buf = Buffer::new(&system(), Tuning::default());
        buf.insert_at(0, text.as_bytes()).unwrap();
        buf.set_cursor(cursor);
        buf
    }

    fn span(buf: &Buffer, kind: MotionKind, count: usize) -> Option<(Range<Address>, bool)> {
        resolve_operator(buf, Motion::with_count(kind, count), 24).map(|s| (s.range, s.linewise))
    }

    #[test]
    fn exclusive_motions_stop_short_of_target() {
        let buf = buffer("one two three", 4);
        assert_eq!(span(&buf, MotionKind::WordForward, 1), Some((4..8, false)));
        assert_eq!(span(&buf, MotionKind::WordBackward, 1), Some((0..4, false)));
        assert_eq!(span(&buf, MotionKind::Left, 2), Some((2..4, false)));
    }

    #[test]
    fn inclusive_motions_take_the_target() {
        let buf = buffer("one two three\nnext", 4);
        assert_eq!(span(&buf, MotionKind::WordEnd, 1), Some((4..7, false)));
        assert_eq!(span(&buf, MotionKind::FindForward(b'h'), 1), Some((4..10, false)));
        assert_eq!(span(&buf, MotionKind::TillForward(b'h'), 1), Some((4..9, false)));
        assert_eq!(span(&buf, MotionKind::LineEnd, 1), Some((4..13, false)));
    }

    #[test]
    fn dw_stays_on_the_line() {
        let buf = buffer("last   \nnext", 0);
        assert_eq!(span(&buf, MotionKind::WordForward, 1), Some((0..7, false)));
    }

    #[test]
    fn linewise_motions_cover_whole_lines() {
        let buf = buffer("a1\nb2\nc3\n", 4);
        assert_eq!(span(&buf, MotionKind::Down, 1), Some((3..9, true)));
        assert_eq!(span(&buf, MotionKind::Up, 1), Some((0..6, true)));
        assert_eq!(span(&buf, MotionKind::GotoLine, 0), Some((3..9, true)));
    }

    #[test]
    fn doubled_operator_takes_count_lines() {
        let buf = buffer("a1\nb2\nc3\n", 4);
        assert_eq!(span(&buf, MotionKind::Lines, 0), Some((3..6, true)));
        assert_eq!(span(&buf, MotionKind::Lines, 2), Some((3..9, true)));
        assert_eq!(span(&buf, MotionKind::Lines, 9), Some((3..9, true)));
    }

    #[test]
    fn linewise_on_unterminated_last_line_takes_previous_newline() {
        let buf = buffer("a1\nb2", 3);
        assert_eq!(span(&buf, MotionKind::Up, 1), Some((0..5, true)));
        assert_eq!(span(&buf, MotionKind::GotoLine, 2), Some((2..5, true)));
    }

    #[test]
    fn failed_motions_select_nothing() {
        let buf = buffer("abc\n", 0);
        assert_eq!(span(&buf, MotionKind::FindForward(b'z'), 1), None);
        assert_eq!(span(&buf, MotionKind::Down, 1), None);
        assert_eq!(span(&buf, MotionKind::LineStart, 1), None);
    }

    #[test]
    fn text_objects_pass_through() {
        let buf = buffer("x = (1, 2)", 5);
        let object = TextObject::Bracket { open: b'(', close: b')' };
        assert_eq!(span(&buf, MotionKind::Inner(object), 1), Some((5..9, false)));
        assert_eq!(span(&buf, MotionKind::Outer(object), 1), Some((4..10, false)));
    }
}
