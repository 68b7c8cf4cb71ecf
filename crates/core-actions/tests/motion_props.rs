//! Property tests: motions and operators over arbitrary text and span layouts.

mod common;
use common::ROWS;

use core_actions::{Motion, MotionKind, Target, TextObject, delete, resolve, resolve_operator, yank};
use core_state::{Buffer, Tuning};
use core_text::alloc::system;
use proptest::prelude::*;

fn text() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            Just(b'a'),
            Just(b'z'),
            Just(b' '),
            Just(b'\n'),
            Just(b'.'),
            Just(b'('),
            Just(b')'),
            Just(b'"'),
            Just(b'{'),
            Just(b'\t'),
        ],
        0..80,
    )
}

fn kind() -> impl Strategy<Value = MotionKind> {
    prop_oneof![
        Just(MotionKind::Left),
        Just(MotionKind::Right),
        Just(MotionKind::Up),
        Just(MotionKind::Down),
        Just(MotionKind::WordForward),
        Just(MotionKind::WordEnd),
        Just(MotionKind::WordBackward),
        Just(MotionKind::BigWordForward),
        Just(MotionKind::BigWordEnd),
        Just(MotionKind::BigWordBackward),
        Just(MotionKind::LineStart),
        Just(MotionKind::FirstNonBlank),
        Just(MotionKind::LineEnd),
        Just(MotionKind::SentenceForward),
        Just(MotionKind::SentenceBackward),
        Just(MotionKind::ParagraphForward),
        Just(MotionKind::ParagraphBackward),
        Just(MotionKind::SectionForward),
        Just(MotionKind::SectionBackward),
        Just(MotionKind::FindForward(b'z')),
        Just(MotionKind::TillBackward(b'a')),
        Just(MotionKind::GotoLine),
        Just(MotionKind::Lines),
        Just(MotionKind::ViewTop),
        Just(MotionKind::ViewMiddle),
        Just(MotionKind::ViewBottom),
        Just(MotionKind::Inner(TextObject::Word)),
        Just(MotionKind::Outer(TextObject::BigWord)),
        Just(MotionKind::Inner(TextObject::Quote(b'"'))),
        Just(MotionKind::Outer(TextObject::Bracket { open: b'(', close: b')' })),
    ]
}

/// Build the buffer in uneven pieces so scans cross span boundaries.
fn buffer(text: &[u8], cut: usize, cursor: usize) -> Buffer {
    let mut buf = Buffer::new(&system(), Tuning::default());
    let cut = cut % (text.len() + 1);
    buf.insert_at(0, &text[cut..]).unwrap();
    buf.insert_at(0, &text[..cut]).unwrap();
    buf.set_cursor(cursor % (text.len() + 1));
    buf
}

proptest! {
    #[test]
    fn targets_stay_in_bounds(text in text(), cut in any::<usize>(), cursor in any::<usize>(),
                              kind in kind(), count in 0usize..4) {
        let buf = buffer(&text, cut, cursor);
        match resolve(&buf, Motion::with_count(kind, count), ROWS) {
            Some(Target::Point(at)) => prop_assert!(at <= text.len()),
            Some(Target::Range(r)) => prop_assert!(r.start <= r.end && r.end <= text.len()),
            None => {}
        }
        if let Some(span) = resolve_operator(&buf, Motion::with_count(kind, count), ROWS) {
            prop_assert!(span.range.start < span.range.end);
            prop_assert!(span.range.end <= text.len());
        }
    }

    #[test]
    fn delete_removes_exactly_the_yanked_bytes(text in text(), cut in any::<usize>(),
                                               cursor in any::<usize>(), kind in kind(),
                                               count in 0usize..4) {
        let mut buf = buffer(&text, cut, cursor);
        let motion = Motion::with_count(kind, count);
        let yanked = yank(&buf, motion, ROWS).map(|y| (y.range(), y.to_vec()));
        let removed = delete(&mut buf, motion, ROWS).unwrap();
        match (yanked, removed) {
            (Some((range, bytes)), Some(cut)) => {
                prop_assert_eq!(&range, &cut);
                let mut expect = text.clone();
                let gone: Vec<u8> = expect.drain(range).collect();
                prop_assert_eq!(gone, bytes);
                prop_assert_eq!(buf.to_vec(), expect);
            }
            (None, None) => prop_assert_eq!(buf.to_vec(), text),
            (y, d) => prop_assert!(false, "yank {:?} and delete {:?} disagree", y, d),
        }
        prop_assert!(buf.cursor() <= buf.size());
    }
}
