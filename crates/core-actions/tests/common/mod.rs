#![allow(dead_code)] // Shared across integration tests; each binary uses a subset.

use core_actions::{InsertAnchor, Inserter, Motion, MotionKind, delete, move_cursor, yank};
use core_io::MemFiles;
use core_state::{Buffer, Tuning};
use core_text::Address;
use core_text::alloc::system;
use std::path::Path;

pub const ROWS: usize = 24;

/// One scripted editor action.
#[derive(Debug, Clone)]
pub enum Step<'a> {
    Move(MotionKind, usize),
    Delete(MotionKind, usize),
    Insert(InsertAnchor, &'a str),
    /// Expect the yank of a motion to equal the text.
    Yank(MotionKind, usize, &'a str),
}

/// Load `text` the way a file is loaded: one original span over a mapped view.
pub fn loaded(text: &str) -> (Buffer, MemFiles) {
    let mut files = MemFiles::new();
    files.insert("doc", text.as_bytes().to_vec());
    let mut buf = Buffer::new(&system(), Tuning::default());
    buf.read(&mut files, Path::new("doc")).unwrap();
    (buf, files)
}

pub fn run(buf: &mut Buffer, steps: &[Step<'_>]) {
    let mut ins = Inserter::new();
    for step in steps {
        match step {
            Step::Move(kind, count) => {
                move_cursor(buf, Motion::with_count(*kind, *count), ROWS);
            }
            Step::Delete(kind, count) => {
                delete(buf, Motion::with_count(*kind, *count), ROWS).unwrap();
            }
            Step::Insert(anchor, text) => {
                ins.begin(buf, *anchor, ROWS).unwrap();
                for line in text.split_inclusive('\n') {
                    ins.insert(buf, line.as_bytes()).unwrap();
                }
                ins.end(buf).unwrap();
            }
            Step::Yank(kind, count, expect) => {
                let got = yank(buf, Motion::with_count(*kind, *count), ROWS)
                    .map(|y| String::from_utf8_lossy(&y.to_vec()).into_owned())
                    .unwrap_or_default();
                assert_eq!(got, *expect, "yank {kind:?}");
            }
        }
    }
}

/// Run `steps` on `initial` with the cursor at `cursor`; returns the final
/// text and cursor.
pub fn scenario(initial: &str, cursor: Address, steps: &[Step<'_>]) -> (String, Address) {
    let (mut buf, mut files) = loaded(initial);
    buf.set_cursor(cursor);
    run(&mut buf, steps);
    let out = (buf.text_lossy(), buf.cursor());
    buf.reset(&mut files);
    out
}
