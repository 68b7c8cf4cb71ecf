//! Edit operations: insert sessions, delete and yank by motion.
//!
//! An insert session brackets a run of typed text. `begin` fixes the
//! insertion point from an anchor; each `insert` appends to the buffer's
//! scratch and installs a span at the session point, which then advances.
//! `backspace` only removes text typed in the current session. `end`
//! coalesces the scratch spans the session produced and leaves the cursor on
//! the last inserted byte, as vi does when leaving Insert mode.
//!
//! A session belongs to the buffer it was started on; callers end it before
//! switching buffers.

use crate::motion::{Motion, Target, clamp_normal, resolve};
use crate::span_resolver::resolve_operator;
use core_state::{Buffer, BufferError};
use core_text::scan::{first_non_blank, line_start};
use core_text::{Address, Chunks};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error("no insert session")]
    NoSession,
    #[error("an insert session is already open")]
    SessionActive,
}

/// Where an insert session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAnchor {
    /// `i`
    Cursor,
    /// `a`
    AfterCursor,
    /// `A` is `$` then after, `I` is `^`; any motion target works.
    Motion(Motion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Session {
    start: Address,
    point: Address,
}

/// Insert-session state for one buffer at a time.
#[derive(Debug, Default)]
pub struct Inserter {
    session: Option<Session>,
}

impl Inserter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Insertion point of the open session.
    pub fn point(&self) -> Option<Address> {
        self.session.map(|s| s.point)
    }

    /// Open a session and move the cursor to its insertion point.
    pub fn begin(&mut self, buffer: &mut Buffer, anchor: InsertAnchor, rows: usize) -> Result<Address, EditError> {
        if self.session.is_some() {
            return Err(EditError::SessionActive);
        }
        let t = buffer.table();
        let cursor = buffer.cursor().min(t.len());
        let after = |at: Address| {
            if t.byte(at).is_some_and(|b| b != b'\n') {
                at + 1
            } else {
                at
            }
        };
        let point = match anchor {
            InsertAnchor::Cursor => cursor,
            InsertAnchor::AfterCursor => after(cursor),
            InsertAnchor::Motion(motion) => match resolve(buffer, motion, rows) {
                Some(Target::Point(p)) if motion.kind.is_inclusive() => after(p),
                Some(Target::Point(p)) => p,
                Some(Target::Range(r)) => r.start,
                None => cursor,
            },
        };
        buffer.set_cursor(point);
        self.session = Some(Session { start: point, point });
        debug!(target: "actions.edit", ?anchor, point, "ins_begin");
        Ok(point)
    }

    /// Insert `bytes` at the session point.
    pub fn insert(&mut self, buffer: &mut Buffer, bytes: &[u8]) -> Result<(), EditError> {
        let session = self.session.as_mut().ok_or(EditError::NoSession)?;
        buffer.insert_at(session.point, bytes)?;
        session.point += bytes.len();
        buffer.set_cursor(session.point);
        trace!(target: "actions.edit", len = bytes.len(), point = session.point, "insert");
        Ok(())
    }

    /// Remove the byte before the session point. Returns false at the start
    /// of the session.
    pub fn backspace(&mut self, buffer: &mut Buffer) -> Result<bool, EditError> {
        let session = self.session.as_mut().ok_or(EditError::NoSession)?;
        if session.point <= session.start {
            return Ok(false);
        }
        buffer.delete_range(session.point - 1..session.point)?;
        session.point -= 1;
        buffer.set_cursor(session.point);
        trace!(target: "actions.edit", point = session.point, "backspace");
        Ok(true)
    }

    /// Close the session.
    pub fn end(&mut self, buffer: &mut Buffer) -> Result<(), EditError> {
        let session = self.session.take().ok_or(EditError::NoSession)?;
        buffer.coalesce();
        let t = buffer.table();
        let point = session.point.min(t.len());
        let cursor = if point > line_start(t, point) { point - 1 } else { point };
        let cursor = clamp_normal(t, cursor);
        buffer.set_cursor(cursor);
        debug!(
            target: "actions.edit",
            inserted = session.point.saturating_sub(session.start),
            spans = buffer.table().span_count(),
            "ins_end"
        );
        Ok(())
    }
}

/// Insert `bytes` at `at` without a session.
pub fn insert(buffer: &mut Buffer, at: Address, bytes: &[u8]) -> Result<(), EditError> {
    buffer.insert_at(at, bytes)?;
    trace!(target: "actions.edit", at, len = bytes.len(), "insert_at");
    Ok(())
}

/// Move the cursor by `motion` (Normal-mode clamping). Returns the new
/// cursor; a failed motion leaves it in place.
pub fn move_cursor(buffer: &mut Buffer, motion: Motion, rows: usize) -> Address {
    let target = match resolve(buffer, motion, rows) {
        Some(Target::Point(p)) => p,
        Some(Target::Range(r)) => r.start,
        None => buffer.cursor(),
    };
    let cursor = clamp_normal(buffer.table(), target);
    buffer.set_cursor(cursor);
    cursor
}

/// Delete the text `motion` covers. Returns the removed range, if any. The
/// cursor lands on the start of the range (first non-blank for linewise
/// deletes).
pub fn delete(buffer: &mut Buffer, motion: Motion, rows: usize) -> Result<Option<Range<Address>>, EditError> {
    let Some(span) = resolve_operator(buffer, motion, rows) else {
        return Ok(None);
    };
    buffer.delete_range(span.range.clone())?;
    let t = buffer.table();
    let landing = if span.linewise {
        // Deleting the last lines leaves nothing at the range start; land
        // on the line above.
        let at = span.range.start.min(t.len());
        let at = if at == t.len() { at.saturating_sub(1) } else { at };
        first_non_blank(t, line_start(t, at))
    } else {
        span.range.start
    };
    let cursor = clamp_normal(t, landing);
    buffer.set_cursor(cursor);
    debug!(target: "actions.edit", ?motion, range = ?span.range, linewise = span.linewise, "delete");
    Ok(Some(span.range))
}

/// Text covered by `motion`, exposed span by span.
pub fn yank(buffer: &Buffer, motion: Motion, rows: usize) -> Option<Yank<'_>> {
    let span = resolve_operator(buffer, motion, rows)?;
    trace!(target: "actions.edit", ?motion, range = ?span.range, "yank");
    Some(Yank {
        chunks: buffer.table().chunks(span.range.clone()),
        range: span.range,
        linewise: span.linewise,
    })
}

/// Borrowed view of yanked text. Iterates the backing slices without
/// copying; `to_vec` collects them when a register needs an owned copy.
#[derive(Debug, Clone)]
pub struct Yank<'a> {
    chunks: Chunks<'a>,
    range: Range<Address>,
    linewise: bool,
}

impl<'a> Yank<'a> {
    pub fn range(&self) -> Range<Address> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_linewise(&self) -> bool {
        self.linewise
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in self.chunks.clone() {
            out.extend_from_slice(chunk);
        }
        out
    }
}

impl<'a> Iterator for Yank<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }
}
