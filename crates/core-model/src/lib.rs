//! The editor instance: one per embedding.
//!
//! [`Editor`] owns the buffer ring together with the collaborators the core
//! runs on: an allocator, a file-operations table and, optionally, a
//! terminal. Every public editing entry point lives here and acts on the
//! current buffer; the crates below it never see more than one buffer or
//! collaborator at a time.
//!
//! Invariants after every public call:
//! * An open insert session always belongs to the current buffer. Switching
//!   buffers closes it first; deleting its buffer drops it.
//! * Buffers are only attached to files opened through the current file
//!   collaborator, so it cannot be swapped while any buffer is attached.
//!
//! Failures come back as [`EditorError`] and, for operations a user would
//! notice (file reads and writes, buffer creation), are also reported as a
//! formatted message on the terminal's status line. No structured code
//! crosses that boundary.

pub mod render;

use core_actions::{EditError, InsertAnchor, Inserter, Motion, Yank};
use core_io::FileOps;
use core_state::{Buffer, BufferError, BufferId, BufferRing, Tuning};
use core_terminal::Terminal;
use core_text::{Address, Located, SharedAllocator};
use std::fmt;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// View height used when neither a row count nor a terminal is set.
pub const DEFAULT_ROWS: usize = 24;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("no buffer")]
    NoBuffer,
    #[error("files are still open through the current collaborator")]
    FilesInUse,
    #[error("no terminal")]
    NoTerminal,
    #[error("terminal: {0:#}")]
    Terminal(anyhow::Error),
}

pub struct Editor {
    alloc: SharedAllocator,
    files: Box<dyn FileOps>,
    terminal: Option<Box<dyn Terminal>>,
    ring: BufferRing,
    inserter: Inserter,
    rows: usize,
    scroll_margin: usize,
    status: Option<String>,
}

impl Editor {
    pub fn new(alloc: SharedAllocator, files: Box<dyn FileOps>) -> Self {
        Self::with_tuning(alloc, files, Tuning::default())
    }

    pub fn with_tuning(alloc: SharedAllocator, files: Box<dyn FileOps>, tuning: Tuning) -> Self {
        let ring = BufferRing::new(&alloc, tuning);
        debug!(target: "editor", ?tuning, "create");
        Self {
            alloc,
            files,
            terminal: None,
            ring,
            inserter: Inserter::new(),
            rows: 0,
            scroll_margin: 0,
            status: None,
        }
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    pub fn tuning(&self) -> Tuning {
        self.ring.tuning()
    }

    /// Applies to buffers created afterwards.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.ring.set_tuning(tuning);
    }

    /// Swap the file collaborator, returning the previous one. Refused while
    /// any buffer holds a file opened through the current one.
    pub fn set_files(&mut self, files: Box<dyn FileOps>) -> Result<Box<dyn FileOps>, EditorError> {
        if self.ring.iter().any(|(_, b)| b.is_attached()) {
            return Err(EditorError::FilesInUse);
        }
        Ok(std::mem::replace(&mut self.files, files))
    }

    /// Install a terminal, returning the previous one.
    pub fn set_terminal(&mut self, terminal: Box<dyn Terminal>) -> Option<Box<dyn Terminal>> {
        self.terminal.replace(terminal)
    }

    pub fn take_terminal(&mut self) -> Option<Box<dyn Terminal>> {
        self.terminal.take()
    }

    /// Forward a display size change to the terminal.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if let Some(term) = self.terminal.as_mut() {
            term.resize(cols, rows);
            debug!(target: "editor", cols, rows, "resize");
        }
    }

    /// Fixed view height; 0 follows the terminal (minus its status line).
    pub fn set_view_rows(&mut self, rows: usize) {
        self.rows = rows;
    }

    pub fn set_scroll_margin(&mut self, margin: usize) {
        self.scroll_margin = margin;
    }

    /// Text rows in the view, used by `H`/`M`/`L` and rendering.
    pub fn view_rows(&self) -> usize {
        if self.rows > 0 {
            return self.rows;
        }
        match &self.terminal {
            Some(term) => usize::from(term.size().1.saturating_sub(1)).max(1),
            None => DEFAULT_ROWS,
        }
    }

    /// Show `msg` on the status line. Delivery is one-way: a terminal that
    /// fails to show it only gets a log entry.
    pub fn report(&mut self, msg: impl fmt::Display) {
        let text = msg.to_string();
        info!(target: "editor", status = %text, "report");
        if let Some(term) = self.terminal.as_mut() {
            if let Err(e) = term.show_status(&text).and_then(|_| term.flush()) {
                warn!(target: "editor", error = %e, "status not shown");
            }
        }
        self.status = Some(text);
    }

    /// Last reported message.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn reported<T>(&mut self, what: &str, result: Result<T, EditorError>) -> Result<T, EditorError> {
        if let Err(e) = &result {
            self.report(format_args!("{what}: {e}"));
        }
        result
    }

    // Buffers

    /// Create a buffer, reading `path` into it when given. The first buffer
    /// becomes current.
    pub fn new_buf(&mut self, path: Option<&Path>) -> Result<BufferId, EditorError> {
        let result = self.ring.new_buf(self.files.as_mut(), path).map_err(EditorError::from);
        let what = path.map_or_else(|| "new buffer".to_owned(), |p| p.display().to_string());
        self.reported(&what, result)
    }

    pub fn delete_buf(&mut self, id: BufferId) -> Result<(), EditorError> {
        if self.ring.current() == Some(id) && self.inserter.is_active() {
            self.inserter = Inserter::new();
        }
        self.ring.delete_buf(self.files.as_mut(), id)?;
        Ok(())
    }

    pub fn buf_count(&self) -> usize {
        self.ring.count()
    }

    /// Buffer ids in ring order, starting at the current one.
    pub fn buffers(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.ring.iter().map(|(id, _)| id)
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.ring.get(id)
    }

    pub fn current(&self) -> Option<BufferId> {
        self.ring.current()
    }

    pub fn current_buffer(&self) -> Option<&Buffer> {
        self.ring.current_buffer()
    }

    pub fn set_current(&mut self, id: BufferId) -> Result<(), EditorError> {
        if !self.ring.contains(id) {
            return Err(BufferError::NotMember.into());
        }
        self.finish_insert()?;
        self.ring.set_current(id)?;
        Ok(())
    }

    /// Make the successor of the current buffer current.
    pub fn next_buf(&mut self) -> Result<Option<BufferId>, EditorError> {
        self.step_buf(BufferRing::next)
    }

    /// Make the predecessor of the current buffer current.
    pub fn prev_buf(&mut self) -> Result<Option<BufferId>, EditorError> {
        self.step_buf(BufferRing::prev)
    }

    fn step_buf(&mut self, step: fn(&BufferRing, BufferId) -> Option<BufferId>) -> Result<Option<BufferId>, EditorError> {
        let Some(target) = self.ring.current().and_then(|id| step(&self.ring, id)) else {
            return Ok(None);
        };
        self.set_current(target)?;
        Ok(Some(target))
    }

    fn buffer_mut(&mut self) -> Result<&mut Buffer, EditorError> {
        self.ring.current_buffer_mut().ok_or(EditorError::NoBuffer)
    }

    /// The current buffer, unless an insert session owns its cursor.
    fn idle_buffer_mut(&mut self) -> Result<&mut Buffer, EditorError> {
        if self.inserter.is_active() {
            return Err(EditError::SessionActive.into());
        }
        self.buffer_mut()
    }

    fn finish_insert(&mut self) -> Result<(), EditorError> {
        if self.inserter.is_active() {
            let buffer = self.ring.current_buffer_mut().ok_or(EditorError::NoBuffer)?;
            self.inserter.end(buffer)?;
        }
        Ok(())
    }

    // Files

    /// Replace the current buffer's content with the file at `path`.
    pub fn read(&mut self, path: &Path) -> Result<(), EditorError> {
        self.inserter = Inserter::new();
        let result = match self.ring.current_buffer_mut() {
            Some(buffer) => buffer.read(self.files.as_mut(), path).map_err(EditorError::from),
            None => Err(EditorError::NoBuffer),
        };
        self.reported(&path.display().to_string(), result)
    }

    /// Write the current buffer to `path`, or to the path it was read from.
    /// Returns the number of bytes written.
    pub fn write(&mut self, path: Option<&Path>) -> Result<usize, EditorError> {
        let result = match self.ring.current_buffer_mut() {
            Some(buffer) => {
                let target = path.or(buffer.path()).map(|p| p.display().to_string());
                buffer
                    .write(self.files.as_mut(), path)
                    .map(|n| (n, target))
                    .map_err(EditorError::from)
            }
            None => Err(EditorError::NoBuffer),
        };
        let (written, target) = self.reported("write", result)?;
        self.report(format_args!(
            "\"{}\" {written} bytes written",
            target.unwrap_or_default()
        ));
        Ok(written)
    }

    /// Size of the current buffer; 0 without one.
    pub fn size(&self) -> usize {
        self.ring.current_buffer().map_or(0, Buffer::size)
    }

    /// Span holding address `at` of the current buffer, with its bytes.
    pub fn locate(&self, at: Address) -> Option<(Located, &[u8])> {
        let t = self.ring.current_buffer()?.table();
        let located = t.find(at)?;
        Some((located, t.text(&t.spans()[located.index])))
    }

    // Editing

    pub fn ins_begin(&mut self, anchor: InsertAnchor) -> Result<Address, EditorError> {
        let rows = self.view_rows();
        let buffer = self.ring.current_buffer_mut().ok_or(EditorError::NoBuffer)?;
        Ok(self.inserter.begin(buffer, anchor, rows)?)
    }

    pub fn insert(&mut self, bytes: &[u8]) -> Result<(), EditorError> {
        let buffer = self.ring.current_buffer_mut().ok_or(EditorError::NoBuffer)?;
        Ok(self.inserter.insert(buffer, bytes)?)
    }

    /// Remove the last byte typed in the open session; false when there is
    /// nothing left to remove.
    pub fn backspace(&mut self) -> Result<bool, EditorError> {
        let buffer = self.ring.current_buffer_mut().ok_or(EditorError::NoBuffer)?;
        Ok(self.inserter.backspace(buffer)?)
    }

    pub fn ins_end(&mut self) -> Result<(), EditorError> {
        let buffer = self.ring.current_buffer_mut().ok_or(EditorError::NoBuffer)?;
        Ok(self.inserter.end(buffer)?)
    }

    pub fn in_insert(&self) -> bool {
        self.inserter.is_active()
    }

    /// Insert `bytes` at `at` outside any session.
    /// Insert outside any session. Refused while one is open.
    pub fn insert_at(&mut self, at: Address, bytes: &[u8]) -> Result<(), EditorError> {
        core_actions::insert(self.idle_buffer_mut()?, at, bytes)?;
        Ok(())
    }

    pub fn delete(&mut self, motion: Motion) -> Result<Option<Range<Address>>, EditorError> {
        let rows = self.view_rows();
        Ok(core_actions::delete(self.idle_buffer_mut()?, motion, rows)?)
    }

    pub fn yank(&self, motion: Motion) -> Result<Option<Yank<'_>>, EditorError> {
        let buffer = self.ring.current_buffer().ok_or(EditorError::NoBuffer)?;
        Ok(core_actions::yank(buffer, motion, self.view_rows()))
    }

    /// Place the cursor at `at`, clamped to the buffer's end. Refused inside
    /// an insert session.
    pub fn set_cursor(&mut self, at: Address) -> Result<Address, EditorError> {
        let buffer = self.idle_buffer_mut()?;
        let at = at.min(buffer.size());
        buffer.set_cursor(at);
        Ok(at)
    }

    pub fn move_cursor(&mut self, motion: Motion) -> Result<Address, EditorError> {
        let rows = self.view_rows();
        Ok(core_actions::move_cursor(self.idle_buffer_mut()?, motion, rows))
    }

    /// Scroll the view to the cursor and draw the current buffer.
    pub fn render(&mut self) -> Result<(), EditorError> {
        let rows = self.view_rows();
        let term = self.terminal.as_mut().ok_or(EditorError::NoTerminal)?;
        let cols = usize::from(term.size().0);
        if let Some(buffer) = self.ring.current_buffer_mut() {
            render::follow_cursor(buffer, rows, cols, self.scroll_margin);
        }
        render::draw(self.ring.current_buffer(), &mut **term, rows).map_err(EditorError::Terminal)
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.ring.clear(self.files.as_mut());
        debug!(target: "editor", "destroy");
    }
}
