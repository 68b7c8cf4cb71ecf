use crate::{BufferError, STAGING_SIZE};
use core_io::{FileId, FileOps, OpenFlags, read_exact, write_all};
use core_text::alloc::{Charge, TrackedVec};
use core_text::{Address, Capacities, Original, PieceTable, SharedAllocator};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace, warn};

/// Per-editor knobs that shape buffer storage and I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Write-back staging area in bytes; 0 is treated as 1.
    pub staging_size: usize,
    pub capacities: Capacities,
    /// Try a mapped view of the file before falling back to a heap copy.
    pub use_mmap: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            staging_size: STAGING_SIZE,
            capacities: Capacities::default(),
            use_mmap: true,
        }
    }
}

#[derive(Debug)]
struct OwnedPath {
    path: PathBuf,
    _charge: Charge,
}

#[derive(Debug)]
pub struct Buffer {
    table: PieceTable,
    tuning: Tuning,
    path: Option<OwnedPath>,
    file: Option<FileId>,
    cursor: Address,
    view_start: Address,
    view_xscroll: usize,
}

impl Buffer {
    pub fn new(alloc: &SharedAllocator, tuning: Tuning) -> Self {
        Self {
            table: PieceTable::new(alloc, tuning.capacities),
            tuning,
            path: None,
            file: None,
            cursor: 0,
            view_start: 0,
            view_xscroll: 0,
        }
    }

    pub fn table(&self) -> &PieceTable {
        &self.table
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref().map(|p| p.path.as_path())
    }

    /// Whether a file handle is held.
    pub fn is_attached(&self) -> bool {
        self.file.is_some()
    }

    pub fn is_mapped(&self) -> bool {
        self.table.original().is_mapped()
    }

    pub fn size(&self) -> usize {
        self.table.len()
    }

    pub fn cursor(&self) -> Address {
        self.cursor
    }

    /// Move the cursor, clamped to `0..=size()`.
    pub fn set_cursor(&mut self, at: Address) {
        self.cursor = at.min(self.size());
    }

    pub fn view_start(&self) -> Address {
        self.view_start
    }

    pub fn set_view_start(&mut self, at: Address) {
        self.view_start = at.min(self.size());
    }

    pub fn view_xscroll(&self) -> usize {
        self.view_xscroll
    }

    pub fn set_view_xscroll(&mut self, columns: usize) {
        self.view_xscroll = columns;
    }

    /// Release content, scratch, spans, path and file handle. The cursor and
    /// view go back to the origin.
    pub fn reset(&mut self, files: &mut dyn FileOps) {
        let mapped = self.is_mapped();
        // Drop the view before telling the collaborator it is gone.
        self.table.clear();
        if let Some(id) = self.file.take() {
            if mapped {
                files.unmap(id);
            }
            files.close(id);
        }
        self.path = None;
        self.cursor = 0;
        self.view_start = 0;
        self.view_xscroll = 0;
        trace!(target: "state.buffer", "reset");
    }

    /// Load `path` as the whole content. The file is created when absent.
    /// On failure the buffer is left reset.
    pub fn read(&mut self, files: &mut dyn FileOps, path: &Path) -> Result<(), BufferError> {
        self.reset(files);
        match self.load(files, path) {
            Ok(()) => {
                debug!(target: "io", path = %path.display(), size = self.size(), mapped = self.is_mapped(), "read");
                Ok(())
            }
            Err(err) => {
                error!(target: "io", path = %path.display(), %err, "read_failed");
                self.reset(files);
                Err(err)
            }
        }
    }

    fn load(&mut self, files: &mut dyn FileOps, path: &Path) -> Result<(), BufferError> {
        let id = files.open(path, OpenFlags::READ_ONLY | OpenFlags::CREATE)?;
        self.file = Some(id);
        let charge = Charge::new(self.table.allocator(), path.as_os_str().len())?;
        self.path = Some(OwnedPath {
            path: path.to_path_buf(),
            _charge: charge,
        });

        let size = files.size(id)?;
        let len = usize::try_from(size).map_err(|_| BufferError::TooLarge(size))?;
        if len == 0 {
            return Ok(());
        }

        let view = if self.tuning.use_mmap {
            match files.map(id) {
                Ok(view) if view.bytes().len() == len => Some(view),
                Ok(_) => {
                    warn!(target: "io", "map_size_mismatch");
                    files.unmap(id);
                    None
                }
                Err(err) => {
                    debug!(target: "io", %err, "map_fallback");
                    None
                }
            }
        } else {
            None
        };
        let original = match view {
            Some(view) => Original::Mapped(view),
            None => {
                let mut heap = TrackedVec::zeroed(self.table.allocator(), len)?;
                read_exact(files, id, heap.as_mut_slice())?;
                Original::Heap(heap)
            }
        };
        let mapped = original.is_mapped();
        // A failed load drops the view, so the mapping goes with it.
        if let Err(err) = self.table.load(original) {
            if mapped {
                files.unmap(id);
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Write the content to `path`, or to the buffer's own path. Returns the
    /// number of bytes written. The stored path is left alone.
    pub fn write(&mut self, files: &mut dyn FileOps, path: Option<&Path>) -> Result<usize, BufferError> {
        let target = match path.or_else(|| self.path()) {
            Some(p) => p.to_path_buf(),
            None => return Err(BufferError::NoDestination),
        };
        // Truncating the file under its own mapped view would pull the
        // original bytes out from under the spans.
        if self.is_mapped() && self.path() == Some(target.as_path()) {
            self.detach_mapping(files)?;
        }
        let id = files.open(
            &target,
            OpenFlags::WRITE_ONLY | OpenFlags::CREATE | OpenFlags::TRUNCATE,
        )?;
        let result = self.stream_to(files, id);
        files.close(id);
        match &result {
            Ok(bytes) => debug!(target: "io", path = %target.display(), bytes, "write"),
            Err(err) => error!(target: "io", path = %target.display(), %err, "write_failed"),
        }
        result
    }

    fn stream_to(&self, files: &mut dyn FileOps, id: FileId) -> Result<usize, BufferError> {
        let capacity = self.tuning.staging_size.max(1);
        let mut staging = TrackedVec::zeroed(self.table.allocator(), capacity)?;
        let stage = staging.as_mut_slice();
        let mut filled = 0;
        let mut written = 0;
        for span in self.table.spans() {
            let mut bytes = self.table.text(span);
            while !bytes.is_empty() {
                let n = (capacity - filled).min(bytes.len());
                stage[filled..filled + n].copy_from_slice(&bytes[..n]);
                filled += n;
                bytes = &bytes[n..];
                if filled == capacity {
                    write_all(files, id, stage)?;
                    written += filled;
                    filled = 0;
                }
            }
        }
        if filled > 0 {
            write_all(files, id, &stage[..filled])?;
            written += filled;
        }
        Ok(written)
    }

    /// Replace a mapped original with a heap copy of the same bytes.
    fn detach_mapping(&mut self, files: &mut dyn FileOps) -> Result<(), BufferError> {
        let bytes = self.table.original().bytes();
        let mut heap = TrackedVec::new(self.table.allocator(), bytes.len());
        heap.extend_from(bytes)?;
        let view = self.table.replace_original(Original::Heap(heap))?;
        drop(view);
        if let Some(id) = self.file {
            files.unmap(id);
        }
        debug!(target: "io", bytes = self.table.original().len(), "detach_mapping");
        Ok(())
    }

    /// Insert `bytes` at `at` (`at == size()` appends).
    pub fn insert_at(&mut self, at: Address, bytes: &[u8]) -> Result<(), BufferError> {
        self.table.insert(at, bytes)?;
        Ok(())
    }

    /// Remove `range` (clamped) and pull the cursor back inside the content.
    pub fn delete_range(&mut self, range: Range<Address>) -> Result<(), BufferError> {
        self.table.remove_range(range)?;
        self.cursor = self.cursor.min(self.size());
        self.view_start = self.view_start.min(self.size());
        Ok(())
    }

    /// Merge contiguous spans.
    pub fn coalesce(&mut self) {
        self.table.coalesce();
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.table.to_vec()
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_vec()).into_owned()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if self.file.is_some() {
            warn!(target: "state.buffer", path = ?self.path(), "dropped_while_attached");
        }
    }
}
