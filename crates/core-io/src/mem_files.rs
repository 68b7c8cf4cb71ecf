//! In-memory file collaborator.
//!
//! Files live in a path-keyed map owned by the adapter. Useful for embeddings
//! without a host filesystem and for exercising buffer I/O deterministically:
//! writes can be capped per call to force partial-write handling, and mapping
//! can be switched off to force the heap-read fallback.

use crate::{FileError, FileId, FileOps, OpenFlags, SeekOrigin};
use core_text::Mapping;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct OpenFile {
    path: PathBuf,
    pos: u64,
    flags: OpenFlags,
}

/// Snapshot view handed out by `map`; later writes to the file do not show
/// through it.
struct Snapshot(Arc<[u8]>);

impl Mapping for Snapshot {
    fn bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct MemFiles {
    files: HashMap<PathBuf, Vec<u8>>,
    open: SlotMap<FileId, OpenFile>,
    no_map: bool,
    write_limit: Option<usize>,
    write_calls: usize,
    maps: usize,
}

impl MemFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_mapping(mut self) -> Self {
        self.no_map = true;
        self
    }

    /// Cap every `write` call at `limit` bytes.
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    pub fn contents(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    /// Number of handles currently open.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Number of mappings handed out and not yet unmapped.
    pub fn live_maps(&self) -> usize {
        self.maps
    }

    fn handle(&self, id: FileId) -> Result<&OpenFile, FileError> {
        self.open.get(id).ok_or(FileError::BadHandle)
    }
}

impl FileOps for MemFiles {
    fn open(&mut self, path: &Path, flags: OpenFlags) -> Result<FileId, FileError> {
        if !self.files.contains_key(path) {
            if !flags.contains(OpenFlags::CREATE) {
                return Err(FileError::NotFound(path.to_path_buf()));
            }
            self.files.insert(path.to_path_buf(), Vec::new());
        }
        if flags.contains(OpenFlags::TRUNCATE) && flags.writable() {
            if let Some(data) = self.files.get_mut(path) {
                data.clear();
            }
        }
        let id = self.open.insert(OpenFile {
            path: path.to_path_buf(),
            pos: 0,
            flags,
        });
        debug!(target: "io", path = %path.display(), ?flags, "mem_open");
        Ok(id)
    }

    fn close(&mut self, file: FileId) {
        if self.open.remove(file).is_none() {
            warn!(target: "io", "close_unknown_handle");
        }
    }

    fn size(&mut self, file: FileId) -> Result<u64, FileError> {
        let path = &self.handle(file)?.path;
        let len = self.files.get(path).map_or(0, Vec::len);
        Ok(len as u64)
    }

    fn map(&mut self, file: FileId) -> Result<Box<dyn Mapping>, FileError> {
        if self.no_map {
            return Err(FileError::Unsupported("map"));
        }
        let path = &self.handle(file)?.path;
        let data = self.files.get(path).ok_or(FileError::BadHandle)?;
        let view: Arc<[u8]> = Arc::from(data.as_slice());
        self.maps += 1;
        Ok(Box::new(Snapshot(view)))
    }

    fn unmap(&mut self, _file: FileId) {
        self.maps = self.maps.saturating_sub(1);
    }

    fn read(&mut self, file: FileId, buf: &mut [u8]) -> Result<usize, FileError> {
        let handle = self.open.get_mut(file).ok_or(FileError::BadHandle)?;
        if !handle.flags.readable() && handle.flags.writable() {
            return Err(FileError::Mode("reading"));
        }
        let data = self.files.get(&handle.path).ok_or(FileError::BadHandle)?;
        let start = usize::try_from(handle.pos).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        handle.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, file: FileId, buf: &[u8]) -> Result<usize, FileError> {
        let handle = self.open.get_mut(file).ok_or(FileError::BadHandle)?;
        if !handle.flags.writable() {
            return Err(FileError::Mode("writing"));
        }
        let data = self.files.get_mut(&handle.path).ok_or(FileError::BadHandle)?;
        let n = self.write_limit.map_or(buf.len(), |limit| buf.len().min(limit));
        let start = usize::try_from(handle.pos).unwrap_or(usize::MAX);
        if data.len() < start {
            data.resize(start, 0);
        }
        let overlap = (data.len() - start).min(n);
        data[start..start + overlap].copy_from_slice(&buf[..overlap]);
        data.extend_from_slice(&buf[overlap..n]);
        handle.pos += n as u64;
        self.write_calls += 1;
        Ok(n)
    }

    fn seek(&mut self, file: FileId, origin: SeekOrigin) -> Result<u64, FileError> {
        let handle = self.open.get_mut(file).ok_or(FileError::BadHandle)?;
        let len = self.files.get(&handle.path).map_or(0, Vec::len);
        let offset = |base: i64, n: i64| base.checked_add(n).ok_or(FileError::InvalidSeek);
        let target = match origin {
            SeekOrigin::Set(n) => i64::try_from(n).map_err(|_| FileError::InvalidSeek)?,
            SeekOrigin::Cur(n) => {
                offset(i64::try_from(handle.pos).map_err(|_| FileError::InvalidSeek)?, n)?
            }
            SeekOrigin::End(n) => offset(i64::try_from(len).map_err(|_| FileError::InvalidSeek)?, n)?,
        };
        handle.pos = u64::try_from(target).map_err(|_| FileError::InvalidSeek)?;
        Ok(handle.pos)
    }
}
