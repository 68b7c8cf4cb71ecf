//! Hosted adapter: `std::fs` files with read-only memory mapping.

use crate::{FileError, FileId, FileOps, OpenFlags, SeekOrigin};
use core_text::Mapping;
use memmap2::Mmap;
use slotmap::SlotMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::Path;
use tracing::{debug, warn};

struct MmapView(Mmap);

impl Mapping for MmapView {
    fn bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug)]
pub struct StdFiles {
    open: SlotMap<FileId, File>,
    use_mmap: bool,
}

impl Default for StdFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl StdFiles {
    pub fn new() -> Self {
        Self {
            open: SlotMap::with_key(),
            use_mmap: true,
        }
    }

    /// Disable mapping; buffers then read original content into the heap.
    pub fn without_mmap(mut self) -> Self {
        self.use_mmap = false;
        self
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    fn file(&mut self, id: FileId) -> Result<&mut File, FileError> {
        self.open.get_mut(id).ok_or(FileError::BadHandle)
    }
}

impl FileOps for StdFiles {
    fn open(&mut self, path: &Path, flags: OpenFlags) -> Result<FileId, FileError> {
        let open_err = |source| FileError::Open {
            path: path.to_path_buf(),
            source,
        };
        // std refuses `create` without write access, so a read-only open with
        // CREATE materializes the empty file first.
        if flags.contains(OpenFlags::CREATE) && !flags.writable() && !path.exists() {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .read(flags.readable() || !flags.writable())
            .write(flags.writable())
            .create(flags.contains(OpenFlags::CREATE) && flags.writable())
            .truncate(flags.contains(OpenFlags::TRUNCATE) && flags.writable())
            .open(path)
            .map_err(open_err)?;
        let id = self.open.insert(file);
        debug!(target: "io", path = %path.display(), ?flags, "open");
        Ok(id)
    }

    fn close(&mut self, file: FileId) {
        if self.open.remove(file).is_none() {
            warn!(target: "io", "close_unknown_handle");
        }
    }

    fn size(&mut self, file: FileId) -> Result<u64, FileError> {
        Ok(self.file(file)?.metadata()?.len())
    }

    fn map(&mut self, file: FileId) -> Result<Box<dyn Mapping>, FileError> {
        if !self.use_mmap {
            return Err(FileError::Unsupported("map"));
        }
        let file = self.file(file)?;
        // SAFETY: the view is treated as immutable for the owning buffer's
        // lifetime; concurrent external modification of the file is outside
        // the editor's contract.
        let mmap = unsafe { Mmap::map(&*file)? };
        Ok(Box::new(MmapView(mmap)))
    }

    fn read(&mut self, file: FileId, buf: &mut [u8]) -> Result<usize, FileError> {
        Ok(self.file(file)?.read(buf)?)
    }

    fn write(&mut self, file: FileId, buf: &[u8]) -> Result<usize, FileError> {
        Ok(self.file(file)?.write(buf)?)
    }

    fn seek(&mut self, file: FileId, origin: SeekOrigin) -> Result<u64, FileError> {
        Ok(self.file(file)?.seek(origin.into())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{read_exact, write_all};

    #[test]
    fn create_read_only_materializes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let mut files = StdFiles::new();
        let id = files
            .open(&path, OpenFlags::READ_ONLY | OpenFlags::CREATE)
            .unwrap();
        assert_eq!(files.size(id).unwrap(), 0);
        files.close(id);
        assert!(path.exists());
        assert_eq!(files.open_count(), 0);
    }

    #[test]
    fn missing_file_without_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = StdFiles::new();
        let err = files
            .open(&dir.path().join("absent"), OpenFlags::READ_ONLY)
            .unwrap_err();
        assert!(matches!(err, FileError::Open { .. }));
    }

    #[test]
    fn write_then_map_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let mut files = StdFiles::new();
        let w = files
            .open(
                &path,
                OpenFlags::WRITE_ONLY | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            )
            .unwrap();
        write_all(&mut files, w, b"mapped bytes").unwrap();
        files.close(w);

        let r = files.open(&path, OpenFlags::READ_ONLY).unwrap();
        let view = files.map(r).unwrap();
        assert_eq!(view.bytes(), b"mapped bytes");
        let mut buf = [0u8; 6];
        files.seek(r, SeekOrigin::Set(7)).unwrap();
        read_exact(&mut files, r, &mut buf[..5]).unwrap();
        assert_eq!(&buf[..5], b"bytes");
        drop(view);
        files.unmap(r);
        files.close(r);
    }

    #[test]
    fn mapping_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        std::fs::write(&path, b"x").unwrap();
        let mut files = StdFiles::new().without_mmap();
        let id = files.open(&path, OpenFlags::READ_ONLY).unwrap();
        assert!(matches!(files.map(id), Err(FileError::Unsupported("map"))));
    }

    #[test]
    fn stale_handle_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        let mut files = StdFiles::new();
        let id = files
            .open(&path, OpenFlags::WRITE_ONLY | OpenFlags::CREATE)
            .unwrap();
        files.close(id);
        assert!(matches!(files.size(id), Err(FileError::BadHandle)));
    }
}
