//! File collaborator interface.
//!
//! The core never touches host file APIs. Buffers talk to a [`FileOps`]
//! implementation supplied by the embedding: `StdFiles` for hosted builds
//! (std::fs plus memory mapping), `MemFiles` for freestanding-style or test
//! embeddings that keep files in memory.
//!
//! Handles are opaque [`FileId`] keys; the adapter owns the open-file table.
//! Every failure is a returned [`FileError`], never a panic.

use bitflags::bitflags;
use core_text::Mapping;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod mem_files;
mod std_files;

pub use mem_files::MemFiles;
pub use std_files::StdFiles;

slotmap::new_key_type! {
    /// Opaque handle to a file opened through a [`FileOps`] adapter.
    pub struct FileId;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const READ_ONLY = 1 << 0;
        const WRITE_ONLY = 1 << 1;
        const READ_WRITE = 1 << 2;
        /// Create the file when absent.
        const CREATE = 1 << 3;
        /// Discard existing content on open (write modes only).
        const TRUNCATE = 1 << 4;
    }
}

impl OpenFlags {
    pub fn readable(self) -> bool {
        self.intersects(Self::READ_ONLY | Self::READ_WRITE)
    }

    pub fn writable(self) -> bool {
        self.intersects(Self::WRITE_ONLY | Self::READ_WRITE)
    }
}

/// Seek origin with its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Set(u64),
    Cur(i64),
    End(i64),
}

impl From<SeekOrigin> for std::io::SeekFrom {
    fn from(origin: SeekOrigin) -> Self {
        match origin {
            SeekOrigin::Set(n) => std::io::SeekFrom::Start(n),
            SeekOrigin::Cur(n) => std::io::SeekFrom::Current(n),
            SeekOrigin::End(n) => std::io::SeekFrom::End(n),
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no such file: {}", .0.display())]
    NotFound(PathBuf),
    #[error("stale file handle")]
    BadHandle,
    #[error("file not opened for {0}")]
    Mode(&'static str),
    #[error("seek before start of file")]
    InvalidSeek,
    #[error("{0} is not supported by this file collaborator")]
    Unsupported(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pluggable file access.
///
/// `map` is an optional capability: the default reports it unsupported and
/// callers fall back to `read`.
pub trait FileOps {
    fn open(&mut self, path: &Path, flags: OpenFlags) -> Result<FileId, FileError>;
    fn close(&mut self, file: FileId);
    fn size(&mut self, file: FileId) -> Result<u64, FileError>;
    fn map(&mut self, _file: FileId) -> Result<Box<dyn Mapping>, FileError> {
        Err(FileError::Unsupported("map"))
    }
    fn unmap(&mut self, _file: FileId) {}
    fn read(&mut self, file: FileId, buf: &mut [u8]) -> Result<usize, FileError>;
    fn write(&mut self, file: FileId, buf: &[u8]) -> Result<usize, FileError>;
    fn seek(&mut self, file: FileId, origin: SeekOrigin) -> Result<u64, FileError>;
}

/// Write all of `buf`, retrying partial writes. A zero-length write with
/// bytes outstanding is reported as `WriteZero`.
pub fn write_all(files: &mut dyn FileOps, file: FileId, mut buf: &[u8]) -> Result<(), FileError> {
    while !buf.is_empty() {
        let n = files.write(file, buf)?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
        }
        buf = &buf[n..];
    }
    Ok(())
}

/// Fill `buf` completely. Reaching end of file early is `UnexpectedEof`.
pub fn read_exact(files: &mut dyn FileOps, file: FileId, mut buf: &mut [u8]) -> Result<(), FileError> {
    while !buf.is_empty() {
        let n = files.read(file, buf)?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        let rest = buf;
        buf = &mut rest[n..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_modes() {
        assert!(OpenFlags::READ_ONLY.readable());
        assert!(!OpenFlags::READ_ONLY.writable());
        assert!((OpenFlags::WRITE_ONLY | OpenFlags::CREATE).writable());
        assert!(OpenFlags::READ_WRITE.readable() && OpenFlags::READ_WRITE.writable());
    }

    #[test]
    fn write_all_retries_partial_writes() {
        let mut files = MemFiles::new().with_write_limit(3);
        let id = files
            .open(Path::new("a"), OpenFlags::WRITE_ONLY | OpenFlags::CREATE)
            .unwrap();
        write_all(&mut files, id, b"0123456789").unwrap();
        files.close(id);
        assert_eq!(files.contents(Path::new("a")), Some(&b"0123456789"[..]));
        assert_eq!(files.write_calls(), 4);
    }

    #[test]
    fn read_exact_reports_short_file() {
        let mut files = MemFiles::new();
        files.insert("short", b"abc".to_vec());
        let id = files.open(Path::new("short"), OpenFlags::READ_ONLY).unwrap();
        let mut buf = [0u8; 5];
        let err = read_exact(&mut files, id, &mut buf).unwrap_err();
        assert!(matches!(err, FileError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
    }
}
