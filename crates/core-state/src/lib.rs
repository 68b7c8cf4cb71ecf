//! Editor state: buffers and the buffer ring.
//!
//! A [`Buffer`] owns one piece table plus everything that ties it to a file:
//! the original content (mapped view or heap copy), an owned copy of its path
//! and the open file handle while attached. All host access goes through a
//! `core_io::FileOps` collaborator passed in per call; buffers never hold
//! one, so a single collaborator table can serve every buffer of an editor.
//!
//! Buffers live in a [`BufferRing`]: a circular list with one current member,
//! stored as an arena so handles stay valid while neighbours come and go.
//!
//! Resource accounting:
//! - The buffer record, the path copy, heap original content, scratch and span
//!   array are all charged against the editor's allocator.
//! - `reset` releases every charge and closes the handle but keeps the
//!   buffer's ring identity; `delete_buf` additionally frees the record.

mod buffer;
mod ring;

pub use buffer::{Buffer, Tuning};
pub use ring::{BufferId, BufferRing};

use core_io::FileError;
use core_text::{AllocError, TableError};
use thiserror::Error;

/// Default size of the write-back staging area.
pub const STAGING_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum BufferError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error("no file name")]
    NoDestination,
    #[error("buffer is not in the ring")]
    NotMember,
    #[error("file of {0} bytes does not fit in memory")]
    TooLarge(u64),
}
