//! Piece-table text storage.
//!
//! A buffer's content is the in-order concatenation of [`Span`]s over two byte
//! sources: the original content (a mapped view or heap copy of the file) and
//! an append-only edit scratch. Edits only touch the span list, so their cost
//! scales with the number of spans affected rather than the file size, and
//! large files are never copied wholesale.
//!
//! Memory growth is gated by an embedding-supplied [`alloc::Allocator`] so the
//! same code runs under a process allocator or a fixed budget.

pub mod alloc;
pub mod piece_table;
pub mod scan;
pub mod span;

/// Zero-based logical byte offset into a buffer's current content.
pub type Address = usize;

pub use alloc::{AllocError, Allocator, SharedAllocator};
pub use piece_table::{Capacities, Chunks, PieceTable, TableError};
pub use scan::{ByteCursor, Class};
pub use span::{Located, Mapping, Original, Source, Span};
