//! Span descriptors and the two byte sources they reference.

use crate::Address;
use crate::alloc::TrackedVec;
use std::fmt;
use std::ops::Range;

/// Which backing store a span reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Content as loaded from the file (mapped view or heap copy).
    Original,
    /// Append-only edit scratch.
    Scratch,
}

/// A contiguous run of bytes in one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub source: Source,
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(source: Source, offset: usize, len: usize) -> Self {
        Self {
            source,
            offset,
            len,
        }
    }

    pub fn original(range: Range<usize>) -> Self {
        Self::new(Source::Original, range.start, range.end - range.start)
    }

    pub fn scratch(range: Range<usize>) -> Self {
        Self::new(Source::Scratch, range.start, range.end - range.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset one past the last byte in the source.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The first `n` bytes (clamped).
    pub fn head(&self, n: usize) -> Self {
        Self::new(self.source, self.offset, n.min(self.len))
    }

    /// Everything after the first `n` bytes (clamped).
    pub fn tail(&self, n: usize) -> Self {
        let n = n.min(self.len);
        Self::new(self.source, self.offset + n, self.len - n)
    }

    /// True when `next` continues this span in the same source.
    pub fn abuts(&self, next: &Span) -> bool {
        self.source == next.source && self.end() == next.offset
    }
}

/// Result of locating an address: span index, offset within that span, and
/// the address at which the span starts (its prefix sum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub index: usize,
    pub offset: usize,
    pub start: Address,
}

impl Located {
    pub fn address(&self) -> Address {
        self.start + self.offset
    }
}

/// A read-only view of file content produced by a file collaborator's `map`.
/// Treated as immutable for as long as the owning buffer holds it.
pub trait Mapping: Send {
    fn bytes(&self) -> &[u8];
}

/// Original content of a buffer.
#[derive(Default)]
pub enum Original {
    #[default]
    Empty,
    Mapped(Box<dyn Mapping>),
    Heap(TrackedVec<u8>),
}

impl Original {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Original::Empty => &[],
            Original::Mapped(view) => view.bytes(),
            Original::Heap(buf) => buf.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Original::Mapped(_))
    }
}

impl fmt::Debug for Original {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Original::Empty => f.write_str("Empty"),
            Original::Mapped(view) => write!(f, "Mapped({} bytes)", view.bytes().len()),
            Original::Heap(buf) => write!(f, "Heap({} bytes)", buf.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_and_tail_partition_the_span() {
        let s = Span::original(10..20);
        assert_eq!(s.head(4), Span::original(10..14));
        assert_eq!(s.tail(4), Span::original(14..20));
        assert!(s.tail(30).is_empty());
        assert_eq!(s.head(30), s);
    }

    #[test]
    fn abuts_requires_same_source_and_contiguity() {
        let a = Span::scratch(0..3);
        assert!(a.abuts(&Span::scratch(3..5)));
        assert!(!a.abuts(&Span::scratch(4..5)));
        assert!(!a.abuts(&Span::original(3..5)));
    }
}
