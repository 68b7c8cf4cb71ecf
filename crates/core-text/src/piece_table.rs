//! Piece table: an ordered span list over original content and edit scratch.
//!
//! Invariants (hold after every public call):
//! * No span has zero length.
//! * `len` equals the sum of span lengths.
//! * Scratch is append-only, so the offset of every span ever issued stays
//!   valid for the lifetime of the table.
//! * Mutations are all-or-nothing: span capacity is reserved before the span
//!   array is touched, so a refused allocation leaves the table unmodified.
//!
//! `find` is a linear prefix-sum scan. Interactive span counts stay small and
//! the scan avoids a cache that every mutation would have to invalidate.

use crate::Address;
use crate::alloc::{AllocError, SharedAllocator, TrackedVec};
use crate::span::{Located, Original, Source, Span};
use std::ops::Range;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("address {at} is past the end of content ({len} bytes)")]
    OutOfRange { at: Address, len: usize },
    #[error("span index {index} out of bounds ({count} spans)")]
    NoSpan { index: usize, count: usize },
}

/// Initial capacities; both grow by doubling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    pub spans: usize,
    pub scratch: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            spans: 16,
            scratch: 256,
        }
    }
}

#[derive(Debug)]
pub struct PieceTable {
    alloc: SharedAllocator,
    caps: Capacities,
    original: Original,
    scratch: TrackedVec<u8>,
    spans: TrackedVec<Span>,
    len: usize,
}

impl PieceTable {
    pub fn new(alloc: &SharedAllocator, caps: Capacities) -> Self {
        Self {
            alloc: alloc.clone(),
            caps,
            original: Original::Empty,
            scratch: TrackedVec::new(alloc, caps.scratch),
            spans: TrackedVec::new(alloc, caps.spans),
            len: 0,
        }
    }

    /// Release original content, scratch and spans. Capacities are kept.
    pub fn clear(&mut self) {
        *self = Self::new(&self.alloc, self.caps);
    }

    /// Install `original` as the whole content, replacing everything.
    /// On failure the table is left empty.
    pub fn load(&mut self, original: Original) -> Result<(), TableError> {
        self.clear();
        let len = original.len();
        if len > 0 {
            self.spans.reserve(1)?;
            self.spans.items_mut().push(Span::original(0..len));
        }
        self.original = original;
        self.len = len;
        trace!(target: "text.spans", len, mapped = self.original.is_mapped(), "load");
        Ok(())
    }

    /// Swap in different backing for the same original bytes (e.g. a heap
    /// copy of a mapped view). Spans are untouched, so the lengths must match.
    pub fn replace_original(&mut self, original: Original) -> Result<Original, TableError> {
        if original.len() != self.original.len() {
            return Err(TableError::OutOfRange {
                at: original.len(),
                len: self.original.len(),
            });
        }
        Ok(std::mem::replace(&mut self.original, original))
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn spans(&self) -> &[Span] {
        self.spans.as_slice()
    }

    pub fn span_count(&self) -> usize {
        self.spans.len()
    }

    pub fn original(&self) -> &Original {
        &self.original
    }

    /// Bytes held in the edit scratch (inserted text, including text that
    /// has since been deleted from the logical content).
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Locate the span containing `at`. `None` when `at >= len()`.
    pub fn find(&self, at: Address) -> Option<Located> {
        if at >= self.len {
            return None;
        }
        let mut start = 0usize;
        for (index, span) in self.spans.as_slice().iter().enumerate() {
            if at < start + span.len {
                return Some(Located {
                    index,
                    offset: at - start,
                    start,
                });
            }
            start += span.len;
        }
        None
    }

    /// Backing bytes of a span, without copying.
    pub fn text(&self, span: &Span) -> &[u8] {
        let src = match span.source {
            Source::Original => self.original.bytes(),
            Source::Scratch => self.scratch.as_slice(),
        };
        &src[span.offset..span.end()]
    }

    /// Byte at `at`, if any.
    pub fn byte(&self, at: Address) -> Option<u8> {
        let loc = self.find(at)?;
        let span = self.spans.as_slice()[loc.index];
        self.text(&span).get(loc.offset).copied()
    }

    /// Split span `index` at `offset`, consuming `gap` bytes that follow the
    /// split point (from the right half, then from subsequent spans).
    ///
    /// Returns the slot at which an insertion belongs: after the left half
    /// and before whatever remains on the right. Zero-length pieces are
    /// pruned before returning, so `offset == 0` yields `index` itself.
    pub fn split(&mut self, index: usize, offset: usize, gap: usize) -> Result<usize, TableError> {
        let count = self.spans.len();
        let Some(&span) = self.spans.as_slice().get(index) else {
            return Err(TableError::NoSpan { index, count });
        };
        debug_assert!(offset <= span.len, "split offset within span");
        self.spans.reserve(1)?;

        let left = span.head(offset);
        let mut right = span.tail(offset);
        let taken = gap.min(right.len);
        right = right.tail(taken);
        let mut rest = gap - taken;

        let spans = self.spans.items_mut();
        let mut end = index + 1;
        while rest > 0 && end < spans.len() {
            let next = spans[end];
            if next.len <= rest {
                rest -= next.len;
                end += 1;
            } else {
                spans[end] = next.tail(rest);
                rest = 0;
            }
        }
        spans.drain(index + 1..end);
        match (left.is_empty(), right.is_empty()) {
            (false, false) => {
                spans[index] = left;
                spans.insert(index + 1, right);
            }
            (false, true) => spans[index] = left,
            (true, false) => spans[index] = right,
            (true, true) => {
                spans.remove(index);
            }
        }

        let consumed = gap - rest;
        self.len -= consumed;
        let slot = index + usize::from(!left.is_empty());
        trace!(target: "text.spans", index, offset, gap, consumed, slot, spans = self.spans.len(), "split");
        Ok(slot)
    }

    /// Install a span referencing `source[offset..offset+len]` at address `at`.
    pub fn insert_region(
        &mut self,
        at: Address,
        source: Source,
        offset: usize,
        len: usize,
    ) -> Result<(), TableError> {
        if at > self.len {
            return Err(TableError::OutOfRange { at, len: self.len });
        }
        if len == 0 {
            return Ok(());
        }
        self.spans.reserve(2)?;
        let slot = match self.find(at) {
            Some(loc) => self.split(loc.index, loc.offset, 0)?,
            None => self.spans.len(),
        };
        self.spans
            .items_mut()
            .insert(slot, Span::new(source, offset, len));
        self.len += len;
        trace!(target: "text.spans", at, ?source, offset, len, slot, "insert_region");
        Ok(())
    }

    /// Append bytes to the scratch, returning where they start.
    pub fn append_scratch(&mut self, bytes: &[u8]) -> Result<usize, TableError> {
        Ok(self.scratch.extend_from(bytes)?)
    }

    /// Insert `bytes` at `at`: scratch append plus `insert_region`.
    pub fn insert(&mut self, at: Address, bytes: &[u8]) -> Result<(), TableError> {
        if at > self.len {
            return Err(TableError::OutOfRange { at, len: self.len });
        }
        if bytes.is_empty() {
            return Ok(());
        }
        // Reserve span slots first so a refused span growth never strands
        // scratch bytes behind a failed call.
        self.spans.reserve(2)?;
        let offset = self.append_scratch(bytes)?;
        self.insert_region(at, Source::Scratch, offset, bytes.len())
    }

    /// Remove the logical range (clamped to content).
    pub fn remove_range(&mut self, range: Range<Address>) -> Result<(), TableError> {
        let end = range.end.min(self.len);
        if range.start >= end {
            return Ok(());
        }
        self.spans.reserve(1)?;
        let Some(loc) = self.find(range.start) else {
            return Ok(());
        };
        self.split(loc.index, loc.offset, end - range.start)?;
        Ok(())
    }

    /// Merge neighbouring spans that are contiguous in the same source.
    pub fn coalesce(&mut self) {
        let before = self.spans.len();
        self.spans.items_mut().dedup_by(|next, prev| {
            if prev.abuts(next) {
                prev.len += next.len;
                true
            } else {
                false
            }
        });
        trace!(target: "text.spans", before, after = self.spans.len(), "coalesce");
    }

    /// Span-backed slices covering `range` (clamped), in order.
    pub fn chunks(&self, range: Range<Address>) -> Chunks<'_> {
        let end = range.end.min(self.len);
        match self.find(range.start) {
            Some(loc) if range.start < end => Chunks {
                table: self,
                index: loc.index,
                offset: loc.offset,
                remaining: end - range.start,
            },
            _ => Chunks {
                table: self,
                index: 0,
                offset: 0,
                remaining: 0,
            },
        }
    }

    /// Copy the range out. Convenience for callers that need contiguity.
    pub fn copy_range(&self, range: Range<Address>) -> Vec<u8> {
        let mut out = Vec::with_capacity(range.end.saturating_sub(range.start));
        for chunk in self.chunks(range) {
            out.extend_from_slice(chunk);
        }
        out
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.copy_range(0..self.len)
    }
}

/// Iterator over the span slices of a logical range.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    table: &'a PieceTable,
    index: usize,
    offset: usize,
    remaining: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let span = self.table.spans().get(self.index)?;
        let bytes = &self.table.text(span)[self.offset..];
        let take = bytes.len().min(self.remaining);
        self.index += 1;
        self.offset = 0;
        self.remaining -= take;
        Some(&bytes[..take])
    }
}
