//! Circular buffer list with a current member.
//!
//! Nodes live in a `SlotMap` arena and link to each other by [`BufferId`];
//! removing a node never moves another, so ids handed to callers stay valid
//! until that buffer is deleted. A singleton links to itself.

use crate::{Buffer, BufferError, Tuning};
use core_io::FileOps;
use core_text::SharedAllocator;
use core_text::alloc::Charge;
use slotmap::SlotMap;
use std::path::Path;
use tracing::{debug, trace};

slotmap::new_key_type! {
    /// Stable handle to a buffer in a [`BufferRing`].
    pub struct BufferId;
}

#[derive(Debug)]
struct Node {
    buffer: Buffer,
    next: BufferId,
    prev: BufferId,
    _record: Charge,
}

#[derive(Debug)]
pub struct BufferRing {
    alloc: SharedAllocator,
    tuning: Tuning,
    nodes: SlotMap<BufferId, Node>,
    current: Option<BufferId>,
}

impl BufferRing {
    pub fn new(alloc: &SharedAllocator, tuning: Tuning) -> Self {
        Self {
            alloc: alloc.clone(),
            tuning,
            nodes: SlotMap::with_key(),
            current: None,
        }
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    /// Applies to buffers created afterwards.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
    }

    /// Create a buffer, loading `path` when given. The first buffer becomes
    /// current; later ones are linked in as the last member (just before
    /// current) and current is left alone.
    pub fn new_buf(
        &mut self,
        files: &mut dyn FileOps,
        path: Option<&Path>,
    ) -> Result<BufferId, BufferError> {
        let record = Charge::new(&self.alloc, std::mem::size_of::<Node>())?;
        let mut buffer = Buffer::new(&self.alloc, self.tuning);
        if let Some(path) = path {
            buffer.read(files, path)?;
        }

        let id = match self.current {
            None => {
                let id = self.nodes.insert_with_key(|id| Node {
                    buffer,
                    next: id,
                    prev: id,
                    _record: record,
                });
                self.current = Some(id);
                id
            }
            Some(current) => {
                let last = self.nodes[current].prev;
                let id = self.nodes.insert(Node {
                    buffer,
                    next: current,
                    prev: last,
                    _record: record,
                });
                self.nodes[last].next = id;
                self.nodes[current].prev = id;
                id
            }
        };
        debug!(target: "state.ring", ?id, path = ?path, count = self.nodes.len(), "new_buf");
        Ok(id)
    }

    /// Unlink `id` and release everything it owns. When it was current,
    /// its successor becomes current.
    pub fn delete_buf(&mut self, files: &mut dyn FileOps, id: BufferId) -> Result<(), BufferError> {
        let node = self.nodes.remove(id).ok_or(BufferError::NotMember)?;
        if node.next == id {
            self.current = None;
        } else {
            self.nodes[node.prev].next = node.next;
            self.nodes[node.next].prev = node.prev;
            if self.current == Some(id) {
                self.current = Some(node.next);
            }
        }
        let Node { mut buffer, .. } = node;
        buffer.reset(files);
        debug!(target: "state.ring", ?id, count = self.nodes.len(), "delete_buf");
        Ok(())
    }

    /// Delete every buffer.
    pub fn clear(&mut self, files: &mut dyn FileOps) {
        while let Some(id) = self.current {
            if self.delete_buf(files, id).is_err() {
                break;
            }
        }
    }

    /// Members counted by walking the links from current.
    pub fn count(&self) -> usize {
        let Some(start) = self.current else {
            return 0;
        };
        let mut count = 1;
        let mut at = self.nodes[start].next;
        while at != start {
            count += 1;
            at = self.nodes[at].next;
            if count > self.nodes.len() {
                debug_assert!(false, "ring links do not close");
                break;
            }
        }
        debug_assert_eq!(count, self.nodes.len());
        count
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn current(&self) -> Option<BufferId> {
        self.current
    }

    pub fn set_current(&mut self, id: BufferId) -> Result<(), BufferError> {
        if !self.nodes.contains_key(id) {
            return Err(BufferError::NotMember);
        }
        self.current = Some(id);
        trace!(target: "state.ring", ?id, "set_current");
        Ok(())
    }

    pub fn next(&self, id: BufferId) -> Option<BufferId> {
        self.nodes.get(id).map(|n| n.next)
    }

    pub fn prev(&self, id: BufferId) -> Option<BufferId> {
        self.nodes.get(id).map(|n| n.prev)
    }

    pub fn get(&self, id: BufferId) -> Option<&Buffer> {
        self.nodes.get(id).map(|n| &n.buffer)
    }

    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.nodes.get_mut(id).map(|n| &mut n.buffer)
    }

    pub fn current_buffer(&self) -> Option<&Buffer> {
        self.get(self.current?)
    }

    pub fn current_buffer_mut(&mut self) -> Option<&mut Buffer> {
        let id = self.current?;
        self.get_mut(id)
    }

    /// Buffers in ring order, starting at current.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            ring: self,
            next: self.current,
            remaining: self.nodes.len(),
        }
    }
}

pub struct Iter<'a> {
    ring: &'a BufferRing,
    next: Option<BufferId>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (BufferId, &'a Buffer);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let node = self.ring.nodes.get(id)?;
        self.remaining -= 1;
        self.next = Some(node.next);
        Some((id, &node.buffer))
    }
}
