//! Allocator collaborator.
//!
//! The core never decides on its own whether memory is available. Every owned
//! region (span array, edit scratch, heap copy of original content, path copy,
//! buffer record) is *charged* against an embedding-supplied [`Allocator`]
//! before the backing `Vec` grows. A refused charge surfaces as
//! [`AllocError`] and the caller backs out without mutating anything.
//!
//! Charges are RAII guards ([`Charge`]) so every exit path of reset / delete /
//! read releases exactly the bytes it acquired, including early returns.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// A growth request the allocator refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation of {requested} bytes refused")]
pub struct AllocError {
    pub requested: usize,
}

/// Pluggable allocation policy.
///
/// `reallocate` is optional: the default falls back to allocate-new then
/// free-old, which is what an allocator without an in-place resize does.
pub trait Allocator: Send + Sync + fmt::Debug {
    fn allocate(&self, size: usize) -> Result<(), AllocError>;
    fn free(&self, size: usize);
    fn reallocate(&self, old: usize, new: usize) -> Result<(), AllocError> {
        self.allocate(new)?;
        self.free(old);
        Ok(())
    }
}

pub type SharedAllocator = Arc<dyn Allocator>;

/// Grants every request; the process allocator does the real work.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, _size: usize) -> Result<(), AllocError> {
        Ok(())
    }
    fn free(&self, _size: usize) {}
    fn reallocate(&self, _old: usize, _new: usize) -> Result<(), AllocError> {
        Ok(())
    }
}

/// Convenience constructor for the default shared allocator.
pub fn system() -> SharedAllocator {
    Arc::new(SystemAllocator)
}

/// Allocator enforcing a byte budget. Used by embeddings with a fixed arena
/// and by tests that need growth to fail at a precise point.
#[derive(Debug)]
pub struct BudgetAllocator {
    limit: AtomicUsize,
    used: AtomicUsize,
}

impl BudgetAllocator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: AtomicUsize::new(limit),
            used: AtomicUsize::new(0),
        }
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Relaxed);
    }
}

impl Allocator for BudgetAllocator {
    fn allocate(&self, size: usize) -> Result<(), AllocError> {
        let limit = self.limit();
        self.used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                used.checked_add(size).filter(|total| *total <= limit)
            })
            .map(|_| ())
            .map_err(|_| AllocError { requested: size })
    }

    fn free(&self, size: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |used| {
                Some(used.saturating_sub(size))
            });
    }

    fn reallocate(&self, old: usize, new: usize) -> Result<(), AllocError> {
        if new > old {
            self.allocate(new - old).map_err(|_| AllocError { requested: new })
        } else {
            self.free(old - new);
            Ok(())
        }
    }
}

/// Bytes currently held against an allocator. Released on drop.
pub struct Charge {
    alloc: SharedAllocator,
    bytes: usize,
}

impl Charge {
    pub fn new(alloc: &SharedAllocator, bytes: usize) -> Result<Self, AllocError> {
        if bytes > 0 {
            alloc.allocate(bytes)?;
        }
        Ok(Self {
            alloc: Arc::clone(alloc),
            bytes,
        })
    }

    /// A zero-byte charge that can later be resized.
    pub fn empty(alloc: &SharedAllocator) -> Self {
        Self {
            alloc: Arc::clone(alloc),
            bytes: 0,
        }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn allocator(&self) -> &SharedAllocator {
        &self.alloc
    }

    /// Grow or shrink the charge. On refusal the charge keeps its old size.
    pub fn resize(&mut self, bytes: usize) -> Result<(), AllocError> {
        match (self.bytes, bytes) {
            (old, new) if old == new => {}
            (0, new) => self.alloc.allocate(new)?,
            (old, 0) => self.alloc.free(old),
            (old, new) => self.alloc.reallocate(old, new)?,
        }
        self.bytes = bytes;
        Ok(())
    }
}

impl Drop for Charge {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.alloc.free(self.bytes);
        }
    }
}

impl fmt::Debug for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Charge").field("bytes", &self.bytes).finish()
    }
}

/// A `Vec` whose capacity is charged against an allocator before it grows.
///
/// Capacity grows by doubling from `initial` slots. After a successful
/// [`TrackedVec::reserve`] the reserved slots can be filled without any
/// further allocation, which is what lets callers check capacity up front
/// and then mutate infallibly.
#[derive(Debug)]
pub struct TrackedVec<T> {
    items: Vec<T>,
    charge: Charge,
    slots: usize,
    initial: usize,
}

impl<T> TrackedVec<T> {
    pub fn new(alloc: &SharedAllocator, initial: usize) -> Self {
        Self {
            items: Vec::new(),
            charge: Charge::empty(alloc),
            slots: 0,
            initial: initial.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Slots paid for (may exceed `len`).
    pub fn capacity(&self) -> usize {
        self.slots
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Ensure room for `additional` more items.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        let needed = self
            .items
            .len()
            .checked_add(additional)
            .ok_or(AllocError { requested: usize::MAX })?;
        if needed <= self.slots {
            return Ok(());
        }
        let mut slots = self.slots.max(self.initial);
        while slots < needed {
            slots = slots.saturating_mul(2);
        }
        let elem = std::mem::size_of::<T>();
        let old_slots = self.slots;
        self.charge.resize(slots.saturating_mul(elem))?;
        if self
            .items
            .try_reserve_exact(slots - self.items.len())
            .is_err()
        {
            let _ = self.charge.resize(old_slots.saturating_mul(elem));
            return Err(AllocError {
                requested: slots.saturating_mul(elem),
            });
        }
        self.slots = slots;
        Ok(())
    }

    /// Direct access for in-crate mutation after a successful `reserve`.
    pub(crate) fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    pub fn push(&mut self, item: T) -> Result<(), AllocError> {
        self.reserve(1)?;
        self.items.push(item);
        Ok(())
    }
}

impl TrackedVec<u8> {
    /// Charge and zero-fill `len` bytes, e.g. as the target of a file read.
    pub fn zeroed(alloc: &SharedAllocator, len: usize) -> Result<Self, AllocError> {
        let mut v = Self::new(alloc, len);
        v.reserve(len)?;
        v.items.resize(len, 0);
        Ok(v)
    }

    /// Append bytes, returning the offset at which they start.
    pub fn extend_from(&mut self, bytes: &[u8]) -> Result<usize, AllocError> {
        self.reserve(bytes.len())?;
        let at = self.items.len();
        self.items.extend_from_slice(bytes);
        Ok(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_refuses_past_limit_and_recovers_on_free() {
        let budget = Arc::new(BudgetAllocator::new(100));
        let alloc: SharedAllocator = budget.clone();
        let a = Charge::new(&alloc, 60).unwrap();
        assert!(Charge::new(&alloc, 50).is_err());
        assert_eq!(budget.used(), 60);
        drop(a);
        assert_eq!(budget.used(), 0);
        assert!(Charge::new(&alloc, 100).is_ok());
    }

    #[test]
    fn charge_resize_keeps_old_size_on_refusal() {
        let budget = Arc::new(BudgetAllocator::new(32));
        let alloc: SharedAllocator = budget.clone();
        let mut c = Charge::new(&alloc, 16).unwrap();
        assert!(c.resize(64).is_err());
        assert_eq!(c.bytes(), 16);
        assert_eq!(budget.used(), 16);
        c.resize(8).unwrap();
        assert_eq!(budget.used(), 8);
    }

    #[test]
    fn default_reallocate_falls_back_to_allocate_then_free() {
        #[derive(Debug)]
        struct Counting(AtomicUsize);
        impl Allocator for Counting {
            fn allocate(&self, size: usize) -> Result<(), AllocError> {
                self.0.fetch_add(size, Ordering::Relaxed);
                Ok(())
            }
            fn free(&self, size: usize) {
                self.0.fetch_sub(size, Ordering::Relaxed);
            }
        }
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let alloc: SharedAllocator = counting.clone();
        let mut c = Charge::new(&alloc, 10).unwrap();
        c.resize(40).unwrap();
        assert_eq!(counting.0.load(Ordering::Relaxed), 40);
    }

    #[test]
    fn tracked_vec_doubles_from_initial() {
        let alloc = system();
        let mut v: TrackedVec<u32> = TrackedVec::new(&alloc, 4);
        v.reserve(1).unwrap();
        assert_eq!(v.capacity(), 4);
        v.reserve(5).unwrap();
        assert_eq!(v.capacity(), 8);
        v.reserve(17).unwrap();
        assert_eq!(v.capacity(), 32);
    }

    #[test]
    fn tracked_vec_refused_growth_leaves_contents() {
        let budget = Arc::new(BudgetAllocator::new(8));
        let alloc: SharedAllocator = budget.clone();
        let mut v: TrackedVec<u8> = TrackedVec::new(&alloc, 4);
        v.extend_from(b"abcd").unwrap();
        assert!(v.extend_from(b"efghijklm").is_err());
        assert_eq!(v.as_slice(), b"abcd");
        assert_eq!(budget.used(), 4);
    }
}
