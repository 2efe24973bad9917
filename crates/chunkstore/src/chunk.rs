//! Chunk: a fixed-capacity block of element slots.
//!
//! A chunk is written only by the thread holding the store's insertion lock
//! and read by any number of threads without locking. Two orderings make
//! that safe:
//!
//! - slot bytes are written before `used` is bumped (release store, acquire
//!   load), so a reader never sees a counted slot that is not fully written;
//! - a successor chunk is fully built before it is linked through a
//!   write-once cell, so a reader never reaches a half-built chunk.
//!
//! Bytes inside `[0, used * stride)` are never written again.

use std::cell::UnsafeCell;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::copy::CopyStrategy;
use crate::error::{Result, StoreError};

pub(crate) struct Chunk {
    /// Position in the chain, 0 for the head.
    ordinal: usize,
    /// Maximum number of elements.
    capacity: usize,
    /// Bytes per element.
    stride: usize,
    /// `capacity * stride` bytes of slot storage.
    slots: Box<[UnsafeCell<u8>]>,
    /// Number of published elements.
    used: AtomicUsize,
    /// Successor, set at most once.
    next: OnceLock<Arc<Chunk>>,
}

// SAFETY: slot bytes past the published prefix are only written by the
// holder of the insertion lock (see `push`), and the published prefix is
// immutable. Readers only ever form shared slices over the published prefix.
unsafe impl Sync for Chunk {}

impl Chunk {
    /// Allocate an empty chunk.
    ///
    /// Fails without side effects if the slot array cannot be reserved.
    pub(crate) fn allocate(ordinal: usize, capacity: usize, stride: usize) -> Result<Self> {
        let bytes = capacity
            .checked_mul(stride)
            .ok_or(StoreError::CapacityOverflow {
                capacity,
                element_size: stride,
            })?;

        // An injected failure asks for more than the allocator can ever grant.
        let request = if allocation_permitted() { bytes } else { usize::MAX };
        let mut cells: Vec<UnsafeCell<u8>> = Vec::new();
        cells
            .try_reserve_exact(request)
            .map_err(|source| StoreError::Allocation { bytes, source })?;
        cells.resize_with(bytes, || UnsafeCell::new(0));

        Ok(Self {
            ordinal,
            capacity,
            stride,
            slots: cells.into_boxed_slice(),
            used: AtomicUsize::new(0),
            next: OnceLock::new(),
        })
    }

    pub(crate) fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of published elements.
    pub(crate) fn len(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Bytes reserved for slot storage.
    pub(crate) fn allocated_bytes(&self) -> usize {
        self.slots.len()
    }

    /// The published elements, packed back to back.
    pub(crate) fn published(&self) -> &[u8] {
        let used = self.used.load(Ordering::Acquire);
        // SAFETY: `used * stride <= slots.len()`, `UnsafeCell<u8>` has the
        // layout of `u8`, and the acquire load above synchronizes with the
        // release store in `push`, so these bytes are initialized and are
        // never written again.
        unsafe { slice::from_raw_parts(self.slots.as_ptr().cast::<u8>(), used * self.stride) }
    }

    /// Bytes of the element at `index`, if it has been published.
    pub(crate) fn element(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.stride)?;
        self.published().get(start..start + self.stride)
    }

    /// Append one element.
    ///
    /// # Safety
    ///
    /// The caller must hold the store's insertion lock, so no other thread
    /// writes to this chunk concurrently, and the chunk must not be full.
    /// `element` must be exactly `stride` bytes.
    pub(crate) unsafe fn push(&self, strategy: CopyStrategy, element: &[u8]) {
        let used = self.used.load(Ordering::Relaxed);
        debug_assert!(used < self.capacity);
        debug_assert_eq!(element.len(), self.stride);

        let base = self.slots.as_ptr();
        // SAFETY: slot `used` lies past the published prefix, so no reader
        // holds a slice over it, and the caller guarantees exclusive writers.
        let slot = slice::from_raw_parts_mut(
            UnsafeCell::raw_get(base.add(used * self.stride)),
            self.stride,
        );
        strategy.copy(element, slot);

        self.used.store(used + 1, Ordering::Release);
    }

    /// The successor chunk, if one has been linked.
    pub(crate) fn next(&self) -> Option<&Chunk> {
        self.next.get().map(|chunk| &**chunk)
    }

    /// Link `chunk` as the successor and return the linked chunk.
    ///
    /// If a successor is already linked it is kept and returned instead.
    pub(crate) fn link(&self, chunk: Arc<Chunk>) -> Arc<Chunk> {
        Arc::clone(self.next.get_or_init(|| chunk))
    }
}

#[cfg(not(test))]
#[inline(always)]
fn allocation_permitted() -> bool {
    true
}

#[cfg(test)]
thread_local! {
    static ALLOCATION_BUDGET: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

#[cfg(test)]
fn allocation_permitted() -> bool {
    ALLOCATION_BUDGET.with(|budget| match budget.get() {
        None => true,
        Some(0) => false,
        Some(left) => {
            budget.set(Some(left - 1));
            true
        }
    })
}

/// Let the next `budget` chunk allocations on this thread succeed and fail
/// every one after that. `None` lifts the limit.
#[cfg(test)]
pub(crate) fn limit_allocations(budget: Option<usize>) {
    ALLOCATION_BUDGET.with(|cell| cell.set(budget));
}

impl Drop for Chunk {
    // Unlink iteratively so long chains don't recurse once per chunk.
    fn drop(&mut self) {
        let mut link = self.next.take();
        while let Some(chunk) = link {
            link = Arc::into_inner(chunk).and_then(|mut chunk| chunk.next.take());
        }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("ordinal", &self.ordinal)
            .field("capacity", &self.capacity)
            .field("stride", &self.stride)
            .field("used", &self.len())
            .field("linked", &self.next.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(chunk: &Chunk, element: &[u8]) {
        // SAFETY: single-threaded test, chunk checked not full.
        assert!(!chunk.is_full());
        unsafe { chunk.push(CopyStrategy::for_size(element.len()), element) }
    }

    #[test]
    fn test_allocate_empty() {
        let chunk = Chunk::allocate(0, 100, 4).unwrap();
        assert_eq!(chunk.len(), 0);
        assert_eq!(chunk.capacity(), 100);
        assert_eq!(chunk.allocated_bytes(), 400);
        assert!(chunk.published().is_empty());
        assert!(chunk.element(0).is_none());
        assert!(chunk.next().is_none());
    }

    #[test]
    fn test_push_publishes_in_order() {
        let chunk = Chunk::allocate(0, 3, 3).unwrap();
        push(&chunk, &[1, 2, 3]);
        push(&chunk, &[4, 5, 6]);

        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.published(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(chunk.element(1), Some(&[4u8, 5, 6][..]));
        assert!(chunk.element(2).is_none());

        push(&chunk, &[7, 8, 9]);
        assert!(chunk.is_full());
    }

    #[test]
    fn test_link_is_write_once() {
        let head = Chunk::allocate(0, 1, 1).unwrap();
        let first = head.link(Arc::new(Chunk::allocate(1, 1, 1).unwrap()));
        let second = head.link(Arc::new(Chunk::allocate(7, 1, 1).unwrap()));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(head.next().map(Chunk::ordinal), Some(1));
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        // Larger than isize::MAX bytes, rejected before touching the allocator.
        let err = Chunk::allocate(0, usize::MAX / 4, 3).unwrap_err();
        assert!(matches!(err, StoreError::Allocation { .. }));

        let err = Chunk::allocate(0, usize::MAX, 2).unwrap_err();
        assert!(matches!(err, StoreError::CapacityOverflow { .. }));
    }

    #[test]
    fn test_allocation_limit_fails_after_budget() {
        limit_allocations(Some(1));
        assert!(Chunk::allocate(0, 100, 4).is_ok());
        let err = Chunk::allocate(1, 100, 4).unwrap_err();
        assert!(matches!(err, StoreError::Allocation { bytes: 400, .. }));

        limit_allocations(None);
        assert!(Chunk::allocate(2, 100, 4).is_ok());
    }

    #[test]
    fn test_long_chain_drops_without_recursion() {
        let head = Chunk::allocate(0, 1, 1).unwrap();
        let mut tail = head.link(Arc::new(Chunk::allocate(1, 1, 1).unwrap()));
        for ordinal in 2..200_000 {
            tail = tail.link(Arc::new(Chunk::allocate(ordinal, 1, 1).unwrap()));
        }
        drop(tail);
        drop(head);
    }
}
