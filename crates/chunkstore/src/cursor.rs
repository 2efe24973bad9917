//! Cursor: caller-owned, pull-style iteration over a store.
//!
//! A cursor borrows the store, so it cannot outlive it, and holds a
//! non-owning reference to its current chunk plus the next slot to read.
//! Cursors are independent of each other and of scans.
//!
//! A cursor is not a snapshot. Elements appended after the cursor was reset
//! are returned as long as they land at or after the cursor's position. When
//! `next` finds nothing the cursor is "exhausted for now": a later call
//! succeeds once more elements are published.

use tracing::trace;

use crate::chunk::Chunk;
use crate::error::{Result, StoreError};
use crate::store::ChunkStore;

/// Observable state of a [`Cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// The next read targets `slot` of chunk number `chunk`.
    Positioned { chunk: usize, slot: usize },
    /// The current chunk is full and no successor is linked yet.
    Exhausted,
}

/// Iteration state over a [`ChunkStore`].
#[derive(Debug, Clone)]
pub struct Cursor<'s> {
    store: &'s ChunkStore,
    chunk: &'s Chunk,
    slot: usize,
}

impl<'s> Cursor<'s> {
    fn new(store: &'s ChunkStore) -> Self {
        Self {
            store,
            chunk: store.head(),
            slot: 0,
        }
    }

    /// The store this cursor reads from.
    pub fn store(&self) -> &'s ChunkStore {
        self.store
    }

    /// Where the next read will land.
    ///
    /// A cursor parked past the end of a full chunk reports the first slot of
    /// the successor once one is linked, and `Exhausted` until then.
    pub fn state(&self) -> CursorState {
        if self.slot < self.chunk.capacity() {
            return CursorState::Positioned {
                chunk: self.chunk.ordinal(),
                slot: self.slot,
            };
        }
        match self.chunk.next() {
            Some(next) => CursorState::Positioned {
                chunk: next.ordinal(),
                slot: 0,
            },
            None => CursorState::Exhausted,
        }
    }

    /// Rewind to the first element.
    pub fn reset(&mut self) {
        self.chunk = self.store.head();
        self.slot = 0;
    }

    /// Copy the next element into `out` and advance.
    ///
    /// Returns `Ok(false)` without moving when no further element is
    /// published yet. `out` must be exactly the store's element size.
    pub fn next_into(&mut self, out: &mut [u8]) -> Result<bool> {
        let element_size = self.store.element_size();
        if out.len() != element_size {
            return Err(StoreError::ElementSize {
                expected: element_size,
                actual: out.len(),
            });
        }

        match self.advance() {
            Some(element) => {
                self.store.copy_strategy().copy(element, out);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Borrow the next element and advance.
    pub(crate) fn advance(&mut self) -> Option<&'s [u8]> {
        if self.slot >= self.chunk.capacity() {
            // Stay parked on a full chunk until its successor is linked.
            let next = self.chunk.next()?;
            trace!(chunk = next.ordinal(), "cursor moved to next chunk");
            self.chunk = next;
            self.slot = 0;
        }

        let element = self.chunk.element(self.slot)?;
        self.slot += 1;
        Some(element)
    }
}

/// Yields owned copies of the elements. Not fused: `None` means no element is
/// published yet, and a later call may return more.
impl Iterator for Cursor<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().map(<[u8]>::to_vec)
    }
}

impl ChunkStore {
    /// A cursor positioned before the first element.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self)
    }

    /// Rewind `cursor` to the first element of this store.
    pub fn reset<'s>(&'s self, cursor: &mut Cursor<'s>) {
        *cursor = Cursor::new(self);
    }

    /// Copy the element under `cursor` into `out` and advance the cursor.
    ///
    /// Returns `Ok(true)` if an element was written and `Ok(false)` if the
    /// cursor is exhausted for now. Fails with [`StoreError::ForeignCursor`]
    /// if `cursor` was created from another store.
    pub fn next_element(&self, cursor: &mut Cursor<'_>, out: &mut [u8]) -> Result<bool> {
        if !std::ptr::eq(self, cursor.store) {
            return Err(StoreError::ForeignCursor);
        }
        cursor.next_into(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: u32) -> ChunkStore {
        let store = ChunkStore::create(100, 4).unwrap();
        for i in 0..count {
            store.insert(&i.to_le_bytes()).unwrap();
        }
        store
    }

    fn drain(store: &ChunkStore, cursor: &mut Cursor<'_>) -> Vec<u32> {
        let mut out = [0u8; 4];
        let mut values = Vec::new();
        while store.next_element(cursor, &mut out).unwrap() {
            values.push(u32::from_le_bytes(out));
        }
        values
    }

    #[test]
    fn test_cursor_reads_in_order_across_chunks() {
        let store = filled(250);
        let mut cursor = store.cursor();
        assert_eq!(drain(&store, &mut cursor), (0..250).collect::<Vec<_>>());
        assert_eq!(cursor.state(), CursorState::Positioned { chunk: 2, slot: 50 });
    }

    #[test]
    fn test_empty_store_cursor() {
        let store = filled(0);
        let mut cursor = store.cursor();
        let mut out = [0u8; 4];
        assert!(!store.next_element(&mut cursor, &mut out).unwrap());
        assert_eq!(cursor.state(), CursorState::Positioned { chunk: 0, slot: 0 });
    }

    #[test]
    fn test_cursor_resumes_in_partial_chunk() {
        let store = filled(10);
        let mut cursor = store.cursor();
        assert_eq!(drain(&store, &mut cursor).len(), 10);

        store.insert(&10u32.to_le_bytes()).unwrap();
        assert_eq!(drain(&store, &mut cursor), vec![10]);
    }

    #[test]
    fn test_cursor_resumes_after_growth() {
        let store = filled(100);
        let mut cursor = store.cursor();
        assert_eq!(drain(&store, &mut cursor).len(), 100);
        assert_eq!(cursor.state(), CursorState::Exhausted);

        store.insert(&100u32.to_le_bytes()).unwrap();
        assert_eq!(cursor.state(), CursorState::Positioned { chunk: 1, slot: 0 });
        assert_eq!(drain(&store, &mut cursor), vec![100]);
        assert_eq!(cursor.state(), CursorState::Positioned { chunk: 1, slot: 1 });
    }

    #[test]
    fn test_parked_cursor_reports_successor_slot() {
        let store = ChunkStore::create(100, 1).unwrap();
        for i in 0..100u8 {
            store.insert(&[i]).unwrap();
        }
        let mut cursor = store.cursor();
        assert_eq!(cursor.by_ref().count(), 100);
        assert_eq!(cursor.state(), CursorState::Exhausted);

        store.insert(&[100]).unwrap();
        assert_eq!(cursor.state(), CursorState::Positioned { chunk: 1, slot: 0 });
        assert_eq!(cursor.next(), Some(vec![100]));
        assert_eq!(cursor.state(), CursorState::Positioned { chunk: 1, slot: 1 });
    }

    #[test]
    fn test_independent_cursors() {
        let store = filled(150);
        let mut a = store.cursor();
        let mut b = store.cursor();

        let mut out = [0u8; 4];
        for _ in 0..120 {
            assert!(store.next_element(&mut a, &mut out).unwrap());
        }

        assert_eq!(drain(&store, &mut b), (0..150).collect::<Vec<_>>());
        assert_eq!(drain(&store, &mut a), (120..150).collect::<Vec<_>>());
    }

    #[test]
    fn test_reset() {
        let store = filled(5);
        let mut cursor = store.cursor();
        assert_eq!(drain(&store, &mut cursor).len(), 5);

        store.reset(&mut cursor);
        assert_eq!(drain(&store, &mut cursor), vec![0, 1, 2, 3, 4]);

        cursor.reset();
        assert_eq!(cursor.count(), 5);
    }

    #[test]
    fn test_foreign_cursor_rejected() {
        let a = filled(3);
        let b = filled(3);
        let mut cursor = a.cursor();
        let mut out = [0u8; 4];

        let err = b.next_element(&mut cursor, &mut out).unwrap_err();
        assert!(matches!(err, StoreError::ForeignCursor));
        assert!(std::ptr::eq(cursor.store(), &a));
    }

    #[test]
    fn test_wrong_output_size() {
        let store = filled(3);
        let mut cursor = store.cursor();
        let mut out = [0u8; 8];

        let err = cursor.next_into(&mut out).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ElementSize {
                expected: 4,
                actual: 8
            }
        ));
        // The failed call did not consume anything.
        assert_eq!(cursor.next(), Some(0u32.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_iterator_is_not_fused() {
        let store = ChunkStore::create(0, 1).unwrap();
        let mut cursor = store.cursor();
        assert_eq!(cursor.next(), None);

        store.insert(&[42]).unwrap();
        assert_eq!(cursor.next(), Some(vec![42]));
        assert_eq!(cursor.next(), None);
    }
}
