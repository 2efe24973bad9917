//! ChunkStore: the container handle.
//!
//! Owns the chunk chain and the insertion lock. Writers are serialized by the
//! lock; readers walk the chain without it and always observe a prefix of the
//! insertion sequence.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chunk::Chunk;
use crate::config::StoreConfig;
use crate::copy::CopyStrategy;
use crate::error::{Result, StoreError};

/// Point-in-time summary of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Bytes per element.
    pub element_size: usize,
    /// Elements per chunk.
    pub chunk_capacity: usize,
    /// Number of chunks in the chain.
    pub chunks: usize,
    /// Number of published elements.
    pub elements: u64,
    /// Bytes reserved for slot storage across all chunks.
    pub allocated_bytes: usize,
}

/// Append-only, thread-safe sequence of fixed-size elements.
///
/// Share it between threads with `Arc<ChunkStore>`. `insert` takes the
/// internal insertion lock; `scan`, cursors and the introspection methods
/// never block.
///
/// # Consistency
///
/// Readers run concurrently with writers. A reader sees every element whose
/// insertion completed before the read started, and possibly some inserted
/// while it runs, but never a partially written element and never a gap: what
/// it observes is always a prefix of the insertion order.
#[derive(Debug)]
pub struct ChunkStore {
    chunk_capacity: usize,
    element_size: usize,
    copy: CopyStrategy,
    head: Arc<Chunk>,
    /// Current tail. The mutex is the insertion lock.
    tail: Mutex<Arc<Chunk>>,
}

impl ChunkStore {
    /// Create a store for `element_size`-byte elements.
    ///
    /// `initial_capacity` is the number of elements per chunk, raised to
    /// [`MIN_CHUNK_CAPACITY`](crate::MIN_CHUNK_CAPACITY) if smaller. The first
    /// chunk is allocated eagerly.
    pub fn create(initial_capacity: usize, element_size: usize) -> Result<Self> {
        Self::with_config(StoreConfig::new(initial_capacity, element_size))
    }

    /// Create a store from a [`StoreConfig`].
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let chunk_capacity = config.chunk_capacity();
        let element_size = config.element_size;

        let head = Chunk::allocate(0, chunk_capacity, element_size).map_err(|err| {
            warn!(chunk_capacity, element_size, error = %err, "initial chunk allocation failed");
            err
        })?;
        let head = Arc::new(head);

        debug!(chunk_capacity, element_size, "created chunk store");

        Ok(Self {
            chunk_capacity,
            element_size,
            copy: CopyStrategy::for_size(element_size),
            tail: Mutex::new(Arc::clone(&head)),
            head,
        })
    }

    /// Elements per chunk.
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Bytes per element.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The copy routine selected for this store's element size.
    pub fn copy_strategy(&self) -> CopyStrategy {
        self.copy
    }

    pub(crate) fn head(&self) -> &Chunk {
        &self.head
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Insertion
    // ─────────────────────────────────────────────────────────────────────────

    /// Append one element.
    ///
    /// `element` must be exactly [`element_size`](Self::element_size) bytes.
    /// Blocks while another insertion holds the lock. On error the element is
    /// not stored and the chain is unchanged.
    pub fn insert(&self, element: &[u8]) -> Result<()> {
        self.check_len(element.len())?;
        let mut tail = self.lock_tail()?;
        self.append(&mut tail, element).map(|_| ())
    }

    /// Append a packed run of elements under one lock acquisition.
    ///
    /// `elements.len()` must be a multiple of the element size. Returns the
    /// number of elements stored. The batch is all or nothing: every chunk it
    /// needs is allocated before the first element is copied, so on error
    /// nothing from the batch is stored.
    pub fn insert_many(&self, elements: &[u8]) -> Result<u64> {
        if elements.len() % self.element_size != 0 {
            return Err(StoreError::ElementSize {
                expected: self.element_size,
                actual: elements.len(),
            });
        }

        let mut tail = self.lock_tail()?;
        self.append(&mut tail, elements)
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        if actual != self.element_size {
            return Err(StoreError::ElementSize {
                expected: self.element_size,
                actual,
            });
        }
        Ok(())
    }

    fn lock_tail(&self) -> Result<MutexGuard<'_, Arc<Chunk>>> {
        self.tail.lock().map_err(|_| {
            warn!("insertion lock poisoned");
            StoreError::LockPoisoned
        })
    }

    /// Append packed elements, allocating every needed chunk up front.
    ///
    /// Must only be called with the tail borrowed out of the insertion lock.
    fn append(&self, tail: &mut Arc<Chunk>, elements: &[u8]) -> Result<u64> {
        let count = elements.len() / self.element_size;
        let spare = self.reserve(tail, count)?;

        let free = (self.chunk_capacity - tail.len()) * self.element_size;
        let (first, mut rest) = elements.split_at(free.min(elements.len()));
        // SAFETY: the tail is only reachable mutably through the lock guard,
        // so this thread is the only writer, and `first` fits its free slots.
        unsafe { self.fill(tail, first) };

        let chunk_bytes = self.chunk_capacity * self.element_size;
        for chunk in spare {
            let (part, more) = rest.split_at(chunk_bytes.min(rest.len()));
            // SAFETY: the chunk is not linked yet, so no other thread can
            // reach it, and `part` holds at most one chunk of elements.
            unsafe { self.fill(&chunk, part) };
            let ordinal = chunk.ordinal();
            *tail = tail.link(Arc::new(chunk));
            debug!(chunk = ordinal, capacity = self.chunk_capacity, "linked new chunk");
            rest = more;
        }
        Ok(count as u64)
    }

    /// Allocate the chunks needed to hold `count` more elements after `tail`.
    ///
    /// Nothing is linked; on error every chunk allocated so far is released.
    fn reserve(&self, tail: &Chunk, count: usize) -> Result<Vec<Chunk>> {
        let free = self.chunk_capacity - tail.len();
        if count <= free {
            return Ok(Vec::new());
        }
        let needed = (count - free).div_ceil(self.chunk_capacity);
        (1..=needed)
            .map(|offset| self.allocate_chunk(tail.ordinal() + offset))
            .collect()
    }

    fn allocate_chunk(&self, ordinal: usize) -> Result<Chunk> {
        Chunk::allocate(ordinal, self.chunk_capacity, self.element_size).map_err(|err| {
            warn!(chunk = ordinal, error = %err, "chunk allocation failed");
            err
        })
    }

    /// Copy packed elements into `chunk`.
    ///
    /// # Safety
    ///
    /// The caller must be the only writer to `chunk`, and `elements` must fit
    /// in its free slots.
    unsafe fn fill(&self, chunk: &Chunk, elements: &[u8]) {
        for element in elements.chunks_exact(self.element_size) {
            chunk.push(self.copy, element);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk traversal
    // ─────────────────────────────────────────────────────────────────────────

    /// Call `callback` with every element in insertion order.
    ///
    /// Returns the number of elements visited. Takes no lock; elements
    /// inserted while the scan runs may or may not be visited.
    pub fn scan<F>(&self, mut callback: F) -> u64
    where
        F: FnMut(&[u8]),
    {
        let mut visited = 0u64;
        self.for_each_chunk(|chunk| {
            for element in chunk.published().chunks_exact(self.element_size) {
                callback(element);
                visited += 1;
            }
        });
        visited
    }

    /// Visit chunks head to tail.
    ///
    /// The successor link is read before the chunk's contents: a chunk with a
    /// successor is full, so the walk never skips elements.
    fn for_each_chunk<'a>(&'a self, mut visit: impl FnMut(&'a Chunk)) {
        let mut chunk = Some(self.head());
        while let Some(current) = chunk {
            let next = current.next();
            visit(current);
            chunk = next;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of published elements.
    pub fn len(&self) -> u64 {
        let mut total = 0u64;
        self.for_each_chunk(|chunk| total += chunk.len() as u64);
        total
    }

    /// True if no element has been published yet.
    pub fn is_empty(&self) -> bool {
        self.head.len() == 0
    }

    /// Number of chunks in the chain.
    pub fn chunk_count(&self) -> usize {
        let mut count = 0;
        self.for_each_chunk(|_| count += 1);
        count
    }

    /// Published element count of each chunk, head first.
    pub fn chunk_lengths(&self) -> Vec<usize> {
        let mut lengths = Vec::new();
        self.for_each_chunk(|chunk| lengths.push(chunk.len()));
        lengths
    }

    /// Element, chunk and memory totals from one walk of the chain.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            element_size: self.element_size,
            chunk_capacity: self.chunk_capacity,
            chunks: 0,
            elements: 0,
            allocated_bytes: 0,
        };
        self.for_each_chunk(|chunk| {
            stats.chunks += 1;
            stats.elements += chunk.len() as u64;
            stats.allocated_bytes += chunk.allocated_bytes();
        });
        stats
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Destruction
    // ─────────────────────────────────────────────────────────────────────────

    /// Release every chunk and return the final statistics.
    ///
    /// Dropping the store releases the same memory; this variant reports what
    /// was freed.
    pub fn destroy(self) -> StoreStats {
        let stats = self.stats();
        debug!(
            chunks = stats.chunks,
            elements = stats.elements,
            allocated_bytes = stats.allocated_bytes,
            "destroying chunk store"
        );
        drop(self);
        stats
    }

    /// Destroy a shared store if `store` is the last handle to it.
    ///
    /// Fails with [`StoreError::InUse`] while other handles exist; in that case
    /// only this handle is released.
    pub fn destroy_shared(store: Arc<Self>) -> Result<StoreStats> {
        match Arc::try_unwrap(store) {
            Ok(store) => Ok(store.destroy()),
            Err(shared) => {
                let handles = Arc::strong_count(&shared) - 1;
                warn!(handles, "refusing to destroy a store that is still shared");
                Err(StoreError::InUse { handles })
            }
        }
    }
}
