//! Test fixtures and helpers.
//!
//! Deterministic element patterns and common setup code for integration
//! tests.

use std::sync::Arc;

use chunkstore::ChunkStore;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Number of leading bytes of a pattern that encode its index.
fn index_width(element_size: usize) -> usize {
    element_size.min(8)
}

/// Build the `index`-th element of a deterministic pattern sequence.
///
/// The first `min(element_size, 8)` bytes hold `index` little-endian, so
/// patterns are distinct while `index < 256^min(element_size, 8)`. Remaining
/// bytes are a fill derived from the index.
pub fn pattern(index: u64, element_size: usize) -> Vec<u8> {
    let width = index_width(element_size);
    let mut bytes = vec![0u8; element_size];
    bytes[..width].copy_from_slice(&index.to_le_bytes()[..width]);
    for (j, byte) in bytes.iter_mut().enumerate().skip(width) {
        *byte = (index as u8).wrapping_mul(31).wrapping_add(j as u8);
    }
    bytes
}

/// Recover the index from a [`pattern`] element.
pub fn pattern_index(bytes: &[u8]) -> u64 {
    let width = index_width(bytes.len());
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[..width]);
    u64::from_le_bytes(buf)
}

/// `count` distinct elements whose non-index bytes are seeded random.
///
/// Element `i` still starts with its index, so the set stays distinct.
pub fn random_patterns(count: u64, element_size: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let width = index_width(element_size);
    (0..count)
        .map(|i| {
            let mut bytes = pattern(i, element_size);
            rng.fill_bytes(&mut bytes[width..]);
            bytes
        })
        .collect()
}

/// Element identifying insertion `seq` of writer `thread` (8 bytes).
pub fn thread_element(thread: u32, seq: u32) -> [u8; 8] {
    ((u64::from(thread) << 32) | u64::from(seq)).to_le_bytes()
}

/// Split a [`thread_element`] back into `(thread, seq)`.
pub fn split_thread_element(bytes: &[u8]) -> (u32, u32) {
    let value = pattern_index(bytes);
    ((value >> 32) as u32, value as u32)
}

/// A store plus a record of what was inserted into it.
pub struct StoreFixture {
    pub store: Arc<ChunkStore>,
    pub inserted: Vec<Vec<u8>>,
}

impl StoreFixture {
    /// Create an empty fixture store.
    pub fn new(initial_capacity: usize, element_size: usize) -> Self {
        Self {
            store: Arc::new(
                ChunkStore::create(initial_capacity, element_size).expect("fixture store"),
            ),
            inserted: Vec::new(),
        }
    }

    pub fn element_size(&self) -> usize {
        self.store.element_size()
    }

    /// Insert the next `count` pattern elements.
    pub fn fill(&mut self, count: u64) -> &mut Self {
        let start = self.inserted.len() as u64;
        for index in start..start + count {
            let element = pattern(index, self.element_size());
            self.store.insert(&element).expect("fixture insert");
            self.inserted.push(element);
        }
        self
    }

    /// Insert the given elements in order.
    pub fn insert_all(&mut self, elements: &[Vec<u8>]) -> &mut Self {
        for element in elements {
            self.store.insert(element).expect("fixture insert");
            self.inserted.push(element.clone());
        }
        self
    }

    /// Everything a full scan visits.
    pub fn scanned(&self) -> Vec<Vec<u8>> {
        let mut seen = Vec::new();
        let count = self.store.scan(|bytes| seen.push(bytes.to_vec()));
        assert_eq!(count, seen.len() as u64);
        seen
    }

    /// Everything a fresh cursor yields through `next_element`.
    pub fn cursored(&self) -> Vec<Vec<u8>> {
        let mut cursor = self.store.cursor();
        let mut out = vec![0u8; self.element_size()];
        let mut seen = Vec::new();
        while self
            .store
            .next_element(&mut cursor, &mut out)
            .expect("fixture cursor")
        {
            seen.push(out.clone());
        }
        seen
    }
}

/// Run `threads` writers, each inserting `per_thread` [`thread_element`]s.
///
/// The store must hold 8-byte elements. Returns every inserted element.
pub fn concurrent_insert(store: &Arc<ChunkStore>, threads: u32, per_thread: u32) -> Vec<[u8; 8]> {
    assert_eq!(store.element_size(), 8, "thread elements are 8 bytes");

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|thread| {
                let store = Arc::clone(store);
                s.spawn(move || {
                    (0..per_thread)
                        .map(|seq| {
                            let element = thread_element(thread, seq);
                            store.insert(&element).expect("concurrent insert");
                            element
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|h| h.join().expect("writer thread panicked"))
            .collect()
    })
}
