//! Proptest generators for property-based testing.

use proptest::prelude::*;

use chunkstore::MIN_CHUNK_CAPACITY;

use crate::fixtures::pattern;

/// Element sizes covering every copy fast path and the generic path.
pub fn element_size() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(1usize),
        Just(2),
        Just(3),
        Just(4),
        Just(5),
        Just(8),
        Just(16),
        9usize..=64,
    ]
}

/// Requested chunk capacities, on both sides of the floor.
pub fn initial_capacity() -> impl Strategy<Value = usize> {
    prop_oneof![
        0usize..MIN_CHUNK_CAPACITY,
        Just(MIN_CHUNK_CAPACITY),
        MIN_CHUNK_CAPACITY..=3 * MIN_CHUNK_CAPACITY,
    ]
}

/// Arbitrary element bytes of exactly `element_size`.
pub fn element(element_size: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), element_size)
}

/// Parameters for building and filling a store.
#[derive(Debug, Clone)]
pub struct StoreParams {
    pub initial_capacity: usize,
    pub element_size: usize,
    /// Number of distinct elements to insert.
    pub count: u64,
}

impl StoreParams {
    /// Effective chunk capacity for these parameters.
    pub fn chunk_capacity(&self) -> usize {
        self.initial_capacity.max(MIN_CHUNK_CAPACITY)
    }

    /// The distinct elements to insert, in order.
    pub fn elements(&self) -> Vec<Vec<u8>> {
        (0..self.count)
            .map(|i| pattern(i, self.element_size))
            .collect()
    }
}

impl Arbitrary for StoreParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (initial_capacity(), element_size(), 0u64..=700)
            .prop_map(|(initial_capacity, element_size, count)| {
                // One-byte elements only have 256 distinct values.
                let count = if element_size == 1 { count.min(256) } else { count };
                StoreParams {
                    initial_capacity,
                    element_size,
                    count,
                }
            })
            .boxed()
    }
}
