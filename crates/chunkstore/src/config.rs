//! Store sizing configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::typed::Element;

/// Smallest number of elements a chunk holds. Smaller requests are raised to this.
pub const MIN_CHUNK_CAPACITY: usize = 100;

/// Largest number of elements a single chunk may hold.
pub const MAX_CHUNK_CAPACITY: usize = 0x7fff_ffff;

/// Sizing parameters for a [`ChunkStore`](crate::ChunkStore).
///
/// Both values are fixed for the lifetime of the store built from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Requested elements per chunk; raised to [`MIN_CHUNK_CAPACITY`] if lower.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Bytes per element.
    pub element_size: usize,
}

fn default_initial_capacity() -> usize {
    MIN_CHUNK_CAPACITY
}

impl StoreConfig {
    /// Create a config for `element_size`-byte elements.
    pub fn new(initial_capacity: usize, element_size: usize) -> Self {
        Self {
            initial_capacity,
            element_size,
        }
    }

    /// Create a config sized for elements of type `T`.
    pub fn for_element<T: Element>(initial_capacity: usize) -> Self {
        Self::new(initial_capacity, T::SIZE)
    }

    /// Effective elements per chunk after applying the floor.
    pub fn chunk_capacity(&self) -> usize {
        self.initial_capacity.max(MIN_CHUNK_CAPACITY)
    }

    /// Bytes occupied by one chunk's slot array.
    ///
    /// Fails if the parameters are invalid or the product overflows.
    pub fn chunk_bytes(&self) -> Result<usize> {
        self.validate()?;
        let capacity = self.chunk_capacity();
        capacity
            .checked_mul(self.element_size)
            .ok_or(StoreError::CapacityOverflow {
                capacity,
                element_size: self.element_size,
            })
    }

    /// Check the parameters without allocating anything.
    pub fn validate(&self) -> Result<()> {
        if self.element_size == 0 {
            return Err(StoreError::InvalidElementSize);
        }
        let capacity = self.chunk_capacity();
        if capacity > MAX_CHUNK_CAPACITY {
            return Err(StoreError::CapacityTooLarge {
                requested: capacity,
                max: MAX_CHUNK_CAPACITY,
            });
        }
        Ok(())
    }
}
