//! Error types for the chunk store.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Element size must be at least one byte.
    #[error("element size must be greater than zero")]
    InvalidElementSize,

    /// Requested chunk capacity is above the per-chunk element ceiling.
    #[error("chunk capacity {requested} exceeds maximum of {max} elements")]
    CapacityTooLarge { requested: usize, max: usize },

    /// A chunk's byte size does not fit in the address space.
    #[error("chunk of {capacity} elements x {element_size} bytes overflows usize")]
    CapacityOverflow {
        capacity: usize,
        element_size: usize,
    },

    /// A chunk's slot array could not be allocated.
    #[error("failed to allocate {bytes} bytes for chunk storage")]
    Allocation {
        bytes: usize,
        #[source]
        source: TryReserveError,
    },

    /// The insertion lock is poisoned by a writer that panicked while holding it.
    #[error("insertion lock poisoned")]
    LockPoisoned,

    /// A caller buffer does not match the store's element size.
    #[error("element size mismatch: expected {expected} bytes, got {actual}")]
    ElementSize { expected: usize, actual: usize },

    /// A cursor was used with a store it was not created from.
    #[error("cursor does not belong to this store")]
    ForeignCursor,

    /// Destruction requested while other handles still reference the store.
    #[error("store is still referenced by {handles} other handle(s)")]
    InUse { handles: usize },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
