//! # chunkstore
//!
//! An append-optimized, thread-safe sequence container for fixed-size
//! elements.
//!
//! ## Overview
//!
//! Elements live in a chain of fixed-capacity chunks. Insertions from any
//! number of threads are serialized by a single insertion lock and always
//! append to the tail chunk, growing the chain when it fills. Reads never take
//! the lock: they walk the chain directly, relying on ordered publication of
//! slot contents and chunk links.
//!
//! ## Key Types
//!
//! - [`ChunkStore`] - The container: create, insert, scan, destroy
//! - [`Cursor`] - Independent pull-style iteration state
//! - [`TypedStore`] - Typed facade for any [`Element`]
//! - [`StoreConfig`] - Sizing parameters
//! - [`StoreError`] - Everything that can fail
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chunkstore::ChunkStore;
//!
//! let store = Arc::new(ChunkStore::create(1000, 4).unwrap());
//!
//! let writers: Vec<_> = (0..4u32)
//!     .map(|t| {
//!         let store = Arc::clone(&store);
//!         std::thread::spawn(move || {
//!             for i in 0..100u32 {
//!                 store.insert(&(t * 1000 + i).to_le_bytes()).unwrap();
//!             }
//!         })
//!     })
//!     .collect();
//! for w in writers {
//!     w.join().unwrap();
//! }
//!
//! // Push-style traversal.
//! assert_eq!(store.scan(|_bytes| {}), 400);
//!
//! // Pull-style traversal.
//! let mut cursor = store.cursor();
//! let mut out = [0u8; 4];
//! let mut count = 0;
//! while store.next_element(&mut cursor, &mut out).unwrap() {
//!     count += 1;
//! }
//! assert_eq!(count, 400);
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: no update, delete, sort or lookup; chunks are freed only
//!   when the whole store is destroyed
//! - **Weakly consistent reads**: readers see a prefix of the insertion order
//!   that may grow while they run
//! - **Cursors are not snapshots**: they observe elements appended after reset
//! - **Capacity floor**: chunks hold at least [`MIN_CHUNK_CAPACITY`] elements

mod chunk;
pub mod config;
pub mod copy;
pub mod cursor;
pub mod error;
pub mod store;
pub mod typed;

pub use config::{StoreConfig, MAX_CHUNK_CAPACITY, MIN_CHUNK_CAPACITY};
pub use copy::CopyStrategy;
pub use cursor::{Cursor, CursorState};
pub use error::{Result, StoreError};
pub use store::{ChunkStore, StoreStats};
pub use typed::{Element, TypedCursor, TypedStore};
