//! # chunkstore testkit
//!
//! Testing utilities for `chunkstore`.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic element patterns, a store wrapper that records
//!   what was inserted, and a concurrent-writer harness
//! - **Generators**: Proptest strategies for store parameters and elements
//! - **Tracing**: a one-call subscriber setup for tests that want log output
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chunkstore_testkit::{StoreFixture, StoreParams};
//!
//! proptest! {
//!     #[test]
//!     fn scan_matches_inserts(params: StoreParams) {
//!         let mut fixture = StoreFixture::new(params.initial_capacity, params.element_size);
//!         fixture.fill(params.count);
//!         prop_assert_eq!(fixture.scanned(), fixture.inserted.clone());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use chunkstore_testkit::fixtures::StoreFixture;
//!
//! let mut fixture = StoreFixture::new(100, 4);
//! fixture.fill(101);
//! assert_eq!(fixture.store.chunk_lengths(), vec![100, 1]);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    concurrent_insert, pattern, pattern_index, random_patterns, split_thread_element,
    thread_element, StoreFixture,
};
pub use generators::StoreParams;

/// Install a debug-level fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}
