//! Typed facade over the byte store.
//!
//! [`TypedStore<T>`] fixes the element size to `T::SIZE` and converts values
//! at the boundary, so callers never handle raw byte buffers.

use std::marker::PhantomData;

use crate::config::StoreConfig;
use crate::cursor::Cursor;
use crate::error::Result;
use crate::store::{ChunkStore, StoreStats};

/// Values up to this size are encoded on the stack before insertion.
const INLINE_ELEMENT_BYTES: usize = 64;

/// A fixed-size value that can be stored in a [`ChunkStore`].
///
/// `write_to` and `read_from` always receive exactly `SIZE` bytes.
pub trait Element: Sized {
    /// Encoded size in bytes. Must be non-zero.
    const SIZE: usize;

    fn write_to(&self, out: &mut [u8]);

    fn read_from(bytes: &[u8]) -> Self;
}

macro_rules! impl_element_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Element for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn write_to(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                fn read_from(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_element_le!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl<const N: usize> Element for [u8; N] {
    const SIZE: usize = N;

    fn write_to(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }

    fn read_from(bytes: &[u8]) -> Self {
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        buf
    }
}

/// A [`ChunkStore`] holding values of type `T`.
#[derive(Debug)]
pub struct TypedStore<T: Element> {
    inner: ChunkStore,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Element> TypedStore<T> {
    /// Create a store with the minimum chunk capacity.
    pub fn new() -> Result<Self> {
        Self::with_capacity(0)
    }

    /// Create a store holding `initial_capacity` elements per chunk (floor applies).
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Ok(Self {
            inner: ChunkStore::with_config(StoreConfig::for_element::<T>(initial_capacity))?,
            _marker: PhantomData,
        })
    }

    /// Encode `value` and append it. On error nothing is stored.
    pub fn insert(&self, value: &T) -> Result<()> {
        if T::SIZE <= INLINE_ELEMENT_BYTES {
            let mut buf = [0u8; INLINE_ELEMENT_BYTES];
            let buf = &mut buf[..T::SIZE];
            value.write_to(buf);
            self.inner.insert(buf)
        } else {
            let mut buf = vec![0u8; T::SIZE];
            value.write_to(&mut buf);
            self.inner.insert(&buf)
        }
    }

    /// Call `callback` with every value in insertion order; returns the count.
    pub fn scan<F>(&self, mut callback: F) -> u64
    where
        F: FnMut(T),
    {
        self.inner.scan(|bytes| callback(T::read_from(bytes)))
    }

    /// A cursor positioned before the first value.
    pub fn cursor(&self) -> TypedCursor<'_, T> {
        TypedCursor {
            inner: self.inner.cursor(),
            _marker: PhantomData,
        }
    }

    /// Same as [`cursor`](Self::cursor), for `for` loops and adapters.
    pub fn iter(&self) -> TypedCursor<'_, T> {
        self.cursor()
    }

    /// Number of published values.
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.stats()
    }

    /// The underlying byte store.
    pub fn as_bytes_store(&self) -> &ChunkStore {
        &self.inner
    }

    /// Release every chunk; see [`ChunkStore::destroy`].
    pub fn destroy(self) -> StoreStats {
        self.inner.destroy()
    }
}

/// Typed cursor returned by [`TypedStore::cursor`]. Not fused, like [`Cursor`].
#[derive(Debug, Clone)]
pub struct TypedCursor<'s, T: Element> {
    inner: Cursor<'s>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Element> TypedCursor<'_, T> {
    /// Rewind to the first value.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<T: Element> Iterator for TypedCursor<'_, T> {
    type Item = T;

    // Decodes straight from the published slot; the slot is always `T::SIZE`
    // bytes because the store was built for `T`.
    fn next(&mut self) -> Option<T> {
        self.inner.advance().map(T::read_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_round_trip() {
        let store = TypedStore::<u64>::new().unwrap();
        for v in 0..300u64 {
            store.insert(&(v * 3)).unwrap();
        }

        let mut scanned = Vec::new();
        assert_eq!(store.scan(|v| scanned.push(v)), 300);

        let iterated: Vec<u64> = store.iter().collect();
        assert_eq!(scanned, iterated);
        assert_eq!(iterated[299], 897);
        assert_eq!(store.stats().chunks, 3);
    }

    #[test]
    fn test_signed_and_float_elements() {
        let ints = TypedStore::<i16>::with_capacity(10).unwrap();
        ints.insert(&-1).unwrap();
        ints.insert(&i16::MIN).unwrap();
        assert_eq!(ints.iter().collect::<Vec<_>>(), vec![-1, i16::MIN]);

        let floats = TypedStore::<f64>::new().unwrap();
        floats.insert(&1.5).unwrap();
        floats.insert(&-0.25).unwrap();
        assert_eq!(floats.iter().collect::<Vec<_>>(), vec![1.5, -0.25]);
    }

    #[test]
    fn test_byte_array_elements() {
        let store = TypedStore::<[u8; 5]>::new().unwrap();
        assert_eq!(store.as_bytes_store().element_size(), 5);

        store.insert(&[1, 2, 3, 4, 5]).unwrap();
        store.insert(&[9; 5]).unwrap();

        let mut cursor = store.iter();
        assert_eq!(cursor.next(), Some([1, 2, 3, 4, 5]));
        assert_eq!(cursor.next(), Some([9; 5]));
        assert_eq!(cursor.next(), None);

        cursor.reset();
        assert_eq!(cursor.count(), 2);
    }

    #[test]
    fn test_large_elements_round_trip() {
        let store = TypedStore::<[u8; 100]>::new().unwrap();
        let mut value = [0u8; 100];
        for i in 0..150u8 {
            value[0] = i;
            value[99] = !i;
            store.insert(&value).unwrap();
        }

        let values: Vec<[u8; 100]> = store.cursor().collect();
        assert_eq!(values.len(), 150);
        assert!(values
            .iter()
            .enumerate()
            .all(|(i, v)| v[0] == i as u8 && v[99] == !(i as u8) && v[1..99] == [0u8; 98]));
        assert_eq!(store.stats().chunks, 2);
    }

    #[test]
    fn test_typed_cursor_resumes_after_growth() {
        let store = TypedStore::<u32>::with_capacity(100).unwrap();
        let mut cursor = store.cursor();
        assert_eq!(cursor.next(), None);

        for v in 0..100u32 {
            store.insert(&v).unwrap();
        }
        assert_eq!(cursor.by_ref().count(), 100);
        assert_eq!(cursor.next(), None);

        store.insert(&100).unwrap();
        assert_eq!(cursor.next(), Some(100));
        assert_eq!(cursor.next(), None);
    }

    #[test]
    fn test_typed_destroy() {
        let store = TypedStore::<u8>::new().unwrap();
        assert!(store.is_empty());
        store.insert(&1).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.destroy().elements, 1);
    }
}
