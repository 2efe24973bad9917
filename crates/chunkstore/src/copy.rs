//! Element copy routine.
//!
//! Every element copy in the crate, into a slot or out to a caller buffer,
//! goes through [`CopyStrategy::copy`]. Sizes of 1, 2, 4 and 8 bytes get a
//! fixed-width copy; everything else uses a plain byte-range copy. The choice
//! is made once per store and never affects what a caller observes.

use serde::{Deserialize, Serialize};

/// How elements of a given size are copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStrategy {
    Word8,
    Word16,
    Word32,
    Word64,
    /// Generic copy of this many bytes.
    Bytes(usize),
}

impl CopyStrategy {
    /// Pick the strategy for `element_size`-byte elements.
    pub fn for_size(element_size: usize) -> Self {
        match element_size {
            1 => CopyStrategy::Word8,
            2 => CopyStrategy::Word16,
            4 => CopyStrategy::Word32,
            8 => CopyStrategy::Word64,
            n => CopyStrategy::Bytes(n),
        }
    }

    /// Number of bytes moved per copy.
    pub fn width(self) -> usize {
        match self {
            CopyStrategy::Word8 => 1,
            CopyStrategy::Word16 => 2,
            CopyStrategy::Word32 => 4,
            CopyStrategy::Word64 => 8,
            CopyStrategy::Bytes(n) => n,
        }
    }

    /// Copy one element from `src` into `dst`.
    ///
    /// Both slices must be exactly [`width`](Self::width) bytes long.
    #[inline]
    pub fn copy(self, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(src.len(), self.width());
        debug_assert_eq!(dst.len(), self.width());
        match self {
            CopyStrategy::Word8 => dst[0] = src[0],
            CopyStrategy::Word16 => copy_word::<2>(src, dst),
            CopyStrategy::Word32 => copy_word::<4>(src, dst),
            CopyStrategy::Word64 => copy_word::<8>(src, dst),
            CopyStrategy::Bytes(_) => dst.copy_from_slice(src),
        }
    }
}

#[inline(always)]
fn copy_word<const N: usize>(src: &[u8], dst: &mut [u8]) {
    dst[..N].copy_from_slice(&src[..N]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_selection() {
        assert_eq!(CopyStrategy::for_size(1), CopyStrategy::Word8);
        assert_eq!(CopyStrategy::for_size(2), CopyStrategy::Word16);
        assert_eq!(CopyStrategy::for_size(3), CopyStrategy::Bytes(3));
        assert_eq!(CopyStrategy::for_size(4), CopyStrategy::Word32);
        assert_eq!(CopyStrategy::for_size(8), CopyStrategy::Word64);
        assert_eq!(CopyStrategy::for_size(16), CopyStrategy::Bytes(16));
    }

    #[test]
    fn test_copy_every_width() {
        for size in [1usize, 2, 3, 4, 5, 8, 16, 33] {
            let strategy = CopyStrategy::for_size(size);
            assert_eq!(strategy.width(), size);

            let src: Vec<u8> = (0..size as u8).map(|b| b.wrapping_mul(37) ^ 0x5a).collect();
            let mut dst = vec![0u8; size];
            strategy.copy(&src, &mut dst);
            assert_eq!(src, dst, "size {}", size);
        }
    }
}
