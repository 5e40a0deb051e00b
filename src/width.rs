//! The width vocabulary: how many bytes a fixed-width encoding occupies.
//!
//! Persisted as a single `u8` holding the byte count.

use crate::error::{Error, Result};

/// Byte width of a fixed-width encoding, 1 to 16 bytes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Width {
    W1 = 1,
    W2 = 2,
    W3 = 3,
    W4 = 4,
    W5 = 5,
    W6 = 6,
    W7 = 7,
    W8 = 8,
    W9 = 9,
    W10 = 10,
    W11 = 11,
    W12 = 12,
    W13 = 13,
    W14 = 14,
    W15 = 15,
    W16 = 16,
}

const ALL: [Width; 16] = [
    Width::W1, Width::W2, Width::W3, Width::W4,
    Width::W5, Width::W6, Width::W7, Width::W8,
    Width::W9, Width::W10, Width::W11, Width::W12,
    Width::W13, Width::W14, Width::W15, Width::W16,
];

impl Width {
    /// number of bytes
    #[inline]
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Width from a byte count, `None` outside 1..=16
    /// ```rust
    /// # use varint_codecs::width::Width;
    /// assert_eq!(Width::from_bytes(3), Some(Width::W3));
    /// assert_eq!(Width::from_bytes(0), None);
    /// assert_eq!(Width::from_bytes(17), None);
    /// ```
    pub fn from_bytes(n: usize) -> Option<Width> {
        if (1..=16).contains(&n) {
            Some(ALL[n - 1])
        } else {
            None
        }
    }

    /// smallest width holding `v`; zero still takes one byte
    #[inline]
    pub fn for_u64(v: u64) -> Width {
        let bytes = (u64::BITS - v.leading_zeros()).div_ceil(8).max(1);
        ALL[bytes as usize - 1]
    }

    /// smallest width holding a 128bit value
    #[inline]
    pub fn for_u128(v: u128) -> Width {
        let bytes = (u128::BITS - v.leading_zeros()).div_ceil(8).max(1);
        ALL[bytes as usize - 1]
    }

    /// largest value storable in this many bytes (saturating at `u64::MAX` for width >= 8)
    #[inline]
    pub fn max_u64(self) -> u64 {
        if self.bytes() >= 8 {
            u64::MAX
        } else {
            (1_u64 << (8 * self.bytes())) - 1
        }
    }
}

impl TryFrom<u8> for Width {
    type Error = Error;

    fn try_from(b: u8) -> Result<Self> {
        Width::from_bytes(b as usize).ok_or(Error::InvalidWidth(b))
    }
}

impl From<Width> for u8 {
    fn from(w: Width) -> u8 {
        w as u8
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_for_u64() {
        assert_eq!(Width::for_u64(0), Width::W1);
        assert_eq!(Width::for_u64(255), Width::W1);
        assert_eq!(Width::for_u64(256), Width::W2);
        assert_eq!(Width::for_u64(u32::MAX as u64), Width::W4);
        assert_eq!(Width::for_u64(1 << 32), Width::W5);
        assert_eq!(Width::for_u64(u64::MAX), Width::W8);
    }

    #[test]
    fn test_for_u128() {
        assert_eq!(Width::for_u128(u64::MAX as u128), Width::W8);
        assert_eq!(Width::for_u128(1 << 64), Width::W9);
        assert_eq!(Width::for_u128(u128::MAX), Width::W16);
    }

    #[test]
    fn test_tag_byte() {
        for b in 1..=16_u8 {
            let w = Width::try_from(b).unwrap();
            assert_eq!(u8::from(w), b);
            assert_eq!(w.bytes(), b as usize);
        }
        assert_eq!(Width::try_from(0), Err(Error::InvalidWidth(0)));
        assert_eq!(Width::try_from(17), Err(Error::InvalidWidth(17)));
    }

    #[test]
    fn test_max() {
        assert_eq!(Width::W1.max_u64(), 255);
        assert_eq!(Width::W3.max_u64(), (1 << 24) - 1);
        assert_eq!(Width::W8.max_u64(), u64::MAX);
        assert_eq!(Width::W12.max_u64(), u64::MAX);
    }
}
