//! Sorted sets of 13-bit integers, bit-packed into a byte slice.
//!
//! Element `i` occupies bits `13*i .. 13*i + 13`, least significant bit first, so `n`
//! elements take exactly [`byte_len(n)`](byte_len) bytes. The count is not stored; the
//! owner (a multiroar chunk) keeps it next to the packed bytes.
//!
//! # Example
//! ```rust
//! # use varint_codecs::packed::{self, Packed13};
//! let mut buf = vec![0_u8; packed::byte_len(3)];
//! let mut set = Packed13::new(&mut buf[..], 0).unwrap();
//! set.insert_sorted(8000).unwrap();
//! set.insert_sorted(7).unwrap();
//! set.insert_sorted(300).unwrap();
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![7, 300, 8000]);
//! assert_eq!(set.member(300), Some(1));
//! ```

use bitvec::{field::BitField, prelude as bv};

use crate::error::{Error, Result};

/// bits per element
pub const BITS: usize = 13;
/// largest storable value
pub const MAX_VALUE: u16 = (1 << BITS) - 1;

/// bytes needed for `count` elements
#[inline]
pub fn byte_len(count: usize) -> usize {
    (count * BITS).div_ceil(8)
}

/// how many elements fit into `bytes` bytes
#[inline]
pub fn count_from_bytes(bytes: usize) -> usize {
    bytes * 8 / BITS
}

/// A view of `len` packed elements at the start of `B`.
///
/// Reading needs `B: AsRef<[u8]>`, mutation additionally `AsMut<[u8]>`.
#[derive(Debug, Clone)]
pub struct Packed13<B> {
    buf: B,
    len: usize,
}

impl<B: AsRef<[u8]>> Packed13<B> {
    /// Wraps `buf` holding `len` elements
    pub fn new(buf: B, len: usize) -> Result<Self> {
        let needed = byte_len(len);
        let available = buf.as_ref().len();
        if available < needed {
            return Err(Error::BufferTooShort { needed, available });
        }
        Ok(Packed13 { buf, len })
    }

    fn bits(&self) -> &bv::BitSlice<u8, bv::Lsb0> {
        bv::BitSlice::from_slice(self.buf.as_ref())
    }

    /// number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// true if there are no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// elements the buffer could hold without growing
    pub fn capacity(&self) -> usize {
        count_from_bytes(self.buf.as_ref().len())
    }

    /// element at `i`
    pub fn get(&self, i: usize) -> Result<u16> {
        if i >= self.len {
            return Err(Error::OutOfRange);
        }
        Ok(self.load(i))
    }

    #[inline]
    fn load(&self, i: usize) -> u16 {
        self.bits()[i * BITS..(i + 1) * BITS].load_le()
    }

    /// Binary search over sorted contents, same contract as [`slice::binary_search`]
    pub fn binary_search(&self, v: u16) -> std::result::Result<usize, usize> {
        let (mut lo, mut hi) = (0, self.len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.load(mid).cmp(&v) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }

    /// index of `v` if present
    pub fn member(&self, v: u16) -> Option<usize> {
        self.binary_search(v).ok()
    }

    /// elements in storage order
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len).map(move |i| self.load(i))
    }

    /// gives the buffer back
    pub fn into_inner(self) -> B {
        self.buf
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Packed13<B> {
    fn bits_mut(&mut self) -> &mut bv::BitSlice<u8, bv::Lsb0> {
        bv::BitSlice::from_slice_mut(self.buf.as_mut())
    }

    /// Overwrites element `i`
    pub fn set(&mut self, i: usize, v: u16) -> Result<()> {
        if i >= self.len {
            return Err(Error::OutOfRange);
        }
        check_value(v)?;
        self.store(i, v);
        Ok(())
    }

    /// Appends without any ordering check; used when filling from an already sorted source
    pub fn push(&mut self, v: u16) -> Result<()> {
        check_value(v)?;
        self.ensure_room()?;
        self.len += 1;
        self.store(self.len - 1, v);
        Ok(())
    }

    #[inline]
    fn store(&mut self, i: usize, v: u16) {
        self.bits_mut()[i * BITS..(i + 1) * BITS].store_le(v);
    }

    fn ensure_room(&self) -> Result<()> {
        let needed = byte_len(self.len + 1);
        let available = self.buf.as_ref().len();
        if available < needed {
            return Err(Error::BufferTooShort { needed, available });
        }
        Ok(())
    }

    /// Inserts `v` at index `i`, shifting the tail up by one slot
    pub fn insert(&mut self, i: usize, v: u16) -> Result<()> {
        if i > self.len {
            return Err(Error::OutOfRange);
        }
        check_value(v)?;
        self.ensure_room()?;
        if i < self.len {
            let end = (self.len + 1) * BITS;
            self.bits_mut()[i * BITS..end].shift_right(BITS);
        }
        self.len += 1;
        self.store(i, v);
        Ok(())
    }

    /// Inserts `v` keeping the contents sorted, returns its index.
    /// Duplicates are allowed; callers wanting set semantics check [`member`](Self::member) first.
    pub fn insert_sorted(&mut self, v: u16) -> Result<usize> {
        let i = match self.binary_search(v) {
            Ok(i) | Err(i) => i,
        };
        self.insert(i, v)?;
        Ok(i)
    }

    /// Removes element `i`, shifting the tail down; the freed slot is zeroed
    pub fn delete(&mut self, i: usize) -> Result<u16> {
        let v = self.get(i)?;
        if i + 1 < self.len {
            let end = self.len * BITS;
            self.bits_mut()[i * BITS..end].shift_left(BITS);
        } else {
            self.store(i, 0);
        }
        self.len -= 1;
        Ok(v)
    }

    /// Removes `v` if present
    pub fn delete_member(&mut self, v: u16) -> bool {
        match self.member(v) {
            Some(i) => self.delete(i).is_ok(),
            None => false,
        }
    }
}

fn check_value(v: u16) -> Result<()> {
    if v > MAX_VALUE {
        Err(Error::OutOfRange)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};

    #[test]
    fn test_sizes() {
        assert_eq!(byte_len(0), 0);
        assert_eq!(byte_len(1), 2);
        assert_eq!(byte_len(8), 13);
        assert_eq!(byte_len(629), 1023);
        assert_eq!(count_from_bytes(2), 1);
        assert_eq!(count_from_bytes(13), 8);
        assert_eq!(count_from_bytes(1024), 630);
    }

    #[test]
    fn test_bit_layout() {
        let mut buf = vec![0_u8; byte_len(2)];
        let mut p = Packed13::new(&mut buf[..], 0).unwrap();
        p.push(MAX_VALUE).unwrap();
        p.push(1).unwrap();
        // 13 ones, then the second element starts at bit 13
        assert_eq!(buf, vec![0xFF, 0x1F | (1 << 5), 0, 0]);
    }

    #[test]
    fn test_insert_sorted_random() {
        let mut rng = rand::thread_rng();
        let dist = Uniform::from(0..=MAX_VALUE);
        let mut buf = vec![0_u8; byte_len(500)];
        let mut p = Packed13::new(&mut buf[..], 0).unwrap();
        let mut reference = Vec::new();
        for _ in 0..500 {
            let v = dist.sample(&mut rng);
            p.insert_sorted(v).unwrap();
            reference.push(v);
        }
        reference.sort_unstable();
        assert_eq!(p.iter().collect::<Vec<_>>(), reference);
        for (i, &v) in reference.iter().enumerate() {
            assert_eq!(p.get(i).unwrap(), v);
            assert_eq!(p.load(p.member(v).unwrap()), v);
        }
        assert!(matches!(p.insert_sorted(1), Err(Error::BufferTooShort { .. })));
    }

    #[test]
    fn test_delete() {
        let mut buf = vec![0_u8; byte_len(5)];
        let mut p = Packed13::new(&mut buf[..], 0).unwrap();
        for v in [10, 20, 30, 40, 50] {
            p.push(v).unwrap();
        }
        assert!(p.delete_member(30));
        assert!(!p.delete_member(31));
        assert_eq!(p.iter().collect::<Vec<_>>(), vec![10, 20, 40, 50]);
        assert_eq!(p.delete(0).unwrap(), 10);
        assert_eq!(p.delete(2).unwrap(), 50);
        assert_eq!(p.iter().collect::<Vec<_>>(), vec![20, 40]);
        assert_eq!(p.delete(2), Err(Error::OutOfRange));
        // freed slots are zero, so the bytes past the live elements are clean
        let len = p.len();
        drop(p);
        assert!(buf[byte_len(len)..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_and_bounds() {
        let mut buf = vec![0_u8; byte_len(3)];
        let mut p = Packed13::new(&mut buf[..], 3).unwrap();
        p.set(1, 4242).unwrap();
        assert_eq!(p.get(1).unwrap(), 4242);
        assert_eq!(p.set(3, 1), Err(Error::OutOfRange));
        assert_eq!(p.set(0, 8192), Err(Error::OutOfRange));
        assert_eq!(p.insert(5, 1), Err(Error::OutOfRange));
        assert!(Packed13::new(&buf[..2], 2).is_err());
        assert_eq!(Packed13::new(&buf[..], 0).unwrap().capacity(), 3);
    }

    #[test]
    fn test_binary_search() {
        let mut buf = vec![0_u8; byte_len(4)];
        let mut p = Packed13::new(&mut buf[..], 0).unwrap();
        for v in [2, 4, 6, 8] {
            p.push(v).unwrap();
        }
        assert_eq!(p.binary_search(6), Ok(2));
        assert_eq!(p.binary_search(5), Err(2));
        assert_eq!(p.binary_search(9), Err(4));
        assert_eq!(p.member(1), None);
    }
}
