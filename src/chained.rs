//! Chained varints, SQLite flavour: 7-bit groups, most significant group first,
//! high bit set on every byte except the last.
//!
//! A value with any of its top 8 bits set takes 9 bytes, and the 9th byte carries
//! a full 8 bits, so the maximum length is 9 instead of 10.
//!
//! ```text
//!  7 bits - A
//! 14 bits - BA
//! ...
//! 56 bits - BBBBBBBA
//! 64 bits - BBBBBBBBC
//! ```
//! (`A` = `0xxxxxxx`, `B` = `1xxxxxxx`, `C` = `xxxxxxxx`)

use crate::error::{ensure_len, Error, Result};

/// longest encoding
pub const MAX_LEN: usize = 9;

/// encoded length of `v`
pub fn len(v: u64) -> usize {
    if v >> 56 != 0 {
        return MAX_LEN;
    }
    let bits = (u64::BITS - v.leading_zeros()).max(1);
    bits.div_ceil(7) as usize
}

fn encode(v: u64) -> ([u8; MAX_LEN], usize) {
    let mut p = [0_u8; MAX_LEN];
    if v >> 56 != 0 {
        p[8] = v as u8;
        let mut rest = v >> 8;
        for slot in p[..8].iter_mut().rev() {
            *slot = (rest & 0x7f) as u8 | 0x80;
            rest >>= 7;
        }
        return (p, MAX_LEN);
    }
    let n = len(v);
    let mut rest = v;
    for (i, slot) in p[..n].iter_mut().enumerate().rev() {
        let cont = if i == n - 1 { 0 } else { 0x80 };
        *slot = (rest & 0x7f) as u8 | cont;
        rest >>= 7;
    }
    (p, n)
}

/// Writes `v` at the start of `buf`, returns bytes written
pub fn put(buf: &mut [u8], v: u64) -> Result<usize> {
    let (p, n) = encode(v);
    ensure_len(buf, n)?;
    buf[..n].copy_from_slice(&p[..n]);
    Ok(n)
}

/// Appends `v` to `out`
pub fn push(out: &mut Vec<u8>, v: u64) -> usize {
    let (p, n) = encode(v);
    out.extend_from_slice(&p[..n]);
    n
}

/// Reads one varint, returns `(value, bytes_read)`
pub fn get(buf: &[u8]) -> Result<(u64, usize)> {
    let mut v = 0_u64;
    for i in 0..MAX_LEN {
        ensure_len(buf, i + 1)?;
        let b = buf[i];
        if i == MAX_LEN - 1 {
            return Ok(((v << 8) | b as u64, MAX_LEN));
        }
        v = (v << 7) | (b & 0x7f) as u64;
        if b & 0x80 == 0 {
            return Ok((v, i + 1));
        }
    }
    Err(Error::MalformedInput("chained varint longer than 9 bytes"))
}

/// Encoded length, found by scanning continuation bits
pub fn len_of_encoded(buf: &[u8]) -> Result<usize> {
    for (i, b) in buf.iter().take(MAX_LEN).enumerate() {
        if b & 0x80 == 0 || i == MAX_LEN - 1 {
            return Ok(i + 1);
        }
    }
    Err(Error::BufferTooShort { needed: buf.len() + 1, available: buf.len() })
}

/// Adds `add` to the varint at `buf`; writes only if the length does not grow.
/// Returns the new length.
pub fn add_no_grow(buf: &mut [u8], add: i64) -> Result<usize> {
    add_impl(buf, add, false)
}

/// Adds `add` to the varint at `buf`, rewriting it at its new length.
pub fn add_grow(buf: &mut [u8], add: i64) -> Result<usize> {
    add_impl(buf, add, true)
}

fn add_impl(buf: &mut [u8], add: i64, grow: bool) -> Result<usize> {
    let (current, old_len) = get(buf)?;
    let updated = current.checked_add_signed(add).ok_or(Error::Overflow)?;
    let new_len = len(updated);
    if new_len > old_len && !grow {
        return Ok(new_len);
    }
    put(buf, updated)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};

    #[test]
    fn test_layouts() {
        let mut out = Vec::new();
        push(&mut out, 0x7f);
        assert_eq!(out, vec![0x7f]);
        out.clear();
        push(&mut out, 0x80);
        assert_eq!(out, vec![0x81, 0x00]);
        out.clear();
        push(&mut out, u64::MAX);
        assert_eq!(out, vec![0xff; 9]);
    }

    #[test]
    fn test_boundaries() {
        for k in 1..=8_u32 {
            let top = (1_u64 << (7 * k)) - 1;
            assert_eq!(len(top), k as usize);
            assert_eq!(len(top + 1), (k + 1) as usize);
        }
        assert_eq!(len(1 << 56), 9);
        assert_eq!(len(0), 1);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = rand::thread_rng();
        let shift = Uniform::from(0..64_u32);
        let mut buf = [0_u8; MAX_LEN];
        for _ in 0..10_000 {
            let v = rand::random::<u64>() >> shift.sample(&mut rng);
            let n = put(&mut buf, v).unwrap();
            assert_eq!(n, len(v));
            assert_eq!(len_of_encoded(&buf).unwrap(), n);
            assert_eq!(get(&buf).unwrap(), (v, n));
        }
    }

    #[test]
    fn test_truncated() {
        assert!(get(&[0x81]).is_err());
        assert!(len_of_encoded(&[0x81, 0x81]).is_err());
    }

    #[test]
    fn test_add() {
        let mut buf = [0_u8; MAX_LEN];
        put(&mut buf, 126).unwrap();
        assert_eq!(add_no_grow(&mut buf, 1).unwrap(), 1);
        assert_eq!(add_no_grow(&mut buf, 1).unwrap(), 2);
        assert_eq!(get(&buf).unwrap(), (127, 1));
        assert_eq!(add_grow(&mut buf, 1).unwrap(), 2);
        assert_eq!(get(&buf).unwrap(), (128, 2));
    }
}
