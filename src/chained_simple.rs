//! Chained varints, LEB128 flavour: 7-bit groups, least significant group first.
//!
//! Same termination trick as [`crate::chained`]: the 9th byte keeps all 8 bits,
//! so nothing is ever longer than 9 bytes.

use crate::error::{ensure_len, Error, Result};

/// longest encoding
pub const MAX_LEN: usize = 9;

/// encoded length of `v`
pub fn len(v: u64) -> usize {
    let bits = (u64::BITS - v.leading_zeros()).max(1);
    (bits.div_ceil(7) as usize).min(MAX_LEN)
}

fn encode(mut v: u64) -> ([u8; MAX_LEN], usize) {
    let mut p = [0_u8; MAX_LEN];
    let mut n = 0;
    while v >= 0x80 && n < MAX_LEN - 1 {
        p[n] = (v & 0x7f) as u8 | 0x80;
        v >>= 7;
        n += 1;
    }
    // last byte: whatever is left (up to 8 bits in position 9)
    p[n] = v as u8;
    (p, n + 1)
}

/// Writes `v` at the start of `buf`
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
        let b = buf[i] as u64;
        if i < MAX_LEN - 1 && b & 0x80 != 0 {
            v |= (b & 0x7f) << (7 * i);
        } else {
            v |= b << (7 * i);
            return Ok((v, i + 1));
        }
    }
    Err(Error::MalformedInput("simple varint longer than 9 bytes"))
}

/// Encoded length, found by scanning continuation bits
pub fn len_of_encoded(buf: &[u8]) -> Result<usize> {
    for i in 0..MAX_LEN {
        ensure_len(buf, i + 1)?;
        if buf[i] & 0x80 == 0 || i == MAX_LEN - 1 {
            return Ok(i + 1);
        }
    }
    Err(Error::MalformedInput("simple varint longer than 9 bytes"))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};

    #[test]
    fn test_leb128_layout() {
        let mut out = Vec::new();
        push(&mut out, 300);
        assert_eq!(out, vec![0xAC, 0x02]);
        out.clear();
        push(&mut out, u64::MAX);
        assert_eq!(out.len(), 9);
        assert_eq!(out[8], 0xff);
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
    fn test_boundaries() {
        let mut buf = [0_u8; MAX_LEN];
        for v in [0, 127, 128, (1 << 56) - 1, 1 << 56, u64::MAX] {
            let n = put(&mut buf, v).unwrap();
            assert_eq!(get(&buf).unwrap(), (v, n));
        }
        assert_eq!(len(1 << 56), 9);
        assert_eq!(len((1 << 56) - 1), 8);
    }
}
