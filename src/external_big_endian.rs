//! Big-endian mirror of [`crate::external`]: same widths, bytes reversed.
//! Useful where fixed-width values should sort by `memcmp`.

use crate::error::{ensure_len, Result};
use crate::width::Width;

/// Writes `v` big-endian in its minimal width
pub fn put(buf: &mut [u8], v: u64) -> Result<Width> {
    let w = Width::for_u64(v);
    put_fixed_width(buf, v, w)?;
    Ok(w)
}

/// Appends `v` big-endian in its minimal width
pub fn push(out: &mut Vec<u8>, v: u64) -> Width {
    let w = Width::for_u64(v);
    let n = w.bytes();
    out.extend_from_slice(&v.to_be_bytes()[8 - n..]);
    w
}

/// Writes the lowest `w` bytes of `v`, most significant first.
/// Only widths up to 8 are meaningful for a u64.
pub fn put_fixed_width(buf: &mut [u8], v: u64, w: Width) -> Result<()> {
    let n = w.bytes();
    ensure_len(buf, n)?;
    let bytes = v.to_be_bytes();
    if n <= 8 {
        buf[..n].copy_from_slice(&bytes[8 - n..]);
    } else {
        let pad = n - 8;
        buf[..pad].fill(0);
        buf[pad..n].copy_from_slice(&bytes);
    }
    Ok(())
}

/// Reads a `w`-byte big-endian value
pub fn get(buf: &[u8], w: Width) -> Result<u64> {
    let n = w.bytes();
    ensure_len(buf, n)?;
    let v = buf[..n]
        .iter()
        .fold(0_u128, |acc, &b| (acc << 8) | b as u128);
    u64::try_from(v).map_err(|_| crate::error::Error::Overflow)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::external;

    #[test]
    fn test_mirrors_little_endian() {
        for v in [0_u64, 1, 255, 256, 70_000, 1 << 40, u64::MAX] {
            let mut le = Vec::new();
            let mut be = Vec::new();
            let w1 = external::push(&mut le, v);
            let w2 = push(&mut be, v);
            assert_eq!(w1, w2);
            be.reverse();
            assert_eq!(le, be);
        }
    }

    #[test]
    fn test_round_trip() {
        let mut buf = [0_u8; 10];
        for v in [0_u64, 7, 4096, u32::MAX as u64 + 1, u64::MAX] {
            let w = put(&mut buf, v).unwrap();
            assert_eq!(get(&buf, w).unwrap(), v);
        }
        put_fixed_width(&mut buf, 513, Width::W10).unwrap();
        assert_eq!(&buf[..10], &[0, 0, 0, 0, 0, 0, 0, 0, 2, 1]);
        assert_eq!(get(&buf, Width::W10).unwrap(), 513);
    }

    #[test]
    fn test_sorts_within_width() {
        let mut a = [0_u8; 2];
        let mut b = [0_u8; 2];
        put_fixed_width(&mut a, 0x01ff, Width::W2).unwrap();
        put_fixed_width(&mut b, 0x0200, Width::W2).unwrap();
        assert!(a < b);
    }
}
