//! External fixed-width varints: an unsigned integer stored little-endian in
//! exactly `w` bytes.
//!
//! There is no tag. The width must be remembered by whoever reads the value back
//! (FOR, PFOR and Dict keep it in their header, Delta writes a width byte in front).
//!
//! # Example
//! ```rust
//! # use varint_codecs::external;
//! # use varint_codecs::width::Width;
//! let mut buf = [0_u8; 8];
//! let w = external::put(&mut buf, 70_000).unwrap();
//! assert_eq!(w, Width::W3);
//! assert_eq!(&buf[..3], &[0x70, 0x11, 0x01]);
//! assert_eq!(external::get(&buf, w).unwrap(), 70_000);
//! ```

use crate::error::{ensure_len, Error, Result};
use crate::width::Width;

/// minimal width for `v`
#[inline]
pub fn width_of(v: u64) -> Width {
    Width::for_u64(v)
}

/// minimal bytes for `v`
#[inline]
pub fn len(v: u64) -> usize {
    width_of(v).bytes()
}

/// width needed to store a non-negative signed value.
/// Negative values have to be cast (or zigzagged) by the caller first.
pub fn signed_width_of(v: i64) -> Result<Width> {
    if v < 0 {
        return Err(Error::OutOfRange);
    }
    Ok(width_of(v as u64))
}

/// Writes `v` in its minimal width, returns the width used
pub fn put(buf: &mut [u8], v: u64) -> Result<Width> {
    let w = width_of(v);
    put_fixed_width(buf, v, w)?;
    Ok(w)
}

/// Appends `v` in its minimal width
pub fn push(out: &mut Vec<u8>, v: u64) -> Width {
    let w = width_of(v);
    push_fixed_width(out, v, w);
    w
}

/// Writes the lowest `w` bytes of `v`.
/// Widths above 8 zero-fill the high bytes.
pub fn put_fixed_width(buf: &mut [u8], v: u64, w: Width) -> Result<()> {
    let n = w.bytes();
    ensure_len(buf, n)?;
    if n <= 8 {
        buf[..n].copy_from_slice(&v.to_le_bytes()[..n]);
    } else {
        buf[..8].copy_from_slice(&v.to_le_bytes());
        buf[8..n].fill(0);
    }
    Ok(())
}

/// Appends the lowest `w` bytes of `v`
#[inline]
pub fn push_fixed_width(out: &mut Vec<u8>, v: u64, w: Width) {
    let n = w.bytes().min(8);
    out.extend_from_slice(&v.to_le_bytes()[..n]);
    // widths > 8 are zero extended
    out.resize(out.len() + (w.bytes() - n), 0);
}

/// Reads a `w`-byte little-endian value.
/// Widths beyond 8 must carry zeros in the high bytes, otherwise [`Error::Overflow`].
pub fn get(buf: &[u8], w: Width) -> Result<u64> {
    let n = w.bytes();
    ensure_len(buf, n)?;
    if n > 8 && buf[8..n].iter().any(|&b| b != 0) {
        return Err(Error::Overflow);
    }
    Ok(load_le(&buf[..n.min(8)]))
}

/// little-endian load of up to 8 bytes, no checks
#[inline(always)]
pub(crate) fn load_le(bytes: &[u8]) -> u64 {
    let mut tmp = [0_u8; 8];
    tmp[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(tmp)
}

/// 128bit variant of [`put_fixed_width`]; covers the full 1..=16 vocabulary
pub fn put_fixed_width_u128(buf: &mut [u8], v: u128, w: Width) -> Result<()> {
    let n = w.bytes();
    ensure_len(buf, n)?;
    buf[..n].copy_from_slice(&v.to_le_bytes()[..n]);
    Ok(())
}

/// 128bit variant of [`get`]
pub fn get_u128(buf: &[u8], w: Width) -> Result<u128> {
    let n = w.bytes();
    ensure_len(buf, n)?;
    let mut tmp = [0_u8; 16];
    tmp[..n].copy_from_slice(&buf[..n]);
    Ok(u128::from_le_bytes(tmp))
}

/// Adds `add` to the value stored at `buf` in width `w`.
///
/// Returns the width of the result. If that width is larger than `w` nothing is
/// written: the caller has to make room and use [`add_grow`].
pub fn add_no_grow(buf: &mut [u8], w: Width, add: i64) -> Result<Width> {
    add_impl(buf, w, add, false)
}

/// Like [`add_no_grow`] but always writes the result in its new minimal width.
/// `buf` must have room for it.
pub fn add_grow(buf: &mut [u8], w: Width, add: i64) -> Result<Width> {
    add_impl(buf, w, add, true)
}

fn add_impl(buf: &mut [u8], w: Width, add: i64, grow: bool) -> Result<Width> {
    let current = get(buf, w)?;
    let updated = current.checked_add_signed(add).ok_or(Error::Overflow)?;
    let new_width = width_of(updated);
    if new_width > w && !grow {
        return Ok(new_width);
    }
    // shrinking results keep their slot
    let write_width = new_width.max(w);
    put_fixed_width(buf, updated, write_width)?;
    Ok(new_width)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};

    #[test]
    fn test_width() {
        assert_eq!(len(0), 1);
        assert_eq!(len(255), 1);
        assert_eq!(len(256), 2);
        assert_eq!(len(u64::MAX), 8);
    }

    #[test]
    fn test_put_get_layout() {
        let mut buf = [0_u8; 8];
        assert_eq!(put(&mut buf, 0x0102).unwrap(), Width::W2);
        assert_eq!(&buf[..2], &[0x02, 0x01]);
        assert_eq!(get(&buf, Width::W2).unwrap(), 0x0102);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = rand::thread_rng();
        let shift = Uniform::from(0..64_u32);
        for _ in 0..10_000 {
            let v = rand::random::<u64>() >> shift.sample(&mut rng);
            let mut out = Vec::new();
            let w = push(&mut out, v);
            assert_eq!(out.len(), w.bytes());
            assert_eq!(get(&out, w).unwrap(), v);
        }
    }

    #[test]
    fn test_truncates_to_width() {
        let mut buf = [0_u8; 2];
        put_fixed_width(&mut buf, 0x123456, Width::W2).unwrap();
        assert_eq!(get(&buf, Width::W2).unwrap(), 0x3456);
    }

    #[test]
    fn test_short_buffer() {
        let mut buf = [0_u8; 1];
        assert_eq!(
            put(&mut buf, 1000),
            Err(Error::BufferTooShort { needed: 2, available: 1 })
        );
        assert!(get(&buf, Width::W4).is_err());
    }

    #[test]
    fn test_u128() {
        let mut buf = [0_u8; 16];
        let v: u128 = (1 << 100) + 17;
        let w = Width::for_u128(v);
        assert_eq!(w, Width::W13);
        put_fixed_width_u128(&mut buf, v, w).unwrap();
        assert_eq!(get_u128(&buf, w).unwrap(), v);
        // a wide slot holding a small value reads back through the u64 path too
        put_fixed_width_u128(&mut buf, 99, Width::W12).unwrap();
        assert_eq!(get(&buf, Width::W12).unwrap(), 99);
    }

    #[test]
    fn test_add_no_grow() {
        let mut buf = [0_u8; 4];
        put_fixed_width(&mut buf, 250, Width::W1).unwrap();
        // fits
        assert_eq!(add_no_grow(&mut buf, Width::W1, 5).unwrap(), Width::W1);
        assert_eq!(get(&buf, Width::W1).unwrap(), 255);
        // doesnt fit: reports the needed width, leaves the buffer alone
        assert_eq!(add_no_grow(&mut buf, Width::W1, 1).unwrap(), Width::W2);
        assert_eq!(buf, [255, 0, 0, 0]);
        // grow writes
        assert_eq!(add_grow(&mut buf, Width::W1, 1).unwrap(), Width::W2);
        assert_eq!(get(&buf, Width::W2).unwrap(), 256);
        // negative add
        assert_eq!(add_no_grow(&mut buf, Width::W2, -6).unwrap(), Width::W1);
        assert_eq!(get(&buf, Width::W2).unwrap(), 250);
    }

    #[test]
    fn test_add_overflow() {
        let mut buf = [0_u8; 8];
        put_fixed_width(&mut buf, 3, Width::W1).unwrap();
        assert_eq!(add_grow(&mut buf, Width::W1, -4), Err(Error::Overflow));
        put_fixed_width(&mut buf, u64::MAX, Width::W8).unwrap();
        assert_eq!(add_grow(&mut buf, Width::W8, 1), Err(Error::Overflow));
        assert_eq!(get(&buf, Width::W8).unwrap(), u64::MAX);
    }
}
