//! Tagged varints (the SQLite4 encoding).
//!
//! The first byte `A0` tells the total length, and for small values it carries the value itself:
//!
//! | A0        | bytes | value                          |
//! |-----------|-------|--------------------------------|
//! | 0..=240   | 1     | `A0`                           |
//! | 241..=248 | 2     | `240 + 256*(A0-241) + A1`      |
//! | 249       | 3     | `2288 + 256*A1 + A2`           |
//! | 250..=255 | 4..=9 | `A1..` big-endian, `A0-247` bytes |
//!
//! Values up to 2287 sort by `memcmp` of their encoding.
//!
//! # Example
//! ```rust
//! # use varint_codecs::tagged;
//! let mut out = Vec::new();
//! tagged::push(&mut out, 241);
//! assert_eq!(out, vec![0xF1, 0x00]);
//! assert_eq!(tagged::get(&out).unwrap(), (241, 2));
//! ```

use crate::error::{ensure_len, Error, Result};

/// largest value in one byte
pub const MAX_1: u64 = 240;
/// largest value in two bytes
pub const MAX_2: u64 = 2287;
/// largest value in three bytes
pub const MAX_3: u64 = 67823;
/// largest value in four bytes
pub const MAX_4: u64 = (1 << 24) - 1;
/// largest value in five bytes
pub const MAX_5: u64 = u32::MAX as u64;
/// largest value in six bytes
pub const MAX_6: u64 = (1 << 40) - 1;
/// largest value in seven bytes
pub const MAX_7: u64 = (1 << 48) - 1;
/// largest value in eight bytes
pub const MAX_8: u64 = (1 << 56) - 1;

/// longest encoding
pub const MAX_LEN: usize = 9;

/// encoded length of `v`
pub fn len(v: u64) -> usize {
    if v <= MAX_1 {
        1
    } else if v <= MAX_2 {
        2
    } else if v <= MAX_3 {
        3
    } else {
        // big-endian tiers: one tag byte plus the significant bytes, at least 3 of them
        1 + ((u64::BITS - v.leading_zeros()).div_ceil(8) as usize).max(3)
    }
}

/// encoded length from the first byte alone
#[inline]
pub fn len_from_first_byte(a0: u8) -> usize {
    if a0 <= 240 {
        1
    } else if a0 <= 248 {
        2
    } else {
        a0 as usize - 246
    }
}

/// encoded length of the varint at the start of `buf`
pub fn len_of_encoded(buf: &[u8]) -> Result<usize> {
    ensure_len(buf, 1)?;
    Ok(len_from_first_byte(buf[0]))
}

/// encode into a scratch array, returns it with the number of used bytes
fn encode(v: u64) -> ([u8; MAX_LEN], usize) {
    let n = len(v);
    let mut z = [0_u8; MAX_LEN];
    write_tier(&mut z, v, n);
    (z, n)
}

/// writes `v` in tier `n`; the caller guarantees `v` fits
fn write_tier(z: &mut [u8; MAX_LEN], v: u64, n: usize) {
    match n {
        1 => z[0] = v as u8,
        2 => {
            let y = v - 240;
            z[0] = (y / 256 + 241) as u8;
            z[1] = (y % 256) as u8;
        }
        3 => {
            let y = v - 2288;
            z[0] = 249;
            z[1] = (y / 256) as u8;
            z[2] = (y % 256) as u8;
        }
        _ => {
            let payload = n - 1;
            z[0] = (246 + n) as u8;
            z[1..n].copy_from_slice(&v.to_be_bytes()[8 - payload..]);
        }
    }
}

/// Writes `v` at the start of `buf`, returns bytes written
pub fn put(buf: &mut [u8], v: u64) -> Result<usize> {
    let (z, n) = encode(v);
    ensure_len(buf, n)?;
    buf[..n].copy_from_slice(&z[..n]);
    Ok(n)
}

/// Appends `v` to `out`, returns bytes written
pub fn push(out: &mut Vec<u8>, v: u64) -> usize {
    let (z, n) = encode(v);
    out.extend_from_slice(&z[..n]);
    n
}

/// Writes `v` using exactly `width` bytes.
///
/// Tiers 1..=3 carry part of the value in the tag byte and only fit their own range,
/// so `width` must equal [`len`]. Tiers 4..=9 are plain big-endian and accept any
/// value of at most that length.
pub fn put_fixed_width(buf: &mut [u8], v: u64, width: usize) -> Result<usize> {
    let natural = len(v);
    let ok = match width {
        1..=3 => width == natural,
        4..=MAX_LEN => width >= natural,
        _ => false,
    };
    if !ok {
        return Err(Error::OutOfRange);
    }
    ensure_len(buf, width)?;
    let mut z = [0_u8; MAX_LEN];
    write_tier(&mut z, v, width);
    buf[..width].copy_from_slice(&z[..width]);
    Ok(width)
}

/// Reads one varint, returns `(value, bytes_read)`
pub fn get(buf: &[u8]) -> Result<(u64, usize)> {
    let n = len_of_encoded(buf)?;
    ensure_len(buf, n)?;
    let a0 = buf[0] as u64;
    let v = match n {
        1 => a0,
        2 => 240 + 256 * (a0 - 241) + buf[1] as u64,
        3 => 2288 + 256 * buf[1] as u64 + buf[2] as u64,
        _ => buf[1..n].iter().fold(0_u64, |acc, &b| (acc << 8) | b as u64),
    };
    Ok((v, n))
}

/// Adds `add` to the varint at `buf`.
/// Returns the new encoded length; writes nothing if it is longer than the current one.
pub fn add_no_grow(buf: &mut [u8], add: i64) -> Result<usize> {
    add_impl(buf, add, false)
}

/// Adds `add` to the varint at `buf`, rewriting it at whatever length the result needs.
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
