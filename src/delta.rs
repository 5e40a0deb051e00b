//! Delta encoding of integer arrays.
//!
//! The first value (the base) is stored as `[width][Z(base)]`, every following one as the
//! ZigZag'd difference to its predecessor, again `[width][Z(delta)]`. Differences wrap
//! (`wrapping_sub`/`wrapping_add`), so every `i64`/`u64` sequence round-trips.
//!
//! Sorted or slowly changing data ends up at 2 bytes per element. There is no random
//! access, decoding is strictly sequential.
//!
//! # Example
//! ```rust
//! # use varint_codecs::delta;
//! let data = vec![100_i64, 102, 103, 105, 110];
//! let enc = delta::encode(&data);
//! let (dec, bytes_read) = delta::decode(&enc, data.len()).unwrap();
//! assert_eq!(dec, data);
//! assert_eq!(bytes_read, enc.len());
//! ```

use crate::error::{ensure_len, try_vec_with_capacity, Result};
use crate::external;
use crate::width::Width;

/// Maps signed to unsigned so that small magnitudes stay small:
/// 0 → 0, -1 → 1, 1 → 2, -2 → 3, ...
#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// inverse of [`zigzag_encode`]
#[inline]
pub fn zigzag_decode(z: u64) -> i64 {
    ((z >> 1) as i64) ^ -((z & 1) as i64)
}

/// worst case output size for `count` values
pub fn max_encoded_size(count: usize) -> usize {
    if count == 0 {
        0
    } else {
        1 + 8 + 9 * (count - 1)
    }
}

/// Appends one signed delta as `[width][Z(delta)]`, returns bytes written
pub fn put(out: &mut Vec<u8>, delta: i64) -> usize {
    push_width_prefixed(out, zigzag_encode(delta))
}

/// Reads one `[width][Z(delta)]`, returns `(delta, bytes_read)`
pub fn get(buf: &[u8]) -> Result<(i64, usize)> {
    let (z, n) = get_width_prefixed(buf)?;
    Ok((zigzag_decode(z), n))
}

fn push_width_prefixed(out: &mut Vec<u8>, v: u64) -> usize {
    let w = external::width_of(v);
    out.push(u8::from(w));
    external::push_fixed_width(out, v, w);
    1 + w.bytes()
}

fn get_width_prefixed(buf: &[u8]) -> Result<(u64, usize)> {
    ensure_len(buf, 1)?;
    let w = Width::try_from(buf[0])?;
    let v = external::get(&buf[1..], w)?;
    Ok((v, 1 + w.bytes()))
}

/// Encodes signed values; an empty slice gives an empty buffer
pub fn encode(values: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(max_encoded_size(values.len()));
    encode_into(&mut out, values);
    out
}

/// Like [`encode`] but appends to `out`; returns bytes written
pub fn encode_into(out: &mut Vec<u8>, values: &[i64]) -> usize {
    let Some((&base, rest)) = values.split_first() else {
        return 0;
    };
    let mut written = push_width_prefixed(out, zigzag_encode(base));
    let mut prev = base;
    for &v in rest {
        written += put(out, v.wrapping_sub(prev));
        prev = v;
    }
    written
}

/// Decodes `count` signed values, returns them with the number of bytes read
pub fn decode(buf: &[u8], count: usize) -> Result<(Vec<i64>, usize)> {
    if count == 0 {
        return Ok((Vec::new(), 0));
    }
    // every element takes at least two bytes, so the buffer bounds the allocation
    let mut out = try_vec_with_capacity(count.min(buf.len() / 2 + 1))?;
    let (z, mut pos) = get_width_prefixed(buf)?;
    let mut current = zigzag_decode(z);
    out.push(current);
    for _ in 1..count {
        let (d, n) = get(&buf[pos..])?;
        pos += n;
        current = current.wrapping_add(d);
        out.push(current);
    }
    Ok((out, pos))
}

/// Encodes unsigned values. The base is stored without ZigZag, deltas are the
/// two's complement difference, so any `u64` sequence works.
pub fn encode_unsigned(values: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(max_encoded_size(values.len()));
    encode_unsigned_into(&mut out, values);
    out
}

/// Like [`encode_unsigned`] but appends to `out`; returns bytes written
pub fn encode_unsigned_into(out: &mut Vec<u8>, values: &[u64]) -> usize {
    let Some((&base, rest)) = values.split_first() else {
        return 0;
    };
    let mut written = push_width_prefixed(out, base);
    let mut prev = base;
    for &v in rest {
        written += put(out, v.wrapping_sub(prev) as i64);
        prev = v;
    }
    written
}

/// Decodes `count` unsigned values, returns them with the number of bytes read
pub fn decode_unsigned(buf: &[u8], count: usize) -> Result<(Vec<u64>, usize)> {
    if count == 0 {
        return Ok((Vec::new(), 0));
    }
    let mut out = try_vec_with_capacity(count.min(buf.len() / 2 + 1))?;
    let (mut current, mut pos) = get_width_prefixed(buf)?;
    out.push(current);
    for _ in 1..count {
        let (d, n) = get(&buf[pos..])?;
        pos += n;
        current = current.wrapping_add_signed(d);
        out.push(current);
    }
    Ok((out, pos))
}
