//! Split varints: the top two bits of the type byte pick a level.
//!
//! Lower levels keep their payload inline, the type byte holding the top 6 bits and
//! following bytes the rest (big-endian). Each level starts where the previous one
//! ended, so e.g. [`Split`] stores 63 in one byte and 64 as `[0x40, 0x01]`.
//! The last level (`VAR`) writes an external little-endian payload whose width sits
//! in the low bits of the type byte.
//!
//! | family              | inline levels (bits) | VAR tag | smallest VAR payload |
//! |---------------------|----------------------|---------|----------------------|
//! | [`Split`]           | 6, 14                | `10`    | 1                    |
//! | [`SplitFull`]       | 6, 14, 22            | `11`    | 1                    |
//! | [`SplitFull16`]     | 14, 22, 30           | `11`    | 4                    |
//! | [`SplitFullNoZero`] | 6, 14, 22 (from 1)   | `11`    | 1                    |
//!
//! Each family also has a reversed layout with the type byte *last*, so a buffer of
//! them can be walked from the end: [`SplitVarint::put_reversed`] / [`SplitVarint::get_reversed`].
//!
//! # Example
//! ```rust
//! # use varint_codecs::split::{SplitFull, SplitVarint};
//! let mut buf = [0_u8; 9];
//! let n = SplitFull::put(&mut buf, 100).unwrap();
//! assert_eq!(&buf[..n], &[0x40, 37]);
//! assert_eq!(SplitFull::get(&buf).unwrap(), (100, 2));
//! ```

use crate::error::{ensure_len, Error, Result};
use crate::external::{self, load_le};
use crate::width::Width;

/// longest encoding of any family
pub const MAX_LEN: usize = 9;

const PREFIX_MASK: u8 = 0xc0;
const LOW6: u8 = 0x3f;

/// Parameters of one split family; the codec itself is provided.
pub trait SplitVarint {
    /// payload bits of each inline level, level `i` has type prefix `i << 6`
    const LEVEL_BITS: &'static [u32];
    /// type prefix of the external level
    const VAR_TAG: u8;
    /// smallest payload width the external level uses
    const MIN_VAR_WIDTH: usize;
    /// subtracted before encoding; 1 makes zero unencodable
    const BIAS: u64;

    /// largest biased value stored inline up to and including `level`
    fn level_max(level: usize) -> u64 {
        Self::LEVEL_BITS[..=level]
            .iter()
            .map(|&b| (1_u64 << b) - 1)
            .sum()
    }

    /// encoded length of `v`
    fn len(v: u64) -> usize {
        let u = v.saturating_sub(Self::BIAS);
        for (level, &bits) in Self::LEVEL_BITS.iter().enumerate() {
            if u <= Self::level_max(level) {
                return inline_len(bits);
            }
        }
        1 + var_width::<Self>(u)
    }

    /// encoded length read from the type byte
    fn len_from_type_byte(b: u8) -> Result<usize> {
        let prefix = b & PREFIX_MASK;
        if prefix == Self::VAR_TAG {
            let w = (b & LOW6) as usize;
            if !(Self::MIN_VAR_WIDTH..=8).contains(&w) {
                return Err(Error::InvalidWidth(w as u8));
            }
            return Ok(1 + w);
        }
        Self::LEVEL_BITS
            .get((prefix >> 6) as usize)
            .map(|&bits| inline_len(bits))
            .ok_or(Error::MalformedInput("unknown split type byte"))
    }

    /// encoded length of the varint starting at `buf`
    fn len_of_encoded(buf: &[u8]) -> Result<usize> {
        ensure_len(buf, 1)?;
        Self::len_from_type_byte(buf[0])
    }

    /// Writes `v` at the start of `buf`, type byte first
    fn put(buf: &mut [u8], v: u64) -> Result<usize> {
        let (z, n) = encode::<Self>(v)?;
        ensure_len(buf, n)?;
        buf[..n].copy_from_slice(&z[..n]);
        Ok(n)
    }

    /// Appends `v` to `out`
    fn push(out: &mut Vec<u8>, v: u64) -> Result<usize> {
        let (z, n) = encode::<Self>(v)?;
        out.extend_from_slice(&z[..n]);
        Ok(n)
    }

    /// Reads the varint at the start of `buf`, returns `(value, bytes_read)`
    fn get(buf: &[u8]) -> Result<(u64, usize)> {
        let n = Self::len_of_encoded(buf)?;
        ensure_len(buf, n)?;
        let v = decode::<Self>(buf[0], &buf[1..n])?;
        Ok((v, n))
    }

    /// Writes `v` at the start of `buf` with the type byte last
    fn put_reversed(buf: &mut [u8], v: u64) -> Result<usize> {
        let (z, n) = encode::<Self>(v)?;
        ensure_len(buf, n)?;
        reverse_layout(&z[..n], &mut buf[..n], Self::VAR_TAG);
        Ok(n)
    }

    /// Appends `v` with the type byte last
    fn push_reversed(out: &mut Vec<u8>, v: u64) -> Result<usize> {
        let (z, n) = encode::<Self>(v)?;
        let start = out.len();
        out.resize(start + n, 0);
        reverse_layout(&z[..n], &mut out[start..], Self::VAR_TAG);
        Ok(n)
    }

    /// Reads the reversed varint that *ends* at the end of `buf`
    fn get_reversed(buf: &[u8]) -> Result<(u64, usize)> {
        let last = *buf.last().ok_or(Error::BufferTooShort { needed: 1, available: 0 })?;
        let n = Self::len_from_type_byte(last)?;
        ensure_len(buf, n)?;
        let body = &buf[buf.len() - n..buf.len() - 1];
        let v = if last & PREFIX_MASK == Self::VAR_TAG {
            decode::<Self>(last, body)?
        } else {
            // inline payload is stored low byte first
            let mut fwd = [0_u8; 3];
            for (dst, src) in fwd.iter_mut().zip(body.iter().rev()) {
                *dst = *src;
            }
            decode::<Self>(last, &fwd[..body.len()])?
        };
        Ok((v, n))
    }
}

#[inline]
fn inline_len(bits: u32) -> usize {
    1 + ((bits - 6) / 8) as usize
}

fn var_width<F: SplitVarint + ?Sized>(u: u64) -> usize {
    let last = F::level_max(F::LEVEL_BITS.len() - 1);
    external::len(u - last).max(F::MIN_VAR_WIDTH)
}

fn encode<F: SplitVarint + ?Sized>(v: u64) -> Result<([u8; MAX_LEN], usize)> {
    let u = v
        .checked_sub(F::BIAS)
        .ok_or(Error::InvalidArgument("zero is not encodable in this family"))?;
    let mut z = [0_u8; MAX_LEN];
    let mut offset = 0_u64;
    for (level, &bits) in F::LEVEL_BITS.iter().enumerate() {
        let max = F::level_max(level);
        if u <= max {
            let x = u - offset;
            let n = inline_len(bits);
            z[0] = ((level as u8) << 6) | ((x >> (8 * (n - 1))) as u8 & LOW6);
            for (i, slot) in z[1..n].iter_mut().enumerate() {
                *slot = (x >> (8 * (n - 2 - i))) as u8;
            }
            return Ok((z, n));
        }
        offset = max;
    }
    let w = var_width::<F>(u);
    z[0] = F::VAR_TAG | w as u8;
    // w is at most 8
    let width = Width::from_bytes(w).ok_or(Error::InvalidWidth(w as u8))?;
    external::put_fixed_width(&mut z[1..], u - offset, width)?;
    Ok((z, 1 + w))
}

/// `body` is everything after the type byte in forward layout
fn decode<F: SplitVarint + ?Sized>(type_byte: u8, body: &[u8]) -> Result<u64> {
    let prefix = type_byte & PREFIX_MASK;
    let u = if prefix == F::VAR_TAG {
        let last = F::level_max(F::LEVEL_BITS.len() - 1);
        load_le(body).checked_add(last).ok_or(Error::Overflow)?
    } else {
        let level = (prefix >> 6) as usize;
        let offset = if level == 0 { 0 } else { F::level_max(level - 1) };
        let x = body
            .iter()
            .fold((type_byte & LOW6) as u64, |acc, &b| (acc << 8) | b as u64);
        x + offset
    };
    u.checked_add(F::BIAS).ok_or(Error::Overflow)
}

/// type byte moves to the end; inline payload bytes flip, external ones stay little-endian
fn reverse_layout(fwd: &[u8], dst: &mut [u8], var_tag: u8) {
    let n = fwd.len();
    dst[n - 1] = fwd[0];
    if fwd[0] & PREFIX_MASK == var_tag {
        dst[..n - 1].copy_from_slice(&fwd[1..]);
    } else {
        for (d, s) in dst[..n - 1].iter_mut().zip(fwd[1..].iter().rev()) {
            *d = *s;
        }
    }
}

/// 6/14 bit inline levels, external after that (type bytes `10000www`)
#[derive(Debug, Clone, Copy)]
pub struct Split;

impl SplitVarint for Split {
    const LEVEL_BITS: &'static [u32] = &[6, 14];
    const VAR_TAG: u8 = 0x80;
    const MIN_VAR_WIDTH: usize = 1;
    const BIAS: u64 = 0;
}

/// 6/14/22 bit inline levels, external after that (type bytes `11000www`)
#[derive(Debug, Clone, Copy)]
pub struct SplitFull;

impl SplitVarint for SplitFull {
    const LEVEL_BITS: &'static [u32] = &[6, 14, 22];
    const VAR_TAG: u8 = 0xc0;
    const MIN_VAR_WIDTH: usize = 1;
    const BIAS: u64 = 0;
}

/// 14/22/30 bit inline levels, never shorter than two bytes
#[derive(Debug, Clone, Copy)]
pub struct SplitFull16;

impl SplitVarint for SplitFull16 {
    const LEVEL_BITS: &'static [u32] = &[14, 22, 30];
    const VAR_TAG: u8 = 0xc0;
    const MIN_VAR_WIDTH: usize = 4;
    const BIAS: u64 = 0;
}

/// [`SplitFull`] shifted up by one: 1..=64 in one byte, zero rejected
#[derive(Debug, Clone, Copy)]
pub struct SplitFullNoZero;

impl SplitVarint for SplitFullNoZero {
    const LEVEL_BITS: &'static [u32] = &[6, 14, 22];
    const VAR_TAG: u8 = 0xc0;
    const MIN_VAR_WIDTH: usize = 1;
    const BIAS: u64 = 1;
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};

    fn enc<F: SplitVarint>(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        F::push(&mut out, v).unwrap();
        out
    }

    fn check_random<F: SplitVarint>() {
        let mut rng = rand::thread_rng();
        let shift = Uniform::from(0..64_u32);
        for _ in 0..5_000 {
            let v = (rand::random::<u64>() >> shift.sample(&mut rng)).max(F::BIAS);
            let e = enc::<F>(v);
            assert_eq!(e.len(), F::len(v));
            assert_eq!(F::len_of_encoded(&e).unwrap(), e.len());
            assert_eq!(F::get(&e).unwrap(), (v, e.len()));

            let mut r = Vec::new();
            F::push_reversed(&mut r, v).unwrap();
            assert_eq!(F::get_reversed(&r).unwrap(), (v, e.len()));
        }
    }

    mod split {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_levels() {
            assert_eq!(Split::level_max(0), 63);
            assert_eq!(Split::level_max(1), 16446);
            assert_eq!(enc::<Split>(63), vec![63]);
            assert_eq!(enc::<Split>(64), vec![0x40, 0x01]);
            assert_eq!(enc::<Split>(16446), vec![0x7f, 0xff]);
            assert_eq!(enc::<Split>(16447), vec![0x81, 0x01]);
            assert_eq!(Split::len(u64::MAX), 9);
        }

        #[test]
        fn test_random() {
            check_random::<Split>();
        }

        #[test]
        fn test_bad_type_byte() {
            assert!(Split::get(&[0xc1, 0]).is_err());
            assert_eq!(Split::get(&[0x80]), Err(Error::InvalidWidth(0)));
        }
    }

    mod split_full {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_levels() {
            assert_eq!(SplitFull::level_max(2), 16446 + (1 << 22) - 1);
            assert_eq!(enc::<SplitFull>(16447), vec![0x80, 0x00, 0x01]);
            let first_var = SplitFull::level_max(2) + 1;
            assert_eq!(enc::<SplitFull>(first_var), vec![0xc1, 0x01]);
        }

        #[test]
        fn test_random() {
            check_random::<SplitFull>();
        }

        #[test]
        fn test_reversed_layout() {
            let mut r = Vec::new();
            SplitFull::push_reversed(&mut r, 16447).unwrap();
            assert_eq!(r, vec![0x01, 0x00, 0x80]);
        }

        #[test]
        fn test_walk_backwards() {
            let values = [0_u64, 5000, 1 << 40, 77, u64::MAX, 16447];
            let mut buf = Vec::new();
            for &v in &values {
                SplitFull::push_reversed(&mut buf, v).unwrap();
            }
            let mut end = buf.len();
            let mut seen = Vec::new();
            while end > 0 {
                let (v, n) = SplitFull::get_reversed(&buf[..end]).unwrap();
                seen.push(v);
                end -= n;
            }
            seen.reverse();
            assert_eq!(seen, values.to_vec());
        }
    }

    mod split_full_16 {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_minimum_two_bytes() {
            assert_eq!(enc::<SplitFull16>(0), vec![0x00, 0x00]);
            assert_eq!(enc::<SplitFull16>(0x3fff), vec![0x3f, 0xff]);
            let first_var = SplitFull16::level_max(2) + 1;
            // payload padded to four bytes
            assert_eq!(enc::<SplitFull16>(first_var), vec![0xc4, 1, 0, 0, 0]);
        }

        #[test]
        fn test_random() {
            check_random::<SplitFull16>();
        }
    }

    mod no_zero {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_shifted() {
            assert!(SplitFullNoZero::push(&mut Vec::new(), 0).is_err());
            assert_eq!(enc::<SplitFullNoZero>(1), vec![0x00]);
            assert_eq!(enc::<SplitFullNoZero>(64), vec![0x3f]);
            assert_eq!(SplitFullNoZero::len(65), 2);
            assert_eq!(SplitFullNoZero::get(&[0x3f]).unwrap(), (64, 1));
        }

        #[test]
        fn test_random() {
            check_random::<SplitFullNoZero>();
        }
    }
}
