//! Variable precision compression of `f64` arrays.
//!
//! Every finite, normal value is split into sign, unbiased exponent and mantissa.
//! Signs go into a bitmap, exponents into one of three [`ExponentMode`] layouts and the
//! mantissas, rounded to the bits of the chosen [`Precision`], are bit-packed back to back.
//! Zeros, denormals, infinities and NaNs are flagged in a second bitmap and stored verbatim.
//!
//! Layout:
//! ```text
//! [precision u8][exp_bits u8][mant_bits u8][mode u8]
//! [special bitmap: ceil(n/8)][sign bitmap: ceil(n/8)]
//! [exponents][packed mantissas: ceil(normals * mant_bits / 8)][special values: 8 bytes LE each]
//! ```
//! Bitmaps and mantissas are packed least significant bit first.
//!
//! [`Precision::Full`] is lossless. The others guarantee a relative error of at most
//! `2^-mant_bits` per value (see [`max_relative_error`]).
//!
//! # Example
//! ```rust
//! # use varint_codecs::float::{self, Precision, ExponentMode};
//! let data = vec![20.5, 21.25, 19.75, 22.0];
//! let enc = float::encode(&data, Precision::Full, ExponentMode::CommonExponent).unwrap();
//! let (dec, bytes_read) = float::decode(&enc, data.len()).unwrap();
//! assert_eq!(dec, data);
//! assert_eq!(bytes_read, enc.len());
//! ```

use bitvec::{field::BitField, prelude as bv};
use log::debug;

use crate::delta;
use crate::error::{ensure_len, try_vec_with_capacity, Error, Result};

const HEADER_LEN: usize = 4;
const EXPONENT_BIAS: i32 = 1023;
const MANTISSA_MASK: u64 = (1 << 52) - 1;
const IMPLICIT_ONE: u64 = 1 << 52;
const MIN_EXPONENT: i16 = -1022;
const MAX_EXPONENT: i16 = 1023;

/// How many mantissa bits survive encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Precision {
    /// 52 mantissa bits, lossless
    Full = 0,
    /// 23 mantissa bits, about single precision
    High = 1,
    /// 10 mantissa bits, about half precision
    Medium = 2,
    /// 4 mantissa bits
    Low = 3,
}

impl Precision {
    /// mantissa bits stored per value
    pub fn mantissa_bits(self) -> u8 {
        match self {
            Precision::Full => 52,
            Precision::High => 23,
            Precision::Medium => 10,
            Precision::Low => 4,
        }
    }

    /// exponent bits of the matching IEEE-like format; informational only, written to the header
    pub fn exponent_bits(self) -> u8 {
        match self {
            Precision::Full => 11,
            Precision::High | Precision::Medium => 8,
            Precision::Low => 5,
        }
    }
}

impl TryFrom<u8> for Precision {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Precision::Full),
            1 => Ok(Precision::High),
            2 => Ok(Precision::Medium),
            3 => Ok(Precision::Low),
            _ => Err(Error::InvalidArgument("unknown float precision")),
        }
    }
}

/// Layout of the exponent region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExponentMode {
    /// every exponent as `[width][Z(exp)]`
    Independent = 0,
    /// `[width][Z(min)]` followed by one `u8` offset per value; offsets must fit in a byte
    CommonExponent = 1,
    /// first exponent as `[width][Z(exp)]`, then `[width][Z(delta)]` to the previous one
    DeltaExponent = 2,
}

impl TryFrom<u8> for ExponentMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ExponentMode::Independent),
            1 => Ok(ExponentMode::CommonExponent),
            2 => Ok(ExponentMode::DeltaExponent),
            _ => Err(Error::InvalidArgument("unknown exponent mode")),
        }
    }
}

/// Summary of an encoded (or would-be encoded) float array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatMeta {
    /// precision of the mantissas
    pub precision: Precision,
    /// exponent layout
    pub mode: ExponentMode,
    /// number of values
    pub count: usize,
    /// values stored verbatim (zero, denormal, infinite, NaN)
    pub special_count: usize,
    /// smallest exponent of a normal value, after rounding
    pub min_exponent: Option<i16>,
    /// largest exponent of a normal value, after rounding
    pub max_exponent: Option<i16>,
    /// total encoded bytes
    pub encoded_size: usize,
}

/// Sign, unbiased exponent and 53-bit mantissa (implicit one included) of a normal `f64`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parts {
    /// true for negative values
    pub sign: bool,
    /// unbiased exponent in `-1022..=1023`
    pub exponent: i16,
    /// mantissa with bit 52 set
    pub mantissa: u64,
}

/// Upper bound of the relative error introduced by `precision`
pub fn max_relative_error(precision: Precision) -> f64 {
    2_f64.powi(-i32::from(precision.mantissa_bits()))
}

/// Upper bound of the absolute error for `value` at `precision`
pub fn max_absolute_error(value: f64, precision: Precision) -> f64 {
    value.abs() * max_relative_error(precision)
}

/// Picks the cheapest precision whose error stays below `max_relative_error`
pub fn precision_for_error(max_relative_error: f64) -> Precision {
    if max_relative_error < 1e-10 {
        Precision::Full
    } else if max_relative_error < 5e-4 {
        Precision::High
    } else if max_relative_error < 0.03 {
        Precision::Medium
    } else {
        Precision::Low
    }
}

/// Values that bypass the mantissa path: zeros, denormals, infinities and NaN
#[inline]
pub fn is_special(v: f64) -> bool {
    !v.is_normal()
}

/// Splits a normal value; `None` for [special](is_special) ones
pub fn decompose(v: f64) -> Option<Parts> {
    if is_special(v) {
        return None;
    }
    let bits = v.to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    Some(Parts {
        sign: bits >> 63 == 1,
        exponent: (biased - EXPONENT_BIAS) as i16,
        mantissa: (bits & MANTISSA_MASK) | IMPLICIT_ONE,
    })
}

/// Reassembles a value; exponents below the normal range give a signed zero,
/// above it a signed infinity. The implicit bit of `mantissa` is ignored.
pub fn compose(sign: bool, exponent: i16, mantissa: u64) -> f64 {
    let sign_bit = u64::from(sign) << 63;
    if exponent == 0 && mantissa == 0 {
        return f64::from_bits(sign_bit);
    }
    let biased = i32::from(exponent) + EXPONENT_BIAS;
    if biased <= 0 {
        return f64::from_bits(sign_bit);
    }
    if biased >= 0x7FF {
        return f64::from_bits(sign_bit | (0x7FF << 52));
    }
    f64::from_bits(sign_bit | ((biased as u64) << 52) | (mantissa & MANTISSA_MASK))
}

/// worst case output size for `count` values at `precision`
pub fn max_encoded_size(count: usize, precision: Precision) -> usize {
    if count == 0 {
        return 0;
    }
    let bitmap = count.div_ceil(8);
    let mantissas = (usize::from(precision.mantissa_bits()) * count).div_ceil(8);
    HEADER_LEN + 2 * bitmap + 9 * count + mantissas + 8 * count
}

/// `count * 8 / encoded_size`, 0 for an empty encoding
pub fn compression_ratio(count: usize, encoded_size: usize) -> f64 {
    if encoded_size == 0 {
        0.0
    } else {
        (count * 8) as f64 / encoded_size as f64
    }
}

/// Rounds the 53-bit mantissa of `parts` to `mant_bits`, returns the stored (exponent, mantissa).
fn quantize(parts: Parts, mant_bits: u8) -> (i16, u64) {
    if mant_bits == 52 {
        return (parts.exponent, parts.mantissa & MANTISSA_MASK);
    }
    let shift = 53 - u32::from(mant_bits);
    let rounded = (parts.mantissa + (1 << (shift - 1))) >> shift;
    if rounded >> mant_bits == 0 {
        (parts.exponent, rounded)
    } else if parts.exponent < MAX_EXPONENT {
        // rounded up to the next power of two
        (parts.exponent + 1, 1 << (mant_bits - 1))
    } else {
        (parts.exponent, (1 << mant_bits) - 1)
    }
}

fn expand(stored: u64, mant_bits: u8) -> u64 {
    if mant_bits == 52 {
        stored | IMPLICIT_ONE
    } else {
        stored << (53 - u32::from(mant_bits))
    }
}

/// quantized normals, in input order
struct Split {
    /// (sign, exponent, stored mantissa)
    normals: Vec<(bool, i16, u64)>,
    special_count: usize,
}

fn split(values: &[f64], precision: Precision) -> Result<Split> {
    let mut normals = try_vec_with_capacity(values.len())?;
    let mant_bits = precision.mantissa_bits();
    for &v in values {
        if let Some(parts) = decompose(v) {
            let (e, m) = quantize(parts, mant_bits);
            normals.push((parts.sign, e, m));
        }
    }
    let special_count = values.len() - normals.len();
    Ok(Split { normals, special_count })
}

fn exponent_range(normals: &[(bool, i16, u64)]) -> Option<(i16, i16)> {
    let min = normals.iter().map(|n| n.1).min()?;
    let max = normals.iter().map(|n| n.1).max()?;
    Some((min, max))
}

fn prefixed_len(v: i64) -> usize {
    1 + crate::external::len(delta::zigzag_encode(v))
}

fn exponent_region_len(normals: &[(bool, i16, u64)], mode: ExponentMode) -> Result<usize> {
    let Some((min, max)) = exponent_range(normals) else {
        return Ok(0);
    };
    match mode {
        ExponentMode::Independent => Ok(normals.iter().map(|n| prefixed_len(i64::from(n.1))).sum()),
        ExponentMode::CommonExponent => {
            if i32::from(max) - i32::from(min) > i32::from(u8::MAX) {
                return Err(Error::OutOfRange);
            }
            Ok(prefixed_len(i64::from(min)) + normals.len())
        }
        ExponentMode::DeltaExponent => {
            let first = prefixed_len(i64::from(normals[0].1));
            let rest: usize = normals
                .windows(2)
                .map(|w| prefixed_len(i64::from(w[1].1) - i64::from(w[0].1)))
                .sum();
            Ok(first + rest)
        }
    }
}

fn meta_for(values: &[f64], precision: Precision, mode: ExponentMode, s: &Split) -> Result<FloatMeta> {
    let count = values.len();
    let range = exponent_range(&s.normals);
    let mantissas = (s.normals.len() * usize::from(precision.mantissa_bits())).div_ceil(8);
    let encoded_size = if count == 0 {
        0
    } else {
        HEADER_LEN
            + 2 * count.div_ceil(8)
            + exponent_region_len(&s.normals, mode)?
            + mantissas
            + 8 * s.special_count
    };
    Ok(FloatMeta {
        precision,
        mode,
        count,
        special_count: s.special_count,
        min_exponent: range.map(|r| r.0),
        max_exponent: range.map(|r| r.1),
        encoded_size,
    })
}

/// Computes the [`FloatMeta`] of encoding `values` without writing anything.
///
/// Fails with [`Error::OutOfRange`] where [`encode`] would.
pub fn analyze(values: &[f64], precision: Precision, mode: ExponentMode) -> Result<FloatMeta> {
    let s = split(values, precision)?;
    meta_for(values, precision, mode, &s)
}

/// Encodes `values`; an empty slice gives an empty buffer
pub fn encode(values: &[f64], precision: Precision, mode: ExponentMode) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(&mut out, values, precision, mode)?;
    Ok(out)
}

/// Like [`encode`] but appends to `out`, returns the meta of what was written.
/// On error `out` is left untouched.
pub fn encode_into(
    out: &mut Vec<u8>,
    values: &[f64],
    precision: Precision,
    mode: ExponentMode,
) -> Result<FloatMeta> {
    let s = split(values, precision)?;
    // validates the exponent range before anything is written
    let meta = meta_for(values, precision, mode, &s)?;
    if values.is_empty() {
        return Ok(meta);
    }
    out.try_reserve(meta.encoded_size).map_err(|_| Error::AllocationFailure)?;
    let start = out.len();

    out.extend_from_slice(&[
        precision as u8,
        precision.exponent_bits(),
        precision.mantissa_bits(),
        mode as u8,
    ]);

    let mut special: bv::BitVec<u8, bv::Lsb0> = bv::BitVec::repeat(false, values.len());
    let mut signs: bv::BitVec<u8, bv::Lsb0> = bv::BitVec::repeat(false, values.len());
    for (i, &v) in values.iter().enumerate() {
        special.set(i, is_special(v));
        signs.set(i, v.is_sign_negative());
    }
    out.extend_from_slice(special.as_raw_slice());
    out.extend_from_slice(signs.as_raw_slice());

    if let Some((min, _)) = exponent_range(&s.normals) {
        match mode {
            ExponentMode::Independent => {
                for &(_, e, _) in &s.normals {
                    delta::put(out, i64::from(e));
                }
            }
            ExponentMode::CommonExponent => {
                delta::put(out, i64::from(min));
                // range already checked to fit a byte
                out.extend(s.normals.iter().map(|&(_, e, _)| (e - min) as u8));
            }
            ExponentMode::DeltaExponent => {
                let mut prev = s.normals[0].1;
                delta::put(out, i64::from(prev));
                for &(_, e, _) in &s.normals[1..] {
                    delta::put(out, i64::from(e) - i64::from(prev));
                    prev = e;
                }
            }
        }
    }

    let mb = usize::from(precision.mantissa_bits());
    let mut mantissas: bv::BitVec<u8, bv::Lsb0> = bv::BitVec::repeat(false, s.normals.len() * mb);
    for (i, &(_, _, m)) in s.normals.iter().enumerate() {
        mantissas[i * mb..(i + 1) * mb].store_le::<u64>(m);
    }
    out.extend_from_slice(mantissas.as_raw_slice());

    for &v in values.iter().filter(|v| is_special(**v)) {
        out.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    debug_assert_eq!(out.len() - start, meta.encoded_size);
    Ok(meta)
}

/// Encodes with the cheapest precision that honours `max_relative_error`.
/// Returns the buffer together with the chosen precision.
pub fn encode_auto(
    values: &[f64],
    max_relative_error: f64,
    mode: ExponentMode,
) -> Result<(Vec<u8>, Precision)> {
    let precision = precision_for_error(max_relative_error);
    debug!("float precision {:?} for max relative error {}", precision, max_relative_error);
    Ok((encode(values, precision, mode)?, precision))
}

fn checked_exponent(e: i64) -> Result<i16> {
    if (i64::from(MIN_EXPONENT)..=i64::from(MAX_EXPONENT)).contains(&e) {
        Ok(e as i16)
    } else {
        Err(Error::MalformedInput("float exponent out of range"))
    }
}

fn read_header(buf: &[u8]) -> Result<(Precision, ExponentMode)> {
    ensure_len(buf, HEADER_LEN)?;
    let precision =
        Precision::try_from(buf[0]).map_err(|_| Error::MalformedInput("unknown float precision"))?;
    if buf[1] != precision.exponent_bits() || buf[2] != precision.mantissa_bits() {
        return Err(Error::MalformedInput("float bit counts do not match precision"));
    }
    let mode =
        ExponentMode::try_from(buf[3]).map_err(|_| Error::MalformedInput("unknown exponent mode"))?;
    Ok((precision, mode))
}

fn parse(buf: &[u8], count: usize) -> Result<(Vec<f64>, FloatMeta)> {
    let (precision, mode) = read_header(buf)?;
    let bitmap_len = count.div_ceil(8);
    let mut pos = HEADER_LEN + 2 * bitmap_len;
    ensure_len(buf, pos)?;
    let special = &bv::BitSlice::<u8, bv::Lsb0>::from_slice(&buf[HEADER_LEN..HEADER_LEN + bitmap_len])[..count];
    let signs = &bv::BitSlice::<u8, bv::Lsb0>::from_slice(&buf[HEADER_LEN + bitmap_len..pos])[..count];
    let special_count = special.count_ones();
    let normal_count = count - special_count;

    let mut exponents: Vec<i16> = try_vec_with_capacity(normal_count)?;
    if normal_count > 0 {
        match mode {
            ExponentMode::Independent => {
                for _ in 0..normal_count {
                    let (e, n) = delta::get(&buf[pos..])?;
                    pos += n;
                    exponents.push(checked_exponent(e)?);
                }
            }
            ExponentMode::CommonExponent => {
                let (base, n) = delta::get(&buf[pos..])?;
                pos += n;
                ensure_len(&buf[pos..], normal_count)?;
                for &offset in &buf[pos..pos + normal_count] {
                    exponents.push(checked_exponent(base.saturating_add(i64::from(offset)))?);
                }
                pos += normal_count;
            }
            ExponentMode::DeltaExponent => {
                let (first, n) = delta::get(&buf[pos..])?;
                pos += n;
                let mut prev = checked_exponent(first)?;
                exponents.push(prev);
                for _ in 1..normal_count {
                    let (d, n) = delta::get(&buf[pos..])?;
                    pos += n;
                    prev = checked_exponent(i64::from(prev).saturating_add(d))?;
                    exponents.push(prev);
                }
            }
        }
    }

    let mant_bits = precision.mantissa_bits();
    let mb = usize::from(mant_bits);
    let mantissa_len = (normal_count * mb).div_ceil(8);
    ensure_len(&buf[pos..], mantissa_len)?;
    let mantissas = bv::BitSlice::<u8, bv::Lsb0>::from_slice(&buf[pos..pos + mantissa_len]);
    pos += mantissa_len;

    ensure_len(&buf[pos..], 8 * special_count)?;
    let mut verbatim = buf[pos..pos + 8 * special_count].chunks_exact(8);
    pos += 8 * special_count;

    let mut values = try_vec_with_capacity(count)?;
    let mut normal = 0;
    for i in 0..count {
        if special[i] {
            let bytes: [u8; 8] = verbatim
                .next()
                .and_then(|c| c.try_into().ok())
                .ok_or(Error::MalformedInput("missing special float"))?;
            values.push(f64::from_le_bytes(bytes));
        } else {
            let stored: u64 = mantissas[normal * mb..(normal + 1) * mb].load_le();
            values.push(compose(signs[i], exponents[normal], expand(stored, mant_bits)));
            normal += 1;
        }
    }

    let meta = FloatMeta {
        precision,
        mode,
        count,
        special_count,
        min_exponent: exponents.iter().min().copied(),
        max_exponent: exponents.iter().max().copied(),
        encoded_size: pos,
    };
    Ok((values, meta))
}

/// Decodes `count` values, returns them with the number of bytes read
pub fn decode(buf: &[u8], count: usize) -> Result<(Vec<f64>, usize)> {
    if count == 0 {
        return Ok((Vec::new(), 0));
    }
    let (values, meta) = parse(buf, count)?;
    Ok((values, meta.encoded_size))
}

/// Reads the meta of an encoded array of `count` values.
/// An empty array has no header, so `count` must be positive.
pub fn read_meta(buf: &[u8], count: usize) -> Result<FloatMeta> {
    if count == 0 {
        return Err(Error::InvalidArgument("an empty float array has no header"));
    }
    Ok(parse(buf, count)?.1)
}
