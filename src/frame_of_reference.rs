//! Frame-of-Reference (FOR) encoding of `u64` arrays.
//!
//! All values are stored as fixed-width offsets from the minimum:
//! ```text
//! [min: tagged][width: u8][count: tagged][offset_0 .. offset_{count-1}: width bytes each, LE]
//! ```
//! The width is the smallest byte count holding `max - min`. Because every offset has
//! the same width, element `i` can be read without touching the others ([`get_at`]).
//!
//! The `batch_*` functions give the same bytes/values as their scalar counterparts but
//! work in lanes of [`LANES`] values once there are at least [`SIMD_MIN_COUNT`] of them.
//!
//! # Example
//! ```rust
//! # use varint_codecs::frame_of_reference as vfor;
//! let data = vec![1000, 1005, 1002, 1010, 1001];
//! let (enc, meta) = vfor::encode(&data);
//! assert_eq!(meta.range, 10);
//! assert_eq!(vfor::get_at(&enc, 3).unwrap(), 1010);
//! let (dec, _) = vfor::decode(&enc).unwrap();
//! assert_eq!(dec, data);
//! ```

use crate::error::{ensure_len, try_vec_with_capacity, Error, Result};
use crate::external::{self, load_le};
use crate::tagged;
use crate::width::Width;

/// values processed per step on the lane-batched paths
pub const LANES: usize = 16;
/// below this count the batch functions fall back to the scalar loop
pub const SIMD_MIN_COUNT: usize = 16;

/// What the encoder knows about an array; most of it is also in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForMeta {
    /// smallest value, the frame of reference
    pub min_value: u64,
    /// largest value. Not persisted: [`read_meta`] reports `min_value`
    pub max_value: u64,
    /// `max_value - min_value`, 0 when read back from a header
    pub range: u64,
    /// number of values
    pub count: usize,
    /// bytes per offset
    pub offset_width: Width,
    /// header plus offsets
    pub encoded_size: usize,
}

impl ForMeta {
    fn from_min_max(min_value: u64, max_value: u64, count: usize) -> Self {
        let range = max_value - min_value;
        let offset_width = compute_width(range);
        let mut meta = ForMeta {
            min_value,
            max_value,
            range,
            count,
            offset_width,
            encoded_size: 0,
        };
        meta.encoded_size = encoded_size(&meta);
        meta
    }

    /// bytes before the first offset
    pub fn header_len(&self) -> usize {
        self.encoded_size - self.count * self.offset_width.bytes()
    }
}

/// smallest width holding `range`
#[inline]
pub fn compute_width(range: u64) -> Width {
    external::width_of(range)
}

/// Single pass min/max. An empty slice gives a zero frame with width 1.
pub fn analyze(values: &[u64]) -> ForMeta {
    let Some(&first) = values.first() else {
        return ForMeta::from_min_max(0, 0, 0);
    };
    let (min, max) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    ForMeta::from_min_max(min, max, values.len())
}

/// header plus `count * offset_width`
pub fn encoded_size(meta: &ForMeta) -> usize {
    tagged::len(meta.min_value) + 1 + tagged::len(meta.count as u64)
        + meta.count * meta.offset_width.bytes()
}

/// Encodes `values`, returns the buffer and the meta it was built from
pub fn encode(values: &[u64]) -> (Vec<u8>, ForMeta) {
    let meta = analyze(values);
    let mut out = Vec::with_capacity(meta.encoded_size);
    write_header(&mut out, &meta);
    for &v in values {
        external::push_fixed_width(&mut out, v - meta.min_value, meta.offset_width);
    }
    (out, meta)
}

/// Appends the encoding of `values` to `out`; returns the meta (its `encoded_size` is what got appended)
pub fn encode_into(out: &mut Vec<u8>, values: &[u64]) -> ForMeta {
    let (enc, meta) = encode(values);
    out.extend_from_slice(&enc);
    meta
}

/// Encodes with a meta computed earlier (by [`analyze`] or [`batch_analyze`]).
/// The meta has to describe `values`: same count, every value inside its frame.
pub fn encode_with_meta(out: &mut Vec<u8>, values: &[u64], meta: &ForMeta) -> Result<usize> {
    if meta.count != values.len() {
        return Err(Error::InvalidArgument("meta count does not match values"));
    }
    let limit = meta.offset_width.max_u64();
    if values
        .iter()
        .any(|&v| v < meta.min_value || v - meta.min_value > limit)
    {
        return Err(Error::OutOfRange);
    }
    let start = out.len();
    write_header(out, meta);
    for &v in values {
        external::push_fixed_width(out, v - meta.min_value, meta.offset_width);
    }
    Ok(out.len() - start)
}

fn write_header(out: &mut Vec<u8>, meta: &ForMeta) {
    tagged::push(out, meta.min_value);
    out.push(u8::from(meta.offset_width));
    tagged::push(out, meta.count as u64);
}

/// Parses the header. `max_value`/`range` are not stored and come back as `min_value`/0.
pub fn read_meta(buf: &[u8]) -> Result<ForMeta> {
    let (min_value, a) = tagged::get(buf)?;
    ensure_len(buf, a + 1)?;
    let offset_width = Width::try_from(buf[a])?;
    if offset_width > Width::W8 {
        return Err(Error::InvalidWidth(offset_width.into()));
    }
    let (count, b) = tagged::get(&buf[a + 1..])?;
    let count = usize::try_from(count).map_err(|_| Error::Overflow)?;
    let header = a + 1 + b;
    let body = count
        .checked_mul(offset_width.bytes())
        .ok_or(Error::Overflow)?;
    Ok(ForMeta {
        min_value,
        max_value: min_value,
        range: 0,
        count,
        offset_width,
        encoded_size: header.checked_add(body).ok_or(Error::Overflow)?,
    })
}

/// checks the whole encoding is present, returns `(meta, offsets)`
fn split_body(buf: &[u8]) -> Result<(ForMeta, &[u8])> {
    let meta = read_meta(buf)?;
    ensure_len(buf, meta.encoded_size)?;
    Ok((meta, &buf[meta.header_len()..meta.encoded_size]))
}

/// Decodes the whole array, returns it with the bytes consumed
pub fn decode(buf: &[u8]) -> Result<(Vec<u64>, usize)> {
    let (meta, body) = split_body(buf)?;
    let mut out = try_vec_with_capacity(meta.count)?;
    decode_scalar(body, meta.offset_width.bytes(), meta.min_value, &mut out);
    Ok((out, meta.encoded_size))
}

fn decode_scalar(body: &[u8], w: usize, min: u64, out: &mut Vec<u64>) {
    out.extend(body.chunks_exact(w).map(|c| min.wrapping_add(load_le(c))));
}

/// Value at `index` straight from the encoding
pub fn get_at(buf: &[u8], index: usize) -> Result<u64> {
    let meta = read_meta(buf)?;
    if index >= meta.count {
        return Err(Error::OutOfRange);
    }
    let w = meta.offset_width.bytes();
    let at = meta.header_len() + index * w;
    ensure_len(buf, at + w)?;
    Ok(meta.min_value.wrapping_add(load_le(&buf[at..at + w])))
}

/// minimum stored in the header
pub fn get_min_value(buf: &[u8]) -> Result<u64> {
    Ok(tagged::get(buf)?.0)
}

/// element count stored in the header
pub fn get_count(buf: &[u8]) -> Result<usize> {
    Ok(read_meta(buf)?.count)
}

/// offset width stored in the header
pub fn get_offset_width(buf: &[u8]) -> Result<Width> {
    Ok(read_meta(buf)?.offset_width)
}

/// [`analyze`] over lanes of [`LANES`] values
pub fn batch_analyze(values: &[u64]) -> ForMeta {
    if values.len() < SIMD_MIN_COUNT {
        return analyze(values);
    }
    let chunks = values.chunks_exact(LANES);
    let rem = chunks.remainder();
    let mut lo = [u64::MAX; LANES];
    let mut hi = [0_u64; LANES];
    for chunk in chunks {
        for ((l, h), &v) in lo.iter_mut().zip(hi.iter_mut()).zip(chunk) {
            *l = (*l).min(v);
            *h = (*h).max(v);
        }
    }
    let mut min = lo.iter().copied().fold(u64::MAX, u64::min);
    let mut max = hi.iter().copied().fold(0, u64::max);
    for &v in rem {
        min = min.min(v);
        max = max.max(v);
    }
    ForMeta::from_min_max(min, max, values.len())
}

/// [`encode`] with the analysis done by [`batch_analyze`]; same bytes
pub fn batch_encode(values: &[u64]) -> (Vec<u8>, ForMeta) {
    let meta = batch_analyze(values);
    let mut out = Vec::with_capacity(meta.encoded_size);
    write_header(&mut out, &meta);
    for &v in values {
        external::push_fixed_width(&mut out, v - meta.min_value, meta.offset_width);
    }
    (out, meta)
}

// widen `$t`-sized little-endian offsets one lane at a time
macro_rules! decode_lanes {
    ($body:expr, $min:expr, $out:expr, $t:ty) => {{
        const W: usize = std::mem::size_of::<$t>();
        let chunks = $body.chunks_exact(LANES * W);
        let rem = chunks.remainder();
        for chunk in chunks {
            let mut lane = [0_u64; LANES];
            for (slot, bytes) in lane.iter_mut().zip(chunk.chunks_exact(W)) {
                let mut b = [0_u8; W];
                b.copy_from_slice(bytes);
                *slot = $min.wrapping_add(<$t>::from_le_bytes(b) as u64);
            }
            $out.extend_from_slice(&lane);
        }
        decode_scalar(rem, W, $min, $out);
    }};
}

fn decode_lanes_into(body: &[u8], w: Width, min: u64, out: &mut Vec<u64>) {
    match w {
        Width::W1 => decode_lanes!(body, min, out, u8),
        Width::W2 => decode_lanes!(body, min, out, u16),
        Width::W4 => decode_lanes!(body, min, out, u32),
        Width::W8 => decode_lanes!(body, min, out, u64),
        // odd widths have no native lane type
        _ => decode_scalar(body, w.bytes(), min, out),
    }
}

/// [`decode`] on the lane path; same values
pub fn batch_decode(buf: &[u8]) -> Result<(Vec<u64>, usize)> {
    let (meta, body) = split_body(buf)?;
    let mut out = try_vec_with_capacity(meta.count)?;
    if meta.count >= SIMD_MIN_COUNT {
        decode_lanes_into(body, meta.offset_width, meta.min_value, &mut out);
    } else {
        decode_scalar(body, meta.offset_width.bytes(), meta.min_value, &mut out);
    }
    Ok((out, meta.encoded_size))
}

/// Decodes up to `block_size` values starting at `start`.
/// Returns fewer at the end of the array, none if `start` is past it.
pub fn decode_block(buf: &[u8], start: usize, block_size: usize) -> Result<Vec<u64>> {
    let meta = read_meta(buf)?;
    if start >= meta.count {
        return Ok(Vec::new());
    }
    let n = block_size.min(meta.count - start);
    let w = meta.offset_width.bytes();
    let from = meta.header_len() + start * w;
    ensure_len(buf, from + n * w)?;
    let body = &buf[from..from + n * w];
    let mut out = try_vec_with_capacity(n)?;
    if n >= SIMD_MIN_COUNT {
        decode_lanes_into(body, meta.offset_width, meta.min_value, &mut out);
    } else {
        decode_scalar(body, w, meta.min_value, &mut out);
    }
    Ok(out)
}
