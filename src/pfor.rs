//! Patched Frame-of-Reference (PFOR).
//!
//! Like [`crate::frame_of_reference`], but the frame width is sized for a percentile of
//! the data rather than its maximum. Values above that percentile are exceptions: their
//! slot holds the marker (all ones at the frame width) and the real value goes to a list
//! behind the slots.
//!
//! ```text
//! [min: tagged][width: u8][count: tagged][slot_0 .. slot_{count-1}: width bytes, LE]
//! [exception_count: tagged]([index: tagged][value: tagged])*
//! ```
//!
//! The exception list may come in any order. Decoding applies it after the slot pass and
//! needs exactly one entry per marker slot.
//!
//! # Example
//! ```rust
//! # use varint_codecs::pfor::{self, Threshold};
//! let data = vec![100, 102, 105, 103, 500, 108, 107, 101];
//! let (enc, meta) = pfor::encode(&data, Threshold::P95).unwrap();
//! assert_eq!(meta.exception_count, 1);
//! assert_eq!(pfor::get_at(&enc, 4).unwrap(), 500);
//! assert_eq!(pfor::decode(&enc).unwrap().0, data);
//! ```

use bitvec::prelude as bv;
use log::debug;

use crate::error::{ensure_len, try_vec_with_capacity, Error, Result};
use crate::external::{self, load_le};
use crate::tagged;
use crate::width::Width;

/// Percentile that decides the frame width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// 90th percentile, more exceptions, narrower slots
    P90,
    /// 95th percentile
    #[default]
    P95,
    /// 99th percentile
    P99,
}

impl Threshold {
    /// the percentile as a number
    pub fn percent(self) -> u64 {
        match self {
            Threshold::P90 => 90,
            Threshold::P95 => 95,
            Threshold::P99 => 99,
        }
    }
}

impl TryFrom<u8> for Threshold {
    type Error = Error;

    fn try_from(p: u8) -> Result<Self> {
        match p {
            90 => Ok(Threshold::P90),
            95 => Ok(Threshold::P95),
            99 => Ok(Threshold::P99),
            _ => Err(Error::InvalidArgument("threshold must be 90, 95 or 99")),
        }
    }
}

/// How the encoder laid out the slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PforLayout {
    /// frame sized by the threshold, outliers patched in from the exception list
    Patched,
    /// frame sized by the full range so every value is inline; chosen when
    /// scratch memory for the analysis could not be reserved
    Inline,
}

/// Header fields plus what the analysis found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PforMeta {
    /// frame of reference
    pub min_value: u64,
    /// slot width
    pub width: Width,
    /// number of values
    pub count: usize,
    /// entries in the exception list
    pub exception_count: usize,
    /// slot value meaning "see exceptions"
    pub marker: u64,
    /// percentile used. Not persisted; reads back as [`Threshold::P95`]
    pub threshold: Threshold,
    /// largest value kept inline. Not persisted; reads back as `min_value`
    pub threshold_value: u64,
    /// layout the encoder picked. Reads back as [`PforLayout::Patched`]
    pub layout: PforLayout,
}

/// all ones at `width`
pub fn marker_for(width: Width) -> u64 {
    width.max_u64()
}

impl PforMeta {
    fn empty(threshold: Threshold) -> Self {
        PforMeta {
            min_value: 0,
            width: Width::W1,
            count: 0,
            exception_count: 0,
            marker: marker_for(Width::W1),
            threshold,
            threshold_value: 0,
            layout: PforLayout::Patched,
        }
    }

    fn header_len(&self) -> usize {
        tagged::len(self.min_value) + 1 + tagged::len(self.count as u64)
    }

    #[inline]
    fn is_exception(&self, v: u64) -> bool {
        v > self.threshold_value || v - self.min_value >= self.marker
    }
}

/// Sorts a copy of `values` to find the minimum and the threshold value, then sizes
/// the frame and counts the exceptions.
///
/// The threshold value sits at sorted index `(count - 1) * percent / 100`, rounded down,
/// so it is always one of the values and the maximum only for `count == 1`. Indexing by
/// `count * percent / 100` instead would pick the maximum of any array shorter than
/// `100 / (100 - percent)` and leave it without exceptions.
pub fn compute_threshold(values: &[u64], threshold: Threshold) -> Result<PforMeta> {
    if values.is_empty() {
        return Ok(PforMeta::empty(threshold));
    }
    let mut sorted = try_vec_with_capacity(values.len())?;
    sorted.extend_from_slice(values);
    sorted.sort_unstable();
    let count = sorted.len();
    let index = (count - 1) * threshold.percent() as usize / 100;
    let min_value = sorted[0];
    let threshold_value = sorted[index];
    let width = external::width_of(threshold_value - min_value);
    let mut meta = PforMeta {
        min_value,
        width,
        count,
        exception_count: 0,
        marker: marker_for(width),
        threshold,
        threshold_value,
        layout: PforLayout::Patched,
    };
    meta.exception_count = values.iter().filter(|&&v| meta.is_exception(v)).count();
    Ok(meta)
}

/// frame wide enough for every value; only a value sitting exactly on the marker
/// (possible at width 8) still needs an exception
fn inline_meta(values: &[u64], threshold: Threshold) -> PforMeta {
    let Some(&first) = values.first() else {
        return PforMeta::empty(threshold);
    };
    let (min, max) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let width = external::width_of((max - min).saturating_add(1));
    let mut meta = PforMeta {
        min_value: min,
        width,
        count: values.len(),
        exception_count: 0,
        marker: marker_for(width),
        threshold,
        threshold_value: max,
        layout: PforLayout::Inline,
    };
    meta.exception_count = values.iter().filter(|&&v| meta.is_exception(v)).count();
    meta
}

/// Upper bound of the encoded size, assuming worst case exception values.
pub fn size(meta: &PforMeta) -> usize {
    meta.header_len()
        + meta.count * meta.width.bytes()
        + tagged::len(meta.exception_count as u64)
        + meta.exception_count * (tagged::len(meta.count as u64) + tagged::MAX_LEN)
}

/// Encodes `values`. If the scratch space for the percentile analysis can't be
/// reserved, falls back to [`PforLayout::Inline`], reported in the returned meta.
pub fn encode(values: &[u64], threshold: Threshold) -> Result<(Vec<u8>, PforMeta)> {
    let meta = or_inline(compute_threshold(values, threshold), values, threshold)?;
    Ok((write(values, &meta), meta))
}

/// the analysed meta, or the inline one if the analysis ran out of memory
fn or_inline(analysed: Result<PforMeta>, values: &[u64], threshold: Threshold) -> Result<PforMeta> {
    match analysed {
        Err(Error::AllocationFailure) => {
            debug!("pfor: no scratch for {} values, encoding inline", values.len());
            Ok(inline_meta(values, threshold))
        }
        r => r,
    }
}

/// [`encode`] with the layout chosen by the caller
pub fn encode_with_layout(
    values: &[u64],
    threshold: Threshold,
    layout: PforLayout,
) -> Result<(Vec<u8>, PforMeta)> {
    let meta = match layout {
        PforLayout::Patched => compute_threshold(values, threshold)?,
        PforLayout::Inline => inline_meta(values, threshold),
    };
    Ok((write(values, &meta), meta))
}

/// Appends the encoding to `out`, returns the meta
pub fn encode_into(out: &mut Vec<u8>, values: &[u64], threshold: Threshold) -> Result<PforMeta> {
    let (enc, meta) = encode(values, threshold)?;
    out.extend_from_slice(&enc);
    Ok(meta)
}

fn write(values: &[u64], meta: &PforMeta) -> Vec<u8> {
    let mut out = Vec::with_capacity(size(meta));
    tagged::push(&mut out, meta.min_value);
    out.push(u8::from(meta.width));
    tagged::push(&mut out, meta.count as u64);
    for &v in values {
        let slot = if meta.is_exception(v) { meta.marker } else { v - meta.min_value };
        external::push_fixed_width(&mut out, slot, meta.width);
    }
    tagged::push(&mut out, meta.exception_count as u64);
    for (i, &v) in values.iter().enumerate() {
        if meta.is_exception(v) {
            tagged::push(&mut out, i as u64);
            tagged::push(&mut out, v);
        }
    }
    out
}

/// parses the header, returns meta and the offset of the first slot
fn read_header(buf: &[u8]) -> Result<(PforMeta, usize)> {
    let (min_value, a) = tagged::get(buf)?;
    ensure_len(buf, a + 1)?;
    let width = Width::try_from(buf[a])?;
    if width > Width::W8 {
        return Err(Error::InvalidWidth(width.into()));
    }
    let (count, b) = tagged::get(&buf[a + 1..])?;
    let count = usize::try_from(count).map_err(|_| Error::Overflow)?;
    let meta = PforMeta {
        min_value,
        width,
        count,
        exception_count: 0,
        marker: marker_for(width),
        threshold: Threshold::P95,
        threshold_value: min_value,
        layout: PforLayout::Patched,
    };
    Ok((meta, a + 1 + b))
}

/// offset of the exception count, checked against the buffer
fn slots_end(buf: &[u8], meta: &PforMeta, start: usize) -> Result<usize> {
    let end = meta
        .count
        .checked_mul(meta.width.bytes())
        .and_then(|n| n.checked_add(start))
        .ok_or(Error::Overflow)?;
    ensure_len(buf, end)?;
    Ok(end)
}

/// Reads the header and the exception count
pub fn read_meta(buf: &[u8]) -> Result<PforMeta> {
    let (mut meta, start) = read_header(buf)?;
    let end = slots_end(buf, &meta, start)?;
    let (exceptions, _) = tagged::get(&buf[end..])?;
    meta.exception_count = usize::try_from(exceptions).map_err(|_| Error::Overflow)?;
    Ok(meta)
}

/// Decodes everything, returns the values and the bytes consumed
pub fn decode(buf: &[u8]) -> Result<(Vec<u64>, usize)> {
    let (meta, start) = read_header(buf)?;
    let end = slots_end(buf, &meta, start)?;
    let w = meta.width.bytes();
    let mut out = try_vec_with_capacity(meta.count)?;
    let mut markers: bv::BitVec<u8, bv::Lsb0> = bv::BitVec::repeat(false, meta.count);
    for (i, slot) in buf[start..end].chunks_exact(w).enumerate() {
        let offset = load_le(slot);
        if offset == meta.marker {
            markers.set(i, true);
            out.push(meta.marker);
        } else {
            out.push(meta.min_value.wrapping_add(offset));
        }
    }

    let (exceptions, n) = tagged::get(&buf[end..])?;
    let mut pos = end + n;
    if exceptions != markers.count_ones() as u64 {
        return Err(Error::MalformedInput("exception count does not match marker slots"));
    }
    let mut patched: bv::BitVec<u8, bv::Lsb0> = bv::BitVec::repeat(false, meta.count);
    for _ in 0..exceptions {
        let (index, a) = tagged::get(&buf[pos..])?;
        let (value, b) = tagged::get(&buf[pos + a..])?;
        pos += a + b;
        if index >= meta.count as u64 {
            return Err(Error::MalformedInput("exception index past the end"));
        }
        let index = index as usize;
        if !markers[index] {
            return Err(Error::MalformedInput("exception does not patch a marker slot"));
        }
        if patched.replace(index, true) {
            return Err(Error::MalformedInput("marker slot patched twice"));
        }
        out[index] = value;
    }
    Ok((out, pos))
}

/// Value at `index`: one slot read, plus a scan of the exception list if it's a marker.
pub fn get_at(buf: &[u8], index: usize) -> Result<u64> {
    let (meta, start) = read_header(buf)?;
    if index >= meta.count {
        return Err(Error::OutOfRange);
    }
    let end = slots_end(buf, &meta, start)?;
    let w = meta.width.bytes();
    let at = start + index * w;
    let offset = load_le(&buf[at..at + w]);
    if offset != meta.marker {
        return Ok(meta.min_value.wrapping_add(offset));
    }
    let (exceptions, n) = tagged::get(&buf[end..])?;
    let mut pos = end + n;
    for _ in 0..exceptions {
        let (i, a) = tagged::get(&buf[pos..])?;
        let (value, b) = tagged::get(&buf[pos + a..])?;
        if i == index as u64 {
            return Ok(value);
        }
        pos += a + b;
    }
    Err(Error::MalformedInput("marker slot without exception"))
}
