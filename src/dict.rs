//! Dictionary encoding for arrays with few distinct values.
//!
//! ```text
//! [dict_size: tagged][dict values: tagged, ascending][count: tagged][index_0 .. index_{count-1}]
//! ```
//! Indices are fixed width, just wide enough for `dict_size - 1`.
//!
//! # Example
//! ```rust
//! # use varint_codecs::dict;
//! let data = vec![200, 200, 404, 200, 500, 200];
//! let enc = dict::encode(&data).unwrap();
//! let (dec, _) = dict::decode(&enc).unwrap();
//! assert_eq!(dec, data);
//! ```

use crate::error::{ensure_len, try_vec_with_capacity, Error, Result};
use crate::external::{self, load_le};
use crate::tagged;
use crate::width::Width;

/// Largest dictionary a decoder accepts (and an encoder produces).
pub const MAX_DICT_SIZE: usize = 1 << 20;

/// Sorted distinct values of an array plus the index width they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    values: Vec<u64>,
    index_width: Width,
}

impl Dictionary {
    /// Sorts a copy of `values` and keeps the distinct ones.
    /// More than [`MAX_DICT_SIZE`] distinct values is an [`Error::OutOfRange`].
    pub fn build(values: &[u64]) -> Result<Self> {
        let mut sorted = try_vec_with_capacity(values.len())?;
        sorted.extend_from_slice(values);
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() > MAX_DICT_SIZE {
            return Err(Error::OutOfRange);
        }
        sorted.shrink_to_fit();
        let index_width = index_width_for(sorted.len());
        Ok(Dictionary { values: sorted, index_width })
    }

    /// index of `v`, binary search
    pub fn find(&self, v: u64) -> Option<usize> {
        self.values.binary_search(&v).ok()
    }

    /// value at `index`
    pub fn lookup(&self, index: usize) -> Option<u64> {
        self.values.get(index).copied()
    }

    /// number of distinct values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// no values at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// the distinct values, ascending
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// bytes per index
    pub fn index_width(&self) -> Width {
        self.index_width
    }

    /// header bytes: size and values
    fn dict_bytes(&self) -> usize {
        tagged::len(self.values.len() as u64)
            + self.values.iter().map(|&v| tagged::len(v)).sum::<usize>()
    }
}

fn index_width_for(dict_size: usize) -> Width {
    external::width_of(dict_size.saturating_sub(1) as u64)
}

/// Summary of what dictionary encoding would do to an array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DictStats {
    /// distinct values
    pub unique_count: usize,
    /// input length
    pub total_count: usize,
    /// dictionary size field plus values
    pub dict_bytes: usize,
    /// all indices
    pub index_bytes: usize,
    /// whole encoding
    pub total_bytes: usize,
    /// input as plain `u64`s
    pub original_bytes: usize,
    /// `original_bytes / total_bytes`
    pub compression_ratio: f64,
    /// `(1 - total_bytes / original_bytes) * 100`
    pub space_reduction: f64,
}

/// Builds a dictionary and encodes `values` with it
pub fn encode(values: &[u64]) -> Result<Vec<u8>> {
    let dict = Dictionary::build(values)?;
    let mut out = Vec::with_capacity(encoded_size_with_dict(&dict, values.len()));
    encode_with_dict(&mut out, &dict, values)?;
    Ok(out)
}

/// Appends the encoding of `values` using `dict`; returns bytes written.
/// A value missing from `dict` is an [`Error::OutOfRange`] and nothing is written.
pub fn encode_with_dict(out: &mut Vec<u8>, dict: &Dictionary, values: &[u64]) -> Result<usize> {
    let mut indices = try_vec_with_capacity(values.len())?;
    for &v in values {
        indices.push(dict.find(v).ok_or(Error::OutOfRange)?);
    }
    let start = out.len();
    tagged::push(out, dict.len() as u64);
    for &v in &dict.values {
        tagged::push(out, v);
    }
    tagged::push(out, values.len() as u64);
    for i in indices {
        external::push_fixed_width(out, i as u64, dict.index_width);
    }
    Ok(out.len() - start)
}

/// size [`encode`] would produce
pub fn encoded_size(values: &[u64]) -> Result<usize> {
    let dict = Dictionary::build(values)?;
    Ok(encoded_size_with_dict(&dict, values.len()))
}

/// size of encoding `count` values with `dict`
pub fn encoded_size_with_dict(dict: &Dictionary, count: usize) -> usize {
    dict.dict_bytes() + tagged::len(count as u64) + count * dict.index_width.bytes()
}

/// `8 * count / encoded_size`, 0 for an empty input
pub fn compression_ratio(values: &[u64]) -> Result<f64> {
    if values.is_empty() {
        return Ok(0.0);
    }
    let size = encoded_size(values)?;
    Ok((values.len() * 8) as f64 / size as f64)
}

/// What encoding `values` would cost; the dictionary is built and dropped.
pub fn stats(values: &[u64]) -> Result<DictStats> {
    let dict = Dictionary::build(values)?;
    let count = values.len();
    let dict_bytes = dict.dict_bytes();
    let index_bytes = count * dict.index_width.bytes();
    let total_bytes = dict_bytes + tagged::len(count as u64) + index_bytes;
    let original_bytes = count * 8;
    Ok(DictStats {
        unique_count: dict.len(),
        total_count: count,
        dict_bytes,
        index_bytes,
        total_bytes,
        original_bytes,
        compression_ratio: original_bytes as f64 / total_bytes as f64,
        space_reduction: if original_bytes == 0 {
            0.0
        } else {
            (1.0 - total_bytes as f64 / original_bytes as f64) * 100.0
        },
    })
}

/// validated header: dictionary, count, offset of the first index
fn read_header(buf: &[u8]) -> Result<(Dictionary, usize, usize)> {
    let (size, mut pos) = tagged::get(buf)?;
    let size = usize::try_from(size).map_err(|_| Error::Overflow)?;
    if size > MAX_DICT_SIZE {
        return Err(Error::MalformedInput("dictionary too large"));
    }
    // every value takes at least one byte
    ensure_len(buf, pos + size)?;
    let mut values = try_vec_with_capacity(size)?;
    for _ in 0..size {
        let (v, n) = tagged::get(&buf[pos..])?;
        if values.last().is_some_and(|&prev| prev >= v) {
            return Err(Error::MalformedInput("dictionary not strictly ascending"));
        }
        values.push(v);
        pos += n;
    }
    let (count, n) = tagged::get(&buf[pos..])?;
    pos += n;
    let count = usize::try_from(count).map_err(|_| Error::Overflow)?;
    if size == 0 && count != 0 {
        return Err(Error::MalformedInput("indices without a dictionary"));
    }
    let index_width = index_width_for(size);
    let body = count
        .checked_mul(index_width.bytes())
        .and_then(|b| b.checked_add(pos))
        .ok_or(Error::Overflow)?;
    ensure_len(buf, body)?;
    Ok((Dictionary { values, index_width }, count, pos))
}

fn resolve(dict: &Dictionary, idx: &[u8]) -> Result<u64> {
    let i = load_le(idx);
    usize::try_from(i)
        .ok()
        .and_then(|i| dict.lookup(i))
        .ok_or(Error::MalformedInput("dictionary index out of range"))
}

/// Decodes a whole buffer, returns the values and bytes consumed
pub fn decode(buf: &[u8]) -> Result<(Vec<u64>, usize)> {
    let (dict, count, pos) = read_header(buf)?;
    let w = dict.index_width.bytes();
    let mut out = try_vec_with_capacity(count)?;
    for idx in buf[pos..pos + count * w].chunks_exact(w) {
        out.push(resolve(&dict, idx)?);
    }
    Ok((out, pos + count * w))
}

/// Decodes into `out`, which must be large enough. Returns `(values, bytes consumed)`.
pub fn decode_into(buf: &[u8], out: &mut [u64]) -> Result<(usize, usize)> {
    let (dict, count, pos) = read_header(buf)?;
    if count > out.len() {
        return Err(Error::BufferTooShort { needed: count, available: out.len() });
    }
    let w = dict.index_width.bytes();
    for (slot, idx) in out.iter_mut().zip(buf[pos..pos + count * w].chunks_exact(w)) {
        *slot = resolve(&dict, idx)?;
    }
    Ok((count, pos + count * w))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};

    #[test]
    fn test_repetitive_scenario() {
        let data = vec![200, 200, 404, 200, 500, 200];
        let dict = Dictionary::build(&data).unwrap();
        assert_eq!(dict.values(), &[200, 404, 500]);
        assert_eq!(dict.index_width(), Width::W1);
        assert_eq!(dict.find(404), Some(1));
        assert_eq!(dict.find(405), None);
        assert_eq!(dict.lookup(2), Some(500));
        assert_eq!(dict.lookup(3), None);

        let enc = encode(&data).unwrap();
        assert_eq!(enc[0], 3);
        assert_eq!(&enc[enc.len() - 6..], &[0, 0, 1, 0, 2, 0]);
        assert_eq!(enc.len(), encoded_size(&data).unwrap());
        let (dec, n) = decode(&enc).unwrap();
        assert_eq!(dec, data);
        assert_eq!(n, enc.len());
    }

    #[test]
    fn test_dict_size_is_unique_count() {
        let mut rng = rand::thread_rng();
        let d = Uniform::from(0..300_u64);
        let data: Vec<u64> = (0..10_000).map(|_| d.sample(&mut rng) * 1_000_003).collect();
        let enc = encode(&data).unwrap();
        let mut uniq = data.clone();
        uniq.sort_unstable();
        uniq.dedup();
        assert_eq!(tagged::get(&enc).unwrap().0, uniq.len() as u64);
        assert_eq!(decode(&enc).unwrap().0, data);
        // more than 256 entries need two byte indices
        if uniq.len() > 256 {
            assert_eq!(Dictionary::build(&data).unwrap().index_width(), Width::W2);
        }
    }

    #[test]
    fn test_decode_into() {
        let data = vec![7, 7, 7, 9];
        let enc = encode(&data).unwrap();
        let mut out = [0_u64; 4];
        assert_eq!(decode_into(&enc, &mut out).unwrap(), (4, enc.len()));
        assert_eq!(out.to_vec(), data);
        let mut small = [0_u64; 3];
        assert!(matches!(decode_into(&enc, &mut small), Err(Error::BufferTooShort { .. })));
    }

    #[test]
    fn test_empty() {
        let enc = encode(&[]).unwrap();
        assert_eq!(enc, vec![0, 0]);
        assert_eq!(decode(&enc).unwrap(), (vec![], 2));
        assert_eq!(compression_ratio(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_malformed() {
        let enc = encode(&[200, 404, 500]).unwrap();
        // index 3 with a dictionary of 3
        let mut bad = enc.clone();
        let last = bad.len() - 1;
        bad[last] = 3;
        assert!(matches!(decode(&bad), Err(Error::MalformedInput(_))));
        // truncated index region
        assert!(matches!(decode(&enc[..enc.len() - 1]), Err(Error::BufferTooShort { .. })));
        // absurd dictionary size
        let mut huge = Vec::new();
        tagged::push(&mut huge, (MAX_DICT_SIZE + 1) as u64);
        assert!(matches!(decode(&huge), Err(Error::MalformedInput(_))));
        // dictionary size larger than the buffer
        let mut short = Vec::new();
        tagged::push(&mut short, 1000);
        assert!(matches!(decode(&short), Err(Error::BufferTooShort { .. })));
        // count without dictionary
        assert!(matches!(decode(&[0, 5]), Err(Error::MalformedInput(_))));
        // dictionary [7, 7] and [9, 3], one index each
        assert!(matches!(decode(&[2, 7, 7, 1, 0]), Err(Error::MalformedInput(_))));
        assert!(matches!(decode(&[2, 9, 3, 1, 0]), Err(Error::MalformedInput(_))));
        assert_eq!(decode(&[2, 3, 9, 1, 1]).unwrap(), (vec![9], 5));
    }

    #[test]
    fn test_value_missing_from_dict() {
        let dict = Dictionary::build(&[1, 2, 3]).unwrap();
        let mut out = Vec::new();
        assert_eq!(encode_with_dict(&mut out, &dict, &[1, 4]), Err(Error::OutOfRange));
        assert!(out.is_empty());
    }

    #[test]
    fn test_stats() {
        let data = vec![200, 200, 404, 200, 500, 200];
        let s = stats(&data).unwrap();
        assert_eq!(s.unique_count, 3);
        assert_eq!(s.total_count, 6);
        assert_eq!(s.index_bytes, 6);
        assert_eq!(s.original_bytes, 48);
        assert_eq!(s.total_bytes, encode(&data).unwrap().len());
        assert!(s.compression_ratio > 1.0);
        assert!((s.compression_ratio - compression_ratio(&data).unwrap()).abs() < 1e-12);
        assert!(s.space_reduction > 0.0);
    }
}
