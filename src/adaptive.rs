//! Picks an array codec from the statistics of the data.
//!
//! [`analyze`] makes one pass over the input and [`select_encoding`] walks a fixed
//! decision tree over the result. The output is the chosen codec's body behind a one
//! byte [`Encoding`] tag:
//! ```text
//! [encoding: u8][body of delta | frame_of_reference | pfor | dict | bitmap | tagged]
//! ```
//! The tagged body is the values as back to back tagged varints. Delta and tagged bodies
//! don't store their length, so [`decode`] takes the value count.
//!
//! # Example
//! ```rust
//! # use varint_codecs::adaptive::{self, Encoding};
//! let data: Vec<u64> = (0..200).map(|i| 1_000_000 + 3 * i).collect();
//! let (enc, meta) = adaptive::encode(&data).unwrap();
//! assert_eq!(meta.encoding, Encoding::Delta);
//! let (dec, _) = adaptive::decode(&enc, data.len()).unwrap();
//! assert_eq!(dec, data);
//! ```

use log::{debug, trace};

use crate::bitmap::{self, VarintBitmap};
use crate::delta;
use crate::dict;
use crate::error::{ensure_len, try_vec_with_capacity, Error, Result};
use crate::frame_of_reference::{self as vfor, ForMeta};
use crate::pfor::{self, PforMeta, Threshold};
use crate::tagged;

/// above this count [`count_unique`] estimates from a sample
pub const EXACT_UNIQUE_LIMIT: usize = 10_000;
/// below this ratio of distinct values the dictionary wins
pub const DICT_UNIQUE_RATIO: f64 = 0.15;
/// share of values above the 95% mark tolerated by PFOR
pub const PFOR_OUTLIER_RATIO: f64 = 0.05;

const MIN_SAMPLE: usize = 100;

/// Inner codec, persisted as the first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Encoding {
    /// sorted or slowly changing sequences
    Delta = 0,
    /// values clustered in a narrow range
    For = 1,
    /// clustered values with a few outliers
    Pfor = 2,
    /// few distinct values
    Dict = 3,
    /// dense ascending sets below 65536
    Bitmap = 4,
    /// one tagged varint per value
    Tagged = 5,
    /// reserved, neither encoded nor decoded
    Group = 6,
}

impl Encoding {
    /// upper case name, for logs and reports
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Delta => "DELTA",
            Encoding::For => "FOR",
            Encoding::Pfor => "PFOR",
            Encoding::Dict => "DICT",
            Encoding::Bitmap => "BITMAP",
            Encoding::Tagged => "TAGGED",
            Encoding::Group => "GROUP",
        }
    }
}

impl TryFrom<u8> for Encoding {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Encoding::Delta),
            1 => Ok(Encoding::For),
            2 => Ok(Encoding::Pfor),
            3 => Ok(Encoding::Dict),
            4 => Ok(Encoding::Bitmap),
            5 => Ok(Encoding::Tagged),
            6 => Ok(Encoding::Group),
            _ => Err(Error::MalformedInput("unknown adaptive encoding")),
        }
    }
}

/// Result of [`analyze`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DataStats {
    /// number of values
    pub count: usize,
    /// smallest value
    pub min_value: u64,
    /// largest value
    pub max_value: u64,
    /// `max_value - min_value`
    pub range: u64,
    /// distinct values, estimated above [`EXACT_UNIQUE_LIMIT`]
    pub unique_count: usize,
    /// `unique_count / count`
    pub unique_ratio: f64,
    /// non-decreasing
    pub is_sorted: bool,
    /// non-increasing and not non-decreasing
    pub is_reverse_sorted: bool,
    /// mean absolute difference of neighbours
    pub avg_delta: u64,
    /// largest absolute difference of neighbours
    pub max_delta: u64,
    /// values above `min + 0.95 * range`
    pub outlier_count: usize,
    /// `outlier_count / count`
    pub outlier_ratio: f64,
    /// every value below 65536
    pub fits_in_bitmap_range: bool,
}

/// Meta of the inner codec, where it has one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerMeta {
    /// the inner codec reports nothing beyond its bytes
    None,
    /// frame of reference header
    For(ForMeta),
    /// patched frame of reference header
    Pfor(PforMeta),
}

/// What got encoded, or what a header says
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveMeta {
    /// inner codec
    pub encoding: Encoding,
    /// number of values; [`read_meta`] only knows it for FOR and PFOR, 0 otherwise
    pub count: usize,
    /// bytes including the tag; [`read_meta`] reports 1 where it can't tell
    pub encoded_size: usize,
    /// inner codec meta
    pub inner: InnerMeta,
}

/// Direction of an array, see [`check_sorted`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sortedness {
    /// non-decreasing, including constant and short arrays
    Ascending,
    /// non-increasing with at least one strict step down
    Descending,
    /// neither
    Unsorted,
}

/// Scans until the array is known to be neither ascending nor descending
pub fn check_sorted(values: &[u64]) -> Sortedness {
    let (mut ascending, mut descending) = (true, true);
    for w in values.windows(2) {
        ascending &= w[0] <= w[1];
        descending &= w[0] >= w[1];
        if !ascending && !descending {
            return Sortedness::Unsorted;
        }
    }
    if ascending {
        Sortedness::Ascending
    } else {
        Sortedness::Descending
    }
}

/// Distinct values; exact up to [`EXACT_UNIQUE_LIMIT`] values, beyond that estimated
/// from every tenth value and scaled up. Gives `values.len()` if scratch space can't be had.
pub fn count_unique(values: &[u64]) -> usize {
    let count = values.len();
    if count <= 1 {
        return count;
    }
    if count <= EXACT_UNIQUE_LIMIT {
        return distinct(values.iter().copied(), count).unwrap_or(count);
    }
    let sample_size = (count / 10).max(MIN_SAMPLE);
    let step = count / sample_size;
    let sample = values.iter().step_by(step).take(sample_size).copied();
    match distinct(sample, sample_size) {
        Ok(unique) => (unique * count / sample_size).min(count),
        Err(_) => count,
    }
}

fn distinct(values: impl Iterator<Item = u64>, n: usize) -> Result<usize> {
    let mut sorted: Vec<u64> = try_vec_with_capacity(n)?;
    sorted.extend(values);
    sorted.sort_unstable();
    sorted.dedup();
    Ok(sorted.len())
}

fn abs_diff_pairs(values: &[u64]) -> impl Iterator<Item = u64> + '_ {
    values.windows(2).map(|w| w[0].abs_diff(w[1]))
}

/// mean absolute difference between neighbours, 0 for fewer than two values
pub fn avg_delta(values: &[u64]) -> u64 {
    if values.len() < 2 {
        return 0;
    }
    let total: u128 = abs_diff_pairs(values).map(u128::from).sum();
    (total / (values.len() as u128 - 1)) as u64
}

/// Collects the [`DataStats`] the decision tree needs
pub fn analyze(values: &[u64]) -> DataStats {
    let Some(&first) = values.first() else {
        return DataStats::default();
    };
    let count = values.len();
    let (min_value, max_value) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max_value - min_value;
    let sortedness = check_sorted(values);
    let unique_count = count_unique(values);

    let outlier_count = if range > 0 {
        let mark = min_value + (u128::from(range) * 95 / 100) as u64;
        values.iter().filter(|&&v| v > mark).count()
    } else {
        0
    };

    let stats = DataStats {
        count,
        min_value,
        max_value,
        range,
        unique_count,
        unique_ratio: unique_count as f64 / count as f64,
        is_sorted: sortedness == Sortedness::Ascending,
        is_reverse_sorted: sortedness == Sortedness::Descending,
        avg_delta: avg_delta(values),
        max_delta: abs_diff_pairs(values).max().unwrap_or(0),
        outlier_count,
        outlier_ratio: outlier_count as f64 / count as f64,
        fits_in_bitmap_range: max_value < bitmap::UNIVERSE as u64,
    };
    trace!("adaptive stats: {:?}", stats);
    stats
}

/// The decision tree, first match wins
pub fn select_encoding(s: &DataStats) -> Encoding {
    if s.count <= 1 {
        return Encoding::Tagged;
    }
    if s.unique_ratio < DICT_UNIQUE_RATIO && s.unique_count <= dict::MAX_DICT_SIZE {
        return Encoding::Dict;
    }
    let monotonic = s.is_sorted || s.is_reverse_sorted;
    if s.fits_in_bitmap_range
        && s.unique_ratio > 0.9
        && monotonic
        && s.range > 0
        && s.count < EXACT_UNIQUE_LIMIT
        && s.count as f64 / s.range as f64 > 0.05
        // a bitmap holds a set: only strictly ascending input decodes to itself
        && s.is_sorted
        && s.unique_count == s.count
    {
        return Encoding::Bitmap;
    }
    if monotonic
        && ((s.min_value > 0 && s.avg_delta < s.min_value / 10) || s.avg_delta < 1000)
    {
        return Encoding::Delta;
    }
    if s.outlier_ratio < PFOR_OUTLIER_RATIO && s.range > 0 {
        return Encoding::Pfor;
    }
    if s.range > 0 && u128::from(s.range) < s.count as u128 * 100 {
        return Encoding::For;
    }
    Encoding::Tagged
}

/// Analyzes `values`, then encodes them with the selected codec
pub fn encode(values: &[u64]) -> Result<(Vec<u8>, AdaptiveMeta)> {
    let encoding = select_encoding(&analyze(values));
    debug!("adaptive: {} values as {}", values.len(), encoding.name());
    match encode_with(values, encoding) {
        // the unique count can be an estimate; a dictionary that turns out too big falls back
        Err(Error::OutOfRange) if encoding == Encoding::Dict => {
            debug!("adaptive: dictionary too large, falling back to TAGGED");
            encode_with(values, Encoding::Tagged)
        }
        r => r,
    }
}

/// Encodes `values` with the given codec.
///
/// [`Encoding::Bitmap`] stores the set of values, so it needs every value below 65536
/// ([`Error::InvalidArgument`] otherwise) and decodes to them sorted and deduplicated.
/// [`Encoding::Group`] is reserved and refused.
pub fn encode_with(values: &[u64], encoding: Encoding) -> Result<(Vec<u8>, AdaptiveMeta)> {
    let mut out = Vec::with_capacity(max_size(values.len()));
    out.push(encoding as u8);
    let inner = match encoding {
        Encoding::Delta => {
            delta::encode_unsigned_into(&mut out, values);
            InnerMeta::None
        }
        Encoding::For => InnerMeta::For(vfor::encode_into(&mut out, values)),
        Encoding::Pfor => InnerMeta::Pfor(pfor::encode_into(&mut out, values, Threshold::P95)?),
        Encoding::Dict => {
            out.extend_from_slice(&dict::encode(values)?);
            InnerMeta::None
        }
        Encoding::Bitmap => {
            let small = values
                .iter()
                .map(|&v| u16::try_from(v))
                .collect::<std::result::Result<Vec<u16>, _>>()
                .map_err(|_| Error::InvalidArgument("bitmap values must be below 65536"))?;
            let mut b = VarintBitmap::new();
            b.add_many(&small)?;
            b.encode_into(&mut out);
            InnerMeta::None
        }
        Encoding::Tagged => {
            for &v in values {
                tagged::push(&mut out, v);
            }
            InnerMeta::None
        }
        Encoding::Group => return Err(Error::InvalidArgument("group encoding is reserved")),
    };
    let meta = AdaptiveMeta {
        encoding,
        count: values.len(),
        encoded_size: out.len(),
        inner,
    };
    Ok((out, meta))
}

fn check_count(decoded: usize, count: usize) -> Result<()> {
    if decoded != count {
        return Err(Error::MalformedInput("stored value count differs from the expected one"));
    }
    Ok(())
}

/// Decodes `count` values; returns them and the bytes read, tag included.
///
/// Codecs that store their own count must agree with `count`.
pub fn decode(buf: &[u8], count: usize) -> Result<(Vec<u64>, usize)> {
    ensure_len(buf, 1)?;
    let encoding = Encoding::try_from(buf[0])?;
    let body = &buf[1..];
    let (values, used) = match encoding {
        Encoding::Delta => delta::decode_unsigned(body, count)?,
        Encoding::For => vfor::decode(body)?,
        Encoding::Pfor => pfor::decode(body)?,
        Encoding::Dict => dict::decode(body)?,
        Encoding::Bitmap => {
            let (b, used) = VarintBitmap::decode(body)?;
            (b.iter().map(u64::from).collect(), used)
        }
        Encoding::Tagged => {
            let mut values = try_vec_with_capacity(count.min(body.len()))?;
            let mut pos = 0;
            for _ in 0..count {
                let (v, n) = tagged::get(&body[pos..])?;
                values.push(v);
                pos += n;
            }
            (values, pos)
        }
        Encoding::Group => return Err(Error::MalformedInput("group encoding is reserved")),
    };
    check_count(values.len(), count)?;
    Ok((values, used + 1))
}

/// Reads the tag and, for FOR and PFOR, the inner header
pub fn read_meta(buf: &[u8]) -> Result<AdaptiveMeta> {
    ensure_len(buf, 1)?;
    let encoding = Encoding::try_from(buf[0])?;
    let body = &buf[1..];
    let meta = match encoding {
        Encoding::For => {
            let m = vfor::read_meta(body)?;
            AdaptiveMeta {
                encoding,
                count: m.count,
                encoded_size: m.encoded_size + 1,
                inner: InnerMeta::For(m),
            }
        }
        Encoding::Pfor => {
            let m = pfor::read_meta(body)?;
            AdaptiveMeta {
                encoding,
                count: m.count,
                encoded_size: pfor::size(&m) + 1,
                inner: InnerMeta::Pfor(m),
            }
        }
        Encoding::Group => return Err(Error::MalformedInput("group encoding is reserved")),
        _ => AdaptiveMeta {
            encoding,
            count: 0,
            encoded_size: 1,
            inner: InnerMeta::None,
        },
    };
    Ok(meta)
}

/// Output size bound for `count` values: the tag plus a full tagged varint each
pub fn max_size(count: usize) -> usize {
    1 + count * tagged::MAX_LEN
}

/// `8 * count / encoded_size`, 0 for an empty encoding
pub fn compression_ratio(count: usize, encoded_size: usize) -> f64 {
    if encoded_size == 0 {
        return 0.0;
    }
    (count * 8) as f64 / encoded_size as f64
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};
    use rand_distr::Geometric;

    fn roundtrip(values: &[u64]) -> Encoding {
        let (enc, meta) = encode(values).unwrap();
        assert_eq!(meta.encoded_size, enc.len());
        assert_eq!(meta.count, values.len());
        let (dec, used) = decode(&enc, values.len()).unwrap();
        assert_eq!(dec, values);
        assert_eq!(used, enc.len());
        meta.encoding
    }

    mod helpers {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_check_sorted() {
            assert_eq!(check_sorted(&[]), Sortedness::Ascending);
            assert_eq!(check_sorted(&[4]), Sortedness::Ascending);
            assert_eq!(check_sorted(&[3, 3, 3]), Sortedness::Ascending);
            assert_eq!(check_sorted(&[1, 2, 2, 5]), Sortedness::Ascending);
            assert_eq!(check_sorted(&[5, 2, 2, 1]), Sortedness::Descending);
            assert_eq!(check_sorted(&[1, 5, 2]), Sortedness::Unsorted);
        }

        #[test]
        fn test_count_unique() {
            assert_eq!(count_unique(&[]), 0);
            assert_eq!(count_unique(&[9]), 1);
            assert_eq!(count_unique(&[200, 200, 404, 200, 500, 200]), 3);

            // sampled: every tenth value still meets all 47 residues, scaled by ten
            let many: Vec<u64> = (0..20_000).map(|i| i % 47).collect();
            assert_eq!(count_unique(&many), 470);

            let distinct: Vec<u64> = (0..20_000).collect();
            assert_eq!(count_unique(&distinct), 20_000);
        }

        #[test]
        fn test_avg_delta() {
            assert_eq!(avg_delta(&[]), 0);
            assert_eq!(avg_delta(&[7]), 0);
            assert_eq!(avg_delta(&[100, 102, 103, 105, 110]), 2);
            assert_eq!(avg_delta(&[10, 0, 10]), 10);
            assert_eq!(avg_delta(&[0, u64::MAX, 0]), u64::MAX);
        }

        #[test]
        fn test_analyze() {
            let s = analyze(&[100, 102, 105, 103, 500, 108, 107, 101]);
            assert_eq!(s.count, 8);
            assert_eq!(s.min_value, 100);
            assert_eq!(s.max_value, 500);
            assert_eq!(s.range, 400);
            assert_eq!(s.unique_count, 8);
            assert!(!s.is_sorted && !s.is_reverse_sorted);
            assert_eq!(s.max_delta, 397);
            // above 100 + 380
            assert_eq!(s.outlier_count, 1);
            assert!(s.fits_in_bitmap_range);

            assert_eq!(analyze(&[]), DataStats::default());
            let flat = analyze(&[5, 5, 5]);
            assert_eq!(flat.outlier_count, 0);
            assert!(flat.is_sorted);
        }

        #[test]
        fn test_names_and_tags() {
            assert_eq!(Encoding::Pfor.name(), "PFOR");
            assert_eq!(Encoding::try_from(4).unwrap(), Encoding::Bitmap);
            assert_eq!(Encoding::try_from(6).unwrap(), Encoding::Group);
            assert!(matches!(Encoding::try_from(7), Err(Error::MalformedInput(_))));
            assert_eq!(max_size(0), 1);
            assert_eq!(max_size(10), 91);
            assert_eq!(compression_ratio(10, 0), 0.0);
            assert_eq!(compression_ratio(10, 20), 4.0);
        }
    }

    mod selection {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_tiny_inputs_are_tagged() {
            assert_eq!(select_encoding(&analyze(&[])), Encoding::Tagged);
            assert_eq!(select_encoding(&analyze(&[123])), Encoding::Tagged);
            assert_eq!(roundtrip(&[]), Encoding::Tagged);
            assert_eq!(roundtrip(&[u64::MAX]), Encoding::Tagged);
        }

        #[test]
        fn test_repetitive_is_dict() {
            let data: Vec<u64> = (0..100).map(|i| (i % 5) * 1000).collect();
            assert_eq!(roundtrip(&data), Encoding::Dict);
        }

        #[test]
        fn test_dense_ascending_set_is_bitmap() {
            let data: Vec<u64> = (0..1000).map(|i| i * 3).collect();
            assert_eq!(roundtrip(&data), Encoding::Bitmap);
        }

        #[test]
        fn test_descending_set_is_not_bitmap() {
            let data: Vec<u64> = (0..1000).rev().map(|i| i * 3).collect();
            let s = analyze(&data);
            assert!(s.is_reverse_sorted);
            assert_eq!(select_encoding(&s), Encoding::Delta);
            assert_eq!(roundtrip(&data), Encoding::Delta);
        }

        #[test]
        fn test_sorted_large_values_is_delta() {
            let data: Vec<u64> = (0..1000).map(|i| 1_000_000 + i * 7).collect();
            assert_eq!(roundtrip(&data), Encoding::Delta);

            // big steps still qualify when they are small next to the values
            let data: Vec<u64> = (0..100).map(|i| (1 << 40) + i * 50_000).collect();
            assert_eq!(roundtrip(&data), Encoding::Delta);
        }

        #[test]
        fn test_one_outlier_is_pfor() {
            let mut data: Vec<u64> = (0..100).map(|i| (i * 37) % 100 + 1000).collect();
            data[50] = 1_000_000;
            assert_eq!(roundtrip(&data), Encoding::Pfor);
        }

        #[test]
        fn test_spread_cluster_is_for() {
            // 5 of 100 values above the 95% mark: too many for PFOR
            let data: Vec<u64> = (0..100).map(|i| (i * 37) % 100 + 5000).collect();
            let s = analyze(&data);
            assert_eq!(s.outlier_count, 5);
            assert_eq!(select_encoding(&s), Encoding::For);
            assert_eq!(roundtrip(&data), Encoding::For);
        }

        #[test]
        fn test_wide_unsorted_is_tagged() {
            let data = vec![1 << 40, 3, 1 << 50, 7, 1 << 45, 12];
            assert_eq!(roundtrip(&data), Encoding::Tagged);
        }
    }

    mod codec {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_encode_with_every_codec() {
            let data: Vec<u64> = vec![3, 9, 27, 81, 243, 729];
            for e in [
                Encoding::Delta,
                Encoding::For,
                Encoding::Pfor,
                Encoding::Dict,
                Encoding::Bitmap,
                Encoding::Tagged,
            ] {
                let (enc, meta) = encode_with(&data, e).unwrap();
                assert_eq!(enc[0], e as u8);
                assert_eq!(meta.encoding, e);
                let (dec, used) = decode(&enc, data.len()).unwrap();
                assert_eq!(dec, data, "{}", e.name());
                assert_eq!(used, enc.len());
            }
        }

        #[test]
        fn test_tagged_body_layout() {
            let (enc, _) = encode_with(&[0, 240, 241], Encoding::Tagged).unwrap();
            assert_eq!(enc, vec![5, 0x00, 0xF0, 0xF1, 0x00]);
        }

        #[test]
        fn test_bitmap_refuses_wide_values() {
            assert!(matches!(
                encode_with(&[1, 70_000], Encoding::Bitmap),
                Err(Error::InvalidArgument(_))
            ));
        }

        #[test]
        fn test_group_is_reserved() {
            assert!(matches!(encode_with(&[1], Encoding::Group), Err(Error::InvalidArgument(_))));
            assert!(matches!(decode(&[6, 0], 1), Err(Error::MalformedInput(_))));
            assert!(matches!(read_meta(&[6]), Err(Error::MalformedInput(_))));
        }

        #[test]
        fn test_malformed() {
            assert!(matches!(decode(&[], 0), Err(Error::BufferTooShort { .. })));
            assert!(matches!(decode(&[42], 0), Err(Error::MalformedInput(_))));
            // truncated tagged body
            assert!(decode(&[5, 0xF1], 1).is_err());

            let (enc, _) = encode_with(&[1, 2, 3], Encoding::For).unwrap();
            assert!(matches!(decode(&enc, 4), Err(Error::MalformedInput(_))));
        }

        #[test]
        fn test_read_meta() {
            let data = vec![1000, 1005, 1002, 1010, 1001];
            let (enc, meta) = encode_with(&data, Encoding::For).unwrap();
            let read = read_meta(&enc).unwrap();
            assert_eq!(read.encoding, Encoding::For);
            assert_eq!(read.count, 5);
            assert_eq!(read.encoded_size, enc.len());
            match (read.inner, meta.inner) {
                (InnerMeta::For(r), InnerMeta::For(m)) => {
                    assert_eq!(r.min_value, m.min_value);
                    assert_eq!(r.offset_width, m.offset_width);
                }
                other => panic!("unexpected meta {:?}", other),
            }

            let data = vec![100, 102, 105, 103, 500, 108, 107, 101];
            let (enc, _) = encode_with(&data, Encoding::Pfor).unwrap();
            let read = read_meta(&enc).unwrap();
            assert_eq!(read.count, 8);
            assert!(read.encoded_size >= enc.len());
            assert!(matches!(read.inner, InnerMeta::Pfor(m) if m.exception_count == 1));

            let (enc, _) = encode_with(&data, Encoding::Tagged).unwrap();
            let read = read_meta(&enc).unwrap();
            assert_eq!((read.count, read.encoded_size), (0, 1));
        }
    }

    mod random {
        use super::*;

        #[test]
        fn test_random_shapes_roundtrip() {
            let mut rng = rand::thread_rng();
            let uniform = Uniform::from(0..u64::MAX);
            let small = Uniform::from(0..20_u64);
            let geo = Geometric::new(0.05).unwrap();
            for _ in 0..20 {
                let wide: Vec<u64> = (0..300).map(|_| uniform.sample(&mut rng)).collect();
                roundtrip(&wide);

                let repetitive: Vec<u64> = (0..300).map(|_| small.sample(&mut rng)).collect();
                roundtrip(&repetitive);

                let mut running = 0_u64;
                let ascending: Vec<u64> = (0..300)
                    .map(|_| {
                        running += 1 + geo.sample(&mut rng);
                        running
                    })
                    .collect();
                roundtrip(&ascending);
            }
        }
    }
}
