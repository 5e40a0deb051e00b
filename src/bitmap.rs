//! Roaring-style container for sets of `u16`.
//!
//! A [`VarintBitmap`] keeps its members in one of three containers and switches between
//! them as the set grows and shrinks:
//!
//! * [`ContainerKind::Array`]: sorted `u16` values, up to [`ARRAY_MAX`] of them
//! * [`ContainerKind::Bitmap`]: 65536 bits (8192 bytes), used above [`ARRAY_MAX`]
//! * [`ContainerKind::Runs`]: `(start, len)` pairs, created by large [`VarintBitmap::add_range`] calls
//!
//! Adding a single value to a Runs container flattens it into an Array or a Bitmap first.
//!
//! Serialized form: `[kind u8][cardinality u32 LE]` followed by
//! the array values (`u16 LE` each), the 8192 bitmap bytes, or `[run count u32 LE]` and
//! the runs as `u16 LE` pairs.
//!
//! # Example
//! ```rust
//! # use varint_codecs::bitmap::{VarintBitmap, ContainerKind};
//! let mut b = VarintBitmap::new();
//! for v in [1, 100, 200, 300] {
//!     b.add(v).unwrap();
//! }
//! assert_eq!(b.kind(), ContainerKind::Array);
//! assert!(b.contains(200));
//!
//! let enc = b.encode();
//! let (dec, bytes_read) = VarintBitmap::decode(&enc).unwrap();
//! assert_eq!(dec, b);
//! assert_eq!(bytes_read, enc.len());
//! ```

use bitvec::prelude as bv;
use itertools::{EitherOrBoth, Itertools};
use log::debug;

use crate::error::{ensure_len, try_vec_with_capacity, Error, Result};

/// most members an Array container holds before turning into a Bitmap
pub const ARRAY_MAX: usize = 4096;
/// bytes of a Bitmap container
pub const BITMAP_BYTES: usize = 8192;
/// size of the value domain
pub const UNIVERSE: usize = 1 << 16;

const DEFAULT_ARRAY_CAPACITY: usize = 16;
const HEADER_LEN: usize = 5;

type Bits = bv::BitVec<u8, bv::Lsb0>;

/// Which container currently holds the members; doubles as the serialized tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContainerKind {
    /// sorted values
    Array = 0,
    /// one bit per possible value
    Bitmap = 1,
    /// runs of consecutive values
    Runs = 2,
}

impl TryFrom<u8> for ContainerKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ContainerKind::Array),
            1 => Ok(ContainerKind::Bitmap),
            2 => Ok(ContainerKind::Runs),
            _ => Err(Error::MalformedInput("unknown bitmap container")),
        }
    }
}

/// `len` consecutive members starting at `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// first member
    pub start: u16,
    /// number of members, never 0
    pub len: u16,
}

impl Run {
    /// one past the last member
    fn end(&self) -> u32 {
        u32::from(self.start) + u32::from(self.len)
    }
}

#[derive(Debug, Clone)]
enum Container {
    Array(Vec<u16>),
    Bitmap(Bits),
    Runs(Vec<Run>),
}

/// Memory and shape summary of a [`VarintBitmap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapStats {
    /// heap plus inline bytes
    pub size_bytes: usize,
    /// current container
    pub kind: ContainerKind,
    /// number of members
    pub cardinality: usize,
    /// allocated slots: values for Array, bits for Bitmap, runs for Runs
    pub container_capacity: usize,
}

/// A set of `u16` values, see the [module docs](self)
#[derive(Debug, Clone)]
pub struct VarintBitmap {
    container: Container,
    cardinality: usize,
}

impl Default for VarintBitmap {
    fn default() -> Self {
        Self::new()
    }
}

/// Equality is set equality, whatever the containers.
impl PartialEq for VarintBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.cardinality == other.cardinality && self.iter().eq(other.iter())
    }
}

impl Eq for VarintBitmap {}

fn empty_bits() -> Result<Bits> {
    let mut raw = try_vec_with_capacity(BITMAP_BYTES)?;
    raw.resize(BITMAP_BYTES, 0);
    Ok(Bits::from_vec(raw))
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut word = [0_u8; 4];
    word.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(word)
}

/// `[start, end)` of every maximal block of consecutive values
fn spans_of(values: impl Iterator<Item = u16>) -> impl Iterator<Item = (u32, u32)> {
    values.map(|v| (u32::from(v), u32::from(v) + 1)).coalesce(|a, b| {
        if a.1 == b.0 {
            Ok((a.0, b.1))
        } else {
            Err((a, b))
        }
    })
}

/// Cuts sorted, disjoint spans into runs; a run length is a `u16`, so `[0, 65536)` takes two
fn runs_from_spans(spans: impl Iterator<Item = (u32, u32)>) -> Result<Vec<Run>> {
    let mut runs = Vec::new();
    for (mut s, e) in spans {
        while s < e {
            let len = (e - s).min(u32::from(u16::MAX));
            runs.try_reserve(1).map_err(|_| Error::AllocationFailure)?;
            runs.push(Run { start: s as u16, len: len as u16 });
            s += len;
        }
    }
    Ok(runs)
}

/// Merges the members of `values` (ascending) and `[lo, hi)` into coalesced runs
fn union_runs(values: impl Iterator<Item = u16>, lo: u16, hi: u16) -> Result<Vec<Run>> {
    let mut spans: Vec<(u32, u32)> = Vec::new();
    for span in spans_of(values) {
        spans.try_reserve(1).map_err(|_| Error::AllocationFailure)?;
        spans.push(span);
    }
    spans.try_reserve(1).map_err(|_| Error::AllocationFailure)?;
    spans.push((u32::from(lo), u32::from(hi)));
    spans.sort_unstable();
    let merged = spans.into_iter().coalesce(|a, b| {
        if b.0 <= a.1 {
            Ok((a.0, a.1.max(b.1)))
        } else {
            Err((a, b))
        }
    });
    runs_from_spans(merged)
}

impl VarintBitmap {
    /// empty set in an Array container
    pub fn new() -> Self {
        VarintBitmap {
            container: Container::Array(Vec::with_capacity(DEFAULT_ARRAY_CAPACITY)),
            cardinality: 0,
        }
    }

    /// current container
    pub fn kind(&self) -> ContainerKind {
        match self.container {
            Container::Array(_) => ContainerKind::Array,
            Container::Bitmap(_) => ContainerKind::Bitmap,
            Container::Runs(_) => ContainerKind::Runs,
        }
    }

    /// number of members
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// true without members
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Moves all members into a container of `kind`.
    /// On allocation failure nothing changes.
    fn convert(&mut self, kind: ContainerKind) -> Result<()> {
        let container = match kind {
            ContainerKind::Array => {
                let mut values = try_vec_with_capacity(self.cardinality)?;
                values.extend(self.iter());
                Container::Array(values)
            }
            ContainerKind::Bitmap => {
                let mut bits = empty_bits()?;
                for v in self.iter() {
                    bits.set(usize::from(v), true);
                }
                Container::Bitmap(bits)
            }
            ContainerKind::Runs => Container::Runs(runs_from_spans(spans_of(self.iter()))?),
        };
        debug!(
            "bitmap container {:?} -> {:?} at {} members",
            self.kind(),
            kind,
            self.cardinality
        );
        self.container = container;
        Ok(())
    }

    /// Runs are only kept for range inserts; any other mutation flattens them.
    fn flatten(&mut self) -> Result<()> {
        if self.cardinality >= ARRAY_MAX {
            self.convert(ContainerKind::Bitmap)
        } else {
            self.convert(ContainerKind::Array)
        }
    }

    /// Best effort: a Bitmap below [`ARRAY_MAX`] goes back to an Array.
    /// A failed allocation keeps the (still correct) Bitmap.
    fn shrink_if_sparse(&mut self) {
        if matches!(self.container, Container::Bitmap(_)) && self.cardinality < ARRAY_MAX {
            if let Err(e) = self.convert(ContainerKind::Array) {
                debug!("keeping sparse bitmap container: {}", e);
            }
        }
    }

    /// Adds `v`; returns false if it was already a member
    pub fn add(&mut self, v: u16) -> Result<bool> {
        match &mut self.container {
            Container::Array(values) => {
                let Err(pos) = values.binary_search(&v) else {
                    return Ok(false);
                };
                if values.len() >= ARRAY_MAX {
                    self.convert(ContainerKind::Bitmap)?;
                    return self.add(v);
                }
                values.try_reserve(1).map_err(|_| Error::AllocationFailure)?;
                values.insert(pos, v);
            }
            Container::Bitmap(bits) => {
                if bits.replace(usize::from(v), true) {
                    return Ok(false);
                }
            }
            Container::Runs(_) => {
                self.flatten()?;
                return self.add(v);
            }
        }
        self.cardinality += 1;
        self.shrink_if_sparse();
        Ok(true)
    }

    /// Removes `v`; returns false if it was not a member
    pub fn remove(&mut self, v: u16) -> Result<bool> {
        match &mut self.container {
            Container::Array(values) => match values.binary_search(&v) {
                Ok(i) => {
                    values.remove(i);
                }
                Err(_) => return Ok(false),
            },
            Container::Bitmap(bits) => {
                if !bits.replace(usize::from(v), false) {
                    return Ok(false);
                }
            }
            Container::Runs(_) => {
                self.flatten()?;
                return self.remove(v);
            }
        }
        self.cardinality -= 1;
        self.shrink_if_sparse();
        Ok(true)
    }

    /// membership test
    pub fn contains(&self, v: u16) -> bool {
        match &self.container {
            Container::Array(values) => values.binary_search(&v).is_ok(),
            Container::Bitmap(bits) => bits[usize::from(v)],
            Container::Runs(runs) => {
                for r in runs {
                    if v < r.start {
                        return false;
                    }
                    if u32::from(v) < r.end() {
                        return true;
                    }
                }
                false
            }
        }
    }

    /// Switches to a Runs container when that is the smallest serialized form.
    /// The next scalar add or remove flattens it again.
    pub fn optimize(&mut self) -> Result<()> {
        if matches!(self.container, Container::Runs(_)) {
            return Ok(());
        }
        let run_bytes = 4 + 4 * spans_of(self.iter()).count();
        if run_bytes < self.encoded_len() - HEADER_LEN {
            self.convert(ContainerKind::Runs)?;
        }
        Ok(())
    }

    /// Adds every value of `values`
    pub fn add_many(&mut self, values: &[u16]) -> Result<()> {
        for &v in values {
            self.add(v)?;
        }
        Ok(())
    }

    /// Adds `[lo, hi)`.
    ///
    /// Ranges longer than [`ARRAY_MAX`] turn the set into a Runs container holding the
    /// union of the old members and the range; shorter ones are added value by value.
    pub fn add_range(&mut self, lo: u16, hi: u16) -> Result<()> {
        if lo >= hi {
            return Ok(());
        }
        if usize::from(hi - lo) > ARRAY_MAX {
            let runs = union_runs(self.iter(), lo, hi)?;
            let cardinality = runs.iter().map(|r| usize::from(r.len)).sum();
            debug!(
                "bitmap container {:?} -> Runs for range [{}, {}), {} runs",
                self.kind(),
                lo,
                hi,
                runs.len()
            );
            self.container = Container::Runs(runs);
            self.cardinality = cardinality;
            return Ok(());
        }
        for v in lo..hi {
            self.add(v)?;
        }
        Ok(())
    }

    /// Removes `[lo, hi)`; the container shape is re-checked once at the end
    pub fn remove_range(&mut self, lo: u16, hi: u16) -> Result<()> {
        if lo >= hi {
            return Ok(());
        }
        if matches!(self.container, Container::Runs(_)) {
            self.flatten()?;
        }
        match &mut self.container {
            Container::Array(values) => values.retain(|v| !(lo..hi).contains(v)),
            Container::Bitmap(bits) => bits[usize::from(lo)..usize::from(hi)].fill(false),
            Container::Runs(_) => {}
        }
        self.cardinality = self.count();
        self.shrink_if_sparse();
        Ok(())
    }

    fn count(&self) -> usize {
        match &self.container {
            Container::Array(values) => values.len(),
            Container::Bitmap(bits) => bits.count_ones(),
            Container::Runs(runs) => runs.iter().map(|r| usize::from(r.len)).sum(),
        }
    }

    /// Removes all members, keeping the current container
    pub fn clear(&mut self) {
        match &mut self.container {
            Container::Array(values) => values.clear(),
            Container::Bitmap(bits) => bits.fill(false),
            Container::Runs(runs) => runs.clear(),
        }
        self.cardinality = 0;
    }

    /// members in ascending order
    pub fn iter(&self) -> Iter<'_> {
        let inner = match &self.container {
            Container::Array(values) => IterInner::Array(values.iter()),
            Container::Bitmap(bits) => IterInner::Bitmap(bits.iter_ones()),
            Container::Runs(runs) => IterInner::Runs { runs: runs.iter(), current: 0..0 },
        };
        Iter { inner }
    }

    /// members in ascending order, collected
    pub fn to_vec(&self) -> Vec<u16> {
        self.iter().collect()
    }

    /// Intersection
    pub fn and(&self, other: &Self) -> Result<Self> {
        let mut out = Self::new();
        if let (Container::Array(a), Container::Array(b)) = (&self.container, &other.container) {
            let both = a.iter().merge_join_by(b.iter(), |x, y| x.cmp(y)).filter_map(|e| match e {
                EitherOrBoth::Both(v, _) => Some(*v),
                _ => None,
            });
            for v in both {
                out.add(v)?;
            }
            return Ok(out);
        }
        let (small, large) =
            if self.cardinality < other.cardinality { (self, other) } else { (other, self) };
        for v in small.iter().filter(|&v| large.contains(v)) {
            out.add(v)?;
        }
        Ok(out)
    }

    /// Union
    pub fn or(&self, other: &Self) -> Result<Self> {
        let mut out = self.clone();
        for v in other.iter() {
            out.add(v)?;
        }
        Ok(out)
    }

    /// Symmetric difference
    pub fn xor(&self, other: &Self) -> Result<Self> {
        let mut out = Self::new();
        let left = self.iter().filter(|&v| !other.contains(v));
        let right = other.iter().filter(|&v| !self.contains(v));
        for v in left.merge(right) {
            out.add(v)?;
        }
        Ok(out)
    }

    /// Members of `self` that are not in `other`
    pub fn and_not(&self, other: &Self) -> Result<Self> {
        let mut out = Self::new();
        for v in self.iter().filter(|&v| !other.contains(v)) {
            out.add(v)?;
        }
        Ok(out)
    }

    /// in-memory footprint in bytes
    pub fn size_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + match &self.container {
                Container::Array(values) => values.capacity() * 2,
                Container::Bitmap(_) => BITMAP_BYTES,
                Container::Runs(runs) => runs.capacity() * 4,
            }
    }

    /// shape and memory summary
    pub fn stats(&self) -> BitmapStats {
        let container_capacity = match &self.container {
            Container::Array(values) => values.capacity(),
            Container::Bitmap(_) => UNIVERSE,
            Container::Runs(runs) => runs.capacity(),
        };
        BitmapStats {
            size_bytes: self.size_bytes(),
            kind: self.kind(),
            cardinality: self.cardinality,
            container_capacity,
        }
    }

    /// bytes [`encode`](Self::encode) produces
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + match &self.container {
                Container::Array(values) => 2 * values.len(),
                Container::Bitmap(_) => BITMAP_BYTES,
                Container::Runs(runs) => 4 + 4 * runs.len(),
            }
    }

    /// Serializes the set
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Appends the serialized set to `out`, returns bytes written
    pub fn encode_into(&self, out: &mut Vec<u8>) -> usize {
        let start = out.len();
        out.push(self.kind() as u8);
        out.extend_from_slice(&(self.cardinality as u32).to_le_bytes());
        match &self.container {
            Container::Array(values) => {
                for v in values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
            Container::Bitmap(bits) => out.extend_from_slice(bits.as_raw_slice()),
            Container::Runs(runs) => {
                out.extend_from_slice(&(runs.len() as u32).to_le_bytes());
                for r in runs {
                    out.extend_from_slice(&r.start.to_le_bytes());
                    out.extend_from_slice(&r.len.to_le_bytes());
                }
            }
        }
        out.len() - start
    }

    /// Parses a serialized set, returns it with the number of bytes read.
    ///
    /// Every structural property is checked: the body length, ascending array values,
    /// sorted non-overlapping runs inside the domain, and the stored cardinality.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        ensure_len(buf, HEADER_LEN)?;
        let kind = ContainerKind::try_from(buf[0])?;
        let cardinality = read_u32(buf, 1) as usize;

        let (container, end) = match kind {
            ContainerKind::Array => {
                if cardinality > ARRAY_MAX {
                    return Err(Error::MalformedInput("array container too large"));
                }
                let end = HEADER_LEN + 2 * cardinality;
                ensure_len(buf, end)?;
                let mut values = try_vec_with_capacity(cardinality)?;
                values.extend(
                    buf[HEADER_LEN..end].chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])),
                );
                if !values.windows(2).all(|w| w[0] < w[1]) {
                    return Err(Error::MalformedInput("array container not strictly ascending"));
                }
                (Container::Array(values), end)
            }
            ContainerKind::Bitmap => {
                let end = HEADER_LEN + BITMAP_BYTES;
                ensure_len(buf, end)?;
                let mut raw = try_vec_with_capacity(BITMAP_BYTES)?;
                raw.extend_from_slice(&buf[HEADER_LEN..end]);
                let bits = Bits::from_vec(raw);
                if bits.count_ones() != cardinality {
                    return Err(Error::MalformedInput("bitmap cardinality mismatch"));
                }
                (Container::Bitmap(bits), end)
            }
            ContainerKind::Runs => {
                ensure_len(buf, HEADER_LEN + 4)?;
                let n = read_u32(buf, HEADER_LEN) as usize;
                let start = HEADER_LEN + 4;
                let end = start.saturating_add(n.saturating_mul(4));
                ensure_len(buf, end)?;
                let mut runs: Vec<Run> = try_vec_with_capacity(n)?;
                let mut prev_end = 0_u32;
                for c in buf[start..end].chunks_exact(4) {
                    let r = Run {
                        start: u16::from_le_bytes([c[0], c[1]]),
                        len: u16::from_le_bytes([c[2], c[3]]),
                    };
                    if r.len == 0 || r.end() > UNIVERSE as u32 {
                        return Err(Error::MalformedInput("run out of range"));
                    }
                    if !runs.is_empty() && u32::from(r.start) < prev_end {
                        return Err(Error::MalformedInput("runs overlap or are unsorted"));
                    }
                    prev_end = r.end();
                    runs.push(r);
                }
                let total: usize = runs.iter().map(|r| usize::from(r.len)).sum();
                if total != cardinality {
                    return Err(Error::MalformedInput("runs cardinality mismatch"));
                }
                (Container::Runs(runs), end)
            }
        };
        Ok((VarintBitmap { container, cardinality }, end))
    }
}

enum IterInner<'a> {
    Array(std::slice::Iter<'a, u16>),
    Bitmap(bitvec::slice::IterOnes<'a, u8, bv::Lsb0>),
    Runs { runs: std::slice::Iter<'a, Run>, current: std::ops::Range<u32> },
}

/// Ascending iterator over the members of a [`VarintBitmap`]
pub struct Iter<'a> {
    inner: IterInner<'a>,
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match &mut self.inner {
            IterInner::Array(it) => it.next().copied(),
            IterInner::Bitmap(it) => it.next().map(|i| i as u16),
            IterInner::Runs { runs, current } => loop {
                if let Some(v) = current.next() {
                    return Some(v as u16);
                }
                let r = runs.next()?;
                *current = u32::from(r.start)..r.end();
            },
        }
    }
}

impl<'a> IntoIterator for &'a VarintBitmap {
    type Item = u16;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::distributions::{Distribution, Uniform};
    use std::collections::BTreeSet;

    fn random_set(n: usize, max: u16) -> (VarintBitmap, BTreeSet<u16>) {
        let mut rng = rand::thread_rng();
        let dist = Uniform::from(0..max);
        let mut b = VarintBitmap::new();
        let mut reference = BTreeSet::new();
        for _ in 0..n {
            let v = dist.sample(&mut rng);
            assert_eq!(b.add(v).unwrap(), reference.insert(v));
        }
        (b, reference)
    }

    fn check(b: &VarintBitmap, reference: &BTreeSet<u16>) {
        assert_eq!(b.cardinality(), reference.len());
        assert_eq!(b.to_vec(), reference.iter().copied().collect::<Vec<_>>());
    }

    mod containers {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_transition_scenario() {
            let mut b = VarintBitmap::new();
            b.add_many(&[1, 100, 200, 300]).unwrap();
            assert_eq!(b.kind(), ContainerKind::Array);
            assert_eq!(b.cardinality(), 4);

            for v in 0..=4999 {
                b.add(v).unwrap();
            }
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            assert_eq!(b.cardinality(), 5000);

            b.remove_range(0, 4900).unwrap();
            assert_eq!(b.kind(), ContainerKind::Array);
            assert_eq!(b.cardinality(), 100);
            assert_eq!(b.to_vec(), (4900..5000).collect::<Vec<u16>>());
        }

        #[test]
        fn test_array_to_bitmap_boundary() {
            let mut b = VarintBitmap::new();
            for v in 0..ARRAY_MAX as u16 {
                b.add(v * 2).unwrap();
            }
            assert_eq!(b.kind(), ContainerKind::Array);
            assert!(b.add(1).unwrap());
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            assert_eq!(b.cardinality(), ARRAY_MAX + 1);

            assert!(b.remove(1).unwrap());
            // exactly ARRAY_MAX members is still a bitmap
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            assert!(b.remove(0).unwrap());
            assert_eq!(b.kind(), ContainerKind::Array);
            assert_eq!(b.cardinality(), ARRAY_MAX - 1);
            assert!(!b.remove(0).unwrap());
        }

        #[test]
        fn test_duplicate_add_idempotent() {
            let mut b = VarintBitmap::new();
            assert!(b.add(7).unwrap());
            assert!(!b.add(7).unwrap());
            assert_eq!(b.cardinality(), 1);
            assert!(!b.remove(8).unwrap());
        }

        #[test]
        fn test_random_against_btreeset() {
            let (mut b, mut reference) = random_set(10_000, u16::MAX);
            check(&b, &reference);
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            let mut rng = rand::thread_rng();
            let dist = Uniform::from(0..u16::MAX);
            for _ in 0..20_000 {
                let v = dist.sample(&mut rng);
                assert_eq!(b.remove(v).unwrap(), reference.remove(&v));
            }
            check(&b, &reference);
            for v in 0..u16::MAX {
                assert_eq!(b.contains(v), reference.contains(&v));
            }
        }

        #[test]
        fn test_clear_keeps_kind() {
            let (mut b, _) = random_set(6000, u16::MAX);
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            b.clear();
            assert!(b.is_empty());
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            assert_eq!(b.iter().next(), None);
        }
    }

    mod ranges {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_large_range_keeps_members() {
            let mut b = VarintBitmap::new();
            b.add_many(&[5, 60_000, 10_000]).unwrap();
            b.add_range(10_001, 20_000).unwrap();
            assert_eq!(b.kind(), ContainerKind::Runs);
            assert_eq!(b.cardinality(), 3 + 9999);
            assert!(b.contains(5));
            assert!(b.contains(10_000));
            assert!(b.contains(19_999));
            assert!(!b.contains(20_000));
            assert!(b.contains(60_000));
            // 10_000 coalesces with the range
            let runs: Vec<u16> = b.iter().take(3).collect();
            assert_eq!(runs, vec![5, 10_000, 10_001]);
        }

        #[test]
        fn test_full_domain_splits_runs() {
            let mut b = VarintBitmap::new();
            b.add(u16::MAX).unwrap();
            b.add_range(0, u16::MAX).unwrap();
            assert_eq!(b.cardinality(), UNIVERSE);
            let (dec, _) = VarintBitmap::decode(&b.encode()).unwrap();
            assert_eq!(dec.cardinality(), UNIVERSE);
            assert!(dec.contains(0) && dec.contains(u16::MAX));
        }

        #[test]
        fn test_small_range_and_runs_flatten() {
            let mut b = VarintBitmap::new();
            b.add_range(10, 20).unwrap();
            assert_eq!(b.kind(), ContainerKind::Array);
            assert_eq!(b.to_vec(), (10..20).collect::<Vec<u16>>());
            b.add_range(0, 5000).unwrap();
            assert_eq!(b.kind(), ContainerKind::Runs);

            // a scalar add flattens to a bitmap at this size
            assert!(b.add(9000).unwrap());
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            assert_eq!(b.cardinality(), 5001);

            let mut small = VarintBitmap::new();
            small.add_range(100, 4300).unwrap();
            small.remove_range(100, 4000).unwrap();
            assert_eq!(small.kind(), ContainerKind::Array);
            assert_eq!(small.to_vec(), (4000..4300).collect::<Vec<u16>>());

            let mut runs = VarintBitmap::new();
            runs.add_range(0, 5000).unwrap();
            assert!(runs.remove(3).unwrap());
            assert_eq!(runs.kind(), ContainerKind::Bitmap);
            assert_eq!(runs.cardinality(), 4999);
        }

        #[test]
        fn test_optimize() {
            let mut b = VarintBitmap::new();
            for v in (0..3000).chain(10_000..14_000) {
                b.add(v).unwrap();
            }
            assert_eq!(b.kind(), ContainerKind::Bitmap);
            b.optimize().unwrap();
            assert_eq!(b.kind(), ContainerKind::Runs);
            assert_eq!(b.cardinality(), 7000);
            assert_eq!(b.encoded_len(), 5 + 4 + 8);

            let mut sparse = VarintBitmap::new();
            sparse.add_many(&[1, 3, 5]).unwrap();
            sparse.optimize().unwrap();
            assert_eq!(sparse.kind(), ContainerKind::Array);
        }

        #[test]
        fn test_empty_ranges() {
            let mut b = VarintBitmap::new();
            b.add_range(5, 5).unwrap();
            b.add_range(9, 3).unwrap();
            b.remove_range(9, 3).unwrap();
            assert!(b.is_empty());
        }
    }

    mod algebra {
        use super::*;
        use pretty_assertions::assert_eq;

        fn as_set(b: &VarintBitmap) -> BTreeSet<u16> {
            b.iter().collect()
        }

        #[test]
        fn test_ops_match_btreeset() {
            for (na, nb) in [(100, 200), (100, 9000), (8000, 9000)] {
                let (a, ra) = random_set(na, 20_000);
                let (b, rb) = random_set(nb, 20_000);

                let and = a.and(&b).unwrap();
                assert_eq!(as_set(&and), &ra & &rb);
                let or = a.or(&b).unwrap();
                assert_eq!(as_set(&or), &ra | &rb);
                let xor = a.xor(&b).unwrap();
                assert_eq!(as_set(&xor), &ra ^ &rb);
                let and_not = a.and_not(&b).unwrap();
                assert_eq!(as_set(&and_not), &ra - &rb);

                assert!(and.iter().all(|v| a.contains(v)));
                assert_eq!(xor, or.and_not(&and).unwrap());
                assert_eq!(or.cardinality(), a.cardinality() + b.cardinality() - and.cardinality());
            }
        }

        #[test]
        fn test_ops_with_runs() {
            let mut a = VarintBitmap::new();
            a.add_range(1000, 7000).unwrap();
            let mut b = VarintBitmap::new();
            b.add_many(&[10, 1000, 6999, 7000]).unwrap();
            assert_eq!(a.and(&b).unwrap().to_vec(), vec![1000, 6999]);
            assert_eq!(b.and_not(&a).unwrap().to_vec(), vec![10, 7000]);
            assert_eq!(a.or(&b).unwrap().cardinality(), 6002);
        }
    }

    mod serialization {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_array_layout() {
            let mut b = VarintBitmap::new();
            b.add_many(&[3, 1, 0x0102]).unwrap();
            let enc = b.encode();
            assert_eq!(enc, vec![0, 3, 0, 0, 0, 1, 0, 3, 0, 0x02, 0x01]);
            assert_eq!(enc.len(), b.encoded_len());
        }

        #[test]
        fn test_runs_layout() {
            let mut b = VarintBitmap::new();
            b.add_range(0x100, 0x1200).unwrap();
            let enc = b.encode();
            assert_eq!(enc, vec![2, 0x00, 0x11, 0, 0, 1, 0, 0, 0, 0x00, 0x01, 0x00, 0x11]);
        }

        #[test]
        fn test_roundtrip_all_kinds() {
            let (sparse, _) = random_set(50, 1000);
            let (dense, _) = random_set(20_000, u16::MAX);
            let mut runs = VarintBitmap::new();
            runs.add_range(7, 60_000).unwrap();
            for b in [sparse, dense, runs, VarintBitmap::new()] {
                let mut enc = b.encode();
                enc.push(0xAA);
                let (dec, n) = VarintBitmap::decode(&enc).unwrap();
                assert_eq!(n, enc.len() - 1);
                assert_eq!(dec.kind(), b.kind());
                assert_eq!(dec, b);
            }
        }

        #[test]
        fn test_malformed() {
            assert!(matches!(VarintBitmap::decode(&[0, 1]), Err(Error::BufferTooShort { .. })));
            assert!(matches!(VarintBitmap::decode(&[3, 0, 0, 0, 0]), Err(Error::MalformedInput(_))));
            // descending array
            assert!(matches!(
                VarintBitmap::decode(&[0, 2, 0, 0, 0, 5, 0, 4, 0]),
                Err(Error::MalformedInput(_))
            ));
            // truncated array body
            assert!(matches!(
                VarintBitmap::decode(&[0, 2, 0, 0, 0, 5, 0]),
                Err(Error::BufferTooShort { .. })
            ));
            // run wrapping past 65535
            assert!(matches!(
                VarintBitmap::decode(&[2, 2, 0, 0, 0, 1, 0, 0, 0, 0xFF, 0xFF, 2, 0]),
                Err(Error::MalformedInput(_))
            ));
            // overlapping runs
            assert!(matches!(
                VarintBitmap::decode(&[2, 6, 0, 0, 0, 2, 0, 0, 0, 0, 0, 4, 0, 2, 0, 2, 0]),
                Err(Error::MalformedInput(_))
            ));
            // cardinality disagrees with the bitmap body
            let mut b = VarintBitmap::new();
            for v in 0..5000 {
                b.add(v).unwrap();
            }
            let mut enc = b.encode();
            enc[1] = 0;
            assert!(matches!(VarintBitmap::decode(&enc), Err(Error::MalformedInput(_))));
        }
    }

    #[test]
    fn test_stats() {
        let mut b = VarintBitmap::new();
        b.add(1).unwrap();
        let s = b.stats();
        assert_eq!(s.kind, ContainerKind::Array);
        assert_eq!(s.cardinality, 1);
        assert!(s.container_capacity >= 16);
        assert!(s.size_bytes >= 32);

        b.add_range(0, 10_000).unwrap();
        b.add(20_000).unwrap();
        let s = b.stats();
        assert_eq!(s.kind, ContainerKind::Bitmap);
        assert_eq!(s.container_capacity, UNIVERSE);
        assert!(s.size_bytes >= BITMAP_BYTES);
    }
}
