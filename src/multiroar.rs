//! Sparse bitmap over `u64` positions, stored as a map of 8192-bit chunks.
//!
//! Position `p` lives in chunk `p / 8192` at offset `p % 8192`. Chunks without any set
//! bit are simply absent from the map. Every present chunk body starts with a
//! [`ChunkKind`] tag and takes the cheapest of four shapes for its population:
//!
//! | kind | body | population |
//! |---|---|---|
//! | [`ChunkKind::UnderFull`] | `[2][count tagged][13-bit packed set offsets]` | `1 ..= 628` |
//! | [`ChunkKind::FullBitmap`] | `[3][1024 bytes, LSB first]` | `629 ..= 7563` |
//! | [`ChunkKind::OverFull`] | `[4][count tagged][13-bit packed unset offsets]` | `7564 ..= 8191` |
//! | [`ChunkKind::All1`] | `[1]` | `8192` |
//!
//! [`Multiroar::set`] and [`Multiroar::remove`] move a chunk up and down this ladder one
//! bit at a time; the packed lists grow and shrink in place through
//! [`ChunkMap::resize_entry`].
//!
//! # Example
//! ```rust
//! # use varint_codecs::multiroar::{Multiroar, ChunkKind};
//! let mut r = Multiroar::new();
//! assert!(!r.set(1_000_000_000_000).unwrap());
//! assert!(r.set(1_000_000_000_000).unwrap());
//! assert!(r.get(1_000_000_000_000));
//! assert!(!r.get(7));
//!
//! r.set_range(8192, 8192).unwrap();
//! assert_eq!(r.chunk_kind(1), Some(ChunkKind::All1));
//! assert_eq!(r.cardinality(), 8193);
//! ```

use bitvec::prelude as bv;
use log::{debug, warn};

use crate::chunk_map::ChunkMap;
use crate::error::{try_vec_with_capacity, Error, Result};
use crate::packed::{self, Packed13};
use crate::tagged;

/// positions per chunk
pub const CHUNK_BITS: u64 = 8192;
/// most positions a packed list holds before the chunk turns into a bitmap
pub const MAX_DIRECT: usize = CHUNK_BITS as usize / packed::BITS - 1;
/// population above which a bitmap chunk switches to listing its unset positions
pub const MAX_BITMAP_BEFORE_NEGATIVE: usize = CHUNK_BITS as usize - MAX_DIRECT;
/// bytes of a [`ChunkKind::FullBitmap`] body after the tag
pub const BITMAP_BYTES: usize = CHUNK_BITS as usize / 8;

const TAG_LEN: usize = 1;

/// Shape of a stored chunk; doubles as the leading tag byte of its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkKind {
    /// every bit set, body is the tag alone
    All1 = 1,
    /// packed list of set offsets
    UnderFull = 2,
    /// plain 8192-bit map
    FullBitmap = 3,
    /// packed list of unset offsets
    OverFull = 4,
}

impl TryFrom<u8> for ChunkKind {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ChunkKind::All1),
            2 => Ok(ChunkKind::UnderFull),
            3 => Ok(ChunkKind::FullBitmap),
            4 => Ok(ChunkKind::OverFull),
            _ => Err(Error::MalformedInput("unknown chunk kind")),
        }
    }
}

impl ChunkKind {
    /// the shape a chunk with `population` set bits is stored in; `None` for an empty chunk
    pub fn for_population(population: usize) -> Option<ChunkKind> {
        match population {
            0 => None,
            p if p < MAX_DIRECT => Some(ChunkKind::UnderFull),
            p if p <= MAX_BITMAP_BEFORE_NEGATIVE => Some(ChunkKind::FullBitmap),
            p if p < CHUNK_BITS as usize => Some(ChunkKind::OverFull),
            _ => Some(ChunkKind::All1),
        }
    }
}

#[inline]
fn split(position: u64) -> (u64, u16) {
    (position / CHUNK_BITS, (position % CHUNK_BITS) as u16)
}

fn kind_of(body: &[u8]) -> Result<ChunkKind> {
    let tag = body.first().ok_or(Error::MalformedInput("empty chunk body"))?;
    ChunkKind::try_from(*tag)
}

/// count and header length (tag + tagged count) of a packed body
fn packed_header(body: &[u8]) -> Result<(usize, usize)> {
    let (count, n) = tagged::get(&body[TAG_LEN..])?;
    Ok((count as usize, TAG_LEN + n))
}

fn packed_view(body: &[u8]) -> Result<Packed13<&[u8]>> {
    let (count, header) = packed_header(body)?;
    Packed13::new(&body[header..], count)
}

fn bits(body: &[u8]) -> &bv::BitSlice<u8, bv::Lsb0> {
    bv::BitSlice::from_slice(&body[TAG_LEN..])
}

fn bits_mut(body: &mut [u8]) -> &mut bv::BitSlice<u8, bv::Lsb0> {
    bv::BitSlice::from_slice_mut(&mut body[TAG_LEN..])
}

/// Builds a packed body of `kind` listing `offsets`, which must be sorted
fn packed_body(kind: ChunkKind, count: usize, offsets: impl Iterator<Item = u16>) -> Result<Vec<u8>> {
    let header = TAG_LEN + tagged::len(count as u64);
    let mut body = try_vec_with_capacity(header + packed::byte_len(count))?;
    body.resize(header + packed::byte_len(count), 0);
    body[0] = kind as u8;
    tagged::put(&mut body[TAG_LEN..header], count as u64)?;
    let mut list = Packed13::new(&mut body[header..], 0)?;
    for o in offsets {
        list.push(o)?;
    }
    Ok(body)
}

/// A 1024-byte bitmap body with `offsets` flipped away from the `background` value
fn bitmap_body(background: bool, offsets: impl Iterator<Item = u16>) -> Result<Vec<u8>> {
    let mut body = try_vec_with_capacity(TAG_LEN + BITMAP_BYTES)?;
    body.resize(TAG_LEN + BITMAP_BYTES, if background { 0xFF } else { 0 });
    body[0] = ChunkKind::FullBitmap as u8;
    let b = bits_mut(&mut body);
    for o in offsets {
        b.set(o as usize, !background);
    }
    Ok(body)
}

/// Expands any body into raw 1024 bitmap bytes
fn expand(body: &[u8]) -> Result<Vec<u8>> {
    let full = match kind_of(body)? {
        ChunkKind::All1 => {
            let mut v = try_vec_with_capacity(BITMAP_BYTES)?;
            v.resize(BITMAP_BYTES, 0xFF);
            return Ok(v);
        }
        ChunkKind::FullBitmap => return Ok(body[TAG_LEN..].to_vec()),
        ChunkKind::UnderFull => bitmap_body(false, packed_view(body)?.iter())?,
        ChunkKind::OverFull => bitmap_body(true, packed_view(body)?.iter())?,
    };
    Ok(full[TAG_LEN..].to_vec())
}

/// Stores raw bitmap bytes in their cheapest shape; `None` when no bit is set
fn canonical(raw: &[u8]) -> Result<Option<Vec<u8>>> {
    let b = bv::BitSlice::<u8, bv::Lsb0>::from_slice(raw);
    let population = b.count_ones();
    let offsets = |value: bool| offsets_where(b, value);
    let body = match ChunkKind::for_population(population) {
        None => return Ok(None),
        Some(ChunkKind::All1) => vec![ChunkKind::All1 as u8],
        Some(ChunkKind::UnderFull) => packed_body(ChunkKind::UnderFull, population, offsets(true))?,
        Some(ChunkKind::OverFull) => packed_body(
            ChunkKind::OverFull,
            CHUNK_BITS as usize - population,
            offsets(false),
        )?,
        Some(ChunkKind::FullBitmap) => {
            let mut body = try_vec_with_capacity(TAG_LEN + BITMAP_BYTES)?;
            body.push(ChunkKind::FullBitmap as u8);
            body.extend_from_slice(raw);
            body
        }
    };
    Ok(Some(body))
}

/// offsets whose bit equals `value`, ascending
fn offsets_where(b: &bv::BitSlice<u8, bv::Lsb0>, value: bool) -> impl Iterator<Item = u16> + '_ {
    b.iter()
        .by_vals()
        .enumerate()
        .filter(move |&(_, bit)| bit == value)
        .map(|(i, _)| i as u16)
}

/// `Ok` value of a read on chunk `c`; a body that doesn't parse is logged and read as empty
fn readable<T>(c: u64, read: Result<T>) -> Option<T> {
    read.map_err(|e| warn!("multiroar chunk {}: unreadable body, {}", c, e)).ok()
}

fn population(body: &[u8]) -> Result<usize> {
    Ok(match kind_of(body)? {
        ChunkKind::All1 => CHUNK_BITS as usize,
        ChunkKind::UnderFull => packed_header(body)?.0,
        ChunkKind::FullBitmap => bits(body).count_ones(),
        ChunkKind::OverFull => CHUNK_BITS as usize - packed_header(body)?.0,
    })
}

fn contains(body: &[u8], o: u16) -> Result<bool> {
    Ok(match kind_of(body)? {
        ChunkKind::All1 => true,
        ChunkKind::UnderFull => packed_view(body)?.member(o).is_some(),
        ChunkKind::FullBitmap => bits(body)[o as usize],
        ChunkKind::OverFull => packed_view(body)?.member(o).is_none(),
    })
}

/// Sparse bitmap addressed by `u64` positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multiroar {
    map: ChunkMap,
}

impl Multiroar {
    /// empty bitmap
    pub fn new() -> Self {
        Multiroar { map: ChunkMap::new() }
    }

    /// Sets `position`, returns whether it was already set
    pub fn set(&mut self, position: u64) -> Result<bool> {
        let (c, o) = split(position);
        let Some(body) = self.map.lookup(c) else {
            let body = packed_body(ChunkKind::UnderFull, 1, std::iter::once(o))?;
            self.map.insert(c, &body)?;
            return Ok(false);
        };
        match kind_of(body)? {
            ChunkKind::All1 => Ok(true),
            ChunkKind::UnderFull => {
                let Some(count) = self.packed_insert(c, o)? else {
                    return Ok(true);
                };
                if count >= MAX_DIRECT {
                    self.packed_to_bitmap(c)?;
                }
                Ok(false)
            }
            ChunkKind::FullBitmap => {
                let body = self
                    .map
                    .lookup_mut(c)
                    .ok_or(Error::InvalidArgument("chunk vanished"))?;
                let b = bits_mut(body);
                let previous = b.replace(o as usize, true);
                if b.count_ones() > MAX_BITMAP_BEFORE_NEGATIVE {
                    self.bitmap_to_packed(c, ChunkKind::OverFull)?;
                }
                Ok(previous)
            }
            ChunkKind::OverFull => match self.packed_remove(c, o)? {
                None => Ok(true),
                Some(0) => {
                    self.map.replace_entry(c, vec![ChunkKind::All1 as u8])?;
                    debug!("multiroar chunk {}: OverFull -> All1", c);
                    Ok(false)
                }
                Some(_) => Ok(false),
            },
        }
    }

    /// Clears `position`, returns whether it was set
    pub fn remove(&mut self, position: u64) -> Result<bool> {
        let (c, o) = split(position);
        let Some(body) = self.map.lookup(c) else {
            return Ok(false);
        };
        match kind_of(body)? {
            ChunkKind::All1 => {
                let body = packed_body(ChunkKind::OverFull, 1, std::iter::once(o))?;
                self.map.replace_entry(c, body)?;
                debug!("multiroar chunk {}: All1 -> OverFull", c);
                Ok(true)
            }
            ChunkKind::UnderFull => match self.packed_remove(c, o)? {
                None => Ok(false),
                Some(0) => {
                    self.map.remove(c);
                    debug!("multiroar chunk {}: UnderFull -> empty", c);
                    Ok(true)
                }
                Some(_) => Ok(true),
            },
            ChunkKind::FullBitmap => {
                let body = self
                    .map
                    .lookup_mut(c)
                    .ok_or(Error::InvalidArgument("chunk vanished"))?;
                let b = bits_mut(body);
                let previous = b.replace(o as usize, false);
                if b.count_ones() < MAX_DIRECT {
                    self.bitmap_to_packed(c, ChunkKind::UnderFull)?;
                }
                Ok(previous)
            }
            ChunkKind::OverFull => {
                let Some(count) = self.packed_insert(c, o)? else {
                    return Ok(false);
                };
                if count >= MAX_DIRECT {
                    self.packed_to_bitmap(c)?;
                }
                Ok(true)
            }
        }
    }

    /// true if `position` is set
    pub fn get(&self, position: u64) -> bool {
        let (c, o) = split(position);
        self.map
            .lookup(c)
            .and_then(|body| readable(c, contains(body, o)))
            .unwrap_or(false)
    }

    /// Sets every position in `start .. start + extent`.
    ///
    /// Chunks covered completely become [`ChunkKind::All1`] directly.
    pub fn set_range(&mut self, start: u64, extent: u64) -> Result<()> {
        let end = start.checked_add(extent).ok_or(Error::Overflow)?;
        let mut p = start;
        while p < end {
            let (c, o) = split(p);
            let chunk_end = (c + 1).saturating_mul(CHUNK_BITS);
            if o == 0 && end >= chunk_end && chunk_end != u64::MAX {
                self.store_body(c, Some(vec![ChunkKind::All1 as u8]))?;
                p = chunk_end;
                continue;
            }
            let stop = end.min(chunk_end);
            for q in p..stop {
                self.set(q)?;
            }
            p = stop;
        }
        Ok(())
    }

    /// number of set positions
    pub fn cardinality(&self) -> u64 {
        self.map
            .iter()
            .filter_map(|(c, body)| readable(c, population(body)))
            .map(|p| p as u64)
            .sum()
    }

    /// shape of chunk `chunk`, `None` if it holds no set bit
    pub fn chunk_kind(&self, chunk: u64) -> Option<ChunkKind> {
        self.map.lookup(chunk).and_then(|body| readable(chunk, kind_of(body)))
    }

    /// number of stored chunks
    pub fn chunk_count(&self) -> usize {
        self.map.len()
    }

    /// summed bytes of all chunk bodies
    pub fn bytes(&self) -> usize {
        self.map.bytes()
    }

    /// true if no position is set
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// In-place union with `other`
    pub fn or(&mut self, other: &Multiroar) -> Result<()> {
        for (c, theirs) in other.map.iter() {
            match self.map.lookup(c) {
                None => self.map.insert(c, theirs)?,
                Some(ours) => {
                    let merged = combine(ours, theirs, |a, b| a | b)?;
                    self.store_body(c, canonical(&merged)?)?;
                }
            }
        }
        Ok(())
    }

    /// In-place intersection with `other`
    pub fn and(&mut self, other: &Multiroar) -> Result<()> {
        let keys: Vec<u64> = self.map.iter().map(|(c, _)| c).collect();
        for c in keys {
            let merged = match (self.map.lookup(c), other.map.lookup(c)) {
                (Some(ours), Some(theirs)) => canonical(&combine(ours, theirs, |a, b| a & b)?)?,
                _ => None,
            };
            self.store_body(c, merged)?;
        }
        Ok(())
    }

    /// In-place symmetric difference with `other`
    pub fn xor(&mut self, other: &Multiroar) -> Result<()> {
        for (c, theirs) in other.map.iter() {
            match self.map.lookup(c) {
                None => self.map.insert(c, theirs)?,
                Some(ours) => {
                    let merged = combine(ours, theirs, |a, b| a ^ b)?;
                    self.store_body(c, canonical(&merged)?)?;
                }
            }
        }
        Ok(())
    }

    /// union of `a` and `b` as a new bitmap
    pub fn new_or(a: &Multiroar, b: &Multiroar) -> Result<Multiroar> {
        let mut r = a.clone();
        r.or(b)?;
        Ok(r)
    }

    /// intersection of `a` and `b` as a new bitmap
    pub fn new_and(a: &Multiroar, b: &Multiroar) -> Result<Multiroar> {
        let mut r = a.clone();
        r.and(b)?;
        Ok(r)
    }

    /// symmetric difference of `a` and `b` as a new bitmap
    pub fn new_xor(a: &Multiroar, b: &Multiroar) -> Result<Multiroar> {
        let mut r = a.clone();
        r.xor(b)?;
        Ok(r)
    }

    /// Replaces, inserts or deletes chunk `c`
    fn store_body(&mut self, c: u64, body: Option<Vec<u8>>) -> Result<()> {
        match (body, self.map.lookup(c).is_some()) {
            (None, _) => {
                self.map.remove(c);
                Ok(())
            }
            (Some(body), true) => self.map.replace_entry(c, body),
            (Some(body), false) => self.map.insert(c, &body),
        }
    }

    /// Adds `o` to the packed list of chunk `c`, growing the entry in place.
    /// Returns the new count, or `None` if `o` was already listed.
    fn packed_insert(&mut self, c: u64, o: u16) -> Result<Option<usize>> {
        let body = self.map.lookup(c).ok_or(Error::InvalidArgument("chunk vanished"))?;
        let (count, header) = packed_header(body)?;
        if Packed13::new(&body[header..], count)?.member(o).is_some() {
            return Ok(None);
        }
        let packed_len = body.len() - header;
        let new_count = count + 1;
        let new_header = TAG_LEN + tagged::len(new_count as u64);
        let grow = if packed::count_from_bytes(packed_len) < new_count { 2 } else { 0 };

        let body = self.map.resize_entry(c, new_header + packed_len + grow)?;
        if new_header > header {
            body.copy_within(header..header + packed_len, new_header);
        }
        tagged::put(&mut body[TAG_LEN..new_header], new_count as u64)?;
        Packed13::new(&mut body[new_header..], count)?.insert_sorted(o)?;
        Ok(Some(new_count))
    }

    /// Removes `o` from the packed list of chunk `c`, shrinking the entry in place.
    /// Returns the new count, or `None` if `o` was not listed.
    fn packed_remove(&mut self, c: u64, o: u16) -> Result<Option<usize>> {
        let body = self
            .map
            .lookup_mut(c)
            .ok_or(Error::InvalidArgument("chunk vanished"))?;
        let (count, header) = packed_header(body)?;
        if !Packed13::new(&mut body[header..], count)?.delete_member(o) {
            return Ok(None);
        }
        let packed_len = body.len() - header;
        let new_count = count - 1;
        let new_header = TAG_LEN + tagged::len(new_count as u64);
        let shrink = if packed_len >= 2 && packed::count_from_bytes(packed_len - 2) >= new_count {
            2
        } else {
            0
        };
        if new_header < header {
            body.copy_within(header..header + packed_len, new_header);
        }
        tagged::put(&mut body[TAG_LEN..new_header], new_count as u64)?;
        self.map.resize_entry(c, new_header + packed_len - shrink)?;
        Ok(Some(new_count))
    }

    /// Paints the packed list of chunk `c` into a bitmap body
    fn packed_to_bitmap(&mut self, c: u64) -> Result<()> {
        let (from, body) = {
            let body = self.map.lookup(c).ok_or(Error::InvalidArgument("chunk vanished"))?;
            let from = kind_of(body)?;
            let background = from == ChunkKind::OverFull;
            (from, bitmap_body(background, packed_view(body)?.iter())?)
        };
        self.map.replace_entry(c, body)?;
        debug!("multiroar chunk {}: {:?} -> FullBitmap", c, from);
        Ok(())
    }

    /// Lists the set (`UnderFull`) or unset (`OverFull`) bits of bitmap chunk `c`
    fn bitmap_to_packed(&mut self, c: u64, to: ChunkKind) -> Result<()> {
        let body = {
            let body = self.map.lookup(c).ok_or(Error::InvalidArgument("chunk vanished"))?;
            let b = bits(body);
            let listed = to == ChunkKind::UnderFull;
            let count = if listed { b.count_ones() } else { b.count_zeros() };
            packed_body(to, count, offsets_where(b, listed))?
        };
        self.map.replace_entry(c, body)?;
        debug!("multiroar chunk {}: FullBitmap -> {:?}", c, to);
        Ok(())
    }
}

/// Expands two bodies and combines them byte by byte
fn combine(a: &[u8], b: &[u8], op: impl Fn(u8, u8) -> u8) -> Result<Vec<u8>> {
    let mut out = expand(a)?;
    let theirs = expand(b)?;
    for (x, y) in out.iter_mut().zip(theirs) {
        *x = op(*x, y);
    }
    Ok(out)
}
