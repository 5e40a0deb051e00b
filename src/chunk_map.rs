//! Sorted `u64 -> bytes` map backing [`multiroar`](crate::multiroar).
//!
//! Entries are plain byte bodies. Besides lookup and insert the map can resize an entry
//! in place ([`ChunkMap::resize_entry`]), which is what the chunk shape machine uses to
//! grow and shrink its packed position lists one element at a time.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Ordered map from chunk index to chunk body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkMap {
    entries: BTreeMap<u64, Vec<u8>>,
}

impl ChunkMap {
    /// empty map
    pub fn new() -> Self {
        ChunkMap { entries: BTreeMap::new() }
    }

    /// body stored under `key`
    pub fn lookup(&self, key: u64) -> Option<&[u8]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    /// mutable body stored under `key`, without changing its length
    pub fn lookup_mut(&mut self, key: u64) -> Option<&mut [u8]> {
        self.entries.get_mut(&key).map(Vec::as_mut_slice)
    }

    /// Inserts (or overwrites) `key` with a copy of `body`
    pub fn insert(&mut self, key: u64, body: &[u8]) -> Result<()> {
        let mut v = Vec::new();
        v.try_reserve_exact(body.len()).map_err(|_| Error::AllocationFailure)?;
        v.extend_from_slice(body);
        self.entries.insert(key, v);
        Ok(())
    }

    /// Resizes the body under `key` to `len` bytes and returns it.
    ///
    /// The common prefix is preserved, new bytes are zero. A missing key is an
    /// [`Error::InvalidArgument`]; on allocation failure the entry is unchanged.
    pub fn resize_entry(&mut self, key: u64, len: usize) -> Result<&mut [u8]> {
        let body = self
            .entries
            .get_mut(&key)
            .ok_or(Error::InvalidArgument("no entry to resize"))?;
        if len > body.len() {
            body.try_reserve_exact(len - body.len()).map_err(|_| Error::AllocationFailure)?;
        }
        body.resize(len, 0);
        if body.capacity() > 2 * len {
            body.shrink_to_fit();
        }
        Ok(body.as_mut_slice())
    }

    /// Swaps the body under an existing `key` for `body`
    pub fn replace_entry(&mut self, key: u64, body: Vec<u8>) -> Result<()> {
        let slot = self
            .entries
            .get_mut(&key)
            .ok_or(Error::InvalidArgument("no entry to replace"))?;
        *slot = body;
        Ok(())
    }

    /// Removes `key`, returning its body
    pub fn remove(&mut self, key: u64) -> Option<Vec<u8>> {
        self.entries.remove(&key)
    }

    /// entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[u8])> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// true without entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// summed body bytes of all entries
    pub fn bytes(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
