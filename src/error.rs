//! Error kinds shared by every codec and container in the crate.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong at a public entry point.
///
/// Errors are plain return values; nothing in the crate unwinds on bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// heap acquisition failed; the input object is unchanged
    #[error("allocation failure")]
    AllocationFailure,
    /// a decoder (or an in-place writer) ran out of bytes
    #[error("buffer too short: needed {needed} bytes, {available} available")]
    BufferTooShort {
        /// bytes required to finish the structure
        needed: usize,
        /// bytes that were actually there
        available: usize,
    },
    /// a structural field is inconsistent with the rest of the input
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),
    /// arithmetic would leave the integer range
    #[error("arithmetic overflow")]
    Overflow,
    /// an index or value lies outside what the container/format accepts
    #[error("out of range")]
    OutOfRange,
    /// a width byte outside the vocabulary (or outside what a codec accepts)
    #[error("invalid width {0}")]
    InvalidWidth(u8),
    /// caller misuse, e.g. an unsupported configuration value
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// Checks that `buf` holds at least `needed` bytes.
#[inline]
pub(crate) fn ensure_len(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        Err(Error::BufferTooShort { needed, available: buf.len() })
    } else {
        Ok(())
    }
}

/// Reserves room for `additional` elements, reporting failure instead of aborting.
#[inline]
pub(crate) fn try_vec_with_capacity<T>(additional: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(additional).map_err(|_| Error::AllocationFailure)?;
    Ok(v)
}
