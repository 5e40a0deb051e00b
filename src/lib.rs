//! Variable-length integer codecs, array codecs and compressed bitmaps.
//!
//! # Overview
//! The crate is built in layers:
//! * **Scalar varints**, one integer in a few bytes: [`external`] (fixed width, no tag),
//!   [`tagged`] (length in the first byte, sorts like the numbers it holds), [`chained`] and
//!   [`chained_simple`] (continuation bits), and the [`split`] families.
//! * **Array codecs** on top of them: [`delta`], [`frame_of_reference`], [`pfor`] (FOR with
//!   patched outliers), [`dict`] and the lossy [`float`] codec.
//!   [`adaptive`] looks at the data and picks one of them.
//! * **Bitmaps**: [`bitmap::VarintBitmap`] for sets of `u16`, and [`multiroar::Multiroar`]
//!   for sparse sets of `u64` positions, built from [`packed`] 13-bit arrays and the
//!   [`chunk_map::ChunkMap`].
//!
//! Widths of the fixed-size fields are described by [`Width`], a byte count from 1 to 16.
//!
//! # Note
//! * Decoders never consume their input. They take a slice and return the decoded data
//!   together with the number of bytes read, so an encoding can be embedded in a larger
//!   buffer and whatever follows it is at `buf[bytes_read..]`.
//! * Everything that can fail on bad input returns [`Result`]; malformed bytes give an
//!   [`Error`], never a panic.
//! * The crate logs through the [`log`] facade (shape changes at `debug`, analysis details
//!   at `trace`) and installs no logger.
//!
//! # Example
//! ```rust
//! # use varint_codecs::{tagged, frame_of_reference, adaptive};
//! // a single value
//! let mut buf = [0_u8; tagged::MAX_LEN];
//! let n = tagged::put(&mut buf, 241).unwrap();
//! assert_eq!(&buf[..n], &[0xF1, 0x00]);
//! assert_eq!(tagged::get(&buf).unwrap(), (241, 2));
//!
//! // an array with a tight range
//! let data = vec![1000_u64, 1005, 1002, 1010, 1001];
//! let (enc, meta) = frame_of_reference::encode(&data);
//! assert_eq!(meta.range, 10);
//! assert_eq!(frame_of_reference::decode(&enc).unwrap().0, data);
//!
//! // or let the data choose
//! let (enc, _) = adaptive::encode(&data).unwrap();
//! assert_eq!(adaptive::decode(&enc, data.len()).unwrap().0, data);
//! ```
//!
//! # Byte order
//! Fixed-width fields are little endian ([`external`]), with a big-endian twin in
//! [`external_big_endian`]. Tagged varints are big endian, which is what makes them sort
//! bytewise.

pub mod error;
pub mod width;

pub mod external;
pub mod external_big_endian;
pub mod tagged;
pub mod chained;
pub mod chained_simple;
pub mod split;

pub mod delta;
pub mod frame_of_reference;
pub mod pfor;
pub mod dict;
pub mod float;
pub mod adaptive;

pub mod bitmap;
pub mod packed;
pub mod chunk_map;
pub mod multiroar;

pub use error::{Error, Result};
pub use width::Width;
