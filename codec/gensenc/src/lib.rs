//! A shape-driven binary codec.
//!
//! Every supported type is classified into one [`Shape`] through the
//! [`Reflect`] trait. The [`Encoder`] and [`Decoder`] walk a value
//! recursively and apply one fixed wire rule per shape:
//!
//! - strings, variable sequences, and mappings carry a `u64` little-endian
//!   length prefix;
//! - records and fixed sequences are the plain concatenation of their parts;
//! - every integer is widened to 8 little-endian bytes;
//! - other scalars are written as their raw little-endian representation;
//! - indirections are transparent.
//!
//! The format is not self-describing: the caller supplies a target of the
//! same type at decode time.
//!
//! # Example
//!
//! ```rust
//! use gensenc::Record;
//!
//! #[derive(Debug, Default, PartialEq, Record)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     #[gensenc(skip)]
//!     cached_norm: Option<f64>,
//! }
//!
//! let point = Point { x: 3, y: -4, cached_norm: Some(5.0) };
//! let bytes = gensenc::encode(&point).unwrap();
//!
//! assert_eq!(bytes.len(), 16);
//!
//! let mut decoded = Point::default();
//! gensenc::decode(&bytes, &mut decoded).unwrap();
//!
//! assert_eq!(decoded, Point { x: 3, y: -4, cached_norm: None });
//! ```

// this allows the derive macro to refer to `::gensenc` from inside this crate
extern crate self as gensenc;

pub use config::{Config, Narrowing};
pub use de::{Decode, Decoder};
pub use error::Error;
pub use gensenc_derive::Record;
pub use ser::{Encode, Encoder};
pub use shape::{Field, Record, Reflect, Shape, Visibility};

pub mod config;
pub mod de;
pub mod error;
pub mod ser;
pub mod shape;

#[doc(hidden)]
pub mod __internal {
    pub use crate::{
        de::{Decode, Decoder, RecordDecoder},
        error::Error,
        ser::{Encode, Encoder, RecordEncoder},
        shape::{Field, Record, Reflect, Shape, Visibility},
    };
}

/// Returns the shape the given value is classified as.
#[must_use]
pub const fn shape_of<T: Reflect + ?Sized>(_: &T) -> Shape { T::SHAPE }

/// Encodes the value with the default [`Config`].
///
/// # Errors
///
/// See [`encode_with`].
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    encode_with(value, Config::default())
}

/// Encodes the value into a freshly allocated buffer.
///
/// # Errors
///
/// - [`Error::TooDeeplyNested`] if the value nests deeper than
///   [`Config::max_depth`].
/// - [`Error::AbsentIndirection`] if an `Option` on the way is `None`.
pub fn encode_with<T: Encode + ?Sized>(
    value: &T,
    config: Config,
) -> Result<Vec<u8>, Error> {
    let mut encoder = Encoder::with_config(Vec::new(), config);
    encoder.encode(value)?;

    let bytes = encoder.into_inner();
    log::debug!("encoded {} frame into {} bytes", T::SHAPE, bytes.len());

    Ok(bytes)
}

/// Decodes the bytes into the target with the default [`Config`].
///
/// # Errors
///
/// See [`decode_with`].
pub fn decode<T: Decode + ?Sized>(
    bytes: &[u8],
    target: &mut T,
) -> Result<(), Error> {
    decode_with(bytes, target, Config::default())
}

/// Decodes the bytes into the target in place.
///
/// The target must have the same type the bytes were encoded from; there is
/// no tag on the wire to verify it. On failure the target may be partially
/// overwritten and must not be relied upon.
///
/// # Errors
///
/// - [`Error::EndOfStream`] if the bytes run out before the frame is
///   complete.
/// - [`Error::CannotSet`] if the target (or a part of it) is read-only.
/// - [`Error::TrailingBytes`] if [`Config::reject_trailing_bytes`] is set and
///   the frame does not consume every byte.
/// - any other [`Error`] raised by the shape-specific decoding rules.
pub fn decode_with<T: Decode + ?Sized>(
    bytes: &[u8],
    target: &mut T,
    config: Config,
) -> Result<(), Error> {
    let mut decoder = Decoder::with_config(bytes, config);
    decoder.decode(target)?;

    let rest = decoder.into_inner();
    log::debug!(
        "decoded {} frame from {} bytes",
        T::SHAPE,
        bytes.len() - rest.len()
    );

    if config.reject_trailing_bytes && !rest.is_empty() {
        return Err(Error::TrailingBytes { remaining: rest.len() });
    }

    Ok(())
}

/// Decodes the bytes into a default-constructed value and returns it.
///
/// No pointee is allocated for an absent indirection, so a `T` whose default
/// holds a `None` (or a collection of `Option`s) fails with
/// [`Error::AbsentIndirection`]; decode into a pre-populated target with
/// [`decode`] instead.
///
/// # Errors
///
/// See [`decode_with`].
pub fn decode_default<T: Decode + Default>(bytes: &[u8]) -> Result<T, Error> {
    let mut target = T::default();
    decode(bytes, &mut target)?;

    Ok(target)
}


#[cfg(test)]
mod test;
