//! The encoding half of the codec.
//!
//! [`Encoder`] owns the wire rules, one `emit_*` method per [`crate::Shape`].
//! [`Encode`] implementations only decide which rule applies to their type
//! and feed it their parts; they never write bytes on their own.
//!
//! # Binary Format
//!
//! - **Strings**: `u64` little-endian byte length, then the UTF-8 bytes.
//! - **Records**: introspectable fields back to back, no header.
//! - **Variable sequences**: `u64` element count, then the elements.
//! - **Fixed sequences**: the elements, no count.
//! - **Mappings**: `u64` pair count, then key, value, key, value, ...
//! - **Integers**: always 8 bytes, little-endian, two's complement.
//! - **Other scalars**: raw little-endian bytes of their native width.
//! - **Indirections**: the pointee's frame.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    io::Write,
    marker::PhantomData,
    rc::Rc,
    sync::Arc,
};

use crate::{
    config::Config,
    error::Error,
    shape::{Field, Record, Reflect},
};

/// A type whose values can be written by an [`Encoder`].
pub trait Encode: Reflect {
    /// Writes this value's frame.
    ///
    /// Implementations pass their nested values back through
    /// [`Encoder::encode`] so that the depth guard sees every level.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the encoder.
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error>;
}

/// Writes values to any [`Write`] implementation.
///
/// # Example
///
/// ```rust
/// use gensenc::Encoder;
///
/// let mut encoder = Encoder::new(Vec::new());
/// encoder.encode("ab").unwrap();
///
/// assert_eq!(encoder.into_inner(), [2, 0, 0, 0, 0, 0, 0, 0, b'a', b'b']);
/// ```
#[derive(Debug)]
pub struct Encoder<W> {
    writer: W,
    config: Config,
    depth: usize,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder with the default [`Config`].
    pub fn new(writer: W) -> Self { Self::with_config(writer, Config::default()) }

    /// Creates an encoder with the given [`Config`].
    pub const fn with_config(writer: W, config: Config) -> Self {
        Self { writer, config, depth: 0 }
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W { self.writer }

    /// Gets a reference to the underlying writer.
    pub const fn writer(&self) -> &W { &self.writer }

    /// Gets the configuration in effect.
    pub const fn config(&self) -> &Config { &self.config }

    /// Encodes one value, classifying it by its [`crate::Shape`] and
    /// descending one nesting level.
    ///
    /// # Errors
    ///
    /// - [`Error::TooDeeplyNested`] if descending would exceed
    ///   [`Config::max_depth`].
    /// - any error raised while encoding the value itself.
    pub fn encode<T: Encode + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<(), Error> {
        if let Some(limit) = self.config.max_depth {
            if self.depth >= limit {
                log::debug!(
                    "refusing to encode {} frame at depth {}",
                    T::SHAPE,
                    self.depth
                );
                return Err(Error::TooDeeplyNested { limit });
            }
        }

        log::trace!("encoding {} frame at depth {}", T::SHAPE, self.depth);

        self.depth += 1;
        let result = T::encode(value, self);
        self.depth -= 1;

        result
    }

    /// Writes a string frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the writer fails.
    pub fn emit_string(&mut self, value: &str) -> Result<(), Error> {
        self.write_length(value.len())?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes a record frame of type `T`; `f` feeds the fields in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `f`.
    pub fn emit_record<T: Record + ?Sized>(
        &mut self,
        f: impl FnOnce(RecordEncoder<'_, W>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        log::trace!(
            "record with {} of {} fields introspectable",
            T::introspectable_fields().count(),
            T::FIELDS.len()
        );

        f(RecordEncoder { encoder: self, fields: T::FIELDS })
    }

    /// Writes a variable sequence frame; the count is the number of items
    /// `elements` yields.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the writer or an element.
    pub fn emit_variable_sequence<'a, T, I>(
        &mut self,
        elements: I,
    ) -> Result<(), Error>
    where
        T: Encode + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: ExactSizeIterator,
    {
        let elements = elements.into_iter();

        self.write_length(elements.len())?;
        self.emit_fixed_sequence(elements)
    }

    /// Writes a fixed sequence frame: the elements without a count.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by an element.
    pub fn emit_fixed_sequence<'a, T, I>(
        &mut self,
        elements: I,
    ) -> Result<(), Error>
    where
        T: Encode + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for element in elements {
            self.encode(element)?;
        }

        Ok(())
    }

    /// Writes a mapping frame; the count is the number of pairs `entries`
    /// yields.
    ///
    /// Pairs are written in the order `entries` yields them unless
    /// [`Config::sort_map_keys`] is set, in which case they are ordered by
    /// the bytes of their encoded keys.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the writer, a key, or a value.
    pub fn emit_mapping<'a, K, V, I>(&mut self, entries: I) -> Result<(), Error>
    where
        K: Encode + 'a,
        V: Encode + 'a,
        I: IntoIterator<Item = (&'a K, &'a V)>,
        I::IntoIter: ExactSizeIterator,
    {
        let entries = entries.into_iter();
        let len = entries.len();

        self.write_length(len)?;

        if !self.config.sort_map_keys {
            for (key, value) in entries {
                self.encode(key)?;
                self.encode(value)?;
            }

            return Ok(());
        }

        let mut frames = Vec::with_capacity(len);
        for (key, value) in entries {
            let key = self.scratch(key)?;
            let value = self.scratch(value)?;

            frames.push((key, value));
        }

        frames.sort_unstable_by(|(lhs, _), (rhs, _)| lhs.cmp(rhs));

        for (key, value) in frames {
            self.write_bytes(&key)?;
            self.write_bytes(&value)?;
        }

        Ok(())
    }

    /// Writes a signed integer widened to 8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the writer fails.
    pub fn emit_signed(&mut self, value: i64) -> Result<(), Error> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes an unsigned integer widened to 8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the writer fails.
    pub fn emit_unsigned(&mut self, value: u64) -> Result<(), Error> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes the raw little-endian representation of a fixed-width scalar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the writer fails.
    pub fn emit_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.write_bytes(bytes)
    }

    /// Writes the frame of the value an indirection points to.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while encoding the pointee.
    pub fn emit_indirection<T: Encode + ?Sized>(
        &mut self,
        pointee: &T,
    ) -> Result<(), Error> {
        self.encode(pointee)
    }

    fn write_length(&mut self, len: usize) -> Result<(), Error> {
        // usize is at most 64 bits wide on every supported target
        self.emit_unsigned(len as u64)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.writer.write_all(bytes).map_err(Error::Io)
    }

    /// Encodes the value into a separate buffer at the current depth.
    fn scratch<T: Encode + ?Sized>(&self, value: &T) -> Result<Vec<u8>, Error> {
        let mut scratch = Encoder {
            writer: Vec::new(),
            config: self.config,
            depth: self.depth,
        };
        scratch.encode(value)?;

        Ok(scratch.writer)
    }
}

/// Feeds the fields of a record to its [`Encoder`].
#[derive(Debug)]
pub struct RecordEncoder<'a, W> {
    encoder: &'a mut Encoder<W>,
    fields: &'static [Field],
}

impl<W: Write> RecordEncoder<'_, W> {
    /// Encodes an introspectable field.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while encoding the field.
    pub fn field<T: Encode + ?Sized>(
        &mut self,
        name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        debug_assert!(
            self.fields.iter().any(|field| field.name == name
                && field.is_introspectable()),
            "`{name}` is not an introspectable field of the record"
        );

        log::trace!("encoding field `{name}`");
        self.encoder.encode(value)
    }

    /// Skips a hidden field; it contributes no bytes.
    pub fn skip(&mut self, name: &'static str) {
        debug_assert!(
            self.fields.iter().any(|field| field.name == name
                && !field.is_introspectable()),
            "`{name}` is not a hidden field of the record"
        );

        log::trace!("skipping hidden field `{name}`");
    }
}

// =============================================================================
// Scalar Implementations
// =============================================================================

macro_rules! impl_encode_integer {
    ($method:ident as $wide:ty => $($ty:ty),*) => {
        $(
            impl Encode for $ty {
                #[allow(
                    clippy::cast_lossless,
                    clippy::cast_possible_wrap,
                    clippy::unnecessary_cast
                )]
                fn encode<W: Write>(
                    &self,
                    encoder: &mut Encoder<W>,
                ) -> Result<(), Error> {
                    encoder.$method(*self as $wide)
                }
            }
        )*
    };
}

impl_encode_integer!(emit_signed as i64 => i8, i16, i32, i64, isize);
impl_encode_integer!(emit_unsigned as u64 => u8, u16, u32, u64, usize);

macro_rules! impl_encode_raw {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode<W: Write>(
                    &self,
                    encoder: &mut Encoder<W>,
                ) -> Result<(), Error> {
                    encoder.emit_raw(&self.to_le_bytes())
                }
            }
        )*
    };
}

impl_encode_raw!(f32, f64, i128, u128);

impl Encode for bool {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_raw(&[u8::from(*self)])
    }
}

impl Encode for char {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_raw(&u32::from(*self).to_le_bytes())
    }
}

impl Encode for str {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_string(self)
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_string(self)
    }
}

// =============================================================================
// Record Implementations
// =============================================================================

impl Encode for () {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_record::<Self>(|_| Ok(()))
    }
}

impl<T: ?Sized> Encode for PhantomData<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_record::<Self>(|_| Ok(()))
    }
}

macro_rules! impl_encode_tuple {
    ($($T:ident => $idx:tt),+) => {
        impl<$($T: Encode),+> Encode for ($($T,)+) {
            fn encode<W: Write>(
                &self,
                encoder: &mut Encoder<W>,
            ) -> Result<(), Error> {
                encoder.emit_record::<Self>(|mut record| {
                    $(
                        record.field(stringify!($idx), &self.$idx)?;
                    )+
                    Ok(())
                })
            }
        }
    };
}

impl_encode_tuple!(T0 => 0);
impl_encode_tuple!(T0 => 0, T1 => 1);
impl_encode_tuple!(T0 => 0, T1 => 1, T2 => 2);
impl_encode_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3);
impl_encode_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4);
impl_encode_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5);
impl_encode_tuple!(
    T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6
);
impl_encode_tuple!(
    T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6, T7 => 7
);

// =============================================================================
// Sequence Implementations
// =============================================================================

impl<T: Encode> Encode for [T] {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_variable_sequence(self)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_variable_sequence(self)
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_variable_sequence(self)
    }
}

impl<T: Encode, S> Encode for HashSet<T, S> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_variable_sequence(self)
    }
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_variable_sequence(self)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_fixed_sequence(self)
    }
}

// =============================================================================
// Mapping Implementations
// =============================================================================

impl<K: Encode, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_mapping(self)
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_mapping(self)
    }
}

// =============================================================================
// Indirection Implementations
// =============================================================================

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_indirection(&**self)
    }
}

impl<T: Encode + ?Sized> Encode for &mut T {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_indirection(&**self)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_indirection(&**self)
    }
}

impl<T: Encode + ?Sized> Encode for Rc<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_indirection(&**self)
    }
}

impl<T: Encode + ?Sized> Encode for Arc<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        encoder.emit_indirection(&**self)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, encoder: &mut Encoder<W>) -> Result<(), Error> {
        match self {
            Some(pointee) => encoder.emit_indirection(pointee),
            None => Err(Error::AbsentIndirection),
        }
    }
}

#[cfg(test)]
mod test;
