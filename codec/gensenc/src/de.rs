//! The decoding half of the codec.
//!
//! [`Decoder`] mirrors [`crate::Encoder`]: one `expect_*` method per
//! [`crate::Shape`], reading from any [`Read`] implementation. [`Decode`] writes
//! the result into an existing target instead of constructing a new value,
//! so collections are reset and refilled and records keep the values of
//! their hidden fields.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    hash::{BuildHasher, Hash},
    io::Read,
    marker::PhantomData,
    rc::Rc,
    sync::Arc,
};

use crate::{
    config::{Config, Narrowing},
    error::Error,
    shape::{Field, Record, Reflect},
};

/// The largest number of elements reserved up front for a collection,
/// whatever its length prefix claims.
pub const PREALLOCATION_LIMIT: usize = 4096;

/// Returns how many elements to reserve for a collection whose length
/// prefix is `count`.
#[must_use]
pub const fn preallocation(count: usize) -> usize {
    if count < PREALLOCATION_LIMIT {
        count
    } else {
        PREALLOCATION_LIMIT
    }
}

/// A type whose values can be overwritten by a [`Decoder`].
pub trait Decode: Reflect {
    /// Reads a frame and writes it into `self`.
    ///
    /// Implementations pass their nested targets back through
    /// [`Decoder::decode`] so that the depth guard sees every level.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the decoder; `self` may be left
    /// partially overwritten.
    ///
    /// The decoder never allocates a pointee: an `Option` target, or an
    /// `Option` inside it, must already be `Some`. Collection elements, map
    /// keys, and map values are built from `Default`, so an `Option` there
    /// always fails with [`Error::AbsentIndirection`] even though the
    /// collection encodes fine.
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error>;
}

/// Reads values from any [`Read`] implementation.
///
/// # Example
///
/// ```rust
/// use gensenc::Decoder;
///
/// let bytes = [5, 0, 0, 0, 0, 0, 0, 0];
/// let mut decoder = Decoder::new(&bytes[..]);
///
/// let mut value = 0u8;
/// decoder.decode(&mut value).unwrap();
///
/// assert_eq!(value, 5);
/// assert!(decoder.into_inner().is_empty());
/// ```
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
    config: Config,
    depth: usize,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder with the default [`Config`].
    pub fn new(reader: R) -> Self { Self::with_config(reader, Config::default()) }

    /// Creates a decoder with the given [`Config`].
    pub const fn with_config(reader: R, config: Config) -> Self {
        Self { reader, config, depth: 0 }
    }

    /// Consumes the decoder and returns the underlying reader.
    pub fn into_inner(self) -> R { self.reader }

    /// Gets a reference to the underlying reader.
    pub const fn reader(&self) -> &R { &self.reader }

    /// Gets the configuration in effect.
    pub const fn config(&self) -> &Config { &self.config }

    /// Decodes one frame into the target, classifying it by its
    /// [`crate::Shape`] and descending one nesting level.
    ///
    /// # Errors
    ///
    /// - [`Error::TooDeeplyNested`] if descending would exceed
    ///   [`Config::max_depth`].
    /// - any error raised while decoding the target itself.
    pub fn decode<T: Decode + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> Result<(), Error> {
        if let Some(limit) = self.config.max_depth {
            if self.depth >= limit {
                log::debug!(
                    "refusing to decode {} frame at depth {}",
                    T::SHAPE,
                    self.depth
                );
                return Err(Error::TooDeeplyNested { limit });
            }
        }

        log::trace!("decoding {} frame at depth {}", T::SHAPE, self.depth);

        self.depth += 1;
        let result = T::decode(target, self);
        self.depth -= 1;

        result
    }

    /// Decodes one frame into a default-constructed holder and returns it.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    pub fn decode_fresh<T: Decode + Default>(&mut self) -> Result<T, Error> {
        let mut holder = T::default();
        self.decode(&mut holder)?;

        Ok(holder)
    }

    /// Reads a `u64` length or count prefix.
    ///
    /// The value is trusted; an absurd length surfaces later as
    /// [`Error::EndOfStream`].
    ///
    /// # Errors
    ///
    /// - [`Error::EndOfStream`] if fewer than 8 bytes remain.
    /// - [`Error::LengthOverflow`] if the length does not fit `usize`.
    pub fn expect_length(&mut self) -> Result<usize, Error> {
        let length = self.expect_unsigned()?;

        usize::try_from(length).map_err(|_| Error::LengthOverflow(length))
    }

    /// Reads a string frame into the target.
    ///
    /// # Errors
    ///
    /// - [`Error::EndOfStream`] if the input ends inside the frame.
    /// - [`Error::InvalidUtf8`] if the bytes are not valid UTF-8.
    pub fn expect_string(&mut self, target: &mut String) -> Result<(), Error> {
        let len = self.expect_length()?;

        let mut bytes = Vec::with_capacity(preallocation(len));
        (&mut self.reader).take(len as u64).read_to_end(&mut bytes)?;

        if bytes.len() < len {
            return Err(Error::EndOfStream);
        }

        *target = String::from_utf8(bytes)?;

        Ok(())
    }

    /// Reads a record frame of type `T`; `f` receives the fields in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `f`.
    pub fn expect_record<T: Record + ?Sized>(
        &mut self,
        f: impl FnOnce(RecordDecoder<'_, R>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        log::trace!(
            "record with {} of {} fields introspectable",
            T::introspectable_fields().count(),
            T::FIELDS.len()
        );

        f(RecordDecoder { decoder: self, fields: T::FIELDS })
    }

    /// Reads a fixed sequence frame into the given slots, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a slot.
    pub fn expect_fixed_sequence<'a, T, I>(
        &mut self,
        slots: I,
    ) -> Result<(), Error>
    where
        T: Decode + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        for slot in slots {
            self.decode(slot)?;
        }

        Ok(())
    }

    /// Reads an 8-byte signed integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] if fewer than 8 bytes remain.
    pub fn expect_signed(&mut self) -> Result<i64, Error> {
        Ok(i64::from_le_bytes(self.expect_raw()?))
    }

    /// Reads an 8-byte unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] if fewer than 8 bytes remain.
    pub fn expect_unsigned(&mut self) -> Result<u64, Error> {
        Ok(u64::from_le_bytes(self.expect_raw()?))
    }

    /// Reads the raw representation of an `N`-byte scalar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndOfStream`] if fewer than `N` bytes remain.
    pub fn expect_raw<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut bytes = [0; N];
        self.reader.read_exact(&mut bytes)?;

        Ok(bytes)
    }

    /// Reads the frame of the value an indirection points to into the
    /// pointee.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while decoding the pointee.
    pub fn expect_indirection<T: Decode + ?Sized>(
        &mut self,
        pointee: &mut T,
    ) -> Result<(), Error> {
        self.decode(pointee)
    }
}

/// Hands the fields of a record to its [`Decoder`].
#[derive(Debug)]
pub struct RecordDecoder<'a, R> {
    decoder: &'a mut Decoder<R>,
    fields: &'static [Field],
}

impl<R: Read> RecordDecoder<'_, R> {
    /// Decodes an introspectable field in place.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while decoding the field.
    pub fn field<T: Decode + ?Sized>(
        &mut self,
        name: &'static str,
        target: &mut T,
    ) -> Result<(), Error> {
        debug_assert!(
            self.fields.iter().any(|field| field.name == name
                && field.is_introspectable()),
            "`{name}` is not an introspectable field of the record"
        );

        log::trace!("decoding field `{name}`");
        self.decoder.decode(target)
    }

    /// Skips a hidden field; no bytes are consumed and the field keeps its
    /// value.
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

macro_rules! impl_decode_integer {
    ($method:ident => $($ty:ty),*) => {
        $(
            impl Decode for $ty {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_possible_wrap,
                    clippy::cast_sign_loss,
                    clippy::unnecessary_cast
                )]
                fn decode<R: Read>(
                    &mut self,
                    decoder: &mut Decoder<R>,
                ) -> Result<(), Error> {
                    let wide = decoder.$method()?;

                    *self = match decoder.config().narrowing {
                        Narrowing::Truncate => wide as $ty,
                        Narrowing::Checked => <$ty>::try_from(wide).map_err(
                            |_| Error::IntegerOverflow {
                                value: i128::from(wide),
                                target: stringify!($ty),
                            },
                        )?,
                    };

                    Ok(())
                }
            }
        )*
    };
}

impl_decode_integer!(expect_signed => i8, i16, i32, i64, isize);
impl_decode_integer!(expect_unsigned => u8, u16, u32, u64, usize);

macro_rules! impl_decode_raw {
    ($($ty:ty),*) => {
        $(
            impl Decode for $ty {
                fn decode<R: Read>(
                    &mut self,
                    decoder: &mut Decoder<R>,
                ) -> Result<(), Error> {
                    *self = <$ty>::from_le_bytes(decoder.expect_raw()?);

                    Ok(())
                }
            }
        )*
    };
}

impl_decode_raw!(f32, f64, i128, u128);

impl Decode for bool {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let [byte] = decoder.expect_raw::<1>()?;
        *self = byte != 0;

        Ok(())
    }
}

impl Decode for char {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let scalar = u32::from_le_bytes(decoder.expect_raw()?);
        *self = char::from_u32(scalar).ok_or(Error::InvalidChar(scalar))?;

        Ok(())
    }
}

impl Decode for String {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        decoder.expect_string(self)
    }
}

// =============================================================================
// Record Implementations
// =============================================================================

impl Decode for () {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        decoder.expect_record::<Self>(|_| Ok(()))
    }
}

impl<T: ?Sized> Decode for PhantomData<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        decoder.expect_record::<Self>(|_| Ok(()))
    }
}

macro_rules! impl_decode_tuple {
    ($($T:ident => $idx:tt),+) => {
        impl<$($T: Decode),+> Decode for ($($T,)+) {
            fn decode<R: Read>(
                &mut self,
                decoder: &mut Decoder<R>,
            ) -> Result<(), Error> {
                decoder.expect_record::<Self>(|mut record| {
                    $(
                        record.field(stringify!($idx), &mut self.$idx)?;
                    )+
                    Ok(())
                })
            }
        }
    };
}

impl_decode_tuple!(T0 => 0);
impl_decode_tuple!(T0 => 0, T1 => 1);
impl_decode_tuple!(T0 => 0, T1 => 1, T2 => 2);
impl_decode_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3);
impl_decode_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4);
impl_decode_tuple!(T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5);
impl_decode_tuple!(
    T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6
);
impl_decode_tuple!(
    T0 => 0, T1 => 1, T2 => 2, T3 => 3, T4 => 4, T5 => 5, T6 => 6, T7 => 7
);

// =============================================================================
// Sequence Implementations
// =============================================================================

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let count = decoder.expect_length()?;

        self.clear();
        self.reserve(preallocation(count));

        for _ in 0..count {
            self.push(decoder.decode_fresh()?);
        }

        Ok(())
    }
}

impl<T: Decode + Default> Decode for VecDeque<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let count = decoder.expect_length()?;

        self.clear();
        self.reserve(preallocation(count));

        for _ in 0..count {
            self.push_back(decoder.decode_fresh()?);
        }

        Ok(())
    }
}

impl<T, S> Decode for HashSet<T, S>
where
    T: Decode + Default + Eq + Hash,
    S: BuildHasher,
{
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let count = decoder.expect_length()?;

        self.clear();
        self.reserve(preallocation(count));

        for _ in 0..count {
            self.insert(decoder.decode_fresh()?);
        }

        Ok(())
    }
}

impl<T: Decode + Default + Ord> Decode for BTreeSet<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let count = decoder.expect_length()?;

        self.clear();

        for _ in 0..count {
            self.insert(decoder.decode_fresh()?);
        }

        Ok(())
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        decoder.expect_fixed_sequence(self)
    }
}

// =============================================================================
// Mapping Implementations
// =============================================================================

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: Decode + Default + Eq + Hash,
    V: Decode + Default,
    S: BuildHasher,
{
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let count = decoder.expect_length()?;

        self.clear();
        self.reserve(preallocation(count));

        for _ in 0..count {
            let key = decoder.decode_fresh()?;
            let value = decoder.decode_fresh()?;

            self.insert(key, value);
        }

        Ok(())
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Default + Ord,
    V: Decode + Default,
{
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let count = decoder.expect_length()?;

        self.clear();

        for _ in 0..count {
            let key = decoder.decode_fresh()?;
            let value = decoder.decode_fresh()?;

            self.insert(key, value);
        }

        Ok(())
    }
}

// =============================================================================
// Indirection Implementations
// =============================================================================

impl<T: ?Sized> Decode for &T {
    fn decode<R: Read>(&mut self, _: &mut Decoder<R>) -> Result<(), Error> {
        Err(Error::CannotSet)
    }
}

impl<T: Decode + ?Sized> Decode for &mut T {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        decoder.expect_indirection(&mut **self)
    }
}

impl<T: Decode + ?Sized> Decode for Box<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        decoder.expect_indirection(&mut **self)
    }
}

impl<T: Decode + ?Sized> Decode for Rc<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let pointee = Rc::get_mut(self).ok_or(Error::CannotSet)?;

        decoder.expect_indirection(pointee)
    }
}

impl<T: Decode + ?Sized> Decode for Arc<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        let pointee = Arc::get_mut(self).ok_or(Error::CannotSet)?;

        decoder.expect_indirection(pointee)
    }
}

/// No storage is allocated for an absent pointee: a `None` target fails with
/// [`Error::AbsentIndirection`], including the `None` holders that
/// collections and [`crate::decode_default`] build from `Default`.
impl<T: Decode> Decode for Option<T> {
    fn decode<R: Read>(&mut self, decoder: &mut Decoder<R>) -> Result<(), Error> {
        match self {
            Some(pointee) => decoder.expect_indirection(pointee),
            None => Err(Error::AbsentIndirection),
        }
    }
}
