//! The shape classifier.
//!
//! Every type the codec supports implements [`Reflect`], which tags it with
//! exactly one [`Shape`]. The tag decides which wire rule the
//! [`crate::Encoder`] and [`crate::Decoder`] apply to values of that type.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    marker::PhantomData,
    rc::Rc,
    sync::Arc,
};

/// The closed set of shapes a value can be classified as.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Shape {
    /// A `u64` byte length followed by the UTF-8 bytes.
    String,

    /// The concatenation of the introspectable fields in declaration order.
    Record,

    /// A `u64` element count followed by the elements.
    VariableSequence,

    /// The elements of a sequence whose length is part of its type.
    FixedSequence,

    /// A `u64` pair count followed by alternating keys and values.
    Mapping,

    /// A signed integer widened to 8 bytes.
    SignedInteger,

    /// An unsigned integer widened to 8 bytes.
    UnsignedInteger,

    /// A reference to another value, encoded as the pointee.
    Indirection,

    /// Any other fixed-width scalar, encoded as its raw bytes.
    Other,
}

/// Classifies a type into a [`Shape`].
pub trait Reflect {
    /// The shape every value of this type has.
    const SHAPE: Shape;
}

/// Whether the codec is allowed to read and write a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    /// The field occupies wire bytes and is restored on decode.
    Introspectable,

    /// The field contributes no bytes and keeps its value on decode.
    Hidden,
}

/// Describes one declared field of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// The field's name, or its position for tuple structs.
    pub name: &'static str,

    /// Whether the codec touches the field.
    pub visibility: Visibility,
}

impl Field {
    /// Creates a new field descriptor.
    #[must_use]
    pub const fn new(name: &'static str, visibility: Visibility) -> Self {
        Self { name, visibility }
    }

    /// Returns `true` if the field occupies bytes on the wire.
    #[must_use]
    pub const fn is_introspectable(&self) -> bool {
        matches!(self.visibility, Visibility::Introspectable)
    }
}

/// A type with the [`Shape::Record`] shape and a declared field list.
///
/// Usually implemented through `#[derive(Record)]`, which generates the
/// field table together with the encoding and decoding code so that both
/// paths skip exactly the same fields.
pub trait Record: Reflect {
    /// The declared fields in declaration order, hidden ones included.
    const FIELDS: &'static [Field];

    /// Iterates over the fields that occupy bytes on the wire.
    fn introspectable_fields() -> impl Iterator<Item = &'static Field> {
        Self::FIELDS.iter().filter(|field| field.is_introspectable())
    }
}

macro_rules! impl_reflect {
    ($shape:ident => $($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                const SHAPE: Shape = Shape::$shape;
            }
        )*
    };
}

impl_reflect!(String => String, str);
impl_reflect!(SignedInteger => i8, i16, i32, i64, isize);
impl_reflect!(UnsignedInteger => u8, u16, u32, u64, usize);
impl_reflect!(Other => bool, char, f32, f64, i128, u128);

impl Reflect for () {
    const SHAPE: Shape = Shape::Record;
}

impl Record for () {
    const FIELDS: &'static [Field] = &[];
}

impl<T: ?Sized> Reflect for PhantomData<T> {
    const SHAPE: Shape = Shape::Record;
}

impl<T: ?Sized> Record for PhantomData<T> {
    const FIELDS: &'static [Field] = &[];
}

macro_rules! impl_reflect_tuple {
    ($($T:ident => $idx:literal),+) => {
        impl<$($T),+> Reflect for ($($T,)+) {
            const SHAPE: Shape = Shape::Record;
        }

        impl<$($T),+> Record for ($($T,)+) {
            const FIELDS: &'static [Field] = &[
                $(Field::new($idx, Visibility::Introspectable)),+
            ];
        }
    };
}

impl_reflect_tuple!(T0 => "0");
impl_reflect_tuple!(T0 => "0", T1 => "1");
impl_reflect_tuple!(T0 => "0", T1 => "1", T2 => "2");
impl_reflect_tuple!(T0 => "0", T1 => "1", T2 => "2", T3 => "3");
impl_reflect_tuple!(T0 => "0", T1 => "1", T2 => "2", T3 => "3", T4 => "4");
impl_reflect_tuple!(
    T0 => "0", T1 => "1", T2 => "2", T3 => "3", T4 => "4", T5 => "5"
);
impl_reflect_tuple!(
    T0 => "0", T1 => "1", T2 => "2", T3 => "3", T4 => "4", T5 => "5",
    T6 => "6"
);
impl_reflect_tuple!(
    T0 => "0", T1 => "1", T2 => "2", T3 => "3", T4 => "4", T5 => "5",
    T6 => "6", T7 => "7"
);

impl<T> Reflect for Vec<T> {
    const SHAPE: Shape = Shape::VariableSequence;
}

impl<T> Reflect for VecDeque<T> {
    const SHAPE: Shape = Shape::VariableSequence;
}

impl<T> Reflect for [T] {
    const SHAPE: Shape = Shape::VariableSequence;
}

impl<T, S> Reflect for HashSet<T, S> {
    const SHAPE: Shape = Shape::VariableSequence;
}

impl<T> Reflect for BTreeSet<T> {
    const SHAPE: Shape = Shape::VariableSequence;
}

impl<T, const N: usize> Reflect for [T; N] {
    const SHAPE: Shape = Shape::FixedSequence;
}

impl<K, V, S> Reflect for HashMap<K, V, S> {
    const SHAPE: Shape = Shape::Mapping;
}

impl<K, V> Reflect for BTreeMap<K, V> {
    const SHAPE: Shape = Shape::Mapping;
}

impl<T: ?Sized> Reflect for &T {
    const SHAPE: Shape = Shape::Indirection;
}

impl<T: ?Sized> Reflect for &mut T {
    const SHAPE: Shape = Shape::Indirection;
}

impl<T: ?Sized> Reflect for Box<T> {
    const SHAPE: Shape = Shape::Indirection;
}

impl<T: ?Sized> Reflect for Rc<T> {
    const SHAPE: Shape = Shape::Indirection;
}

impl<T: ?Sized> Reflect for Arc<T> {
    const SHAPE: Shape = Shape::Indirection;
}

impl<T> Reflect for Option<T> {
    const SHAPE: Shape = Shape::Indirection;
}

#[cfg(test)]
mod test {
    use std::collections::{BTreeMap, HashSet};

    use strum::IntoEnumIterator;

    use super::{Field, Record, Reflect, Shape, Visibility};

    #[test]
    fn shape_names_are_distinct() {
        let names =
            Shape::iter().map(|shape| shape.to_string()).collect::<HashSet<_>>();

        assert_eq!(names.len(), 9);
        assert!(names.contains("fixed_sequence"));
    }

    #[test]
    fn classification_table() {
        assert_eq!(<String as Reflect>::SHAPE, Shape::String);
        assert_eq!(<&str as Reflect>::SHAPE, Shape::Indirection);
        assert_eq!(<(u8, String) as Reflect>::SHAPE, Shape::Record);
        assert_eq!(<Vec<u8> as Reflect>::SHAPE, Shape::VariableSequence);
        assert_eq!(<HashSet<u8> as Reflect>::SHAPE, Shape::VariableSequence);
        assert_eq!(<[u8; 4] as Reflect>::SHAPE, Shape::FixedSequence);
        assert_eq!(<BTreeMap<u8, u8> as Reflect>::SHAPE, Shape::Mapping);
        assert_eq!(<i16 as Reflect>::SHAPE, Shape::SignedInteger);
        assert_eq!(<usize as Reflect>::SHAPE, Shape::UnsignedInteger);
        assert_eq!(<Option<u8> as Reflect>::SHAPE, Shape::Indirection);
        assert_eq!(<f32 as Reflect>::SHAPE, Shape::Other);
        assert_eq!(<u128 as Reflect>::SHAPE, Shape::Other);
    }

    #[test]
    fn shape_display_is_snake_case() {
        assert_eq!(Shape::VariableSequence.to_string(), "variable_sequence");
        assert_eq!(Shape::Other.to_string(), "other");
    }

    #[test]
    fn tuple_fields_are_positional() {
        assert_eq!(<(u8, i8, bool) as Record>::FIELDS, &[
            Field::new("0", Visibility::Introspectable),
            Field::new("1", Visibility::Introspectable),
            Field::new("2", Visibility::Introspectable),
        ]);
        assert_eq!(<() as Record>::introspectable_fields().count(), 0);
    }
}
