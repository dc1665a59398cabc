//! Contains the definition of [`Config`].

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// The nesting ceiling used by [`Config::default`].
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// The policy applied when an 8-byte wire integer is narrowed into a smaller
/// native integer type.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Narrowing {
    /// Keeps the low bits of the wire value, the way an `as` cast does.
    #[default]
    Truncate,

    /// Fails with [`crate::Error::IntegerOverflow`] if the wire value does
    /// not fit the target type.
    Checked,
}

/// Tunes the behavior of the [`crate::Encoder`] and [`crate::Decoder`].
///
/// None of the options change the wire format of a successfully encoded
/// value except [`Config::sort_map_keys`], which only fixes the otherwise
/// unspecified order of mapping pairs.
///
/// # Example
///
/// ```rust
/// use gensenc::{Config, Narrowing};
///
/// let config = Config::builder()
///     .max_depth(Some(16))
///     .narrowing(Narrowing::Checked)
///     .build();
///
/// assert_eq!(config.max_depth, Some(16));
/// assert!(!config.sort_map_keys);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TypedBuilder,
)]
#[serde(default)]
pub struct Config {
    /// The deepest nesting level a value may reach; `None` disables the
    /// guard.
    #[builder(default = Some(DEFAULT_MAX_DEPTH))]
    pub max_depth: Option<usize>,

    /// Writes mapping pairs ordered by the bytes of their encoded keys
    /// instead of the mapping's iteration order.
    #[builder(default)]
    pub sort_map_keys: bool,

    /// The policy for narrowing wire integers into native integers.
    #[builder(default)]
    pub narrowing: Narrowing,

    /// Makes [`crate::decode_with`] fail if the input has bytes left over
    /// after the frame.
    #[builder(default)]
    pub reject_trailing_bytes: bool,
}

impl Default for Config {
    fn default() -> Self { Self::builder().build() }
}
