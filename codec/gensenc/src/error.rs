//! Contains the definition of [`Error`].

use std::io;

/// The error raised while encoding or decoding a value.
///
/// The first error found anywhere in the traversal aborts the whole call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The decode target, or a part of it, cannot be written through.
    ///
    /// Raised by shared references and by shared `Rc`/`Arc` pointers that
    /// are not uniquely owned. No bytes are consumed for the target.
    #[error("cannot set a value through a read-only target")]
    CannotSet,

    /// The input ended before the frame being decoded was complete.
    #[error("unexpected end of stream")]
    EndOfStream,

    /// An `Option` indirection was `None`; there is no pointee to encode or
    /// decode into.
    #[error("encountered an absent indirection")]
    AbsentIndirection,

    /// The value nests deeper than the configured ceiling.
    #[error("value nests deeper than the limit of {limit} levels")]
    TooDeeplyNested {
        /// The configured ceiling that was exceeded.
        limit: usize,
    },

    /// A string frame does not hold valid UTF-8.
    #[error("string frame is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A `char` frame does not hold a valid Unicode scalar value.
    #[error("`{0:#x}` is not a valid unicode scalar value")]
    InvalidChar(u32),

    /// A wire integer does not fit the target's width under checked
    /// narrowing.
    #[error("integer `{value}` does not fit into `{target}`")]
    IntegerOverflow {
        /// The 8-byte wire value.
        value: i128,

        /// The name of the target integer type.
        target: &'static str,
    },

    /// A length prefix does not fit into `usize` on this platform.
    #[error("length prefix `{0}` does not fit into `usize`")]
    LengthOverflow(u64),

    /// The decoded frame did not consume the whole input.
    #[error("{remaining} trailing bytes left after the decoded frame")]
    TrailingBytes {
        /// The number of unread bytes.
        remaining: usize,
    },

    /// The underlying byte stream failed.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::EndOfStream
        } else {
            Self::Io(error)
        }
    }
}
