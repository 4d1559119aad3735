use thiserror::Error;

/// Errors returned by the strict accessors of the store.
///
/// The optional accessors (`get_optional`, `get_float_channel`, ...) never
/// surface these; they collapse `KeyNotFound` and `TypeMismatch` into `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// No entry is stored under the key.
    #[error("no channel stored under key `{0}`")]
    KeyNotFound(String),

    /// The entry exists but holds another element type.
    #[error("type mismatch: requested {expected}, stored {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// An atomic lookup hit an entry that is not a 1 x 1 channel of the requested type.
    #[error("shape mismatch for `{key}`: expected 1 x 1 {expected}, found {num_elements} x {width} {found}")]
    ShapeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
        num_elements: usize,
        width: usize,
    },

    #[error("channel width must be at least 1")]
    InvalidWidth,

    /// A row or column index past the end of the channel.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("channel key must not be empty")]
    EmptyKey,

    /// A flat buffer does not match the declared shape.
    #[error("buffer holds {len} values, expected {num_elements} x {width}")]
    BufferLength {
        len: usize,
        num_elements: usize,
        width: usize,
    },

    /// `num_elements * width` does not fit in `usize`.
    #[error("shape {num_elements} x {width} overflows the addressable length")]
    ShapeOverflow { num_elements: usize, width: usize },

    /// A row view or other borrow of the shared buffer is still alive.
    #[error("channel buffer is already borrowed through another view")]
    BufferBorrowed,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
