/// Violations of the [`TextEditState`](crate::TextEditState) invariants.
///
/// Offsets are UTF-16 code units; `-1` means "unset".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextEditStateError {
    #[error("invalid selection: ({start}, {end})")]
    InvalidSelection { start: i64, end: i64 },

    #[error("invalid composing range: ({start}, {end})")]
    InvalidComposingRange { start: i64, end: i64 },

    #[error("invalid composing end: {end} (text length {len})")]
    ComposingOutOfBounds { end: i64, len: i64 },

    #[error("invalid selection start: {start} (text length {len})")]
    SelectionStartOutOfBounds { start: i64, len: i64 },

    #[error("invalid selection end: {end} (text length {len})")]
    SelectionEndOutOfBounds { end: i64, len: i64 },
}

/// Errors decoding the arguments of a system channel method call.
#[derive(Debug, thiserror::Error)]
pub enum ArgumentError {
    /// A required argument is absent.
    #[error("missing argument: {0}")]
    Missing(&'static str),

    /// An argument has the wrong shape.
    #[error("argument {field} must be {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    /// Structured arguments did not match the expected JSON layout.
    #[error("invalid arguments: {0}")]
    Json(#[from] serde_json::Error),

    /// Arguments could not be viewed as JSON.
    #[error("invalid arguments: {0}")]
    Codec(#[from] platchan_codec::CodecError),

    #[error(transparent)]
    TextEditState(#[from] TextEditStateError),
}

pub type Result<T> = std::result::Result<T, ArgumentError>;
