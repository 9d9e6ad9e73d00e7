/// Errors that can occur while encoding or decoding channel payloads.
///
/// These are format errors: the bytes (or value) do not fit the codec.
/// Application-level failures travel inside an error envelope instead.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The buffer ended before a complete value was read.
    #[error("unexpected end of message (needed {needed} bytes, {remaining} remaining)")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// An unknown type discriminant was found in a standard-codec payload.
    #[error("unknown value type 0x{0:02x}")]
    UnknownType(u8),

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 string: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A method call was malformed (wrong shape, trailing bytes, non-string name).
    #[error("invalid method call: {0}")]
    InvalidMethodCall(String),

    /// An envelope was malformed.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Method names must be non-empty.
    #[error("method name must not be empty")]
    EmptyMethodName,

    /// The value cannot be represented by this codec.
    #[error("value not representable by {codec} codec: {reason}")]
    Unrepresentable { codec: &'static str, reason: String },

    /// Lists and maps are nested deeper than the decoder accepts.
    #[error("value nesting exceeds {max} levels")]
    NestingTooDeep { max: usize },

    /// A size field exceeds what the wire format can carry.
    #[error("payload too large ({size} bytes, max {max})")]
    TooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
