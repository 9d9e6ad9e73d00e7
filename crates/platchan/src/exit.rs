use std::fmt;

use platchan_codec::CodecError;
use platchan_messenger::MessengerError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Malformed payloads and values the codec cannot represent are bad input.
pub fn codec_error(context: &str, err: CodecError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn messenger_error(context: &str, err: MessengerError) -> CliError {
    match err {
        MessengerError::Spawn { .. } => CliError::new(INTERNAL, format!("{context}: {err}")),
        MessengerError::QueueClosed(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        MessengerError::Codec(err) => codec_error(context, err),
        MessengerError::InvalidControl(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn json_arg_error(flag: &str, err: serde_json::Error) -> CliError {
    CliError::usage(format!("{flag} is not valid JSON: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_errors_are_data_invalid() {
        let err = codec_error("decode failed", CodecError::UnknownType(99));
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("decode failed: "));
    }

    #[test]
    fn messenger_errors_map_by_kind() {
        assert_eq!(
            messenger_error("x", MessengerError::QueueClosed("q".into())).code,
            FAILURE
        );
        assert_eq!(
            messenger_error("x", MessengerError::Codec(CodecError::EmptyMethodName)).code,
            DATA_INVALID
        );
    }
}
