use std::fmt;

use crate::error::{CodecError, Result};
use crate::value::Value;

/// A method name plus its arguments: the unit exchanged over a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    method: String,
    args: Value,
}

impl MethodCall {
    /// Create a method call. The method name must be non-empty.
    pub fn new(method: impl Into<String>, args: impl Into<Value>) -> Result<Self> {
        let method = method.into();
        if method.is_empty() {
            return Err(CodecError::EmptyMethodName);
        }
        Ok(Self {
            method,
            args: args.into(),
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &Value {
        &self.args
    }

    /// Look up a string key when the arguments are a map.
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.method, self.args)
    }
}

/// An application-level error reported by the remote handler.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformError {
    pub code: String,
    pub message: Option<String>,
    pub details: Value,
    pub stacktrace: Option<String>,
}

impl PlatformError {
    pub fn new(code: impl Into<String>, message: Option<String>, details: Value) -> Self {
        Self {
            code: code.into(),
            message,
            details,
            stacktrace: None,
        }
    }

    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.code, message),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for PlatformError {}

/// A decoded reply.
///
/// The "not implemented" outcome is not an envelope: it is signalled by an
/// empty reply at the messenger level.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Error(PlatformError),
}

impl Envelope {
    pub fn into_result(self) -> std::result::Result<Value, PlatformError> {
        match self {
            Envelope::Success(value) => Ok(value),
            Envelope::Error(err) => Err(err),
        }
    }
}
