use std::fmt;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use platchan_codec::{MethodCodec, PlatformError, Value};
use platchan_messenger::BinaryReply;
use tracing::{debug, error, warn};

/// Failure returned by a method call handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return type of [`MethodCallHandler`](crate::MethodCallHandler).
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Outcome of an outgoing method call, delivered exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error(PlatformError),
    /// The remote side had no handler, or the handler declined the method.
    NotImplemented,
}

impl MethodResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented)
    }

    /// The error, if the remote side reported one.
    pub fn error(&self) -> Option<&PlatformError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }

    /// The success value, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Reply slot shared between a [`MethodResult`] and the dispatch wrapper.
///
/// Whoever takes the reply first answers; the other side finds it empty.
/// When the last holder goes away with the reply still inside, the reply
/// handle's own drop sends the "no reply" sentinel.
pub(crate) type ReplySlot = Arc<Mutex<Option<BinaryReply>>>;

pub(crate) fn take_reply(slot: &ReplySlot) -> Option<BinaryReply> {
    slot.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

/// Single-use sink for answering one incoming method call.
///
/// Every terminal method consumes the sink. A handler may answer before
/// returning, or move the sink elsewhere and answer later from any thread.
/// Dropping it unanswered releases the caller with "not implemented".
pub struct MethodResult {
    channel: Arc<str>,
    method: String,
    codec: Arc<dyn MethodCodec>,
    slot: ReplySlot,
}

impl MethodResult {
    pub(crate) fn new(
        channel: Arc<str>,
        method: String,
        codec: Arc<dyn MethodCodec>,
        slot: ReplySlot,
    ) -> Self {
        Self {
            channel,
            method,
            codec,
            slot,
        }
    }

    /// Sink for a call that did not arrive through a channel, such as one
    /// synthesized by integration code. Answers go to `reply`.
    pub fn from_reply(
        channel: &str,
        method: &str,
        codec: Arc<dyn MethodCodec>,
        reply: BinaryReply,
    ) -> Self {
        Self::new(
            Arc::from(channel),
            method.to_string(),
            codec,
            Arc::new(Mutex::new(Some(reply))),
        )
    }

    /// Channel the call arrived on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Method being answered.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Answer with a success envelope.
    pub fn success(self, result: impl Into<Value>) {
        let result = result.into();
        let payload = match self.codec.encode_success_envelope(&result) {
            Ok(payload) => payload,
            Err(err) => {
                error!(
                    channel = %self.channel,
                    method = %self.method,
                    codec = self.codec.name(),
                    error = %err,
                    "failed to encode success envelope"
                );
                match self
                    .codec
                    .encode_error_envelope("error", Some(err.to_string().as_str()), &Value::Null)
                {
                    Ok(payload) => payload,
                    Err(_) => return self.send(None),
                }
            }
        };
        self.send(Some(payload));
    }

    /// Answer with an error envelope.
    pub fn error(self, code: &str, message: Option<&str>, details: impl Into<Value>) {
        let details = details.into();
        match self.codec.encode_error_envelope(code, message, &details) {
            Ok(payload) => self.send(Some(payload)),
            Err(err) => {
                error!(
                    channel = %self.channel,
                    method = %self.method,
                    error = %err,
                    "failed to encode error envelope"
                );
                self.send(None);
            }
        }
    }

    /// Answer "not implemented".
    pub fn not_implemented(self) {
        debug!(channel = %self.channel, method = %self.method, "method not implemented");
        self.send(None);
    }

    fn send(self, payload: Option<Bytes>) {
        match take_reply(&self.slot) {
            Some(reply) => reply.reply(payload),
            None => warn!(
                channel = %self.channel,
                method = %self.method,
                "call already answered; ignoring second answer"
            ),
        }
    }
}

impl fmt::Debug for MethodResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodResult")
            .field("channel", &self.channel)
            .field("method", &self.method)
            .field("codec", &self.codec.name())
            .finish()
    }
}
