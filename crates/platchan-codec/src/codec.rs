use bytes::Bytes;

use crate::call::{Envelope, MethodCall};
use crate::error::Result;
use crate::value::Value;

/// Bidirectional transform between method calls/replies and binary payloads.
///
/// Implementations are stateless and shared freely across channels and
/// threads. Decoding malformed bytes is a [`CodecError`](crate::CodecError);
/// an application error arrives as [`Envelope::Error`].
pub trait MethodCodec: Send + Sync {
    /// Short name used in logs ("standard", "json").
    fn name(&self) -> &'static str;

    fn encode_method_call(&self, call: &MethodCall) -> Result<Bytes>;

    fn decode_method_call(&self, payload: &[u8]) -> Result<MethodCall>;

    fn encode_success_envelope(&self, result: &Value) -> Result<Bytes>;

    fn encode_error_envelope(
        &self,
        code: &str,
        message: Option<&str>,
        details: &Value,
    ) -> Result<Bytes>;

    fn encode_error_envelope_with_stacktrace(
        &self,
        code: &str,
        message: Option<&str>,
        details: &Value,
        stacktrace: &str,
    ) -> Result<Bytes>;

    fn decode_envelope(&self, payload: &[u8]) -> Result<Envelope>;
}
