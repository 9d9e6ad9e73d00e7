use bytes::Bytes;
use serde_json::{json, Value as Json};

use crate::call::{Envelope, MethodCall};
use crate::codec::MethodCodec;
use crate::error::{CodecError, Result};
use crate::standard::platform_error_from_parts;
use crate::value::Value;

/// Textual method codec compatible with the Dart `JSONMethodCodec`.
///
/// Method calls travel as `{"method": ..., "args": ...}`; success envelopes
/// as a one-element array; error envelopes as `[code, message, details]`
/// with an optional fourth stacktrace element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonMethodCodec;

impl JsonMethodCodec {
    pub const INSTANCE: JsonMethodCodec = JsonMethodCodec;
}

fn to_bytes(json: &Json) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(json)?))
}

impl MethodCodec for JsonMethodCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode_method_call(&self, call: &MethodCall) -> Result<Bytes> {
        to_bytes(&json!({
            "method": call.method(),
            "args": call.args().to_json()?,
        }))
    }

    fn decode_method_call(&self, payload: &[u8]) -> Result<MethodCall> {
        let json: Json = serde_json::from_slice(payload)?;
        let Json::Object(mut object) = json else {
            return Err(CodecError::InvalidMethodCall(
                "expected a JSON object".to_string(),
            ));
        };
        let method = match object.remove("method") {
            Some(Json::String(method)) => method,
            Some(other) => {
                return Err(CodecError::InvalidMethodCall(format!(
                    "method name is {other}, expected string"
                )))
            }
            None => {
                return Err(CodecError::InvalidMethodCall(
                    "missing \"method\" field".to_string(),
                ))
            }
        };
        let args = object.remove("args").map(Value::from).unwrap_or_default();
        MethodCall::new(method, args)
    }

    fn encode_success_envelope(&self, result: &Value) -> Result<Bytes> {
        to_bytes(&Json::Array(vec![result.to_json()?]))
    }

    fn encode_error_envelope(
        &self,
        code: &str,
        message: Option<&str>,
        details: &Value,
    ) -> Result<Bytes> {
        to_bytes(&json!([code, message, details.to_json()?]))
    }

    fn encode_error_envelope_with_stacktrace(
        &self,
        code: &str,
        message: Option<&str>,
        details: &Value,
        stacktrace: &str,
    ) -> Result<Bytes> {
        to_bytes(&json!([code, message, details.to_json()?, stacktrace]))
    }

    fn decode_envelope(&self, payload: &[u8]) -> Result<Envelope> {
        if payload.is_empty() {
            return Err(CodecError::InvalidEnvelope(
                "expected envelope, got nothing".to_string(),
            ));
        }

        let json: Json = serde_json::from_slice(payload)?;
        let Json::Array(items) = json else {
            return Err(CodecError::InvalidEnvelope(
                "expected a JSON array".to_string(),
            ));
        };

        let mut fields = items.into_iter().map(Value::from);
        match fields.len() {
            1 => Ok(Envelope::Success(fields.next().unwrap_or_default())),
            3 | 4 => {
                let code = fields.next().unwrap_or_default();
                let message = fields.next().unwrap_or_default();
                let details = fields.next().unwrap_or_default();
                let stacktrace = fields.next().unwrap_or_default();
                platform_error_from_parts(code, message, details, stacktrace)
                    .map(Envelope::Error)
                    .ok_or_else(|| {
                        CodecError::InvalidEnvelope("malformed error envelope".to_string())
                    })
            }
            n => Err(CodecError::InvalidEnvelope(format!(
                "unexpected envelope length {n}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JsonMethodCodec {
        JsonMethodCodec::INSTANCE
    }

    #[test]
    fn method_call_roundtrip() {
        let args = Value::List(vec![
            Value::I64(3),
            Value::map([
                ("obscureText", Value::Bool(false)),
                ("label", Value::from("Go")),
                ("inputType", Value::map([("signed", Value::Null), ("name", Value::from("x"))])),
                ("big", Value::I64(5_000_000_000)),
            ]),
        ]);
        let call = MethodCall::new("TextInput.setClient", args).unwrap();
        let bytes = codec().encode_method_call(&call).unwrap();
        assert_eq!(codec().decode_method_call(&bytes).unwrap(), call);
    }

    #[test]
    fn map_keys_keep_insertion_order_on_the_wire() {
        let call = MethodCall::new("m", Value::map([("zeta", 1), ("alpha", 2)])).unwrap();
        let bytes = codec().encode_method_call(&call).unwrap();
        assert_eq!(
            bytes.as_ref(),
            br#"{"method":"m","args":{"zeta":1,"alpha":2}}"#
        );
        let decoded = codec().decode_method_call(&bytes).unwrap();
        assert_eq!(decoded, call);
    }

    #[test]
    fn method_call_wire_layout() {
        let call = MethodCall::new("TextInput.show", Value::Null).unwrap();
        let bytes = codec().encode_method_call(&call).unwrap();
        let json: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, json!({"method": "TextInput.show", "args": null}));
    }

    #[test]
    fn missing_args_decode_as_null() {
        let call = codec()
            .decode_method_call(br#"{"method":"TextInput.hide"}"#)
            .unwrap();
        assert_eq!(call.method(), "TextInput.hide");
        assert!(call.args().is_null());
    }

    #[test]
    fn non_object_method_call_rejected() {
        let err = codec().decode_method_call(b"[1,2]").unwrap_err();
        assert!(matches!(err, CodecError::InvalidMethodCall(_)));
    }

    #[test]
    fn malformed_json_is_format_error() {
        let err = codec().decode_method_call(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn success_envelope_roundtrip() {
        let value = Value::map([("ok", Value::Bool(true))]);
        let bytes = codec().encode_success_envelope(&value).unwrap();
        assert_eq!(bytes.as_ref(), br#"[{"ok":true}]"#);
        assert_eq!(
            codec().decode_envelope(&bytes).unwrap(),
            Envelope::Success(value)
        );
    }

    #[test]
    fn error_envelope_roundtrip() {
        let details = Value::map([("field", "text")]);
        let bytes = codec()
            .encode_error_envelope("error", Some("bad state"), &details)
            .unwrap();
        let err = codec().decode_envelope(&bytes).unwrap().into_result().unwrap_err();
        assert_eq!(err.code, "error");
        assert_eq!(err.message.as_deref(), Some("bad state"));
        assert_eq!(err.details, details);
    }

    #[test]
    fn error_envelope_with_stacktrace_roundtrip() {
        let bytes = codec()
            .encode_error_envelope_with_stacktrace("error", None, &Value::Null, "trace")
            .unwrap();
        let err = codec().decode_envelope(&bytes).unwrap().into_result().unwrap_err();
        assert_eq!(err.stacktrace.as_deref(), Some("trace"));
        assert!(err.message.is_none());
    }

    #[test]
    fn two_element_envelope_rejected() {
        let err = codec().decode_envelope(b"[1,2]").unwrap_err();
        assert!(matches!(err, CodecError::InvalidEnvelope(_)));
    }

    #[test]
    fn non_string_code_rejected() {
        assert!(codec().decode_envelope(b"[1,null,null]").is_err());
    }

    #[test]
    fn non_string_map_keys_fail_to_encode() {
        let value = Value::Map(vec![(Value::I32(1), Value::Null)]);
        let err = codec().encode_success_envelope(&value).unwrap_err();
        assert!(matches!(err, CodecError::Unrepresentable { .. }));
    }
}
