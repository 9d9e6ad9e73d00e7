use bytes::{BufMut, Bytes, BytesMut};

use crate::call::{Envelope, MethodCall, PlatformError};
use crate::codec::MethodCodec;
use crate::error::{CodecError, Result};
use crate::value::Value;

const NULL: u8 = 0;
const TRUE: u8 = 1;
const FALSE: u8 = 2;
const INT32: u8 = 3;
const INT64: u8 = 4;
const LARGE_INT: u8 = 5;
const FLOAT64: u8 = 6;
const STRING: u8 = 7;
const UINT8_LIST: u8 = 8;
const INT32_LIST: u8 = 9;
const INT64_LIST: u8 = 10;
const FLOAT64_LIST: u8 = 11;
const LIST: u8 = 12;
const MAP: u8 = 13;
const FLOAT32_LIST: u8 = 14;

const ENVELOPE_SUCCESS: u8 = 0;
const ENVELOPE_ERROR: u8 = 1;

/// Sizes below this fit in the marker byte itself.
const SIZE_U16_MARKER: u8 = 254;
const SIZE_U32_MARKER: u8 = 255;

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Deepest list/map nesting accepted when decoding.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Binary method codec compatible with the Dart `StandardMethodCodec`.
///
/// Wire format, per value:
/// ```text
/// ┌───────────┬──────────────────┬───────────────┬───────────────┐
/// │ Type (1B) │ Size (1/3/5B)    │ Align padding │ Body (LE)     │
/// │           │ lists/strings    │ typed data    │               │
/// └───────────┴──────────────────┴───────────────┴───────────────┘
/// ```
/// Sizes below 254 take one byte; `254` prefixes a u16 and `255` a u32.
/// Float64 scalars and typed lists are aligned to their element width,
/// measured from the start of the message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardMethodCodec;

impl StandardMethodCodec {
    pub const INSTANCE: StandardMethodCodec = StandardMethodCodec;
}

/// Append one value in standard-codec encoding.
pub fn write_value(dst: &mut BytesMut, value: &Value) -> Result<()> {
    match value {
        Value::Null => dst.put_u8(NULL),
        Value::Bool(true) => dst.put_u8(TRUE),
        Value::Bool(false) => dst.put_u8(FALSE),
        Value::I32(v) => {
            dst.put_u8(INT32);
            dst.put_i32_le(*v);
        }
        Value::I64(v) => match i32::try_from(*v) {
            Ok(small) => {
                dst.put_u8(INT32);
                dst.put_i32_le(small);
            }
            Err(_) => {
                dst.put_u8(INT64);
                dst.put_i64_le(*v);
            }
        },
        Value::F64(v) => {
            dst.put_u8(FLOAT64);
            write_alignment(dst, 8);
            dst.put_f64_le(*v);
        }
        Value::String(s) => {
            dst.put_u8(STRING);
            write_size(dst, s.len())?;
            dst.put_slice(s.as_bytes());
        }
        Value::U8List(items) => {
            dst.put_u8(UINT8_LIST);
            write_size(dst, items.len())?;
            dst.put_slice(items);
        }
        Value::I32List(items) => {
            dst.put_u8(INT32_LIST);
            write_size(dst, items.len())?;
            write_alignment(dst, 4);
            items.iter().for_each(|v| dst.put_i32_le(*v));
        }
        Value::I64List(items) => {
            dst.put_u8(INT64_LIST);
            write_size(dst, items.len())?;
            write_alignment(dst, 8);
            items.iter().for_each(|v| dst.put_i64_le(*v));
        }
        Value::F32List(items) => {
            dst.put_u8(FLOAT32_LIST);
            write_size(dst, items.len())?;
            write_alignment(dst, 4);
            items.iter().for_each(|v| dst.put_f32_le(*v));
        }
        Value::F64List(items) => {
            dst.put_u8(FLOAT64_LIST);
            write_size(dst, items.len())?;
            write_alignment(dst, 8);
            items.iter().for_each(|v| dst.put_f64_le(*v));
        }
        Value::List(items) => {
            dst.put_u8(LIST);
            write_size(dst, items.len())?;
            for item in items {
                write_value(dst, item)?;
            }
        }
        Value::Map(entries) => {
            dst.put_u8(MAP);
            write_size(dst, entries.len())?;
            for (key, value) in entries {
                write_value(dst, key)?;
                write_value(dst, value)?;
            }
        }
    }
    Ok(())
}

fn write_size(dst: &mut BytesMut, size: usize) -> Result<()> {
    if size < usize::from(SIZE_U16_MARKER) {
        dst.put_u8(size as u8);
    } else if size <= usize::from(u16::MAX) {
        dst.put_u8(SIZE_U16_MARKER);
        dst.put_u16_le(size as u16);
    } else if size <= u32::MAX as usize {
        dst.put_u8(SIZE_U32_MARKER);
        dst.put_u32_le(size as u32);
    } else {
        return Err(CodecError::TooLarge {
            size,
            max: u32::MAX as usize,
        });
    }
    Ok(())
}

fn write_alignment(dst: &mut BytesMut, alignment: usize) {
    let rem = dst.len() % alignment;
    if rem != 0 {
        dst.put_bytes(0, alignment - rem);
    }
}

/// Cursor over a standard-codec payload.
///
/// Tracks the absolute position so alignment padding matches the writer.
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> ReadBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.pos % alignment;
        if rem != 0 {
            self.take(alignment - rem)?;
        }
        Ok(())
    }

    fn get_size(&mut self) -> Result<usize> {
        match self.get_u8()? {
            SIZE_U16_MARKER => Ok(usize::from(u16::from_le_bytes(self.take_array()?))),
            SIZE_U32_MARKER => Ok(u32::from_le_bytes(self.take_array()?) as usize),
            small => Ok(usize::from(small)),
        }
    }

    fn get_typed<const N: usize, T>(
        &mut self,
        count: usize,
        convert: impl Fn([u8; N]) -> T,
    ) -> Result<Vec<T>> {
        self.align(N)?;
        let byte_len = count.checked_mul(N).ok_or(CodecError::TooLarge {
            size: count,
            max: usize::MAX / N,
        })?;
        let bytes = self.take(byte_len)?;
        Ok(bytes
            .chunks_exact(N)
            .map(|chunk| {
                let mut raw = [0u8; N];
                raw.copy_from_slice(chunk);
                convert(raw)
            })
            .collect())
    }

    fn get_string(&mut self) -> Result<String> {
        let len = self.get_size()?;
        let bytes = self.take(len)?;
        Ok(std::str::from_utf8(bytes)?.to_string())
    }

    /// Run `read` one container level deeper, failing past
    /// [`MAX_NESTING_DEPTH`].
    fn nested<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        self.depth += 1;
        let out = read(self);
        self.depth -= 1;
        out
    }

    /// Read the next value.
    pub fn read_value(&mut self) -> Result<Value> {
        let type_byte = self.get_u8()?;
        self.read_value_of_type(type_byte)
    }

    fn read_value_of_type(&mut self, type_byte: u8) -> Result<Value> {
        Ok(match type_byte {
            NULL => Value::Null,
            TRUE => Value::Bool(true),
            FALSE => Value::Bool(false),
            INT32 => Value::I32(i32::from_le_bytes(self.take_array()?)),
            INT64 => Value::I64(i64::from_le_bytes(self.take_array()?)),
            LARGE_INT => {
                let hex = self.get_string()?;
                let parsed = i64::from_str_radix(&hex, 16).map_err(|_| {
                    CodecError::Unrepresentable {
                        codec: "standard",
                        reason: format!("large integer {hex} exceeds 64 bits"),
                    }
                })?;
                Value::I64(parsed)
            }
            FLOAT64 => {
                self.align(8)?;
                Value::F64(f64::from_le_bytes(self.take_array()?))
            }
            STRING => Value::String(self.get_string()?),
            UINT8_LIST => {
                let len = self.get_size()?;
                Value::U8List(self.take(len)?.to_vec())
            }
            INT32_LIST => {
                let count = self.get_size()?;
                Value::I32List(self.get_typed(count, i32::from_le_bytes)?)
            }
            INT64_LIST => {
                let count = self.get_size()?;
                Value::I64List(self.get_typed(count, i64::from_le_bytes)?)
            }
            FLOAT32_LIST => {
                let count = self.get_size()?;
                Value::F32List(self.get_typed(count, f32::from_le_bytes)?)
            }
            FLOAT64_LIST => {
                let count = self.get_size()?;
                Value::F64List(self.get_typed(count, f64::from_le_bytes)?)
            }
            LIST => self.nested(|buf| {
                let count = buf.get_size()?;
                // Every element takes at least one byte; bound the allocation.
                let mut items = Vec::with_capacity(count.min(buf.remaining()));
                for _ in 0..count {
                    items.push(buf.read_value()?);
                }
                Ok(Value::List(items))
            })?,
            MAP => self.nested(|buf| {
                let count = buf.get_size()?;
                let mut entries = Vec::with_capacity(count.min(buf.remaining() / 2));
                for _ in 0..count {
                    let key = buf.read_value()?;
                    let value = buf.read_value()?;
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            })?,
            other => return Err(CodecError::UnknownType(other)),
        })
    }
}

fn new_buffer() -> BytesMut {
    BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY)
}

impl MethodCodec for StandardMethodCodec {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn encode_method_call(&self, call: &MethodCall) -> Result<Bytes> {
        let mut buf = new_buffer();
        write_value(&mut buf, &Value::String(call.method().to_string()))?;
        write_value(&mut buf, call.args())?;
        Ok(buf.freeze())
    }

    fn decode_method_call(&self, payload: &[u8]) -> Result<MethodCall> {
        let mut buf = ReadBuffer::new(payload);
        let method = match buf.read_value()? {
            Value::String(method) => method,
            other => {
                return Err(CodecError::InvalidMethodCall(format!(
                    "method name is {}, expected string",
                    other.type_name()
                )))
            }
        };
        let args = buf.read_value()?;
        if buf.has_remaining() {
            return Err(CodecError::InvalidMethodCall(
                "trailing bytes after arguments".to_string(),
            ));
        }
        MethodCall::new(method, args)
    }

    fn encode_success_envelope(&self, result: &Value) -> Result<Bytes> {
        let mut buf = new_buffer();
        buf.put_u8(ENVELOPE_SUCCESS);
        write_value(&mut buf, result)?;
        Ok(buf.freeze())
    }

    fn encode_error_envelope(
        &self,
        code: &str,
        message: Option<&str>,
        details: &Value,
    ) -> Result<Bytes> {
        let mut buf = new_buffer();
        write_error_fields(&mut buf, code, message, details)?;
        Ok(buf.freeze())
    }

    fn encode_error_envelope_with_stacktrace(
        &self,
        code: &str,
        message: Option<&str>,
        details: &Value,
        stacktrace: &str,
    ) -> Result<Bytes> {
        let mut buf = new_buffer();
        write_error_fields(&mut buf, code, message, details)?;
        write_value(&mut buf, &Value::String(stacktrace.to_string()))?;
        Ok(buf.freeze())
    }

    fn decode_envelope(&self, payload: &[u8]) -> Result<Envelope> {
        if payload.is_empty() {
            return Err(CodecError::InvalidEnvelope(
                "expected envelope, got nothing".to_string(),
            ));
        }

        let mut buf = ReadBuffer::new(payload);
        match buf.get_u8()? {
            ENVELOPE_SUCCESS => {
                let result = buf.read_value()?;
                if !buf.has_remaining() {
                    return Ok(Envelope::Success(result));
                }
            }
            ENVELOPE_ERROR => {
                let code = buf.read_value()?;
                let message = buf.read_value()?;
                let details = buf.read_value()?;
                let stacktrace = if buf.has_remaining() {
                    buf.read_value()?
                } else {
                    Value::Null
                };
                if !buf.has_remaining() {
                    if let Some(err) = platform_error_from_parts(code, message, details, stacktrace)
                    {
                        return Ok(Envelope::Error(err));
                    }
                }
            }
            _ => {}
        }

        Err(CodecError::InvalidEnvelope(
            "unrecognized envelope layout".to_string(),
        ))
    }
}

fn write_error_fields(
    buf: &mut BytesMut,
    code: &str,
    message: Option<&str>,
    details: &Value,
) -> Result<()> {
    buf.put_u8(ENVELOPE_ERROR);
    write_value(buf, &Value::String(code.to_string()))?;
    write_value(buf, &Value::from(message))?;
    write_value(buf, details)
}

/// Validate decoded error fields; `None` when the shapes are wrong.
pub(crate) fn platform_error_from_parts(
    code: Value,
    message: Value,
    details: Value,
    stacktrace: Value,
) -> Option<PlatformError> {
    let code = match code {
        Value::String(code) => code,
        _ => return None,
    };
    let message = match message {
        Value::Null => None,
        Value::String(message) => Some(message),
        _ => return None,
    };
    let stacktrace = match stacktrace {
        Value::Null => None,
        Value::String(trace) => Some(trace),
        _ => return None,
    };
    Some(PlatformError {
        code,
        message,
        details,
        stacktrace,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> StandardMethodCodec {
        StandardMethodCodec::INSTANCE
    }

    fn sample_args() -> Value {
        Value::map([
            ("null", Value::Null),
            ("flag", Value::Bool(true)),
            ("small", Value::I32(-7)),
            ("big", Value::I64(1 << 40)),
            ("ratio", Value::F64(0.25)),
            ("bytes", Value::U8List(vec![1, 2, 3])),
            ("ints", Value::I32List(vec![1, -2, 3])),
            ("longs", Value::I64List(vec![i64::MIN, i64::MAX])),
            ("floats", Value::F32List(vec![1.5, -2.5])),
            ("doubles", Value::F64List(vec![3.125])),
            (
                "nested",
                Value::List(vec![Value::from("x"), Value::Map(vec![(Value::I32(1), Value::Null)])]),
            ),
        ])
    }

    #[test]
    fn method_call_roundtrip() {
        let call = MethodCall::new("TextInput.setClient", sample_args()).unwrap();
        let bytes = codec().encode_method_call(&call).unwrap();
        let decoded = codec().decode_method_call(&bytes).unwrap();
        assert_eq!(decoded, call);

        let unsorted = Value::map([
            ("zeta", Value::I64(1)),
            ("alpha", Value::I64(-2)),
            ("mid", Value::map([("y", Value::I64(i64::from(i32::MAX))), ("b", Value::Null)])),
        ]);
        let call = MethodCall::new("m", unsorted).unwrap();
        let bytes = codec().encode_method_call(&call).unwrap();
        let decoded = codec().decode_method_call(&bytes).unwrap();
        assert_eq!(decoded, call);
        match decoded.args() {
            Value::Map(entries) => {
                let keys: Vec<_> = entries.iter().filter_map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, ["zeta", "alpha", "mid"]);
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn method_call_wire_layout() {
        let call = MethodCall::new("hi", Value::Null).unwrap();
        let bytes = codec().encode_method_call(&call).unwrap();
        assert_eq!(bytes.as_ref(), &[STRING, 2, b'h', b'i', NULL]);
    }

    #[test]
    fn small_int64_is_written_as_int32() {
        let bytes = codec()
            .encode_success_envelope(&Value::I64(1))
            .unwrap();
        assert_eq!(bytes.as_ref(), &[ENVELOPE_SUCCESS, INT32, 1, 0, 0, 0]);
    }

    #[test]
    fn float64_is_aligned_to_eight_bytes() {
        let bytes = codec()
            .encode_success_envelope(&Value::F64(1.0))
            .unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[1], FLOAT64);
        assert!(bytes[2..8].iter().all(|b| *b == 0));
        assert_eq!(&bytes[8..], &1.0f64.to_le_bytes());
    }

    #[test]
    fn medium_size_uses_u16_marker() {
        let text = "a".repeat(300);
        let bytes = codec()
            .encode_success_envelope(&Value::String(text.clone()))
            .unwrap();
        assert_eq!(&bytes[..4], &[ENVELOPE_SUCCESS, STRING, SIZE_U16_MARKER, 0x2c]);
        assert_eq!(bytes[4], 0x01);
        let decoded = codec().decode_envelope(&bytes).unwrap();
        assert_eq!(decoded, Envelope::Success(Value::String(text)));
    }

    #[test]
    fn success_envelope_roundtrip() {
        let value = sample_args();
        let bytes = codec().encode_success_envelope(&value).unwrap();
        assert_eq!(
            codec().decode_envelope(&bytes).unwrap(),
            Envelope::Success(value)
        );
    }

    #[test]
    fn error_envelope_roundtrip() {
        let details = Value::List(vec![Value::I32(1)]);
        let bytes = codec()
            .encode_error_envelope("E_CURSOR", Some("no cursor"), &details)
            .unwrap();
        let err = codec().decode_envelope(&bytes).unwrap().into_result().unwrap_err();
        assert_eq!(err.code, "E_CURSOR");
        assert_eq!(err.message.as_deref(), Some("no cursor"));
        assert_eq!(err.details, details);
        assert!(err.stacktrace.is_none());
    }

    #[test]
    fn error_envelope_with_stacktrace_roundtrip() {
        let bytes = codec()
            .encode_error_envelope_with_stacktrace("error", None, &Value::Null, "at main")
            .unwrap();
        let err = codec().decode_envelope(&bytes).unwrap().into_result().unwrap_err();
        assert_eq!(err.code, "error");
        assert!(err.message.is_none());
        assert_eq!(err.stacktrace.as_deref(), Some("at main"));
    }

    #[test]
    fn empty_envelope_is_format_error() {
        let err = codec().decode_envelope(&[]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEnvelope(_)));
    }

    #[test]
    fn unknown_envelope_flag_is_format_error() {
        let err = codec().decode_envelope(&[2, NULL]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEnvelope(_)));
    }

    #[test]
    fn error_envelope_with_non_string_code_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u8(ENVELOPE_ERROR);
        write_value(&mut buf, &Value::I32(5)).unwrap();
        write_value(&mut buf, &Value::Null).unwrap();
        write_value(&mut buf, &Value::Null).unwrap();
        assert!(codec().decode_envelope(&buf).is_err());
    }

    #[test]
    fn trailing_bytes_in_method_call_rejected() {
        let err = codec()
            .decode_method_call(&[STRING, 1, b'm', NULL, NULL])
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidMethodCall(_)));
    }

    #[test]
    fn non_string_method_name_rejected() {
        let err = codec().decode_method_call(&[INT32, 1, 0, 0, 0, NULL]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidMethodCall(_)));
    }

    #[test]
    fn truncated_payload_is_eof() {
        let err = codec().decode_method_call(&[STRING, 5, b'a']).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { .. }));
    }

    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut payload = vec![ENVELOPE_SUCCESS];
        for _ in 0..depth {
            payload.extend_from_slice(&[LIST, 1]);
        }
        payload.push(NULL);
        payload
    }

    #[test]
    fn deep_nesting_is_format_error() {
        let err = codec().decode_envelope(&nested_lists(200_000)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::NestingTooDeep {
                max: MAX_NESTING_DEPTH
            }
        ));
    }

    #[test]
    fn nesting_up_to_limit_decodes() {
        let envelope = codec()
            .decode_envelope(&nested_lists(MAX_NESTING_DEPTH))
            .expect("nesting at the limit should decode");
        let mut value = envelope.into_result().expect("should be a success envelope");
        for _ in 0..MAX_NESTING_DEPTH {
            value = match value {
                Value::List(mut items) => items.pop().expect("list should hold one item"),
                other => panic!("expected list, got {other:?}"),
            };
        }
        assert_eq!(value, Value::Null);

        assert!(codec()
            .decode_envelope(&nested_lists(MAX_NESTING_DEPTH + 1))
            .is_err());
    }

    #[test]
    fn unknown_type_rejected() {
        let err = codec().decode_envelope(&[ENVELOPE_SUCCESS, 99]).unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(99)));
    }

    #[test]
    fn large_int_decodes_from_hex() {
        let mut buf = BytesMut::new();
        buf.put_u8(ENVELOPE_SUCCESS);
        buf.put_u8(LARGE_INT);
        buf.put_u8(2);
        buf.put_slice(b"ff");
        assert_eq!(
            codec().decode_envelope(&buf).unwrap(),
            Envelope::Success(Value::I64(255))
        );
    }
}
