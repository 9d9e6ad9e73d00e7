use crate::error::{CodecError, Result};

/// A value that can travel through a platform channel.
///
/// Mirrors the types the Dart side's standard message codec understands.
/// Maps keep insertion order and allow any key type; the JSON codec only
/// accepts string keys.
///
/// `I32` and `I64` compare by numeric value: codecs pick the narrowest
/// integer width on the wire, so width is not part of a value's identity.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    String(String),
    U8List(Vec<u8>),
    I32List(Vec<i32>),
    I64List(Vec<i64>),
    F32List(Vec<f32>),
    F64List(Vec<f64>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Build a string-keyed map, preserving the given order.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Value::String(k.into()), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of `I32` and `I64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            Value::I32(v) => Some(f64::from(*v)),
            Value::I64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a string key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "int32",
            Value::I64(_) => "int64",
            Value::F64(_) => "float64",
            Value::String(_) => "string",
            Value::U8List(_) => "Uint8List",
            Value::I32List(_) => "Int32List",
            Value::I64List(_) => "Int64List",
            Value::F32List(_) => "Float32List",
            Value::F64List(_) => "Float64List",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Convert to a JSON value.
    ///
    /// Typed lists become arrays. Fails for non-string map keys and
    /// non-finite floats, which JSON cannot carry.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::I32(v) => Json::from(*v),
            Value::I64(v) => Json::from(*v),
            Value::F64(v) => json_float(*v)?,
            Value::String(s) => Json::String(s.clone()),
            Value::U8List(items) => Json::Array(items.iter().map(|v| Json::from(*v)).collect()),
            Value::I32List(items) => Json::Array(items.iter().map(|v| Json::from(*v)).collect()),
            Value::I64List(items) => Json::Array(items.iter().map(|v| Json::from(*v)).collect()),
            Value::F32List(items) => Json::Array(
                items
                    .iter()
                    .map(|v| json_float(f64::from(*v)))
                    .collect::<Result<_>>()?,
            ),
            Value::F64List(items) => Json::Array(
                items
                    .iter()
                    .map(|v| json_float(*v))
                    .collect::<Result<_>>()?,
            ),
            Value::List(items) => {
                Json::Array(items.iter().map(Value::to_json).collect::<Result<_>>()?)
            }
            Value::Map(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = key.as_str().ok_or_else(|| CodecError::Unrepresentable {
                        codec: "json",
                        reason: format!("map key of type {} is not a string", key.type_name()),
                    })?;
                    map.insert(key.to_string(), value.to_json()?);
                }
                Json::Object(map)
            }
        })
    }
}

fn json_float(v: f64) -> Result<serde_json::Value> {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .ok_or_else(|| CodecError::Unrepresentable {
            codec: "json",
            reason: format!("non-finite number {v}"),
        })
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::I32(small),
                        Err(_) => Value::I64(i),
                    }
                } else {
                    // u64 beyond i64::MAX and fractional numbers both land here.
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (Value::String(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::I32(_) | Value::I64(_), Value::I32(_) | Value::I64(_)) => {
                self.as_i64() == other.as_i64()
            }
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::U8List(a), Value::U8List(b)) => a == b,
            (Value::I32List(a), Value::I32List(b)) => a == b,
            (Value::I64List(a), Value::I64List(b)) => a == b,
            (Value::F32List(a), Value::F32List(b)) => a == b,
            (Value::F64List(a), Value::F64List(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
