use bytes::Bytes;
use platchan_codec::{MethodCall, MethodCodec, StandardMethodCodec, Value};

use crate::error::{MessengerError, Result};

/// Reserved channel carrying channel-buffer control messages.
pub const CHANNEL_BUFFERS: &str = "dev.flutter/channel-buffers";

/// Control method: change a channel's buffer capacity.
pub const CONTROL_RESIZE: &str = "resize";
/// Control method: allow or forbid dropping old messages on overflow.
pub const CONTROL_OVERFLOW: &str = "overflow";

/// Message on the channel-buffers control channel.
///
/// Encoded with the standard codec as `resize [channel, size]` or
/// `overflow [channel, allowed]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelBufferControl {
    Resize { channel: String, size: usize },
    Overflow { channel: String, allowed: bool },
}

impl ChannelBufferControl {
    pub fn resize(channel: impl Into<String>, size: usize) -> Self {
        Self::Resize {
            channel: channel.into(),
            size,
        }
    }

    pub fn overflow(channel: impl Into<String>, allowed: bool) -> Self {
        Self::Overflow {
            channel: channel.into(),
            allowed,
        }
    }

    /// Channel the control message applies to.
    pub fn channel(&self) -> &str {
        match self {
            Self::Resize { channel, .. } | Self::Overflow { channel, .. } => channel,
        }
    }

    pub fn encode(&self) -> Result<Bytes> {
        let call = match self {
            Self::Resize { channel, size } => {
                let size = i64::try_from(*size).map_err(|_| {
                    MessengerError::InvalidControl(format!("buffer size {size} out of range"))
                })?;
                MethodCall::new(
                    CONTROL_RESIZE,
                    Value::List(vec![Value::from(channel.as_str()), Value::I64(size)]),
                )?
            }
            Self::Overflow { channel, allowed } => MethodCall::new(
                CONTROL_OVERFLOW,
                Value::List(vec![Value::from(channel.as_str()), Value::Bool(*allowed)]),
            )?,
        };
        Ok(StandardMethodCodec::INSTANCE.encode_method_call(&call)?)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let call = StandardMethodCodec::INSTANCE.decode_method_call(payload)?;
        let args = call.args().as_list().unwrap_or_default();
        let channel = match args.first().and_then(Value::as_str) {
            Some(channel) => channel.to_string(),
            None => {
                return Err(MessengerError::InvalidControl(format!(
                    "{}: first argument must be a channel name",
                    call.method()
                )))
            }
        };

        match (call.method(), args.get(1)) {
            (CONTROL_RESIZE, Some(size)) => {
                let size = size
                    .as_i64()
                    .and_then(|size| usize::try_from(size).ok())
                    .ok_or_else(|| {
                        MessengerError::InvalidControl(format!(
                            "resize: invalid size {size:?}"
                        ))
                    })?;
                Ok(Self::Resize { channel, size })
            }
            (CONTROL_OVERFLOW, Some(allowed)) => {
                let allowed = allowed.as_bool().ok_or_else(|| {
                    MessengerError::InvalidControl(format!("overflow: invalid flag {allowed:?}"))
                })?;
                Ok(Self::Overflow { channel, allowed })
            }
            (method, _) => Err(MessengerError::InvalidControl(format!(
                "unsupported control method {method}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_wire_shape() {
        let bytes = ChannelBufferControl::resize("flutter/textinput", 3)
            .encode()
            .unwrap();
        let call = StandardMethodCodec::INSTANCE.decode_method_call(&bytes).unwrap();
        assert_eq!(call.method(), "resize");
        assert_eq!(
            call.args(),
            &Value::List(vec![Value::from("flutter/textinput"), Value::I32(3)])
        );
    }

    #[test]
    fn decode_matches_encode() {
        for control in [
            ChannelBufferControl::resize("a", 10),
            ChannelBufferControl::overflow("b", false),
        ] {
            let bytes = control.encode().unwrap();
            assert_eq!(ChannelBufferControl::decode(&bytes).unwrap(), control);
        }
    }

    #[test]
    fn negative_size_rejected() {
        let call = MethodCall::new(
            CONTROL_RESIZE,
            Value::List(vec![Value::from("a"), Value::I32(-1)]),
        )
        .unwrap();
        let bytes = StandardMethodCodec::INSTANCE.encode_method_call(&call).unwrap();
        assert!(matches!(
            ChannelBufferControl::decode(&bytes),
            Err(MessengerError::InvalidControl(_))
        ));
    }

    #[test]
    fn unknown_method_rejected() {
        let call = MethodCall::new("drain", Value::List(vec![Value::from("a")])).unwrap();
        let bytes = StandardMethodCodec::INSTANCE.encode_method_call(&call).unwrap();
        assert!(ChannelBufferControl::decode(&bytes).is_err());
    }
}
