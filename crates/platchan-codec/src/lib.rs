//! Method-call and envelope codecs for platform channels.
//!
//! This is the leaf layer of platchan. Two codecs ship side by side:
//! - [`StandardMethodCodec`]: compact self-describing binary format
//! - [`JsonMethodCodec`]: UTF-8 JSON, for handlers that expect text arguments
//!
//! Both match the framing the Dart side already decodes; neither is
//! negotiable per message.

pub mod call;
pub mod codec;
pub mod error;
pub mod json;
pub mod standard;
pub mod value;

pub use call::{Envelope, MethodCall, PlatformError};
pub use codec::MethodCodec;
pub use error::{CodecError, Result};
pub use json::JsonMethodCodec;
pub use standard::{ReadBuffer, StandardMethodCodec, MAX_NESTING_DEPTH};
pub use value::Value;
