//! Method channels over a binary messenger.
//!
//! This is the layer application code talks to. A [`MethodChannel`] pairs a
//! channel name with a codec and lets either side:
//! - invoke named methods on the other side and receive one [`MethodResponse`]
//! - register a [`MethodCallHandler`] that answers through a [`MethodResult`]
//! - steer the receiving side's buffering for the channel
//!
//! Handler failures never cross the messenger as panics; they come back to
//! the caller as error envelopes.

pub mod channel;
pub mod error;
pub mod result;

pub use channel::{
    MethodCallHandler, MethodChannel, ResponseCallback, ERROR_CODE, FORMAT_ERROR_CODE,
};
pub use error::{ChannelError, Result};
pub use result::{HandlerError, HandlerResult, MethodResponse, MethodResult};
