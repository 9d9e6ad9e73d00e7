//! Binary messaging layer for platform channels.
//!
//! Moves opaque byte payloads between the host and the Dart VM by channel
//! name:
//! - [`BinaryMessenger`] contract with single-use [`BinaryReply`] handles
//! - Serial [`TaskQueue`] execution contexts handlers can be pinned to
//! - Per-channel buffering driven by [`ChannelBufferControl`] messages
//! - [`LocalMessenger`], an in-process endpoint pair
//!
//! Everything above this layer (codecs aside) talks to a `dyn BinaryMessenger`.

mod buffers;
pub mod control;
pub mod error;
pub mod local;
pub mod task_queue;
pub mod traits;

pub use control::{ChannelBufferControl, CHANNEL_BUFFERS};
pub use error::{MessengerError, Result};
pub use local::{LocalMessenger, MessengerConfig, MessengerEndpoint};
pub use task_queue::{describe_panic, Task, TaskQueue};
pub use traits::{BinaryMessageHandler, BinaryMessenger, BinaryReply, ReplyCallback};
