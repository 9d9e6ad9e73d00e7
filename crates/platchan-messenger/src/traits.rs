use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::error::Result;
use crate::task_queue::TaskQueue;

/// Continuation invoked once with the reply bytes, or `None` when the remote
/// side produced no reply (no handler, or not implemented).
pub type ReplyCallback = Box<dyn FnOnce(Option<Bytes>) + Send + 'static>;

/// Single-use reply handle passed to a [`BinaryMessageHandler`].
///
/// Answering consumes the handle, so at most one reply is ever sent. A
/// handle dropped without an answer logs a warning and sends `None`, which
/// releases the remote caller instead of leaving it pending.
pub struct BinaryReply {
    channel: String,
    callback: Option<ReplyCallback>,
}

impl BinaryReply {
    /// Reply handle that forwards the answer to `callback`.
    pub fn new(channel: impl Into<String>, callback: ReplyCallback) -> Self {
        Self {
            channel: channel.into(),
            callback: Some(callback),
        }
    }

    /// Reply handle for a fire-and-forget message; answers are discarded.
    pub fn detached(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            callback: None,
        }
    }

    /// Channel the original message arrived on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Whether the sender is waiting for an answer.
    pub fn expects_reply(&self) -> bool {
        self.callback.is_some()
    }

    /// Send the one reply for this message.
    pub fn reply(mut self, message: Option<Bytes>) {
        if let Some(callback) = self.callback.take() {
            callback(message);
        }
    }
}

impl Drop for BinaryReply {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            warn!(
                channel = %self.channel,
                "reply handle dropped without an answer; sending empty reply"
            );
            callback(None);
        }
    }
}

impl fmt::Debug for BinaryReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryReply")
            .field("channel", &self.channel)
            .field("pending", &self.callback.is_some())
            .finish()
    }
}

/// Receives raw messages for one channel name.
///
/// Implementations must answer every message exactly once through the
/// supplied [`BinaryReply`], possibly later and from another thread.
pub trait BinaryMessageHandler: Send + Sync {
    fn on_message(&self, message: Bytes, reply: BinaryReply);
}

impl<F> BinaryMessageHandler for F
where
    F: Fn(Bytes, BinaryReply) + Send + Sync,
{
    fn on_message(&self, message: Bytes, reply: BinaryReply) {
        self(message, reply)
    }
}

/// Raw name-addressed transport between the host and the Dart VM.
pub trait BinaryMessenger: Send + Sync {
    /// Send `message` on `channel`. When `reply` is given it is invoked
    /// exactly once, with the reply bytes or `None`.
    fn send(&self, channel: &str, message: Bytes, reply: Option<ReplyCallback>);

    /// Register (or with `None`, remove) the handler for `channel`.
    ///
    /// Replaces any earlier registration for the same name. With a task
    /// queue the handler runs on that queue instead of the default context.
    fn set_message_handler(
        &self,
        channel: &str,
        handler: Option<Arc<dyn BinaryMessageHandler>>,
        task_queue: Option<TaskQueue>,
    );

    /// Create a task queue handlers can be pinned to.
    fn make_background_task_queue(&self, name: &str) -> Result<TaskQueue> {
        TaskQueue::spawn(name)
    }
}
