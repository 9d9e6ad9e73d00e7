use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::{debug, error, trace, warn};

use crate::buffers::{ChannelBuffer, Pending};
use crate::control::{ChannelBufferControl, CHANNEL_BUFFERS};
use crate::error::Result;
use crate::task_queue::TaskQueue;
use crate::traits::{BinaryMessageHandler, BinaryMessenger, BinaryReply, ReplyCallback};

/// Configuration for an in-process messenger pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessengerConfig {
    /// Messages buffered per channel while no handler is registered.
    /// Zero answers such messages with an empty reply immediately.
    pub default_buffer_size: usize,
    /// When a buffer is full, drop the oldest message instead of the newest.
    pub allow_overflow: bool,
    /// Name of the host-side endpoint; prefixes its dispatch queue.
    pub host_name: String,
    /// Name of the VM-side endpoint.
    pub vm_name: String,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            default_buffer_size: 0,
            allow_overflow: true,
            host_name: "host".to_string(),
            vm_name: "vm".to_string(),
        }
    }
}

/// Two connected messenger endpoints living in one process.
///
/// Whatever one endpoint sends is delivered to handlers registered on the
/// other. Each endpoint dispatches on its own default queue
/// (`<name>.platform`) unless a handler is pinned to a task queue, and
/// replies come back on the sender's default queue.
pub struct LocalMessenger {
    host: Arc<MessengerEndpoint>,
    vm: Arc<MessengerEndpoint>,
}

impl LocalMessenger {
    /// Create a pair with default configuration.
    pub fn new() -> Result<Self> {
        Self::pair(MessengerConfig::default())
    }

    /// Create a pair with explicit configuration.
    pub fn pair(config: MessengerConfig) -> Result<Self> {
        let link = Arc::new(Link {
            sides: [
                Side::new(&config.host_name, &config)?,
                Side::new(&config.vm_name, &config)?,
            ],
        });

        Ok(Self {
            host: Arc::new(MessengerEndpoint {
                link: link.clone(),
                index: 0,
            }),
            vm: Arc::new(MessengerEndpoint { link, index: 1 }),
        })
    }

    /// The host (platform) side.
    pub fn host(&self) -> Arc<MessengerEndpoint> {
        self.host.clone()
    }

    /// The VM (Dart) side.
    pub fn vm(&self) -> Arc<MessengerEndpoint> {
        self.vm.clone()
    }
}

struct Link {
    sides: [Side; 2],
}

#[derive(Clone)]
struct HandlerEntry {
    handler: Arc<dyn BinaryMessageHandler>,
    task_queue: Option<TaskQueue>,
}

struct Side {
    name: String,
    default_queue: TaskQueue,
    default_buffer_size: usize,
    allow_overflow: bool,
    state: Mutex<SideState>,
}

#[derive(Default)]
struct SideState {
    handlers: HashMap<String, HandlerEntry>,
    buffers: HashMap<String, ChannelBuffer>,
}

impl Side {
    fn new(name: &str, config: &MessengerConfig) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            default_queue: TaskQueue::spawn(format!("{name}.platform"))?,
            default_buffer_size: config.default_buffer_size,
            allow_overflow: config.allow_overflow,
            state: Mutex::new(SideState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SideState> {
        // A panic while holding the lock leaves the table itself consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn buffer_for<'a>(&self, state: &'a mut SideState, channel: &str) -> &'a mut ChannelBuffer {
        state
            .buffers
            .entry(channel.to_string())
            .or_insert_with(|| ChannelBuffer::new(self.default_buffer_size, self.allow_overflow))
    }

    /// Route one inbound message. The handler is captured here, so a
    /// registration change afterwards does not affect this message.
    fn deliver(&self, channel: &str, message: Bytes, reply: BinaryReply) {
        if channel == CHANNEL_BUFFERS {
            self.apply_control(message, reply);
            return;
        }

        let rejected = {
            let mut state = self.lock();
            if let Some(entry) = state.handlers.get(channel).cloned() {
                drop(state);
                self.dispatch(&entry, channel, message, reply);
                return;
            }
            // Buffers exist only for channels with capacity; unknown names
            // leave no trace.
            if !state.buffers.contains_key(channel) && self.default_buffer_size == 0 {
                Some((message, reply))
            } else {
                self.buffer_for(&mut state, channel).push(message, reply)
            }
        };

        match rejected {
            None => debug!(endpoint = %self.name, channel, "no handler yet; message buffered"),
            Some((_, reply)) => {
                if self.lock().buffers.get(channel).is_some_and(|b| b.capacity() > 0) {
                    warn!(endpoint = %self.name, channel, "channel buffer full; message dropped");
                } else {
                    debug!(endpoint = %self.name, channel, "no handler registered");
                }
                reply.reply(None);
            }
        }
    }

    fn dispatch(&self, entry: &HandlerEntry, channel: &str, message: Bytes, reply: BinaryReply) {
        let queue = entry.task_queue.as_ref().unwrap_or(&self.default_queue);
        let handler = entry.handler.clone();
        trace!(
            endpoint = %self.name,
            channel,
            queue = queue.name(),
            size = message.len(),
            "dispatching message"
        );
        // On failure the task (and its reply handle) is dropped, which
        // answers the sender with an empty reply.
        if let Err(err) = queue.submit(move || handler.on_message(message, reply)) {
            error!(endpoint = %self.name, channel, error = %err, "failed to dispatch message");
        }
    }

    fn set_handler(
        &self,
        channel: &str,
        handler: Option<Arc<dyn BinaryMessageHandler>>,
        task_queue: Option<TaskQueue>,
    ) {
        let mut state = self.lock();
        match handler {
            Some(handler) => {
                let entry = HandlerEntry {
                    handler,
                    task_queue,
                };
                if state.handlers.insert(channel.to_string(), entry.clone()).is_some() {
                    debug!(endpoint = %self.name, channel, "replacing message handler");
                }
                // Flush under the lock so later sends queue behind the backlog.
                let backlog = state
                    .buffers
                    .get_mut(channel)
                    .map(ChannelBuffer::drain)
                    .unwrap_or_default();
                if !backlog.is_empty() {
                    debug!(endpoint = %self.name, channel, count = backlog.len(), "flushing buffered messages");
                }
                for (message, reply) in backlog {
                    self.dispatch(&entry, channel, message, reply);
                }
            }
            None => {
                state.handlers.remove(channel);
                debug!(endpoint = %self.name, channel, "message handler removed");
            }
        }
    }

    fn apply_control(&self, message: Bytes, reply: BinaryReply) {
        let control = match ChannelBufferControl::decode(&message) {
            Ok(control) => control,
            Err(err) => {
                warn!(endpoint = %self.name, error = %err, "ignoring invalid channel-buffer control message");
                reply.reply(None);
                return;
            }
        };

        let evicted: Vec<Pending> = {
            let mut state = self.lock();
            let buffer = self.buffer_for(&mut state, control.channel());
            match &control {
                ChannelBufferControl::Resize { size, .. } => buffer.resize(*size),
                ChannelBufferControl::Overflow { allowed, .. } => {
                    buffer.set_allow_overflow(*allowed);
                    Vec::new()
                }
            }
        };

        debug!(endpoint = %self.name, control = ?control, "applied channel-buffer control");
        if !evicted.is_empty() {
            warn!(
                endpoint = %self.name,
                channel = control.channel(),
                count = evicted.len(),
                "buffer shrunk; dropping oldest messages"
            );
        }
        for (_, pending_reply) in evicted {
            pending_reply.reply(None);
        }
        reply.reply(None);
    }
}

/// One side of a [`LocalMessenger`].
pub struct MessengerEndpoint {
    link: Arc<Link>,
    index: usize,
}

impl MessengerEndpoint {
    fn local(&self) -> &Side {
        &self.link.sides[self.index]
    }

    fn remote(&self) -> &Side {
        &self.link.sides[1 - self.index]
    }

    /// Endpoint name from the configuration.
    pub fn name(&self) -> &str {
        &self.local().name
    }

    /// Queue this endpoint dispatches handlers and replies on by default.
    pub fn default_queue(&self) -> &TaskQueue {
        &self.local().default_queue
    }

    /// Whether a handler is registered on this endpoint for `channel`.
    pub fn has_handler(&self, channel: &str) -> bool {
        self.local().lock().handlers.contains_key(channel)
    }

    /// Messages waiting on this endpoint for a handler on `channel`.
    pub fn buffered(&self, channel: &str) -> usize {
        self.local()
            .lock()
            .buffers
            .get(channel)
            .map_or(0, ChannelBuffer::len)
    }

    /// Current buffer capacity on this endpoint for `channel`.
    pub fn buffer_capacity(&self, channel: &str) -> usize {
        self.local()
            .lock()
            .buffers
            .get(channel)
            .map_or(self.local().default_buffer_size, ChannelBuffer::capacity)
    }
}

impl BinaryMessenger for MessengerEndpoint {
    fn send(&self, channel: &str, message: Bytes, reply: Option<ReplyCallback>) {
        trace!(endpoint = %self.name(), channel, size = message.len(), "sending message");
        let reply = match reply {
            Some(callback) => {
                let queue = self.local().default_queue.clone();
                let channel_name = channel.to_string();
                BinaryReply::new(
                    channel,
                    Box::new(move |answer| {
                        if let Err(err) = queue.submit(move || callback(answer)) {
                            error!(channel = %channel_name, error = %err, "reply lost; sender queue closed");
                        }
                    }),
                )
            }
            None => BinaryReply::detached(channel),
        };
        self.remote().deliver(channel, message, reply);
    }

    fn set_message_handler(
        &self,
        channel: &str,
        handler: Option<Arc<dyn BinaryMessageHandler>>,
        task_queue: Option<TaskQueue>,
    ) {
        self.local().set_handler(channel, handler, task_queue);
    }
}

impl fmt::Debug for MessengerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessengerEndpoint")
            .field("name", &self.name())
            .field("peer", &self.remote().name)
            .finish()
    }
}
