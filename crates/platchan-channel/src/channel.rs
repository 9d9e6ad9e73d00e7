use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use platchan_codec::{Envelope, MethodCall, MethodCodec, PlatformError, Value};
use platchan_messenger::{
    describe_panic, BinaryMessageHandler, BinaryMessenger, BinaryReply, ChannelBufferControl,
    TaskQueue, CHANNEL_BUFFERS,
};
use tracing::{debug, error, trace, warn};

use crate::error::Result;
use crate::result::{take_reply, HandlerError, HandlerResult, MethodResponse, MethodResult};

/// Continuation receiving the outcome of an outgoing call.
pub type ResponseCallback = Box<dyn FnOnce(MethodResponse) + Send + 'static>;

/// Error code used for failures raised on this side of the channel.
pub const ERROR_CODE: &str = "error";
/// Error code reported when a reply cannot be decoded.
pub const FORMAT_ERROR_CODE: &str = "format-error";

/// Handles method calls arriving on a [`MethodChannel`].
///
/// The handler answers through the [`MethodResult`] it is given. Returning
/// `Err` (or panicking) before answering makes the channel answer with an
/// error envelope on the handler's behalf.
pub trait MethodCallHandler: Send + Sync {
    fn on_method_call(&self, call: MethodCall, result: MethodResult) -> HandlerResult;
}

impl<F> MethodCallHandler for F
where
    F: Fn(MethodCall, MethodResult) -> HandlerResult + Send + Sync,
{
    fn on_method_call(&self, call: MethodCall, result: MethodResult) -> HandlerResult {
        self(call, result)
    }
}

/// A named channel exchanging method calls over a [`BinaryMessenger`].
///
/// The channel itself holds no mutable state: handler registration lives
/// in the messenger, keyed by channel name.
#[derive(Clone)]
pub struct MethodChannel {
    name: Arc<str>,
    codec: Arc<dyn MethodCodec>,
    messenger: Arc<dyn BinaryMessenger>,
    task_queue: Option<TaskQueue>,
}

impl MethodChannel {
    pub fn new(
        messenger: Arc<dyn BinaryMessenger>,
        name: impl Into<String>,
        codec: Arc<dyn MethodCodec>,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            codec,
            messenger,
            task_queue: None,
        }
    }

    /// Run incoming calls on `queue` instead of the messenger's default
    /// context.
    pub fn with_task_queue(mut self, queue: TaskQueue) -> Self {
        self.task_queue = Some(queue);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &dyn MethodCodec {
        self.codec.as_ref()
    }

    pub fn task_queue(&self) -> Option<&TaskQueue> {
        self.task_queue.as_ref()
    }

    /// Call `method` on the other side.
    ///
    /// Never blocks. Without a callback the call is fire-and-forget. With
    /// one, it runs exactly once on the messenger's reply context.
    pub fn invoke_method(
        &self,
        method: &str,
        args: impl Into<Value>,
        callback: Option<ResponseCallback>,
    ) {
        let payload = match self.encode_call(method, args.into()) {
            Ok(payload) => payload,
            Err(err) => {
                error!(
                    channel = %self.name,
                    method,
                    codec = self.codec.name(),
                    error = %err,
                    "failed to encode method call"
                );
                if let Some(callback) = callback {
                    let failure = PlatformError::new(ERROR_CODE, Some(err.to_string()), Value::Null);
                    run_callback(&self.name, method, callback, MethodResponse::Error(failure));
                }
                return;
            }
        };

        trace!(channel = %self.name, method, size = payload.len(), "invoking method");

        let reply = callback.map(|callback| {
            let channel = self.name.clone();
            let codec = self.codec.clone();
            let method = method.to_string();
            Box::new(move |reply: Option<Bytes>| {
                let response = decode_response(codec.as_ref(), &channel, &method, reply);
                run_callback(&channel, &method, callback, response);
            }) as platchan_messenger::ReplyCallback
        });

        self.messenger.send(&self.name, payload, reply);
    }

    /// Call `method` and await the outcome.
    #[cfg(feature = "async")]
    pub async fn invoke_method_async(
        &self,
        method: &str,
        args: impl Into<Value>,
    ) -> Result<MethodResponse> {
        let payload = self.encode_call(method, args.into())?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let channel = self.name.clone();
        let codec = self.codec.clone();
        let method_name = method.to_string();

        self.messenger.send(
            &self.name,
            payload,
            Some(Box::new(move |reply: Option<Bytes>| {
                let response = decode_response(codec.as_ref(), &channel, &method_name, reply);
                let _ = tx.send(response);
            })),
        );

        rx.await.map_err(|_| crate::ChannelError::ReplyDropped {
            channel: self.name.to_string(),
            method: method.to_string(),
        })
    }

    /// Register the handler for calls arriving on this channel, or remove
    /// it with `None`. A later registration replaces an earlier one.
    pub fn set_method_call_handler(&self, handler: Option<Arc<dyn MethodCallHandler>>) {
        let wrapped = handler.map(|handler| {
            Arc::new(IncomingCalls {
                channel: self.name.clone(),
                codec: self.codec.clone(),
                handler,
            }) as Arc<dyn BinaryMessageHandler>
        });
        debug!(
            channel = %self.name,
            registered = wrapped.is_some(),
            queue = self.task_queue.as_ref().map(TaskQueue::name),
            "setting method call handler"
        );
        self.messenger
            .set_message_handler(&self.name, wrapped, self.task_queue.clone());
    }

    /// Ask the receiving side to buffer up to `size` messages for this
    /// channel while it has no handler.
    pub fn resize_channel_buffer(&self, size: usize) -> Result<()> {
        self.send_control(ChannelBufferControl::resize(&*self.name, size))
    }

    /// Whether the receiving side may drop the oldest buffered message when
    /// this channel's buffer is full.
    pub fn allow_channel_buffer_overflow(&self, allowed: bool) -> Result<()> {
        self.send_control(ChannelBufferControl::overflow(&*self.name, allowed))
    }

    fn send_control(&self, control: ChannelBufferControl) -> Result<()> {
        let payload = control.encode()?;
        debug!(channel = %self.name, control = ?control, "sending channel-buffer control");
        self.messenger.send(CHANNEL_BUFFERS, payload, None);
        Ok(())
    }

    fn encode_call(&self, method: &str, args: Value) -> Result<Bytes> {
        let call = MethodCall::new(method, args)?;
        Ok(self.codec.encode_method_call(&call)?)
    }
}

impl fmt::Debug for MethodChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodChannel")
            .field("name", &self.name)
            .field("codec", &self.codec.name())
            .field("task_queue", &self.task_queue)
            .finish()
    }
}

fn decode_response(
    codec: &dyn MethodCodec,
    channel: &str,
    method: &str,
    reply: Option<Bytes>,
) -> MethodResponse {
    let payload = match reply {
        Some(payload) if !payload.is_empty() => payload,
        _ => return MethodResponse::NotImplemented,
    };
    match codec.decode_envelope(&payload) {
        Ok(Envelope::Success(value)) => MethodResponse::Success(value),
        Ok(Envelope::Error(err)) => MethodResponse::Error(err),
        Err(err) => {
            error!(
                channel,
                method,
                codec = codec.name(),
                error = %err,
                "failed to decode reply envelope"
            );
            MethodResponse::Error(PlatformError::new(
                FORMAT_ERROR_CODE,
                Some(err.to_string()),
                Value::Null,
            ))
        }
    }
}

fn run_callback(channel: &str, method: &str, callback: ResponseCallback, response: MethodResponse) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(move || callback(response))) {
        error!(
            channel,
            method,
            panic = %describe_panic(panic.as_ref()),
            "reply callback panicked"
        );
    }
}

/// Binary handler that decodes calls and drives a [`MethodCallHandler`].
struct IncomingCalls {
    channel: Arc<str>,
    codec: Arc<dyn MethodCodec>,
    handler: Arc<dyn MethodCallHandler>,
}

impl IncomingCalls {
    fn reject_undecodable(&self, message: &str, reply: BinaryReply) {
        match self
            .codec
            .encode_error_envelope(ERROR_CODE, Some(message), &Value::Null)
        {
            Ok(payload) => reply.reply(Some(payload)),
            Err(err) => {
                error!(channel = %self.channel, error = %err, "failed to encode error envelope");
                reply.reply(None);
            }
        }
    }
}

impl BinaryMessageHandler for IncomingCalls {
    fn on_message(&self, message: Bytes, reply: BinaryReply) {
        let call = match self.codec.decode_method_call(&message) {
            Ok(call) => call,
            Err(err) => {
                error!(
                    channel = %self.channel,
                    codec = self.codec.name(),
                    error = %err,
                    "failed to decode method call"
                );
                self.reject_undecodable(&err.to_string(), reply);
                return;
            }
        };

        let method = call.method().to_string();
        trace!(channel = %self.channel, method = %method, "dispatching method call");

        let slot = Arc::new(Mutex::new(Some(reply)));
        let result = MethodResult::new(
            self.channel.clone(),
            method.clone(),
            self.codec.clone(),
            slot.clone(),
        );

        let outcome = catch_unwind(AssertUnwindSafe(|| self.handler.on_method_call(call, result)));
        let (message, stacktrace) = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => {
                let message = err.to_string();
                (message, error_chain(&err))
            }
            Err(panic) => {
                let message = describe_panic(panic.as_ref());
                (message, Backtrace::force_capture().to_string())
            }
        };

        let Some(reply) = take_reply(&slot) else {
            warn!(
                channel = %self.channel,
                method = %method,
                error = %message,
                "handler failed after answering"
            );
            return;
        };

        error!(
            channel = %self.channel,
            method = %method,
            error = %message,
            "unhandled failure in method call handler"
        );
        match self.codec.encode_error_envelope_with_stacktrace(
            ERROR_CODE,
            Some(message.as_str()),
            &Value::Null,
            &stacktrace,
        ) {
            Ok(payload) => reply.reply(Some(payload)),
            Err(err) => {
                error!(channel = %self.channel, error = %err, "failed to encode error envelope");
                reply.reply(None);
            }
        }
    }
}

/// Render an error and its sources, one per line.
fn error_chain(err: &HandlerError) -> String {
    let mut chain = format!("{err}");
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str(&format!("\ncaused by: {cause}"));
        source = cause.source();
    }
    chain
}
