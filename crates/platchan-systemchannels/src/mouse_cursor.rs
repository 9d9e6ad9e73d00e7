use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use platchan_channel::{
    HandlerError, HandlerResult, MethodCallHandler, MethodChannel, MethodResult, ERROR_CODE,
};
use platchan_codec::{MethodCall, StandardMethodCodec, Value};
use platchan_messenger::{describe_panic, BinaryMessenger};
use tracing::{debug, error, info, warn};

use crate::names::MOUSE_CURSOR;

pub const ACTIVATE_SYSTEM_CURSOR: &str = "activateSystemCursor";

/// Host-side receiver of `flutter/mousecursor` requests.
pub trait MouseCursorMethodHandler: Send + Sync {
    /// Show the system cursor named `kind` (e.g. `basic`, `click`, `text`).
    fn activate_system_cursor(&self, kind: &str) -> Result<(), HandlerError>;
}

impl<F> MouseCursorMethodHandler for F
where
    F: Fn(&str) -> Result<(), HandlerError> + Send + Sync,
{
    fn activate_system_cursor(&self, kind: &str) -> Result<(), HandlerError> {
        self(kind)
    }
}

type HandlerSlot = Arc<Mutex<Option<Arc<dyn MouseCursorMethodHandler>>>>;

#[derive(Clone)]
struct MouseCursorDispatch {
    handler: HandlerSlot,
}

impl MouseCursorDispatch {
    fn handle(&self, call: &MethodCall, result: MethodResult) {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(handler) = handler else {
            warn!(method = call.method(), "no mouse cursor handler registered");
            result.not_implemented();
            return;
        };

        info!(method = call.method(), "received mouse cursor call");
        match call.method() {
            ACTIVATE_SYSTEM_CURSOR => {
                let Some(kind) = call.arg("kind").and_then(Value::as_str) else {
                    result.error(
                        ERROR_CODE,
                        Some("activateSystemCursor requires a string kind"),
                        Value::Null,
                    );
                    return;
                };
                match catch_unwind(AssertUnwindSafe(|| handler.activate_system_cursor(kind))) {
                    Ok(Ok(())) => result.success(true),
                    Ok(Err(err)) => {
                        let message = format!("Error when setting cursors: {err}");
                        result.error(ERROR_CODE, Some(message.as_str()), Value::Null);
                    }
                    Err(panic) => {
                        let panic = describe_panic(panic.as_ref());
                        error!(kind, panic = %panic, "mouse cursor handler panicked");
                        let message = format!("UnHandled error: {panic}");
                        result.error(ERROR_CODE, Some(message.as_str()), Value::Null);
                    }
                }
            }
            other => {
                debug!(method = other, "unsupported mouse cursor method");
                result.not_implemented();
            }
        }
    }
}

impl MethodCallHandler for MouseCursorDispatch {
    fn on_method_call(&self, call: MethodCall, result: MethodResult) -> HandlerResult {
        self.handle(&call, result);
        Ok(())
    }
}

/// The `flutter/mousecursor` channel (standard method codec).
pub struct MouseCursorChannel {
    channel: MethodChannel,
    dispatch: MouseCursorDispatch,
}

impl MouseCursorChannel {
    pub fn new(messenger: Arc<dyn BinaryMessenger>) -> Self {
        let channel = MethodChannel::new(
            messenger,
            MOUSE_CURSOR,
            Arc::new(StandardMethodCodec::INSTANCE),
        );
        let dispatch = MouseCursorDispatch {
            handler: Arc::new(Mutex::new(None)),
        };
        channel.set_method_call_handler(Some(Arc::new(dispatch.clone())));
        Self { channel, dispatch }
    }

    pub fn channel(&self) -> &MethodChannel {
        &self.channel
    }

    /// Install the receiver for cursor requests; `None` detaches it.
    pub fn set_method_handler(&self, handler: Option<Arc<dyn MouseCursorMethodHandler>>) {
        *self
            .dispatch
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handler;
    }

    /// Run `call` through the same dispatch as calls arriving on the channel.
    pub fn synthesize_method_call(&self, call: MethodCall, result: MethodResult) {
        self.dispatch.handle(&call, result);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use bytes::Bytes;
    use platchan_channel::MethodResponse;
    use platchan_codec::{Envelope, MethodCodec};
    use platchan_messenger::{BinaryReply, LocalMessenger};

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    struct Harness {
        _messenger: LocalMessenger,
        cursor: MouseCursorChannel,
        framework: MethodChannel,
    }

    fn harness() -> Harness {
        let messenger = LocalMessenger::new().expect("messenger should start");
        let cursor = MouseCursorChannel::new(messenger.host());
        let framework = MethodChannel::new(
            messenger.vm(),
            MOUSE_CURSOR,
            Arc::new(StandardMethodCodec::INSTANCE),
        );
        Harness {
            _messenger: messenger,
            cursor,
            framework,
        }
    }

    fn invoke(framework: &MethodChannel, method: &str, args: Value) -> MethodResponse {
        let (tx, rx) = mpsc::channel();
        framework.invoke_method(
            method,
            args,
            Some(Box::new(move |response: MethodResponse| {
                let _ = tx.send(response);
            })),
        );
        rx.recv_timeout(TIMEOUT).expect("call should be answered")
    }

    fn kind(kind: &str) -> Value {
        Value::map([("kind", kind)])
    }

    #[test]
    fn activates_cursor_through_handler() {
        let h = harness();
        let (tx, rx) = mpsc::channel();
        h.cursor.set_method_handler(Some(Arc::new(move |kind: &str| -> Result<(), HandlerError> {
            let _ = tx.send(kind.to_string());
            Ok(())
        })));

        assert_eq!(
            invoke(&h.framework, ACTIVATE_SYSTEM_CURSOR, kind("click")),
            MethodResponse::Success(Value::Bool(true))
        );
        assert_eq!(rx.recv_timeout(TIMEOUT).unwrap(), "click");
    }

    #[test]
    fn handler_failure_is_reported() {
        let h = harness();
        h.cursor.set_method_handler(Some(Arc::new(|_: &str| -> Result<(), HandlerError> {
            Err("no such cursor".into())
        })));

        let response = invoke(&h.framework, ACTIVATE_SYSTEM_CURSOR, kind("alien"));
        let err = response.error().expect("failure should be an error envelope");
        assert_eq!(err.code, "error");
        assert_eq!(
            err.message.as_deref(),
            Some("Error when setting cursors: no such cursor")
        );
    }

    #[test]
    fn no_handler_is_answered_not_implemented() {
        let h = harness();
        assert_eq!(
            invoke(&h.framework, ACTIVATE_SYSTEM_CURSOR, kind("basic")),
            MethodResponse::NotImplemented
        );
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let h = harness();
        h.cursor
            .set_method_handler(Some(Arc::new(|_: &str| -> Result<(), HandlerError> { Ok(()) })));
        assert_eq!(
            invoke(&h.framework, "hideCursor", Value::Null),
            MethodResponse::NotImplemented
        );
    }

    #[test]
    fn missing_kind_is_an_error() {
        let h = harness();
        h.cursor
            .set_method_handler(Some(Arc::new(|_: &str| -> Result<(), HandlerError> { Ok(()) })));
        let response = invoke(&h.framework, ACTIVATE_SYSTEM_CURSOR, Value::map([("shape", 3)]));
        assert_eq!(response.error().map(|e| e.code.as_str()), Some("error"));
    }

    #[test]
    fn panicking_handler_is_answered_with_error() {
        let h = harness();
        h.cursor.set_method_handler(Some(Arc::new(|_: &str| -> Result<(), HandlerError> {
            panic!("cursor backend gone")
        })));

        let response = invoke(&h.framework, ACTIVATE_SYSTEM_CURSOR, kind("basic"));
        let err = response.error().expect("panic should become an error envelope");
        assert_eq!(err.code, "error");
        assert_eq!(
            err.message.as_deref(),
            Some("UnHandled error: cursor backend gone")
        );
    }

    #[test]
    fn synthesized_call_contains_handler_panic() {
        let h = harness();
        h.cursor.set_method_handler(Some(Arc::new(|_: &str| -> Result<(), HandlerError> {
            panic!("cursor backend gone")
        })));

        let (tx, rx) = mpsc::channel();
        let reply = BinaryReply::new(
            MOUSE_CURSOR,
            Box::new(move |payload: Option<Bytes>| {
                let _ = tx.send(payload);
            }),
        );
        let result = MethodResult::from_reply(
            MOUSE_CURSOR,
            ACTIVATE_SYSTEM_CURSOR,
            Arc::new(StandardMethodCodec::INSTANCE),
            reply,
        );
        let call = MethodCall::new(ACTIVATE_SYSTEM_CURSOR, kind("text")).unwrap();
        h.cursor.synthesize_method_call(call, result);

        let payload = rx.recv_timeout(TIMEOUT).unwrap().expect("reply should carry bytes");
        match StandardMethodCodec::INSTANCE.decode_envelope(&payload).unwrap() {
            Envelope::Error(err) => {
                assert_eq!(err.code, "error");
                assert!(err
                    .message
                    .as_deref()
                    .is_some_and(|m| m.starts_with("UnHandled error: ")));
            }
            other => panic!("expected error envelope, got {other:?}"),
        }
    }

    #[test]
    fn synthesized_call_uses_same_dispatch() {
        let h = harness();
        h.cursor
            .set_method_handler(Some(Arc::new(|_: &str| -> Result<(), HandlerError> { Ok(()) })));

        let (tx, rx) = mpsc::channel();
        let reply = BinaryReply::new(
            MOUSE_CURSOR,
            Box::new(move |payload: Option<Bytes>| {
                let _ = tx.send(payload);
            }),
        );
        let result = MethodResult::from_reply(
            MOUSE_CURSOR,
            ACTIVATE_SYSTEM_CURSOR,
            Arc::new(StandardMethodCodec::INSTANCE),
            reply,
        );
        let call = MethodCall::new(ACTIVATE_SYSTEM_CURSOR, kind("text")).unwrap();
        h.cursor.synthesize_method_call(call, result);

        let payload = rx.recv_timeout(TIMEOUT).unwrap().expect("reply should carry bytes");
        assert_eq!(
            StandardMethodCodec::INSTANCE.decode_envelope(&payload).unwrap(),
            Envelope::Success(Value::Bool(true))
        );
    }
}
