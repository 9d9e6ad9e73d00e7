//! The engine's built-in system channels.
//!
//! Typed wrappers over [`MethodChannel`](platchan_channel::MethodChannel)
//! for the protocols the framework speaks out of the box:
//! - `flutter/textinput` ([`TextInputChannel`], JSON codec)
//! - `flutter/mousecursor` ([`MouseCursorChannel`], standard codec)
//!
//! Every call arriving on these channels is answered, including when no
//! host handler is installed.

use std::sync::Arc;

use platchan_messenger::BinaryMessenger;

pub mod configuration;
pub mod error;
pub mod mouse_cursor;
pub mod names;
pub mod text_edit_state;
pub mod text_input;

pub use configuration::{
    Configuration, InputType, TextCapitalization, TextInputAction, TextInputType,
};
pub use error::{ArgumentError, Result, TextEditStateError};
pub use mouse_cursor::{MouseCursorChannel, MouseCursorMethodHandler};
pub use text_edit_state::TextEditState;
pub use text_input::{TextInputCall, TextInputChannel, TextInputMethodHandler};

/// The system channels wired onto one messenger.
pub struct SystemChannels {
    pub text_input: TextInputChannel,
    pub mouse_cursor: MouseCursorChannel,
}

impl SystemChannels {
    pub fn new(messenger: Arc<dyn BinaryMessenger>) -> Self {
        Self {
            text_input: TextInputChannel::new(messenger.clone()),
            mouse_cursor: MouseCursorChannel::new(messenger),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use platchan_channel::{MethodChannel, MethodResponse};
    use platchan_codec::{JsonMethodCodec, MethodCodec, StandardMethodCodec, Value};
    use platchan_messenger::LocalMessenger;

    use super::*;

    fn invoke(channel: &MethodChannel, method: &str) -> MethodResponse {
        let (tx, rx) = mpsc::channel();
        channel.invoke_method(
            method,
            Value::Null,
            Some(Box::new(move |response: MethodResponse| {
                let _ = tx.send(response);
            })),
        );
        rx.recv_timeout(Duration::from_secs(2))
            .expect("call should be answered")
    }

    #[test]
    fn registers_both_channels_on_the_messenger() {
        let messenger = LocalMessenger::new().expect("messenger should start");
        let host = messenger.host();
        let _channels = SystemChannels::new(host.clone());

        assert!(host.has_handler(names::TEXT_INPUT));
        assert!(host.has_handler(names::MOUSE_CURSOR));

        let json: Arc<dyn MethodCodec> = Arc::new(JsonMethodCodec::INSTANCE);
        let standard: Arc<dyn MethodCodec> = Arc::new(StandardMethodCodec::INSTANCE);
        let text_input = MethodChannel::new(messenger.vm(), names::TEXT_INPUT, json);
        let mouse_cursor = MethodChannel::new(messenger.vm(), names::MOUSE_CURSOR, standard);

        assert_eq!(invoke(&text_input, "TextInput.show"), MethodResponse::NotImplemented);
        assert_eq!(
            invoke(&mouse_cursor, "activateSystemCursor"),
            MethodResponse::NotImplemented
        );
    }
}
