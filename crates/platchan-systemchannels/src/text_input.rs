use std::sync::{Arc, Mutex, PoisonError};

use platchan_channel::{HandlerResult, MethodCallHandler, MethodChannel, MethodResult, ERROR_CODE};
use platchan_codec::{JsonMethodCodec, MethodCall, Value};
use platchan_messenger::BinaryMessenger;
use tracing::{debug, warn};

use crate::configuration::{Configuration, TextInputAction};
use crate::error::{ArgumentError, Result};
use crate::names::TEXT_INPUT;
use crate::text_edit_state::TextEditState;

/// Host-side receiver of `flutter/textinput` requests.
pub trait TextInputMethodHandler: Send + Sync {
    fn show(&self);

    fn hide(&self);

    fn request_autofill(&self) {}

    fn finish_autofill_context(&self, _should_save: bool) {}

    fn set_client(&self, client_id: i64, configuration: Configuration);

    fn set_platform_view_client(&self, _platform_view_id: i64, _uses_virtual_display: bool) {}

    /// `transform` is a 4x4 column-major matrix.
    fn set_editable_size_and_transform(&self, _width: f64, _height: f64, _transform: Vec<f64>) {}

    fn set_editing_state(&self, state: TextEditState);

    fn clear_client(&self);

    fn send_app_private_command(&self, _action: &str, _data: &Value) {}
}

/// A decoded `flutter/textinput` request.
#[derive(Debug, Clone, PartialEq)]
pub enum TextInputCall {
    Show,
    Hide,
    RequestAutofill,
    FinishAutofillContext {
        should_save: bool,
    },
    SetClient {
        client_id: i64,
        configuration: Box<Configuration>,
    },
    SetPlatformViewClient {
        platform_view_id: i64,
        uses_virtual_display: bool,
    },
    SetEditableSizeAndTransform {
        width: f64,
        height: f64,
        transform: Vec<f64>,
    },
    SetEditingState(TextEditState),
    ClearClient,
    SendAppPrivateCommand {
        action: String,
        data: Value,
    },
}

impl TextInputCall {
    /// Decode a call. `Ok(None)` means the method is not part of the
    /// protocol.
    pub fn decode(call: &MethodCall) -> Result<Option<Self>> {
        let args = call.args();
        let decoded = match call.method() {
            "TextInput.show" => Self::Show,
            "TextInput.hide" => Self::Hide,
            "TextInput.requestAutofill" => Self::RequestAutofill,
            "TextInput.clearClient" => Self::ClearClient,
            "TextInput.finishAutofillContext" => Self::FinishAutofillContext {
                should_save: args.as_bool().ok_or(ArgumentError::InvalidType {
                    field: "shouldSave",
                    expected: "a boolean",
                })?,
            },
            "TextInput.setClient" => {
                let list = args.as_list().ok_or(ArgumentError::InvalidType {
                    field: "args",
                    expected: "a [clientId, configuration] list",
                })?;
                let client_id = integer(list.first(), "clientId")?;
                let configuration = match list.get(1) {
                    Some(value) => serde_json::from_value(value.to_json()?)?,
                    None => return Err(ArgumentError::Missing("configuration")),
                };
                Self::SetClient {
                    client_id,
                    configuration: Box::new(configuration),
                }
            }
            "TextInput.setPlatformViewClient" => Self::SetPlatformViewClient {
                platform_view_id: integer(args.get("platformViewId"), "platformViewId")?,
                uses_virtual_display: match args.get("usesVirtualDisplay") {
                    None | Some(Value::Null) => false,
                    Some(value) => value.as_bool().ok_or(ArgumentError::InvalidType {
                        field: "usesVirtualDisplay",
                        expected: "a boolean",
                    })?,
                },
            },
            "TextInput.setEditableSizeAndTransform" => {
                let transform = args
                    .get("transform")
                    .ok_or(ArgumentError::Missing("transform"))?
                    .as_list()
                    .and_then(|items| items.iter().map(Value::as_f64).collect::<Option<Vec<f64>>>())
                    .filter(|transform| transform.len() == 16)
                    .ok_or(ArgumentError::InvalidType {
                        field: "transform",
                        expected: "a list of 16 numbers",
                    })?;
                Self::SetEditableSizeAndTransform {
                    width: number(args.get("width"), "width")?,
                    height: number(args.get("height"), "height")?,
                    transform,
                }
            }
            "TextInput.setEditingState" => Self::SetEditingState(TextEditState::from_value(args)?),
            "TextInput.sendAppPrivateCommand" => Self::SendAppPrivateCommand {
                action: args
                    .get("action")
                    .ok_or(ArgumentError::Missing("action"))?
                    .as_str()
                    .ok_or(ArgumentError::InvalidType {
                        field: "action",
                        expected: "a string",
                    })?
                    .to_string(),
                data: args.get("data").cloned().unwrap_or_default(),
            },
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    fn apply(self, handler: &dyn TextInputMethodHandler) {
        match self {
            Self::Show => handler.show(),
            Self::Hide => handler.hide(),
            Self::RequestAutofill => handler.request_autofill(),
            Self::FinishAutofillContext { should_save } => {
                handler.finish_autofill_context(should_save)
            }
            Self::SetClient {
                client_id,
                configuration,
            } => handler.set_client(client_id, *configuration),
            Self::SetPlatformViewClient {
                platform_view_id,
                uses_virtual_display,
            } => handler.set_platform_view_client(platform_view_id, uses_virtual_display),
            Self::SetEditableSizeAndTransform {
                width,
                height,
                transform,
            } => handler.set_editable_size_and_transform(width, height, transform),
            Self::SetEditingState(state) => handler.set_editing_state(state),
            Self::ClearClient => handler.clear_client(),
            Self::SendAppPrivateCommand { action, data } => {
                handler.send_app_private_command(&action, &data)
            }
        }
    }
}

fn integer(value: Option<&Value>, field: &'static str) -> Result<i64> {
    value
        .ok_or(ArgumentError::Missing(field))?
        .as_i64()
        .ok_or(ArgumentError::InvalidType {
            field,
            expected: "an integer",
        })
}

fn number(value: Option<&Value>, field: &'static str) -> Result<f64> {
    value
        .ok_or(ArgumentError::Missing(field))?
        .as_f64()
        .ok_or(ArgumentError::InvalidType {
            field,
            expected: "a number",
        })
}

type HandlerSlot = Arc<Mutex<Option<Arc<dyn TextInputMethodHandler>>>>;

struct TextInputDispatch {
    handler: HandlerSlot,
}

impl MethodCallHandler for TextInputDispatch {
    fn on_method_call(&self, call: MethodCall, result: MethodResult) -> HandlerResult {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(handler) = handler else {
            warn!(method = call.method(), "no text input handler registered");
            result.not_implemented();
            return Ok(());
        };

        debug!(method = call.method(), "received text input call");
        match TextInputCall::decode(&call) {
            Ok(Some(decoded)) => {
                decoded.apply(handler.as_ref());
                result.success(Value::Null);
            }
            Ok(None) => result.not_implemented(),
            Err(err) => {
                warn!(method = call.method(), error = %err, "invalid text input arguments");
                result.error(ERROR_CODE, Some(err.to_string().as_str()), Value::Null);
            }
        }
        Ok(())
    }
}

/// The `flutter/textinput` channel (JSON method codec).
///
/// Requests from the framework go to the registered
/// [`TextInputMethodHandler`]; editing updates and keyboard actions are
/// sent back with the notification methods.
pub struct TextInputChannel {
    channel: MethodChannel,
    handler: HandlerSlot,
}

impl TextInputChannel {
    pub fn new(messenger: Arc<dyn BinaryMessenger>) -> Self {
        let channel = MethodChannel::new(messenger, TEXT_INPUT, Arc::new(JsonMethodCodec::INSTANCE));
        let handler: HandlerSlot = Arc::new(Mutex::new(None));
        channel.set_method_call_handler(Some(Arc::new(TextInputDispatch {
            handler: handler.clone(),
        })));
        Self { channel, handler }
    }

    pub fn channel(&self) -> &MethodChannel {
        &self.channel
    }

    /// Install the receiver for framework requests; `None` detaches it.
    pub fn set_text_input_method_handler(&self, handler: Option<Arc<dyn TextInputMethodHandler>>) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    /// Ask the framework to resend the current editing state.
    pub fn request_existing_input_state(&self) {
        self.channel
            .invoke_method("TextInputClient.requestExistingInputState", Value::Null, None);
    }

    /// Report a new editing state for `client_id`.
    pub fn update_editing_state(
        &self,
        client_id: i64,
        text: &str,
        selection_start: i64,
        selection_end: i64,
        composing_start: i64,
        composing_end: i64,
    ) {
        debug!(
            client_id,
            selection_start, selection_end, composing_start, composing_end, "updating editing state"
        );
        let state = Value::map([
            ("text", Value::from(text)),
            ("selectionBase", Value::I64(selection_start)),
            ("selectionExtent", Value::I64(selection_end)),
            ("composingBase", Value::I64(composing_start)),
            ("composingExtent", Value::I64(composing_end)),
        ]);
        self.channel.invoke_method(
            "TextInputClient.updateEditingState",
            Value::List(vec![Value::I64(client_id), state]),
            None,
        );
    }

    /// Report a keyboard action for `client_id`.
    pub fn perform_action(&self, client_id: i64, action: TextInputAction) {
        debug!(client_id, action = action.as_str(), "sending input action");
        self.channel.invoke_method(
            "TextInputClient.performAction",
            Value::List(vec![Value::I64(client_id), Value::from(action.as_str())]),
            None,
        );
    }

    pub fn newline(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Newline);
    }

    pub fn go(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Go);
    }

    pub fn search(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Search);
    }

    pub fn send(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Send);
    }

    pub fn done(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Done);
    }

    pub fn next(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Next);
    }

    pub fn previous(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Previous);
    }

    pub fn unspecified_action(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::Unspecified);
    }

    pub fn commit_content(&self, client_id: i64) {
        self.perform_action(client_id, TextInputAction::CommitContent);
    }

    /// Forward an IME private command to the framework.
    pub fn perform_private_command(&self, client_id: i64, action: &str, data: Value) {
        debug!(client_id, action, "sending private command");
        let payload = Value::map([("action", Value::from(action)), ("data", data)]);
        self.channel.invoke_method(
            "TextInputClient.performPrivateCommand",
            Value::List(vec![Value::I64(client_id), payload]),
            None,
        );
    }
}
