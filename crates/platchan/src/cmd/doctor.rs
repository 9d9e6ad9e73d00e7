use std::sync::{mpsc, Arc};
use std::time::Duration;

use platchan_channel::{MethodChannel, MethodResponse};
use platchan_codec::{Envelope, JsonMethodCodec, MethodCall, MethodCodec, StandardMethodCodec, Value};
use platchan_messenger::{LocalMessenger, MessengerConfig};
use platchan_systemchannels::{names, SystemChannels};
use serde::Serialize;
use tracing::debug;

use crate::cmd::DoctorArgs;
use crate::exit::{messenger_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
const LOOPBACK_CHANNEL: &str = "platchan/doctor";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn from_outcome(name: &'static str, outcome: Result<String, String>) -> Self {
        match outcome {
            Ok(detail) => Self {
                name,
                status: CheckStatus::Pass,
                detail,
            },
            Err(detail) => Self {
                name,
                status: CheckStatus::Fail,
                detail,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let messenger = LocalMessenger::pair(MessengerConfig {
        host_name: "doctor.host".to_string(),
        vm_name: "doctor.vm".to_string(),
        ..MessengerConfig::default()
    })
    .map_err(|err| messenger_error("failed to start loopback messenger", err))?;

    let checks = vec![
        CheckResult::from_outcome("standard_codec", codec_check(&StandardMethodCodec::INSTANCE)),
        CheckResult::from_outcome("json_codec", codec_check(&JsonMethodCodec::INSTANCE)),
        CheckResult::from_outcome("loopback_call", loopback_check(&messenger)),
        CheckResult::from_outcome("system_channels", system_channels_check(&messenger)),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = DoctorOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };
    print_doctor(&output, format);

    Ok(if has_fail { HEALTH_CHECK_FAILED } else { SUCCESS })
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("platchan doctor\n");
            for check in &output.checks {
                println!(
                    "  [{:>4}] {:<16} {}",
                    status_text(check.status),
                    check.name,
                    check.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => println!("{}", output.overall),
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
    }
}

fn sample_call() -> Result<MethodCall, String> {
    let args = Value::map([
        ("name", Value::from("doctor")),
        ("count", Value::I32(3)),
        ("ratio", Value::F64(0.5)),
        ("tags", Value::List(vec![Value::from("a"), Value::Null, Value::Bool(true)])),
    ]);
    MethodCall::new("doctor.check", args).map_err(|err| err.to_string())
}

fn codec_check(codec: &dyn MethodCodec) -> Result<String, String> {
    let call = sample_call()?;
    let encoded = codec
        .encode_method_call(&call)
        .map_err(|err| format!("encode failed: {err}"))?;
    let decoded = codec
        .decode_method_call(&encoded)
        .map_err(|err| format!("decode failed: {err}"))?;
    if decoded.method() != call.method() || decoded.args().get("count") != Some(&Value::I32(3)) {
        return Err(format!("method call changed in transit: {decoded:?}"));
    }

    let envelope = codec
        .encode_error_envelope("doctor", Some("expected"), &Value::Null)
        .and_then(|bytes| codec.decode_envelope(&bytes))
        .map_err(|err| format!("error envelope failed: {err}"))?;
    match envelope {
        Envelope::Error(err) if err.code == "doctor" => {}
        other => return Err(format!("unexpected error envelope: {other:?}")),
    }

    debug!(codec = codec.name(), size = encoded.len(), "codec check passed");
    Ok(format!("call and envelopes round-trip ({} bytes)", encoded.len()))
}

fn invoke(channel: &MethodChannel, method: &str, args: Value) -> Result<MethodResponse, String> {
    let (tx, rx) = mpsc::channel();
    channel.invoke_method(
        method,
        args,
        Some(Box::new(move |response: MethodResponse| {
            let _ = tx.send(response);
        })),
    );
    rx.recv_timeout(REPLY_TIMEOUT)
        .map_err(|_| format!("no reply to {method} within {REPLY_TIMEOUT:?}"))
}

fn loopback_check(messenger: &LocalMessenger) -> Result<String, String> {
    let codec: Arc<dyn MethodCodec> = Arc::new(StandardMethodCodec::INSTANCE);
    let host = MethodChannel::new(messenger.host(), LOOPBACK_CHANNEL, codec.clone());
    let vm = MethodChannel::new(messenger.vm(), LOOPBACK_CHANNEL, codec);

    match invoke(&host, "echo", Value::Null)? {
        MethodResponse::NotImplemented => {}
        other => return Err(format!("unregistered channel answered {other:?}")),
    }

    vm.set_method_call_handler(Some(Arc::new(
        |call: MethodCall, result: platchan_channel::MethodResult| -> platchan_channel::HandlerResult {
            result.success(call.args().clone());
            Ok(())
        },
    )));
    let response = invoke(&host, "echo", Value::from("ping"))?;
    vm.set_method_call_handler(None);

    match response {
        MethodResponse::Success(Value::String(text)) if text == "ping" => {
            Ok("host -> vm call answered".to_string())
        }
        other => Err(format!("echo returned {other:?}")),
    }
}

fn system_channels_check(messenger: &LocalMessenger) -> Result<String, String> {
    let _channels = SystemChannels::new(messenger.host());
    let framework = MethodChannel::new(
        messenger.vm(),
        names::TEXT_INPUT,
        Arc::new(JsonMethodCodec::INSTANCE),
    );

    match invoke(&framework, "TextInput.show", Value::Null)? {
        MethodResponse::NotImplemented => Ok("text input answers without a handler".to_string()),
        other => Err(format!("text input answered {other:?}")),
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "systemchannels") {
        features.push("systemchannels");
    }
    if cfg!(feature = "async") {
        features.push("async");
    }

    CheckResult {
        name: "compiled_features",
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codecs_pass_self_check() {
        assert!(codec_check(&StandardMethodCodec::INSTANCE).is_ok());
        assert!(codec_check(&JsonMethodCodec::INSTANCE).is_ok());
    }

    #[test]
    fn loopback_passes() {
        let messenger = LocalMessenger::new().expect("messenger should start");
        assert_eq!(
            loopback_check(&messenger),
            Ok("host -> vm call answered".to_string())
        );
        assert!(system_channels_check(&messenger).is_ok());
    }

    #[test]
    fn doctor_output_has_overall_status() {
        let output = DoctorOutput {
            checks: vec![CheckResult::from_outcome("x", Ok("ok".to_string()))],
            overall: "pass",
        };
        let json = serde_json::to_string(&output).expect("doctor output should serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("\"status\":\"pass\""));
    }
}
