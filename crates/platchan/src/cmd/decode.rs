use platchan_codec::Envelope;
use serde_json::Value as Json;

use crate::cmd::{DecodeArgs, PayloadKind};
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{from_hex, print_decoded, value_to_json, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let codec = args.codec.codec();
    let payload = from_hex(&args.hex)?;

    let fields = match args.kind {
        PayloadKind::Call => {
            let call = codec
                .decode_method_call(&payload)
                .map_err(|err| codec_error("decode failed", err))?;
            vec![
                ("kind", Json::from("call")),
                ("method", Json::from(call.method())),
                ("args", value_to_json(call.args())),
            ]
        }
        PayloadKind::Envelope => match codec
            .decode_envelope(&payload)
            .map_err(|err| codec_error("decode failed", err))?
        {
            Envelope::Success(result) => vec![
                ("kind", Json::from("success")),
                ("result", value_to_json(&result)),
            ],
            Envelope::Error(err) => vec![
                ("kind", Json::from("error")),
                ("code", Json::from(err.code)),
                ("message", err.message.map_or(Json::Null, Json::from)),
                ("details", value_to_json(&err.details)),
                ("stacktrace", err.stacktrace.map_or(Json::Null, Json::from)),
            ],
        },
    };

    print_decoded(&fields, format);
    Ok(SUCCESS)
}
