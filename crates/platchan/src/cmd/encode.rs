use platchan_codec::MethodCall;
use tracing::debug;

use crate::cmd::{parse_json_value, EncodeArgs};
use crate::exit::{codec_error, CliResult, SUCCESS};
use crate::output::{print_encoded, to_hex, EncodedOutput, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let codec = args.codec.codec();
    let call_args = parse_json_value("--args", args.args.as_deref())?;
    let call = MethodCall::new(args.method, call_args)
        .map_err(|err| codec_error("invalid method call", err))?;
    let payload = codec
        .encode_method_call(&call)
        .map_err(|err| codec_error("encode failed", err))?;

    debug!(codec = codec.name(), method = call.method(), size = payload.len(), "encoded method call");

    print_encoded(
        &EncodedOutput {
            codec: codec.name(),
            kind: "call",
            size: payload.len(),
            hex: to_hex(&payload),
        },
        format,
    );
    Ok(SUCCESS)
}
