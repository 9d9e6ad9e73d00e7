use crate::cmd::{parse_json_value, EnvelopeArgs};
use crate::exit::{codec_error, CliError, CliResult, SUCCESS};
use crate::output::{print_encoded, to_hex, EncodedOutput, OutputFormat};

pub fn run(args: EnvelopeArgs, format: OutputFormat) -> CliResult<i32> {
    let codec = args.codec.codec();

    let (kind, encoded) = match (&args.success, &args.error) {
        (Some(result), None) => {
            let result = parse_json_value("--success", Some(result.as_str()))?;
            ("success", codec.encode_success_envelope(&result))
        }
        (None, Some(code)) => {
            let details = parse_json_value("--details", args.details.as_deref())?;
            let message = args.message.as_deref();
            let encoded = match &args.stacktrace {
                Some(stacktrace) => {
                    codec.encode_error_envelope_with_stacktrace(code, message, &details, stacktrace)
                }
                None => codec.encode_error_envelope(code, message, &details),
            };
            ("error", encoded)
        }
        _ => return Err(CliError::usage("pass exactly one of --success or --error")),
    };
    let payload = encoded.map_err(|err| codec_error("encode failed", err))?;

    print_encoded(
        &EncodedOutput {
            codec: codec.name(),
            kind,
            size: payload.len(),
            hex: to_hex(&payload),
        },
        format,
    );
    Ok(SUCCESS)
}
