use clap::{Args, Subcommand, ValueEnum};
use platchan_codec::{JsonMethodCodec, MethodCodec, StandardMethodCodec};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod doctor;
pub mod encode;
pub mod envelope;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a method call.
    Encode(EncodeArgs),
    /// Decode a hex payload as a method call or envelope.
    Decode(DecodeArgs),
    /// Encode a success or error envelope.
    Envelope(EnvelopeArgs),
    /// Run codec and loopback self-checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Envelope(args) => envelope::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum CodecKind {
    /// Binary codec (`StandardMethodCodec`).
    #[default]
    Standard,
    /// Textual codec (`JSONMethodCodec`).
    Json,
}

impl CodecKind {
    pub fn codec(self) -> &'static dyn MethodCodec {
        match self {
            CodecKind::Standard => &StandardMethodCodec::INSTANCE,
            CodecKind::Json => &JsonMethodCodec::INSTANCE,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PayloadKind {
    /// A method call.
    Call,
    /// A reply envelope.
    Envelope,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Codec to encode with.
    #[arg(long, value_enum, default_value_t = CodecKind::Standard)]
    pub codec: CodecKind,
    /// Method name.
    #[arg(long, short = 'm')]
    pub method: String,
    /// Arguments as JSON.
    #[arg(long, value_name = "JSON")]
    pub args: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Codec the payload was encoded with.
    #[arg(long, value_enum, default_value_t = CodecKind::Standard)]
    pub codec: CodecKind,
    /// What the payload holds.
    #[arg(long, value_enum)]
    pub kind: PayloadKind,
    /// Payload as hex.
    pub hex: String,
}

#[derive(Args, Debug)]
pub struct EnvelopeArgs {
    /// Codec to encode with.
    #[arg(long, value_enum, default_value_t = CodecKind::Standard)]
    pub codec: CodecKind,
    /// Success envelope carrying this JSON result.
    #[arg(long, value_name = "JSON", conflicts_with = "error", required_unless_present = "error")]
    pub success: Option<String>,
    /// Error envelope with this error code.
    #[arg(long, value_name = "CODE")]
    pub error: Option<String>,
    /// Error message.
    #[arg(long, requires = "error")]
    pub message: Option<String>,
    /// Error details as JSON.
    #[arg(long, value_name = "JSON", requires = "error")]
    pub details: Option<String>,
    /// Stack trace text for the error.
    #[arg(long, requires = "error")]
    pub stacktrace: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

/// Parse an optional JSON flag into a codec value; absent means null.
pub fn parse_json_value(flag: &str, input: Option<&str>) -> CliResult<platchan_codec::Value> {
    match input {
        None => Ok(platchan_codec::Value::Null),
        Some(text) => serde_json::from_str::<serde_json::Value>(text)
            .map(platchan_codec::Value::from)
            .map_err(|err| crate::exit::json_arg_error(flag, err)),
    }
}
