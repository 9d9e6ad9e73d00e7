use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use platchan_codec::Value;
use serde::Serialize;

use crate::exit::{CliError, CliResult};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// An encoded payload ready to print.
#[derive(Serialize)]
pub struct EncodedOutput<'a> {
    pub codec: &'a str,
    pub kind: &'a str,
    pub size: usize,
    pub hex: String,
}

pub fn print_encoded(out: &EncodedOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODEC", "KIND", "SIZE", "HEX"])
                .add_row(vec![
                    out.codec.to_string(),
                    out.kind.to_string(),
                    out.size.to_string(),
                    out.hex.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "codec={} kind={} size={} hex={}",
                out.codec, out.kind, out.size, out.hex
            );
        }
        OutputFormat::Raw => println!("{}", out.hex),
    }
}

/// Print decoded fields. `fields` keep their order in table and pretty
/// output; JSON output is the serialized object.
pub fn print_decoded(fields: &[(&str, serde_json::Value)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect();
            print_json(&object);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (key, value) in fields {
                table.add_row(vec![key.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (key, value) in fields {
                println!("{key}={value}");
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// JSON view of a decoded value. Values JSON cannot hold (non-string map
/// keys, non-finite floats) fall back to their debug text.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    value
        .to_json()
        .unwrap_or_else(|_| serde_json::Value::String(format!("{value:?}")))
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse a hex string, ignoring whitespace and an optional `0x` prefix.
pub fn from_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);

    hex::decode(digits).map_err(|err| CliError::usage(format!("invalid hex payload: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = [0x00, 0x07, 0xab, 0xff];
        assert_eq!(to_hex(&bytes), "0007abff");
        assert_eq!(from_hex("0007abff").unwrap(), bytes);
        assert_eq!(from_hex("0x00 07 AB ff").unwrap(), bytes);
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(from_hex("abc").is_err());
        assert!(from_hex("zz").is_err());
        assert!(from_hex("+f").is_err());
        assert!(from_hex("a\u{e9}0").is_err());
    }

    #[test]
    fn unrepresentable_values_fall_back_to_debug() {
        let value = Value::Map(vec![(Value::I32(1), Value::Null)]);
        assert!(value_to_json(&value).is_string());
    }
}
