//! Subcommand implementations.
//!
//! Each command takes parsed arguments and an output sink. Nothing here
//! touches stdout directly.

use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

use courier_core::{EncoderConfig, IndirectEncoder, IndirectEncoding};
use courier_proto::{MessageFields, ProtocolError, kvf};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Command failure.
#[derive(Debug, Error)]
pub enum CliError {
    /// A positional argument was not `key=value`
    #[error("expected key=value, got {0:?}")]
    NotAPair(String),

    /// Fields could not be built or decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading input or writing output failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Parse one `key=value` argument. Only the first `=` separates, so values
/// may contain `=`.
pub fn parse_field(arg: &str) -> Result<(String, String), CliError> {
    let (key, value) = arg.split_once('=').ok_or_else(|| CliError::NotAPair(arg.to_string()))?;
    Ok((key.to_string(), value.to_string()))
}

/// Read a whole input file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Ok(fs::read(path)?)
}

/// Show how `pairs` would be delivered to `recipient` as an indirect message.
///
/// Prints the routing decision, then the user-agent response: status,
/// headers, and the body if there is one.
pub fn encode(
    out: &mut impl Write,
    recipient: &Url,
    threshold: Option<usize>,
    pairs: Vec<(String, String)>,
) -> Result<(), CliError> {
    let fields = MessageFields::from_pairs(pairs)?;
    let mut config = EncoderConfig::default();
    if let Some(threshold) = threshold {
        config.get_to_post_threshold = threshold;
    }
    let encoder = IndirectEncoder::new(config);

    let route = match encoder.choose(&fields) {
        IndirectEncoding::Redirect => "redirect",
        IndirectEncoding::FormPost => "form post",
    };
    debug!(recipient = %recipient, fields = fields.len(), route, "encoding");

    let response = encoder.encode(recipient, &fields);
    writeln!(
        out,
        "route: {route} (wire size {}, threshold {})",
        fields.wire_size(),
        encoder.config().get_to_post_threshold
    )?;
    writeln!(out, "status: {}", response.status)?;
    for (name, value) in response.headers.iter() {
        writeln!(out, "{name}: {value}")?;
    }
    if let Some(body) = &response.body {
        writeln!(out)?;
        out.write_all(body)?;
    }
    Ok(())
}

/// Print a key-value form document as one urlencoded line.
pub fn decode_kvf(out: &mut impl Write, input: &[u8]) -> Result<(), CliError> {
    let fields = kvf::decode(input)?;
    debug!(fields = fields.len(), "decoded key-value form");
    writeln!(out, "{}", fields.to_urlencoded())?;
    Ok(())
}

/// Print the wire size the encoder compares against its threshold.
pub fn size(out: &mut impl Write, pairs: Vec<(String, String)>) -> Result<(), CliError> {
    let fields = MessageFields::from_pairs(pairs)?;
    writeln!(out, "{}", fields.wire_size())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(parse_field("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert_eq!(parse_field("empty=").unwrap(), ("empty".to_string(), String::new()));
    }

    #[test]
    fn parse_field_requires_equals() {
        assert!(matches!(parse_field("novalue"), Err(CliError::NotAPair(arg)) if arg == "novalue"));
    }

    #[test]
    fn size_rejects_duplicate_keys() {
        let pairs = vec![("a".to_string(), "1".to_string()), ("a".to_string(), "2".to_string())];
        let err = size(&mut Vec::new(), pairs).unwrap_err();
        assert!(matches!(err, CliError::Protocol(ProtocolError::DuplicateField(key)) if key == "a"));
    }
}
