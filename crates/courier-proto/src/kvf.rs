//! Key-value form encoding.
//!
//! Direct responses in the OpenID family use a line-oriented format: one
//! `key:value` pair per line, each line terminated by `\n`, UTF-8 encoded.
//! Keys may not contain `:` or `\n`; values may not contain `\n`. There is
//! no escaping mechanism, so unencodable input is an error rather than
//! something to be mangled.

use crate::{
    errors::{ProtocolError, Result},
    fields::MessageFields,
};

/// Content type used for key-value form bodies
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Encode a field set in key-value form.
pub fn encode(fields: &MessageFields) -> Result<String> {
    let mut out = String::with_capacity(fields.wire_size());
    for (key, value) in fields.iter() {
        if key.contains(':') {
            return Err(ProtocolError::KvfUnencodable {
                field: key.to_string(),
                reason: "key contains ':'",
            });
        }
        if key.contains('\n') {
            return Err(ProtocolError::KvfUnencodable {
                field: key.to_string(),
                reason: "key contains a newline",
            });
        }
        if value.contains('\n') {
            return Err(ProtocolError::KvfUnencodable {
                field: key.to_string(),
                reason: "value contains a newline",
            });
        }

        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    Ok(out)
}

/// Decode a key-value form body.
///
/// A missing final newline is tolerated. Empty lines are skipped.
pub fn decode(body: &[u8]) -> Result<MessageFields> {
    let text = std::str::from_utf8(body).map_err(|_| ProtocolError::KvfNotUtf8)?;

    let mut fields = MessageFields::new();
    for (index, line) in text.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        let (key, value) =
            line.split_once(':').ok_or(ProtocolError::KvfMissingSeparator { line: index + 1 })?;
        fields.insert(key, value)?;
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_one_line_per_field() {
        let fields =
            MessageFields::from_pairs([("mode", "id_res"), ("assoc_handle", "{HMAC-SHA1}{1}")])
                .unwrap();
        assert_eq!(encode(&fields).unwrap(), "mode:id_res\nassoc_handle:{HMAC-SHA1}{1}\n");
    }

    #[test]
    fn value_may_contain_colons() {
        let fields = MessageFields::from_pairs([("claimed_id", "https://me.example/")]).unwrap();
        let encoded = encode(&fields).unwrap();
        assert_eq!(decode(encoded.as_bytes()).unwrap(), fields);
    }

    #[test]
    fn rejects_colon_in_key() {
        let fields = MessageFields::from_pairs([("ns:sreg", "x")]).unwrap();
        assert!(matches!(encode(&fields), Err(ProtocolError::KvfUnencodable { .. })));
    }

    #[test]
    fn rejects_newline_in_value() {
        let fields = MessageFields::from_pairs([("error", "line one\nline two")]).unwrap();
        assert!(matches!(encode(&fields), Err(ProtocolError::KvfUnencodable { .. })));
    }

    #[test]
    fn decode_tolerates_missing_final_newline() {
        let fields = decode(b"a:1\nb:2").unwrap();
        assert_eq!(fields.get("b"), Some("2"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn decode_reports_line_without_separator() {
        let err = decode(b"a:1\nbroken\n").unwrap_err();
        assert_eq!(err, ProtocolError::KvfMissingSeparator { line: 2 });
    }

    #[test]
    fn decode_rejects_duplicate_keys() {
        assert_eq!(decode(b"a:1\na:2\n").unwrap_err(), ProtocolError::DuplicateField("a".into()));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(decode(&[0x61, 0x3a, 0xff, 0x0a]).unwrap_err(), ProtocolError::KvfNotUtf8);
    }
}
