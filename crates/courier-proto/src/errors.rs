//! Error types for the Courier wire format.
//!
//! All errors are structured, testable, and name the offending input.

use thiserror::Error;

/// Wire-level errors raised while parsing or building field sets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    // Field set errors
    /// The same key appeared twice in one field set
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// A field required by the message schema is absent
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field value could not be interpreted
    #[error("invalid value for field {field}: {reason}")]
    InvalidField {
        /// Name of the field
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    // Key-value form errors
    /// A key-value form line had no `:` separator
    #[error("key-value form line {line} has no ':' separator")]
    KvfMissingSeparator {
        /// 1-based line number
        line: usize,
    },

    /// A key or value contains a character key-value form cannot carry
    #[error("key-value form cannot encode {field}: {reason}")]
    KvfUnencodable {
        /// Name of the field
        field: String,
        /// Offending character description
        reason: &'static str,
    },

    /// Key-value form body was not valid UTF-8
    #[error("key-value form body is not valid UTF-8")]
    KvfNotUtf8,

    // Vocabulary errors
    /// Transport name is not one of the known transports
    #[error("unrecognized message transport: {0:?}")]
    UnknownTransport(String),

    /// Protocol version string could not be parsed
    #[error("invalid protocol version: {0:?}")]
    InvalidVersion(String),
}

/// Convenient Result type alias for wire operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
