//! Error types for the message channel.
//!
//! Failures fall into four families that callers handle differently:
//!
//! - [`UsageError`]: the integrating application called the channel wrong
//!   (missing recipient, direct request handed to `send`). Never retried.
//! - [`ConfigurationError`]: the binding element set is inconsistent.
//!   Raised once, at channel construction; no channel exists afterwards.
//! - [`ProtocolViolation`]: a message failed protection or structural
//!   checks, or the remote party answered with nothing usable. Carries the
//!   message type and, for protection shortfalls, the missing set.
//! - [`TransportError`]: the direct transport collaborator failed.
//!
//! "No message present" on receive is not an error at all; see
//! [`Received`](crate::channel::Received).

use std::time::Duration;

use courier_proto::{ProtectionKind, ProtocolError, Protections, StatusCode};
use thiserror::Error;

/// Top-level channel error.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Programming mistake by the caller
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Inconsistent channel configuration
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Message rejected by protocol rules
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// Direct transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ChannelError {
    /// True if the message was rejected on protocol grounds.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// True if the caller misused the channel.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Only transport timeouts and connection failures qualify. Protocol
    /// violations indicate a broken or malicious peer and are never
    /// transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_transient())
    }
}

/// Wire errors reaching the channel become protocol violations, except an
/// unrecognized transport name which is the caller's mistake.
impl From<ProtocolError> for ChannelError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownTransport(value) => {
                Self::Usage(UsageError::UnrecognizedTransport(value))
            },
            other => Self::Protocol(ProtocolViolation::Malformed(other)),
        }
    }
}

/// The caller handed the channel something it cannot act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// Indirect or request message that is not addressed to anyone
    #[error("{message_type} is not a directed message")]
    NotDirected {
        /// Type name of the message
        message_type: &'static str,
    },

    /// Directed message whose recipient is absent
    #[error("{message_type} has no recipient")]
    MissingRecipient {
        /// Type name of the message
        message_type: &'static str,
    },

    /// Direct requests go through `Channel::request`, not `Channel::send`
    #[error("{message_type} is a direct request; use request() to send it")]
    DirectRequestViaSend {
        /// Type name of the message
        message_type: &'static str,
    },

    /// `Channel::request` only carries direct requests
    #[error("{message_type} cannot be sent as a direct request: {reason}")]
    NotADirectRequest {
        /// Type name of the message
        message_type: &'static str,
        /// What disqualified it
        reason: &'static str,
    },

    /// Transport name outside the known set
    #[error("unrecognized message transport: {0:?}")]
    UnrecognizedTransport(String),
}

/// Binding element set that cannot form a valid pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Two elements claim the same protection
    #[error("more than one binding element provides {0}")]
    DuplicateProtection(ProtectionKind),

    /// An element's protection depends on kinds no element provides
    #[error("{protection} requires {missing}, which no binding element provides")]
    MissingDependency {
        /// The protection whose dependency chain is broken
        protection: ProtectionKind,
        /// Kinds that must be added
        missing: Protections,
    },

    /// The builder was not given a required collaborator
    #[error("channel builder is missing the {0}")]
    MissingCollaborator(&'static str),
}

/// A message was rejected on protocol grounds.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    /// Required protections were not applied
    #[error("unprotected message {message_type}: requires {required}, applied {applied}, missing {missing}")]
    UnprotectedMessage {
        /// Type name of the message
        message_type: &'static str,
        /// What the message declares as mandatory
        required: Protections,
        /// What the pipeline actually applied
        applied: Protections,
        /// `required - applied`
        missing: Protections,
    },

    /// The message's own structural validation failed
    #[error("invalid message {message_type}: {reason}")]
    InvalidMessage {
        /// Type name of the message
        message_type: &'static str,
        /// Validation failure
        reason: String,
    },

    /// A binding element refused the message
    #[error("{element} rejected {message_type}: {source}")]
    BindingFailed {
        /// Type name of the message
        message_type: &'static str,
        /// Name of the failing element
        element: String,
        /// Protection the element provides, if any
        protection: Option<ProtectionKind>,
        /// Element failure
        #[source]
        source: BindingError,
    },

    /// Direct response carried no body
    #[error("direct response to {request_type} was empty (status {status})")]
    EmptyResponse {
        /// Type name of the request
        request_type: &'static str,
        /// HTTP status of the response
        status: StatusCode,
    },

    /// Direct response body did not match any known response message
    #[error("no response message recognized for {request_type}")]
    NoResponseMessage {
        /// Type name of the request
        request_type: &'static str,
    },

    /// Malformed wire data
    #[error("malformed message: {0}")]
    Malformed(#[from] ProtocolError),
}

impl ProtocolViolation {
    /// Missing protections for [`Self::UnprotectedMessage`], empty otherwise.
    pub fn missing_protection(&self) -> Protections {
        match self {
            Self::UnprotectedMessage { missing, .. } => *missing,
            _ => Protections::empty(),
        }
    }
}

/// Failure reported by a binding element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Signature expected on an incoming message but absent
    #[error("message is not signed")]
    MissingSignature,

    /// Signature does not match the message content
    #[error("signature mismatch")]
    InvalidSignature,

    /// Creation timestamp expected but absent
    #[error("message carries no creation timestamp")]
    MissingTimestamp,

    /// Message older than the allowed age
    #[error("message expired: age {age:?} exceeds maximum {maximum:?}")]
    Expired {
        /// How old the message is
        age: Duration,
        /// Configured maximum
        maximum: Duration,
    },

    /// Message dated too far in the future
    #[error("message timestamp is {ahead:?} in the future, beyond allowed skew {skew:?}")]
    FromTheFuture {
        /// How far ahead of local time
        ahead: Duration,
        /// Configured clock skew tolerance
        skew: Duration,
    },

    /// Nonce expected but absent
    #[error("message carries no nonce")]
    MissingNonce,

    /// Nonce already seen within the replay window
    #[error("replayed nonce {nonce:?} in context {context:?}")]
    ReplayDetected {
        /// Nonce context
        context: String,
        /// The repeated nonce
        nonce: String,
    },

    /// Element-specific failure
    #[error("{0}")]
    Rejected(String),

    /// Wire error raised while the element serialized the message
    #[error(transparent)]
    Wire(#[from] ProtocolError),
}

/// Error from the message's own `ensure_valid_message` hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct MessageValidationError {
    /// Why the message is invalid
    pub reason: String,
}

impl MessageValidationError {
    /// Create a validation error
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Direct transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Could not reach the remote party or the connection broke
    #[error("connection to {url} failed: {reason}")]
    Connection {
        /// Target URL
        url: String,
        /// Underlying failure
        reason: String,
    },

    /// Remote party did not answer in time
    #[error("request to {url} timed out after {elapsed:?}")]
    Timeout {
        /// Target URL
        url: String,
        /// How long the transport waited
        elapsed: Duration,
    },

    /// Request was refused before it was sent
    #[error("request rejected by transport: {0}")]
    Rejected(String),
}

impl TransportError {
    /// Connection failures and timeouts may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}
