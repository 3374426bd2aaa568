//! Wire vocabulary for the Courier message channel.
//!
//! Protocol messages cross the wire as flat key/value field sets. Indirect
//! messages ride in a URL query string or an auto-submitted HTML form body,
//! both `application/x-www-form-urlencoded`. Direct messages travel in the
//! body of a server-to-server HTTP exchange, either urlencoded or in
//! key-value form (`key:value\n` lines).
//!
//! This crate owns the types both parties must agree on: the protection
//! flags a message may declare, the transport and role enums, protocol
//! versions, ordered field maps with their two encodings, and the
//! HTTP-shaped request/response values handed to and from a transport.
//! Nothing here performs I/O.
//!
//! # Security
//!
//! Field maps reject duplicate keys at every entry point. A message whose
//! wire form names the same field twice is malformed, never "last one wins".
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod fields;
pub mod http;
pub mod kvf;
pub mod protection;
pub mod transport;
pub mod version;

pub use errors::{ProtocolError, Result};
pub use fields::MessageFields;
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse, StatusCode};
pub use protection::{ProtectionKind, Protections};
pub use transport::{MessageRole, MessageTransport};
pub use version::ProtocolVersion;
