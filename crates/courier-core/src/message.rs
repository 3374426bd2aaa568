//! Protocol message model.
//!
//! A [`ProtocolMessage`] is one unit of a request/response exchange. The
//! channel only needs the handful of attributes declared on the trait:
//! version, transport, role, required protections, extra data and a
//! self-validation hook. Everything else about a message is the business of
//! the serializer that maps it to wire fields.
//!
//! Optional behaviour is exposed as capabilities rather than subtypes. A
//! message that can carry a signature returns `Some` from
//! [`as_tamper_resistant`](ProtocolMessage::as_tamper_resistant); a binding
//! element that signs messages simply declines anything returning `None`.

use std::{any::Any, fmt, time::SystemTime};

use courier_proto::{
    HttpMethod, HttpRequest, MessageFields, MessageRole, MessageTransport, ProtocolVersion,
    Protections,
};
use url::Url;

use crate::error::MessageValidationError;

/// Fields carried by a message beyond its declared schema, in wire order.
pub type ExtraData = MessageFields;

/// One protocol exchange unit.
///
/// Implementations must be `Send + Sync` because a channel is shared across
/// request-handling threads and attaches the message to its response.
pub trait ProtocolMessage: fmt::Debug + Send + Sync + 'static {
    /// Protocol version negotiated for this message
    fn version(&self) -> ProtocolVersion;

    /// How the message travels
    fn transport(&self) -> MessageTransport;

    /// Request or response
    fn role(&self) -> MessageRole;

    /// Protections the message cannot be trusted without
    fn required_protection(&self) -> Protections;

    /// Vendor and extension fields outside the declared schema
    fn extra_data(&self) -> &ExtraData;

    /// Mutable access to extra data, for transformation elements and the
    /// serializer
    fn extra_data_mut(&mut self) -> &mut ExtraData;

    /// Structural invariant check, independent of transport protection.
    ///
    /// Called after binding elements have run, both before transmission and
    /// before an incoming message is handed to the application.
    fn ensure_valid_message(&self) -> Result<(), MessageValidationError>;

    /// Name used in diagnostics
    fn message_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Addressing capability; `None` for messages with no recipient concept
    fn as_directed(&self) -> Option<&dyn DirectedMessage> {
        None
    }

    /// Signature slot
    fn as_tamper_resistant(&self) -> Option<&dyn TamperResistant> {
        None
    }

    /// Mutable signature slot
    fn as_tamper_resistant_mut(&mut self) -> Option<&mut dyn TamperResistant> {
        None
    }

    /// Creation timestamp slot
    fn as_expiring(&self) -> Option<&dyn Expiring> {
        None
    }

    /// Mutable creation timestamp slot
    fn as_expiring_mut(&mut self) -> Option<&mut dyn Expiring> {
        None
    }

    /// Nonce slot
    fn as_replay_protected(&self) -> Option<&dyn ReplayProtected> {
        None
    }

    /// Mutable nonce slot
    fn as_replay_protected_mut(&mut self) -> Option<&mut dyn ReplayProtected> {
        None
    }

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn ProtocolMessage {
    /// Borrow as concrete message type `T`.
    pub fn downcast_ref<T: ProtocolMessage>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow as concrete message type `T`.
    pub fn downcast_mut<T: ProtocolMessage>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Recipient, if the message is directed and has one.
    pub fn recipient(&self) -> Option<&Url> {
        self.as_directed().and_then(|directed| directed.recipient())
    }
}

/// A message addressed to a specific endpoint.
pub trait DirectedMessage {
    /// Where the message is going. `None` means the recipient is not yet
    /// known, which the channel treats as a usage error.
    fn recipient(&self) -> Option<&Url>;

    /// Preferred HTTP method when sent as a direct request.
    fn http_method(&self) -> HttpMethod {
        HttpMethod::Post
    }
}

/// A message that can carry a signature over its fields.
pub trait TamperResistant {
    /// Wire name of the signature field, excluded from the signed payload
    fn signature_field(&self) -> &'static str;

    /// Current signature
    fn signature(&self) -> Option<&str>;

    /// Replace the signature
    fn set_signature(&mut self, signature: Option<String>);
}

/// A message stamped with its creation time.
pub trait Expiring {
    /// When the sender created the message
    fn created_at(&self) -> Option<SystemTime>;

    /// Stamp the creation time
    fn set_created_at(&mut self, at: SystemTime);
}

/// A message carrying a single-use nonce.
pub trait ReplayProtected {
    /// Scope within which nonces must be unique (for example the sending
    /// party's identifier)
    fn nonce_context(&self) -> &str;

    /// Current nonce
    fn nonce(&self) -> Option<&str>;

    /// Replace the nonce
    fn set_nonce(&mut self, nonce: String);
}

/// Where an incoming request arrived, handed to the message factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivingEndpoint {
    /// Request URL without its query string
    pub location: Url,
    /// Method the request arrived with
    pub method: HttpMethod,
}

impl ReceivingEndpoint {
    /// Endpoint description of an incoming request
    pub fn from_request(request: &HttpRequest) -> Self {
        let mut location = request.url.clone();
        location.set_query(None);
        location.set_fragment(None);
        Self { location, method: request.method }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_query_and_fragment() {
        let url = Url::parse("https://rp.example/return?openid.mode=id_res#top").unwrap();
        let endpoint = ReceivingEndpoint::from_request(&HttpRequest::new(HttpMethod::Get, url));
        assert_eq!(endpoint.location.as_str(), "https://rp.example/return");
        assert_eq!(endpoint.method, HttpMethod::Get);
    }
}
