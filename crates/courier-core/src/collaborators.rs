//! External collaborators consumed by the channel.
//!
//! The channel decides *when* a message is serialized, which concrete type
//! an incoming field set becomes, and when a direct request goes out. It
//! does not know *how*: those are the jobs of the implementations plugged
//! in here. Each protocol family supplies its own.

use courier_proto::{HttpRequest, HttpResponse, MessageFields, ProtocolError};

use crate::{
    error::TransportError,
    message::{ProtocolMessage, ReceivingEndpoint},
};

/// Recognizes which concrete message type a field set represents.
///
/// Implementations must be pure with respect to channel state: the same
/// inputs always yield the same kind of message, and nothing is recorded.
pub trait MessageFactory: Send + Sync {
    /// Blank request message for fields that arrived at `recipient`, or
    /// `None` if the fields are not a request this party understands.
    fn new_request_message(
        &self,
        recipient: &ReceivingEndpoint,
        fields: &MessageFields,
    ) -> Option<Box<dyn ProtocolMessage>>;

    /// Blank response message answering `request`, or `None` if the fields
    /// are not a recognized response.
    fn new_response_message(
        &self,
        request: &dyn ProtocolMessage,
        fields: &MessageFields,
    ) -> Option<Box<dyn ProtocolMessage>>;
}

/// Maps messages to and from wire fields.
///
/// Unknown incoming fields belong in the message's extra data; outgoing
/// extra data is emitted after the declared fields. Duplicate keys are an
/// error in both directions.
pub trait MessageSerializer: Send + Sync {
    /// Every wire field of `message`, declared fields first.
    fn serialize(&self, message: &dyn ProtocolMessage) -> Result<MessageFields, ProtocolError>;

    /// Populate `message` from `fields`.
    fn deserialize(
        &self,
        fields: &MessageFields,
        message: &mut dyn ProtocolMessage,
    ) -> Result<(), ProtocolError>;
}

/// Executes direct (server-to-server) HTTP exchanges.
///
/// Blocks the calling thread until the full response is read. Timeouts,
/// retries and connection reuse are the implementation's business.
pub trait DirectWebRequestHandler: Send + Sync {
    /// Send `request` and return whatever came back.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
