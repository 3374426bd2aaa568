//! Message channel.
//!
//! The channel moves protocol messages between two parties and is the only
//! place where the binding pipeline, protection checks, and wire dispatch
//! meet.
//!
//! # Sending
//!
//! ```text
//!            ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌──────────┐
//! message ──>│ classify │──>│ prepare │──>│ serialize │──>│ dispatch │──> UserAgentResponse
//!            └──────────┘   └─────────┘   └───────────┘   └──────────┘
//!                 │              │                             │
//!             usage error   protocol error        direct: variant writes response
//!                                                 indirect: redirect or form POST
//! ```
//!
//! *Prepare* notifies observers, runs the pipeline forward, checks that the
//! protections the message requires were all applied, then runs the
//! message's own validation. A message that fails any step never reaches
//! the wire.
//!
//! # Receiving
//!
//! Fields come from the POST form body, or from the query string when the
//! form is empty. The factory decides which message they are; no match is
//! [`Received::Absent`], not an error. A recognized message is deserialized,
//! run through the pipeline in reverse, and checked exactly like an
//! outgoing one.
//!
//! # Direct requests
//!
//! [`Channel::request`] prepares a direct request, hands it to the direct
//! transport, waits for the answer, and returns the response message after
//! the same receive-side checks. An empty or unrecognized answer is a
//! protocol violation.
//!
//! # Concurrency
//!
//! A channel is `Send + Sync` and holds no mutable state; its binding
//! element list is fixed at construction. Elements with state of their own
//! synchronize it themselves.

mod builder;

use std::{fmt, sync::Arc};

use courier_proto::{
    HttpRequest, MessageFields, MessageRole, MessageTransport, ProtocolError, Protections,
};
use tracing::{debug, trace, warn};
use url::Url;

pub use self::builder::{ChannelBuilder, ChannelConfig};
use crate::{
    binding::BindingContext,
    collaborators::{DirectWebRequestHandler, MessageFactory, MessageSerializer},
    encoder::IndirectEncoder,
    env::Environment,
    error::{ChannelError, ProtocolViolation, UsageError},
    message::{ProtocolMessage, ReceivingEndpoint},
    observer::ChannelObserver,
    pipeline::{BindingPipeline, ElementFailure},
    response::UserAgentResponse,
    variant::ProtocolVariant,
};

/// Outcome of reading a message from an incoming request.
#[derive(Debug)]
pub enum Received {
    /// The request carries no message this party recognizes
    Absent,

    /// A message was recognized but failed protocol checks
    Rejected(ProtocolViolation),

    /// A message passed every check
    Valid(Box<dyn ProtocolMessage>),
}

impl Received {
    /// True for [`Received::Absent`]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// True for [`Received::Valid`]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// True for [`Received::Rejected`]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Collapse into `Ok(None)` / `Err(violation)` / `Ok(Some(message))`.
    pub fn into_result(self) -> Result<Option<Box<dyn ProtocolMessage>>, ProtocolViolation> {
        match self {
            Self::Absent => Ok(None),
            Self::Rejected(violation) => Err(violation),
            Self::Valid(message) => Ok(Some(message)),
        }
    }

    /// The message if valid
    pub fn into_message(self) -> Option<Box<dyn ProtocolMessage>> {
        match self {
            Self::Valid(message) => Some(message),
            Self::Absent | Self::Rejected(_) => None,
        }
    }
}

/// Where an outgoing message goes after preparation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    DirectResponse,
    Indirect(Url),
}

/// Protocol message channel, generic over the protocol variant's direct
/// wire conventions.
pub struct Channel<V> {
    variant: V,
    factory: Arc<dyn MessageFactory>,
    serializer: Arc<dyn MessageSerializer>,
    web_request_handler: Arc<dyn DirectWebRequestHandler>,
    env: Arc<dyn Environment>,
    pipeline: BindingPipeline,
    encoder: IndirectEncoder,
    observers: Vec<Arc<dyn ChannelObserver>>,
}

impl<V: ProtocolVariant> Channel<V> {
    /// Start building a channel for `variant`.
    pub fn builder(variant: V) -> ChannelBuilder<V> {
        ChannelBuilder::new(variant)
    }

    /// The protocol variant
    pub fn variant(&self) -> &V {
        &self.variant
    }

    /// The validated binding pipeline
    pub fn pipeline(&self) -> &BindingPipeline {
        &self.pipeline
    }

    /// The indirect message encoder
    pub fn encoder(&self) -> &IndirectEncoder {
        &self.encoder
    }

    /// Prepare and dispatch an outgoing message.
    ///
    /// Direct responses are written by the protocol variant; indirect
    /// messages become a redirect or a self-submitting form. The returned
    /// response carries `message`.
    ///
    /// # Errors
    ///
    /// - `Usage` if the message is a direct request, or an indirect message
    ///   without a recipient
    /// - `Protocol` if required protections were not applied or the message
    ///   fails its own validation
    pub fn send(
        &self,
        mut message: Box<dyn ProtocolMessage>,
    ) -> Result<UserAgentResponse, ChannelError> {
        let route = classify(message.as_ref())?;
        self.prepare_message_for_sending(message.as_mut())?;

        let fields = self.serializer.serialize(message.as_ref())?;
        let response = match &route {
            Route::DirectResponse => self.variant.write_direct_response(message.as_ref(), &fields)?,
            Route::Indirect(recipient) => self.encoder.encode(recipient, &fields),
        };

        debug!(
            message_type = message.message_type(),
            variant = self.variant.name(),
            status = %response.status,
            "message sent"
        );
        Ok(response.attach(message))
    }

    /// Run the send-side pipeline and checks without dispatching.
    ///
    /// Returns the protections applied.
    pub fn prepare_message_for_sending(
        &self,
        message: &mut dyn ProtocolMessage,
    ) -> Result<Protections, ChannelError> {
        for observer in &self.observers {
            observer.on_sending(message);
        }
        debug!(
            message_type = message.message_type(),
            transport = %message.transport(),
            required = %message.required_protection(),
            "preparing message for sending"
        );

        let applied = self
            .pipeline
            .prepare_for_sending(&self.binding_context(), message)
            .map_err(|failure| element_violation(message.message_type(), failure))?;
        ensure_protection(message, applied)?;
        ensure_valid(message)?;

        Ok(applied)
    }

    /// Read the message, if any, carried by an incoming request.
    pub fn read_from_request(&self, request: &HttpRequest) -> Received {
        let fields = match extract_fields(request) {
            Ok(fields) => fields,
            Err(err) => return Received::Rejected(self.rejected(err.into())),
        };
        if fields.is_empty() {
            trace!(url = %request.url, "no message fields in request");
            return Received::Absent;
        }

        let endpoint = ReceivingEndpoint::from_request(request);
        let Some(mut message) = self.factory.new_request_message(&endpoint, &fields) else {
            debug!(url = %request.url, fields = fields.len(), "no message recognized");
            return Received::Absent;
        };

        match self.receive(message.as_mut(), &fields) {
            Ok(applied) => {
                debug!(
                    message_type = message.message_type(),
                    applied = %applied,
                    "message received"
                );
                self.accepted(message.as_ref());
                Received::Valid(message)
            },
            Err(violation) => Received::Rejected(self.rejected(violation)),
        }
    }

    /// Send a direct request and wait for its response.
    ///
    /// Blocks until the direct transport returns. The response goes through
    /// the same receive-side checks as [`read_from_request`](Self::read_from_request).
    ///
    /// # Errors
    ///
    /// - `Usage` if `message` is not a directed direct request with a
    ///   recipient
    /// - `Transport` if the exchange itself failed
    /// - `Protocol` if either message fails its checks, or the response is
    ///   empty or unrecognized
    pub fn request(
        &self,
        mut message: Box<dyn ProtocolMessage>,
    ) -> Result<Box<dyn ProtocolMessage>, ChannelError> {
        let recipient = classify_request(message.as_ref())?;
        self.prepare_message_for_sending(message.as_mut())?;

        let request_type = message.message_type();
        let fields = self.serializer.serialize(message.as_ref())?;
        let http_request = self.variant.create_http_request(message.as_ref(), &recipient, &fields)?;
        debug!(
            message_type = request_type,
            method = %http_request.method,
            recipient = %recipient,
            "sending direct request"
        );

        let http_response = self.web_request_handler.execute(http_request)?;
        let response_fields = self
            .variant
            .read_from_response(&http_response)
            .map_err(|err| self.rejected(err.into()))?
            .ok_or_else(|| {
                self.rejected(ProtocolViolation::EmptyResponse {
                    request_type,
                    status: http_response.status,
                })
            })?;

        let mut response = self
            .factory
            .new_response_message(message.as_ref(), &response_fields)
            .ok_or_else(|| self.rejected(ProtocolViolation::NoResponseMessage { request_type }))?;

        self.receive(response.as_mut(), &response_fields).map_err(|v| self.rejected(v))?;
        self.accepted(response.as_ref());
        Ok(response)
    }

    /// Run the receive-side pipeline and checks on an already deserialized
    /// message. Returns the protections applied.
    pub fn process_incoming_message(
        &self,
        message: &mut dyn ProtocolMessage,
    ) -> Result<Protections, ProtocolViolation> {
        let applied = self
            .pipeline
            .prepare_for_receiving(&self.binding_context(), message)
            .map_err(|failure| element_violation(message.message_type(), failure))?;
        ensure_protection(message, applied)?;
        ensure_valid(message)?;

        Ok(applied)
    }

    fn receive(
        &self,
        message: &mut dyn ProtocolMessage,
        fields: &MessageFields,
    ) -> Result<Protections, ProtocolViolation> {
        self.serializer.deserialize(fields, message)?;
        self.process_incoming_message(message)
    }

    fn binding_context(&self) -> BindingContext<'_> {
        BindingContext { serializer: self.serializer.as_ref(), env: self.env.as_ref() }
    }

    fn accepted(&self, message: &dyn ProtocolMessage) {
        for observer in &self.observers {
            observer.on_received(message);
        }
    }

    fn rejected(&self, violation: ProtocolViolation) -> ProtocolViolation {
        warn!(%violation, "rejected incoming message");
        for observer in &self.observers {
            observer.on_rejected(&violation);
        }
        violation
    }
}

impl<V: fmt::Debug> fmt::Debug for Channel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("variant", &self.variant)
            .field("pipeline", &self.pipeline)
            .field("encoder", &self.encoder)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

/// Decide how an outgoing message leaves through [`Channel::send`].
fn classify(message: &dyn ProtocolMessage) -> Result<Route, UsageError> {
    let message_type = message.message_type();

    match (message.transport(), message.role()) {
        (MessageTransport::Direct, MessageRole::Response) => Ok(Route::DirectResponse),
        (MessageTransport::Direct, MessageRole::Request) => {
            Err(UsageError::DirectRequestViaSend { message_type })
        },
        (MessageTransport::Indirect, _) => recipient_of(message).map(Route::Indirect),
    }
}

/// Recipient of a message handed to [`Channel::request`].
fn classify_request(message: &dyn ProtocolMessage) -> Result<Url, UsageError> {
    let message_type = message.message_type();

    if message.role() != MessageRole::Request {
        return Err(UsageError::NotADirectRequest { message_type, reason: "it is a response" });
    }
    if message.transport() != MessageTransport::Direct {
        return Err(UsageError::NotADirectRequest {
            message_type,
            reason: "it travels through the user agent",
        });
    }
    recipient_of(message)
}

fn recipient_of(message: &dyn ProtocolMessage) -> Result<Url, UsageError> {
    let message_type = message.message_type();
    let directed = message.as_directed().ok_or(UsageError::NotDirected { message_type })?;
    directed.recipient().cloned().ok_or(UsageError::MissingRecipient { message_type })
}

/// Form body fields, falling back to the query string only when the form
/// carries nothing.
fn extract_fields(request: &HttpRequest) -> Result<MessageFields, ProtocolError> {
    let form = request.form_fields()?;
    if !form.is_empty() {
        return Ok(form);
    }
    request.query_fields()
}

fn ensure_protection(
    message: &dyn ProtocolMessage,
    applied: Protections,
) -> Result<(), ProtocolViolation> {
    let required = message.required_protection();
    let missing = required - applied;
    if missing.is_empty() {
        return Ok(());
    }

    Err(ProtocolViolation::UnprotectedMessage {
        message_type: message.message_type(),
        required,
        applied,
        missing,
    })
}

fn ensure_valid(message: &dyn ProtocolMessage) -> Result<(), ProtocolViolation> {
    message.ensure_valid_message().map_err(|err| ProtocolViolation::InvalidMessage {
        message_type: message.message_type(),
        reason: err.reason,
    })
}

fn element_violation(message_type: &'static str, failure: ElementFailure) -> ProtocolViolation {
    ProtocolViolation::BindingFailed {
        message_type,
        element: failure.element,
        protection: failure.protection,
        source: failure.error,
    }
}
