//! Test message type with its factory and serializer.
//!
//! [`TestMessage`] is a single concrete message whose transport, role,
//! required protections and supported capabilities are all chosen per
//! instance, so one type covers every routing and protection case.
//!
//! Wire layout written by [`TestSerializer`]:
//!
//! | field | content |
//! |---|---|
//! | `mode` | message mode, always present |
//! | `payload` | free text, optional |
//! | `realm` | nonce context |
//! | `created_at` | creation time in unix seconds, optional |
//! | `nonce` | replay nonce, optional |
//! | `sig` | signature, optional |
//!
//! Anything else lands in the message's extra data.

use std::{
    any::Any,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use courier_core::{
    collaborators::{MessageFactory, MessageSerializer},
    error::MessageValidationError,
    message::{
        DirectedMessage, Expiring, ExtraData, ProtocolMessage, ReceivingEndpoint, ReplayProtected,
        TamperResistant,
    },
};
use courier_proto::{
    HttpMethod, MessageFields, MessageRole, MessageTransport, ProtocolError, ProtocolVersion,
    Protections,
};
use url::Url;

/// Wire name of the signature field
pub const SIGNATURE_FIELD: &str = "sig";

/// Default nonce context
pub const DEFAULT_REALM: &str = "https://rp.example/";

/// Configurable protocol message for channel tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMessage {
    /// Message mode; an empty mode fails validation
    pub mode: String,
    /// Free-form content
    pub payload: Option<String>,
    /// Nonce context
    pub realm: String,
    /// Destination, if known
    pub recipient: Option<Url>,
    /// Method preferred for direct requests
    pub method: HttpMethod,
    /// Whether the message exposes the addressing capability
    pub addressable: bool,
    /// Capability slots the message exposes
    pub supported: Protections,
    /// Transport
    pub transport: MessageTransport,
    /// Role
    pub role: MessageRole,
    /// Protections the message requires
    pub required: Protections,
    /// Signature slot
    pub signature: Option<String>,
    /// Creation time slot
    pub created_at: Option<SystemTime>,
    /// Nonce slot
    pub nonce: Option<String>,
    /// Unrecognized fields
    pub extra: ExtraData,
}

impl TestMessage {
    fn blank(transport: MessageTransport, role: MessageRole) -> Self {
        Self {
            mode: String::new(),
            payload: None,
            realm: DEFAULT_REALM.to_string(),
            recipient: None,
            method: HttpMethod::Post,
            addressable: true,
            supported: Protections::all(),
            transport,
            role,
            required: Protections::empty(),
            signature: None,
            created_at: None,
            nonce: None,
            extra: ExtraData::new(),
        }
    }

    /// Indirect request, such as an authentication request relayed by the
    /// browser
    pub fn indirect_request(mode: &str, recipient: Url) -> Self {
        Self::blank(MessageTransport::Indirect, MessageRole::Request)
            .with_mode(mode)
            .with_recipient(recipient)
    }

    /// Indirect response, such as an assertion relayed back by the browser
    pub fn indirect_response(mode: &str, recipient: Url) -> Self {
        Self::blank(MessageTransport::Indirect, MessageRole::Response)
            .with_mode(mode)
            .with_recipient(recipient)
    }

    /// Direct request made server to server
    pub fn direct_request(mode: &str, recipient: Url) -> Self {
        Self::blank(MessageTransport::Direct, MessageRole::Request)
            .with_mode(mode)
            .with_recipient(recipient)
    }

    /// Direct response written back to the requesting server
    pub fn direct_response(mode: &str) -> Self {
        Self::blank(MessageTransport::Direct, MessageRole::Response).with_mode(mode)
    }

    /// Set the mode
    #[must_use]
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    /// Set the payload
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Set the recipient
    #[must_use]
    pub fn with_recipient(mut self, recipient: Url) -> Self {
        self.recipient = Some(recipient);
        self
    }

    /// Clear the recipient
    #[must_use]
    pub fn without_recipient(mut self) -> Self {
        self.recipient = None;
        self
    }

    /// Hide the addressing capability entirely
    #[must_use]
    pub fn undirected(mut self) -> Self {
        self.addressable = false;
        self
    }

    /// Set the preferred direct request method
    #[must_use]
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the required protections
    #[must_use]
    pub fn requiring(mut self, required: Protections) -> Self {
        self.required = required;
        self
    }

    /// Restrict which capability slots are exposed
    #[must_use]
    pub fn supporting(mut self, supported: Protections) -> Self {
        self.supported = supported;
        self
    }

    /// Set the nonce context
    #[must_use]
    pub fn with_realm(mut self, realm: &str) -> Self {
        self.realm = realm.to_string();
        self
    }

    /// Add an extra field
    #[must_use]
    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.set(key, value);
        self
    }

    /// Same shape as `self` with every wire-populated slot cleared.
    #[must_use]
    pub fn blank_like(&self) -> Self {
        let mut blank = Self::blank(self.transport, self.role);
        blank.addressable = self.addressable;
        blank.supported = self.supported;
        blank.required = self.required;
        blank.method = self.method;
        blank
    }
}

impl DirectedMessage for TestMessage {
    fn recipient(&self) -> Option<&Url> {
        self.recipient.as_ref()
    }

    fn http_method(&self) -> HttpMethod {
        self.method
    }
}

impl TamperResistant for TestMessage {
    fn signature_field(&self) -> &'static str {
        SIGNATURE_FIELD
    }

    fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    fn set_signature(&mut self, signature: Option<String>) {
        self.signature = signature;
    }
}

impl Expiring for TestMessage {
    fn created_at(&self) -> Option<SystemTime> {
        self.created_at
    }

    fn set_created_at(&mut self, at: SystemTime) {
        self.created_at = Some(at);
    }
}

impl ReplayProtected for TestMessage {
    fn nonce_context(&self) -> &str {
        &self.realm
    }

    fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    fn set_nonce(&mut self, nonce: String) {
        self.nonce = Some(nonce);
    }
}

impl ProtocolMessage for TestMessage {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2_0
    }

    fn transport(&self) -> MessageTransport {
        self.transport
    }

    fn role(&self) -> MessageRole {
        self.role
    }

    fn required_protection(&self) -> Protections {
        self.required
    }

    fn extra_data(&self) -> &ExtraData {
        &self.extra
    }

    fn extra_data_mut(&mut self) -> &mut ExtraData {
        &mut self.extra
    }

    fn ensure_valid_message(&self) -> Result<(), MessageValidationError> {
        if self.mode.is_empty() {
            return Err(MessageValidationError::new("mode is empty"));
        }
        Ok(())
    }

    fn message_type(&self) -> &'static str {
        "TestMessage"
    }

    fn as_directed(&self) -> Option<&dyn DirectedMessage> {
        if self.addressable { Some(self) } else { None }
    }

    fn as_tamper_resistant(&self) -> Option<&dyn TamperResistant> {
        if self.supported.contains(Protections::TAMPER_PROTECTION) { Some(self) } else { None }
    }

    fn as_tamper_resistant_mut(&mut self) -> Option<&mut dyn TamperResistant> {
        if self.supported.contains(Protections::TAMPER_PROTECTION) { Some(self) } else { None }
    }

    fn as_expiring(&self) -> Option<&dyn Expiring> {
        if self.supported.contains(Protections::EXPIRATION) { Some(self) } else { None }
    }

    fn as_expiring_mut(&mut self) -> Option<&mut dyn Expiring> {
        if self.supported.contains(Protections::EXPIRATION) { Some(self) } else { None }
    }

    fn as_replay_protected(&self) -> Option<&dyn ReplayProtected> {
        if self.supported.contains(Protections::REPLAY_PROTECTION) { Some(self) } else { None }
    }

    fn as_replay_protected_mut(&mut self) -> Option<&mut dyn ReplayProtected> {
        if self.supported.contains(Protections::REPLAY_PROTECTION) { Some(self) } else { None }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Maps [`TestMessage`] to and from wire fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestSerializer;

fn not_a_test_message() -> ProtocolError {
    ProtocolError::InvalidField {
        field: "mode".to_string(),
        reason: "message is not a TestMessage".to_string(),
    }
}

fn unix_seconds(at: SystemTime) -> Result<u64, ProtocolError> {
    at.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).map_err(|_| ProtocolError::InvalidField {
        field: "created_at".to_string(),
        reason: "timestamp precedes the unix epoch".to_string(),
    })
}

impl MessageSerializer for TestSerializer {
    fn serialize(&self, message: &dyn ProtocolMessage) -> Result<MessageFields, ProtocolError> {
        let message = message.downcast_ref::<TestMessage>().ok_or_else(not_a_test_message)?;

        let mut fields = MessageFields::new();
        fields.insert("mode", message.mode.as_str())?;
        if let Some(payload) = &message.payload {
            fields.insert("payload", payload.as_str())?;
        }
        fields.insert("realm", message.realm.as_str())?;
        if let Some(created_at) = message.created_at {
            fields.insert("created_at", unix_seconds(created_at)?.to_string())?;
        }
        if let Some(nonce) = &message.nonce {
            fields.insert("nonce", nonce.as_str())?;
        }
        if let Some(signature) = &message.signature {
            fields.insert(SIGNATURE_FIELD, signature.as_str())?;
        }
        for (key, value) in message.extra.iter() {
            fields.insert(key, value)?;
        }
        Ok(fields)
    }

    fn deserialize(
        &self,
        fields: &MessageFields,
        message: &mut dyn ProtocolMessage,
    ) -> Result<(), ProtocolError> {
        let message = message.downcast_mut::<TestMessage>().ok_or_else(not_a_test_message)?;

        for (key, value) in fields.iter() {
            match key {
                "mode" => message.mode = value.to_string(),
                "payload" => message.payload = Some(value.to_string()),
                "realm" => message.realm = value.to_string(),
                "created_at" => {
                    let secs: u64 = value.parse().map_err(|_| ProtocolError::InvalidField {
                        field: key.to_string(),
                        reason: format!("not a unix timestamp: {value:?}"),
                    })?;
                    let created_at = UNIX_EPOCH.checked_add(Duration::from_secs(secs)).ok_or_else(
                        || ProtocolError::InvalidField {
                            field: key.to_string(),
                            reason: format!("timestamp out of range: {value}"),
                        },
                    )?;
                    message.created_at = Some(created_at);
                },
                "nonce" => message.nonce = Some(value.to_string()),
                SIGNATURE_FIELD => message.signature = Some(value.to_string()),
                _ => {
                    message.extra.set(key, value);
                },
            }
        }
        Ok(())
    }
}

/// Recognizes [`TestMessage`]s by the presence of a `mode` field.
///
/// Incoming requests are shaped like `request`, responses like `response`.
/// Fields without `mode` are not a message.
#[derive(Debug, Clone)]
pub struct TestMessageFactory {
    request: TestMessage,
    response: TestMessage,
}

impl TestMessageFactory {
    /// Factory producing messages shaped like the given prototypes
    pub fn new(request: &TestMessage, response: &TestMessage) -> Self {
        Self { request: request.blank_like(), response: response.blank_like() }
    }

    /// Indirect requests and direct responses requiring `required`
    pub fn requiring(required: Protections) -> Self {
        let request =
            TestMessage::blank(MessageTransport::Indirect, MessageRole::Request).requiring(required);
        let response =
            TestMessage::blank(MessageTransport::Direct, MessageRole::Response).requiring(required);
        Self { request, response }
    }
}

impl Default for TestMessageFactory {
    fn default() -> Self {
        Self::requiring(Protections::empty())
    }
}

impl MessageFactory for TestMessageFactory {
    fn new_request_message(
        &self,
        recipient: &ReceivingEndpoint,
        fields: &MessageFields,
    ) -> Option<Box<dyn ProtocolMessage>> {
        fields.get("mode")?;
        let message = self.request.blank_like().with_recipient(recipient.location.clone());
        Some(Box::new(message))
    }

    fn new_response_message(
        &self,
        _request: &dyn ProtocolMessage,
        fields: &MessageFields,
    ) -> Option<Box<dyn ProtocolMessage>> {
        fields.get("mode")?;
        Some(Box::new(self.response.blank_like()))
    }
}
