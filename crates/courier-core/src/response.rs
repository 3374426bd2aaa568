//! HTTP-shaped response produced by every send operation.

use std::fmt;

use bytes::Bytes;
use courier_proto::{StatusCode, http::Headers};

use crate::message::ProtocolMessage;

/// Response the host application writes back to the user agent (indirect
/// messages) or to the remote party (direct responses).
///
/// The originating message rides along so tests and tracing can see what
/// was sent without decoding the body again.
pub struct UserAgentResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: Headers,
    /// Response body, absent for redirects
    pub body: Option<Bytes>,
    original_message: Option<Box<dyn ProtocolMessage>>,
}

impl UserAgentResponse {
    /// Response with no body and no attached message
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Headers::new(), body: None, original_message: None }
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers.set("Content-Type", content_type);
        self.body = Some(body.into());
        self
    }

    /// `Location` header, present on redirects
    pub fn location(&self) -> Option<&str> {
        self.headers.get("Location")
    }

    /// Body as UTF-8 text, lossily decoded
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// The message this response carries
    pub fn original_message(&self) -> Option<&dyn ProtocolMessage> {
        self.original_message.as_deref()
    }

    /// Take ownership of the carried message
    pub fn take_original_message(&mut self) -> Option<Box<dyn ProtocolMessage>> {
        self.original_message.take()
    }

    pub(crate) fn attach(mut self, message: Box<dyn ProtocolMessage>) -> Self {
        self.original_message = Some(message);
        self
    }
}

impl fmt::Debug for UserAgentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAgentResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("original_message", &self.original_message.as_ref().map(|m| m.message_type()))
            .finish()
    }
}
