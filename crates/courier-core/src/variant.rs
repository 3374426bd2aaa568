//! Protocol variants.
//!
//! Protocol families agree on the channel algorithm but differ in how direct
//! messages look on the wire. A [`ProtocolVariant`] captures exactly those
//! differences: how an outgoing direct request is built, how a direct
//! response body is read, and how a direct response is written. The channel
//! is generic over the variant instead of being subclassed per protocol.

use bytes::Bytes;
use courier_proto::{
    HttpMethod, HttpRequest, HttpResponse, MessageFields, ProtocolError, StatusCode, http, kvf,
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{message::ProtocolMessage, response::UserAgentResponse};

/// Direct-message wire conventions of one protocol family.
pub trait ProtocolVariant: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Build the HTTP request carrying a direct request message.
    fn create_http_request(
        &self,
        message: &dyn ProtocolMessage,
        recipient: &Url,
        fields: &MessageFields,
    ) -> Result<HttpRequest, ProtocolError>;

    /// Fields of a direct response, or `None` if the body is absent or
    /// empty.
    fn read_from_response(
        &self,
        response: &HttpResponse,
    ) -> Result<Option<MessageFields>, ProtocolError>;

    /// Response answering a direct request with `fields`.
    fn write_direct_response(
        &self,
        message: &dyn ProtocolMessage,
        fields: &MessageFields,
    ) -> Result<UserAgentResponse, ProtocolError>;
}

/// Method used for direct requests whose message has no preference.
fn method_for(message: &dyn ProtocolMessage, default: HttpMethod) -> HttpMethod {
    message.as_directed().map_or(default, |directed| directed.http_method())
}

fn build_request(method: HttpMethod, recipient: &Url, fields: &MessageFields) -> HttpRequest {
    match method {
        HttpMethod::Post => HttpRequest::post_form(recipient.clone(), fields),
        HttpMethod::Get => HttpRequest::get_with_query(recipient, fields),
    }
}

/// OAuth-style: urlencoded everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormUrlEncoded {
    /// Force every direct request onto this method instead of the
    /// message's preference
    pub force_method: Option<HttpMethod>,
}

impl ProtocolVariant for FormUrlEncoded {
    fn name(&self) -> &'static str {
        "form-urlencoded"
    }

    fn create_http_request(
        &self,
        message: &dyn ProtocolMessage,
        recipient: &Url,
        fields: &MessageFields,
    ) -> Result<HttpRequest, ProtocolError> {
        let method = self.force_method.unwrap_or_else(|| method_for(message, HttpMethod::Post));
        Ok(build_request(method, recipient, fields))
    }

    fn read_from_response(
        &self,
        response: &HttpResponse,
    ) -> Result<Option<MessageFields>, ProtocolError> {
        response
            .non_empty_body()
            .map(|body| MessageFields::from_urlencoded(&String::from_utf8_lossy(body)))
            .transpose()
    }

    fn write_direct_response(
        &self,
        _message: &dyn ProtocolMessage,
        fields: &MessageFields,
    ) -> Result<UserAgentResponse, ProtocolError> {
        Ok(UserAgentResponse::new(StatusCode::OK)
            .with_body(http::FORM_URLENCODED, Bytes::from(fields.to_urlencoded())))
    }
}

/// OpenID-style: urlencoded requests, key-value form responses.
///
/// Direct error responses are signalled with HTTP 400. A response is an
/// error response when its fields contain `error_indicator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueForm {
    /// `(field, value)` marking a direct error response
    pub error_indicator: Option<(String, String)>,
}

impl Default for KeyValueForm {
    fn default() -> Self {
        Self { error_indicator: Some(("mode".to_string(), "error".to_string())) }
    }
}

impl KeyValueForm {
    fn is_error(&self, fields: &MessageFields) -> bool {
        self.error_indicator
            .as_ref()
            .is_some_and(|(field, value)| fields.get(field) == Some(value.as_str()))
    }
}

impl ProtocolVariant for KeyValueForm {
    fn name(&self) -> &'static str {
        "key-value-form"
    }

    fn create_http_request(
        &self,
        _message: &dyn ProtocolMessage,
        recipient: &Url,
        fields: &MessageFields,
    ) -> Result<HttpRequest, ProtocolError> {
        Ok(HttpRequest::post_form(recipient.clone(), fields))
    }

    fn read_from_response(
        &self,
        response: &HttpResponse,
    ) -> Result<Option<MessageFields>, ProtocolError> {
        response.non_empty_body().map(|body| kvf::decode(body)).transpose()
    }

    fn write_direct_response(
        &self,
        _message: &dyn ProtocolMessage,
        fields: &MessageFields,
    ) -> Result<UserAgentResponse, ProtocolError> {
        let status = if self.is_error(fields) { StatusCode::BAD_REQUEST } else { StatusCode::OK };
        let body = kvf::encode(fields)?;
        Ok(UserAgentResponse::new(status).with_body(kvf::CONTENT_TYPE, body))
    }
}
