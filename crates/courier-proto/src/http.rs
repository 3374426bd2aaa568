//! HTTP-shaped request and response values.
//!
//! These are plain data handed between the channel and whatever actually
//! moves bytes. No connection handling lives here.

use std::fmt;

use bytes::Bytes;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{errors::Result, fields::MessageFields};

/// `Content-Type` of urlencoded bodies
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// HTTP request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET, fields in the query string
    Get,
    /// POST, fields in the body
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// 200 OK
    pub const OK: Self = Self(200);
    /// 302 Found
    pub const FOUND: Self = Self(302);
    /// 303 See Other
    pub const SEE_OTHER: Self = Self(303);
    /// 400 Bad Request
    pub const BAD_REQUEST: Self = Self(400);
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Header map with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    inner: IndexMap<String, String>,
}

impl Headers {
    /// Empty header map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any value stored under the same name in any
    /// letter case.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.inner.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.inner.insert(name, value.into());
    }

    /// Header value by case-insensitive name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Iterate headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no headers are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// An HTTP request, either built for a direct message or received from a
/// user agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: HttpMethod,
    /// Full request URL including any query string
    pub url: Url,
    /// Request headers
    pub headers: Headers,
    /// Request body, if any
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Request with no headers and no body
    #[must_use]
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self { method, url, headers: Headers::new(), body: None }
    }

    /// POST with `fields` as an urlencoded body.
    #[must_use]
    pub fn post_form(url: Url, fields: &MessageFields) -> Self {
        let mut request = Self::new(HttpMethod::Post, url);
        request.headers.set("Content-Type", FORM_URLENCODED);
        request.body = Some(Bytes::from(fields.to_urlencoded()));
        request
    }

    /// GET with `fields` appended to the query string.
    #[must_use]
    pub fn get_with_query(url: &Url, fields: &MessageFields) -> Self {
        Self::new(HttpMethod::Get, fields.append_to_url(url))
    }

    /// True if the body is declared as urlencoded form data.
    #[must_use]
    pub fn has_form_body(&self) -> bool {
        self.headers.get("Content-Type").is_some_and(|value| {
            value
                .split(';')
                .next()
                .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
        })
    }

    /// Fields carried in an urlencoded POST body. Anything else yields an
    /// empty set.
    pub fn form_fields(&self) -> Result<MessageFields> {
        match (&self.body, self.method) {
            (Some(body), HttpMethod::Post) if self.has_form_body() => {
                MessageFields::from_urlencoded(&String::from_utf8_lossy(body))
            },
            _ => Ok(MessageFields::new()),
        }
    }

    /// Fields carried in the URL query string.
    pub fn query_fields(&self) -> Result<MessageFields> {
        MessageFields::from_url_query(&self.url)
    }
}

/// An HTTP response read back from a direct transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: Headers,
    /// Response body; `None` when the peer sent nothing
    pub body: Option<Bytes>,
}

impl HttpResponse {
    /// Response with a body
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Headers::new(), body: Some(body.into()) }
    }

    /// Response without a body
    #[must_use]
    pub fn empty(status: StatusCode) -> Self {
        Self { status, headers: Headers::new(), body: None }
    }

    /// Body if present and non-empty
    #[must_use]
    pub fn non_empty_body(&self) -> Option<&Bytes> {
        self.body.as_ref().filter(|body| !body.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn post_form_sets_body_and_content_type() {
        let fields = MessageFields::from_pairs([("a", "1"), ("b", "x y")]).unwrap();
        let request = HttpRequest::post_form(url("https://op.example/server"), &fields);
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.headers.get("content-type"), Some(FORM_URLENCODED));
        assert_eq!(request.body.as_deref(), Some(&b"a=1&b=x+y"[..]));
        assert_eq!(request.form_fields().unwrap(), fields);
    }

    #[test]
    fn form_fields_ignore_non_form_bodies() {
        let mut request = HttpRequest::new(HttpMethod::Post, url("https://op.example/"));
        request.headers.set("Content-Type", "application/json");
        request.body = Some(Bytes::from_static(b"a=1"));
        assert!(request.form_fields().unwrap().is_empty());
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let mut request = HttpRequest::new(HttpMethod::Post, url("https://op.example/"));
        request.headers.set("content-type", "application/x-www-form-urlencoded; charset=utf-8");
        request.body = Some(Bytes::from_static(b"a=1"));
        assert_eq!(request.form_fields().unwrap().get("a"), Some("1"));
    }

    #[test]
    fn get_with_query_moves_fields_into_url() {
        let fields = MessageFields::from_pairs([("mode", "check")]).unwrap();
        let request = HttpRequest::get_with_query(&url("https://op.example/server"), &fields);
        assert_eq!(request.url.as_str(), "https://op.example/server?mode=check");
        assert_eq!(request.query_fields().unwrap(), fields);
        assert!(request.body.is_none());
    }

    #[test]
    fn headers_set_replaces_any_case() {
        let mut headers = Headers::new();
        headers.set("Location", "a");
        headers.set("location", "b");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("LOCATION"), Some("b"));
    }

    #[test]
    fn empty_body_is_not_a_body() {
        let response = HttpResponse::new(StatusCode::OK, Bytes::new());
        assert!(response.non_empty_body().is_none());
        assert!(HttpResponse::empty(StatusCode::OK).non_empty_body().is_none());
    }
}
