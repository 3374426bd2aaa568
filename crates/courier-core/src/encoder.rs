//! Indirect message encoding.
//!
//! An indirect message reaches its recipient through the user's browser,
//! either as a redirect whose `Location` carries the fields in its query
//! string, or as an HTML form that posts the fields and submits itself on
//! load. Redirects are what most parties expect for small payloads, but some
//! recipients cap URL length, so payloads above a size threshold switch to
//! the form.
//!
//! The size measure is `Σ(key.len() + value.len() + 2)` over all fields
//! (see [`MessageFields::wire_size`]). A payload exactly at the threshold
//! still redirects.

use courier_proto::{MessageFields, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::response::UserAgentResponse;

/// Default size above which indirect messages are sent by form POST.
pub const DEFAULT_GET_TO_POST_THRESHOLD: usize = 2048;

/// Element id of the generated form
pub const FORM_ID: &str = "courier_form";

/// Element id of the generated submit button
pub const SUBMIT_ID: &str = "courier_submit";

/// Indirect encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Payloads with a wire size above this are POSTed
    pub get_to_post_threshold: usize,
    /// Status used for redirects
    pub redirect_status: StatusCode,
    /// Label on the form's submit button, shown when scripts are disabled
    pub continue_label: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            get_to_post_threshold: DEFAULT_GET_TO_POST_THRESHOLD,
            redirect_status: StatusCode::FOUND,
            continue_label: "Continue".to_string(),
        }
    }
}

/// How an indirect message is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndirectEncoding {
    /// Redirect with the fields in the query string
    Redirect,
    /// Self-submitting HTML form
    FormPost,
}

/// Chooses and renders the user-agent response for indirect messages.
#[derive(Debug, Clone, Default)]
pub struct IndirectEncoder {
    config: EncoderConfig,
}

impl IndirectEncoder {
    /// Encoder with the given configuration
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Which encoding `fields` will get.
    pub fn choose(&self, fields: &MessageFields) -> IndirectEncoding {
        if fields.wire_size() > self.config.get_to_post_threshold {
            IndirectEncoding::FormPost
        } else {
            IndirectEncoding::Redirect
        }
    }

    /// Render the response delivering `fields` to `recipient`.
    pub fn encode(&self, recipient: &Url, fields: &MessageFields) -> UserAgentResponse {
        let encoding = self.choose(fields);
        debug!(
            recipient = %recipient,
            size = fields.wire_size(),
            threshold = self.config.get_to_post_threshold,
            ?encoding,
            "encoding indirect message"
        );

        match encoding {
            IndirectEncoding::Redirect => self.redirect(recipient, fields),
            IndirectEncoding::FormPost => self.form_post(recipient, fields),
        }
    }

    /// Redirect response whose `Location` is `recipient` plus `fields`.
    pub fn redirect(&self, recipient: &Url, fields: &MessageFields) -> UserAgentResponse {
        let location = fields.append_to_url(recipient);

        let mut response = UserAgentResponse::new(self.config.redirect_status);
        response.headers.set("Location", location.as_str());
        response.headers.set("Cache-Control", "no-cache, no-store");
        response
    }

    /// Self-submitting form response posting `fields` to `recipient`.
    pub fn form_post(&self, recipient: &Url, fields: &MessageFields) -> UserAgentResponse {
        let document = self.render_form(recipient, fields);

        let mut response = UserAgentResponse::new(StatusCode::OK)
            .with_body("text/html; charset=utf-8", document);
        response.headers.set("Cache-Control", "no-cache, no-store");
        response.headers.set("Pragma", "no-cache");
        response
    }

    /// HTML document for [`form_post`](Self::form_post).
    ///
    /// The body's `onload` disables the submit button before submitting so
    /// an impatient click cannot post twice; a manual submission disables it
    /// the same way through `onsubmit`.
    pub fn render_form(&self, action: &Url, fields: &MessageFields) -> String {
        let disable = format!("document.getElementById('{SUBMIT_ID}').disabled = true;");

        let mut html = String::with_capacity(512 + fields.wire_size() * 2);
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("<meta charset=\"utf-8\" />\n");
        html.push_str("<title>Please wait while you are redirected</title>\n");
        html.push_str("</head>\n");
        html.push_str(&format!(
            "<body onload=\"{disable} document.getElementById('{FORM_ID}').submit();\">\n"
        ));
        html.push_str(&format!(
            "<form id=\"{FORM_ID}\" action=\"{}\" method=\"post\" \
             enctype=\"application/x-www-form-urlencoded\" onsubmit=\"{disable}\">\n",
            escape_html(action.as_str())
        ));
        for (name, value) in fields.iter() {
            html.push_str(&format!(
                "\t<input type=\"hidden\" name=\"{}\" value=\"{}\" />\n",
                escape_html(name),
                escape_html(value)
            ));
        }
        html.push_str("\t<noscript><p>Scripts are disabled. Press the button to continue.</p></noscript>\n");
        html.push_str(&format!(
            "\t<input id=\"{SUBMIT_ID}\" type=\"submit\" value=\"{}\" />\n",
            escape_html(&self.config.continue_label)
        ));
        html.push_str("</form>\n</body>\n</html>\n");
        html
    }
}

/// Escape text for use inside an HTML attribute value or element body.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
