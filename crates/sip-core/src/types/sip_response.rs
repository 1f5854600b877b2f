//! # SIP Response Message

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use crate::types::headers::{Header, HeaderAccess, HeaderName, Headers};
use crate::types::sip_message::encode;
use crate::types::sip_request::Request;
use crate::types::status::StatusCode;

/// A SIP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    /// Creates a response with the default reason phrase and no headers
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.reason_phrase().to_string(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Builds a response to `request` (RFC 3261 Section 8.2.6.2).
    ///
    /// All Via fields, From, To, Call-ID and CSeq are copied from the request.
    /// Anything other than 100 Trying gets a To tag if the request had none.
    pub fn from_request(status: StatusCode, request: &Request) -> Self {
        let mut response = Response::new(status);
        for header in request.headers.iter() {
            match header.name {
                HeaderName::Via | HeaderName::From | HeaderName::CallId | HeaderName::CSeq => {
                    response.headers.push(header.clone());
                }
                HeaderName::To => {
                    let mut to = header.clone();
                    if status != StatusCode::TRYING && !has_tag(&to.value) {
                        to.value = format!("{};tag={}", to.value, generate_tag());
                    }
                    response.headers.push(to);
                }
                _ => {}
            }
        }
        response.headers.push(Header::new(HeaderName::ContentLength, "0"));
        response
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Serializes the response for the wire
    pub fn to_bytes(&self) -> Bytes {
        encode(
            &format!("SIP/2.0 {} {}", self.status, self.reason),
            &self.headers,
            &self.body,
        )
    }
}

impl HeaderAccess for Response {
    fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

fn has_tag(value: &str) -> bool {
    // parameters after the closing '>' (or the whole value for bare URIs)
    let params = value.rsplit_once('>').map_or(value, |(_, params)| params);
    params
        .split(';')
        .skip(1)
        .any(|p| p.trim().to_ascii_lowercase().starts_with("tag="))
}

fn generate_tag() -> String {
    let mut tag = Uuid::new_v4().simple().to_string();
    tag.truncate(10);
    tag
}
