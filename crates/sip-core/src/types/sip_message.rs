//! The [`Message`] enum: what the transport hands to the transaction layer.

use std::fmt::Write;

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::headers::{HeaderAccess, HeaderName, Headers};
use crate::types::method::Method;
use crate::types::sip_request::Request;
use crate::types::sip_response::Response;
use crate::types::status::StatusCode;

/// Port used when a Contact or Via does not name one
pub const DEFAULT_SIP_PORT: &str = "5060";

/// Either side of a SIP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Message::Request(request) => Some(request),
            Message::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Request(_) => None,
            Message::Response(response) => Some(response),
        }
    }

    /// Request method, or the CSeq method for a response
    pub fn method(&self) -> Option<Method> {
        match self {
            Message::Request(request) => Some(request.method.clone()),
            Message::Response(response) => response.cseq().map(|cseq| cseq.method),
        }
    }

    /// Only meaningful for responses
    pub fn status_code(&self) -> Option<StatusCode> {
        self.as_response().map(|response| response.status)
    }

    /// Host of the first Contact URI
    pub fn contact_host(&self) -> Option<String> {
        self.contact().map(|uri| uri.host)
    }

    /// Port of the first Contact URI, `"5060"` when the URI has none
    pub fn contact_port(&self) -> Option<String> {
        self.contact().map(|uri| uri.port_or_default())
    }

    /// Where responses to this message go: the Contact, else the top Via sent-by.
    pub fn response_destination(&self) -> Option<(String, String)> {
        if let Some(uri) = self.contact() {
            let port = uri.port_or_default();
            return Some((uri.host, port));
        }
        self.top_via().map(|via| {
            let port = via
                .port
                .map_or_else(|| DEFAULT_SIP_PORT.to_string(), |port| port.to_string());
            (via.host, port)
        })
    }

    /// The body, if it is a session description.
    ///
    /// A body without Content-Type is assumed to be SDP.
    pub fn sdp_payload(&self) -> Option<Bytes> {
        let body = self.body();
        if body.is_empty() {
            return None;
        }
        let is_sdp = self.content_type().is_none_or(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("application/sdp")
        });
        is_sdp.then(|| body.clone())
    }

    pub fn body(&self) -> &Bytes {
        match self {
            Message::Request(request) => &request.body,
            Message::Response(response) => &response.body,
        }
    }

    /// Serializes the message for the wire
    pub fn export(&self) -> Bytes {
        match self {
            Message::Request(request) => request.to_bytes(),
            Message::Response(response) => response.to_bytes(),
        }
    }
}

impl HeaderAccess for Message {
    fn headers(&self) -> &Headers {
        match self {
            Message::Request(request) => &request.headers,
            Message::Response(response) => &response.headers,
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

/// Writes start line, headers, a computed Content-Length and the body.
pub(crate) fn encode(start_line: &str, headers: &Headers, body: &Bytes) -> Bytes {
    let mut head = String::with_capacity(256);
    head.push_str(start_line);
    head.push_str("\r\n");
    for header in headers.iter() {
        if header.name == HeaderName::ContentLength {
            continue;
        }
        // writing into a String cannot fail
        let _ = write!(head, "{}\r\n", header);
    }
    let _ = write!(head, "{}: {}\r\n\r\n", HeaderName::ContentLength, body.len());

    let mut buf = BytesMut::with_capacity(head.len() + body.len());
    buf.put_slice(head.as_bytes());
    buf.put_slice(body);
    buf.freeze()
}
