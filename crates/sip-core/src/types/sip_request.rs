//! # SIP Request Message
//!
//! A request line, an ordered header list and an optional body.
//!
//! Besides plain construction this module knows how to derive the two
//! requests a client transaction has to build on its own:
//!
//! - [`Request::cancel`]: the CANCEL for a pending INVITE (RFC 3261 Section 9.1)
//! - [`Request::ack_for`]: the ACK for a non-2xx final response
//!   (RFC 3261 Section 17.1.1.3)

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::types::cseq::CSeq;
use crate::types::headers::{Header, HeaderAccess, HeaderName, Headers};
use crate::types::method::Method;
use crate::types::sip_message::encode;
use crate::types::sip_response::Response;

/// A SIP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Request-URI, kept verbatim
    pub uri: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    /// Creates a request with no headers and an empty body
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a header field
    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Sets the body. Content-Length is always recomputed on export.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Builds the CANCEL for this request.
    ///
    /// Request-URI, Call-ID, From, To and the CSeq number are copied, the
    /// method becomes CANCEL and the only Via is this request's top Via, so
    /// the CANCEL carries the same branch.
    pub fn cancel(&self) -> Result<Request> {
        let via = self
            .header(&HeaderName::Via)
            .ok_or(Error::MissingHeader("Via"))?;
        let cseq = self.cseq().ok_or(Error::MissingHeader("CSeq"))?;

        let mut cancel = Request::new(Method::Cancel, self.uri.clone())
            .with_header(HeaderName::Via, via);
        for (name, label) in [
            (HeaderName::From, "From"),
            (HeaderName::To, "To"),
            (HeaderName::CallId, "Call-ID"),
        ] {
            let value = self.header(&name).ok_or(Error::MissingHeader(label))?;
            cancel.headers.push(Header::new(name, value));
        }
        cancel.headers.push(Header::new(
            HeaderName::CSeq,
            CSeq::new(cseq.seq, Method::Cancel).to_string(),
        ));
        copy_routes(self, &mut cancel);
        cancel.headers.push(Header::new(HeaderName::MaxForwards, "70"));
        Ok(cancel)
    }

    /// Builds the ACK for a non-2xx final `response` to this request.
    ///
    /// The To header comes from the response (it carries the remote tag),
    /// everything else from this request.
    pub fn ack_for(&self, response: &Response) -> Result<Request> {
        let via = self
            .header(&HeaderName::Via)
            .ok_or(Error::MissingHeader("Via"))?;
        let cseq = self.cseq().ok_or(Error::MissingHeader("CSeq"))?;
        let to = response
            .header(&HeaderName::To)
            .or_else(|| self.header(&HeaderName::To))
            .ok_or(Error::MissingHeader("To"))?;
        let from = self
            .header(&HeaderName::From)
            .ok_or(Error::MissingHeader("From"))?;
        let call_id = self.call_id().ok_or(Error::MissingHeader("Call-ID"))?;

        let mut ack = Request::new(Method::Ack, self.uri.clone())
            .with_header(HeaderName::Via, via)
            .with_header(HeaderName::From, from)
            .with_header(HeaderName::To, to)
            .with_header(HeaderName::CallId, call_id)
            .with_header(HeaderName::CSeq, CSeq::new(cseq.seq, Method::Ack).to_string());
        copy_routes(self, &mut ack);
        ack.headers.push(Header::new(HeaderName::MaxForwards, "70"));
        Ok(ack)
    }

    /// Serializes the request for the wire
    pub fn to_bytes(&self) -> Bytes {
        encode(&self.to_start_line(), &self.headers, &self.body)
    }

    fn to_start_line(&self) -> String {
        format!("{} {} SIP/2.0", self.method, self.uri)
    }
}

impl HeaderAccess for Request {
    fn headers(&self) -> &Headers {
        &self.headers
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

fn copy_routes(from: &Request, to: &mut Request) {
    let route = HeaderName::Other("Route".to_string());
    for value in from.headers.get_all(&route) {
        to.headers.push(Header::new(route.clone(), value));
    }
}
