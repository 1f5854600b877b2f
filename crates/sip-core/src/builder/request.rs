use bytes::Bytes;

use crate::types::{CSeq, HeaderName, Method, Request, Via};

/// Fluent builder for outgoing requests.
///
/// ```
/// use sipline_core::builder::SimpleRequestBuilder;
/// use sipline_core::types::Method;
///
/// let request = SimpleRequestBuilder::new(Method::Invite, "sip:bob@biloxi.com")
///     .from("Alice", "sip:alice@atlanta.com", Some("1928301774"))
///     .to("Bob", "sip:bob@biloxi.com", None)
///     .call_id("a84b4c76e66710")
///     .cseq(1)
///     .via("pc33.atlanta.com", Some(5060), "z9hG4bK776asdhds")
///     .contact("sip:alice@pc33.atlanta.com")
///     .build();
/// assert_eq!(request.headers.len(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleRequestBuilder {
    request: Request,
}

impl SimpleRequestBuilder {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, uri),
        }
    }

    pub fn from(self, display_name: &str, uri: &str, tag: Option<&str>) -> Self {
        self.header(HeaderName::From, name_addr(display_name, uri, tag))
    }

    pub fn to(self, display_name: &str, uri: &str, tag: Option<&str>) -> Self {
        self.header(HeaderName::To, name_addr(display_name, uri, tag))
    }

    pub fn call_id(self, call_id: &str) -> Self {
        self.header(HeaderName::CallId, call_id)
    }

    /// CSeq with this builder's method
    pub fn cseq(self, seq: u32) -> Self {
        let cseq = CSeq::new(seq, self.request.method.clone());
        self.header(HeaderName::CSeq, cseq.to_string())
    }

    /// Adds a UDP Via below any existing ones
    pub fn via(self, host: &str, port: Option<u16>, branch: &str) -> Self {
        self.header(HeaderName::Via, Via::udp(host, port, branch).to_string())
    }

    pub fn contact(self, uri: &str) -> Self {
        self.header(HeaderName::Contact, format!("<{}>", uri))
    }

    pub fn max_forwards(self, hops: u8) -> Self {
        self.header(HeaderName::MaxForwards, hops.to_string())
    }

    /// Sets an `application/sdp` body
    pub fn sdp(mut self, sdp: impl Into<Bytes>) -> Self {
        self.request.headers.set(HeaderName::ContentType, "application/sdp");
        self.request.body = sdp.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.request = self.request.with_header(name, value);
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

fn name_addr(display_name: &str, uri: &str, tag: Option<&str>) -> String {
    let mut value = if display_name.is_empty() {
        format!("<{}>", uri)
    } else {
        format!("\"{}\" <{}>", display_name, uri)
    };
    if let Some(tag) = tag {
        value.push_str(";tag=");
        value.push_str(tag);
    }
    value
}
