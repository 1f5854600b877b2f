use std::str::FromStr;

use super::{HeaderName, Headers};
use crate::types::cseq::CSeq;
use crate::types::uri::{uri_from_name_addr, SipUri};
use crate::types::via::Via;

/// Typed read access to the headers the transaction layer cares about.
///
/// Implemented by both [`crate::Request`] and [`crate::Response`]. Every
/// accessor returns `None` when the header is absent or does not parse.
pub trait HeaderAccess {
    fn headers(&self) -> &Headers;

    fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers().get(name)
    }

    /// The top-most Via entry
    fn top_via(&self) -> Option<Via> {
        self.header(&HeaderName::Via)
            .and_then(|value| Via::from_str(value).ok())
    }

    /// Branch parameter of the top Via
    fn via_branch(&self) -> Option<String> {
        self.top_via()
            .and_then(|via| via.branch().map(str::to_string))
    }

    fn call_id(&self) -> Option<&str> {
        self.header(&HeaderName::CallId)
    }

    fn cseq(&self) -> Option<CSeq> {
        self.header(&HeaderName::CSeq)
            .and_then(|value| CSeq::from_str(value).ok())
    }

    /// URI of the first Contact
    fn contact(&self) -> Option<SipUri> {
        self.header(&HeaderName::Contact)
            .and_then(|value| uri_from_name_addr(value).ok())
    }

    fn content_type(&self) -> Option<&str> {
        self.header(&HeaderName::ContentType)
    }
}
