//! SIP message model.

pub mod cseq;
pub mod headers;
pub mod method;
pub mod sip_message;
pub mod sip_request;
pub mod sip_response;
pub mod status;
pub mod uri;
pub mod via;

pub use cseq::CSeq;
pub use headers::{Header, HeaderAccess, HeaderName, Headers};
pub use method::Method;
pub use sip_message::{Message, DEFAULT_SIP_PORT};
pub use sip_request::Request;
pub use sip_response::Response;
pub use status::{reason_phrase, StatusCode};
pub use uri::{uri_from_name_addr, SipUri};
pub use via::{generate_branch, Via, BRANCH_MAGIC_COOKIE};
