//! SIP message model for the sipline stack.
//!
//! Parses datagrams into [`Message`]s, gives typed access to the headers the
//! transaction layer routes on (Via branch, CSeq, Contact), builds responses,
//! CANCEL and ACK requests, and serializes messages back to bytes.
//!
//! ```
//! use sipline_core::prelude::*;
//!
//! let raw = b"OPTIONS sip:carol@chicago.com SIP/2.0\r\n\
//! Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKhjhs8ass877\r\n\
//! CSeq: 63104 OPTIONS\r\n\
//! Contact: <sip:alice@pc33.atlanta.com>\r\n\r\n";
//!
//! let message = parse_message(raw).unwrap();
//! assert_eq!(message.via_branch().as_deref(), Some("z9hG4bKhjhs8ass877"));
//! assert_eq!(message.contact_host().as_deref(), Some("pc33.atlanta.com"));
//! ```

pub mod builder;
pub mod error;
pub mod parser;
pub mod sdp;
pub mod types;

pub use builder::SimpleRequestBuilder;
pub use error::{Error, Result};
pub use parser::parse_message;
pub use types::{
    generate_branch, reason_phrase, CSeq, Header, HeaderAccess, HeaderName, Headers, Message,
    Method, Request, Response, SipUri, StatusCode, Via, BRANCH_MAGIC_COOKIE, DEFAULT_SIP_PORT,
};

/// Re-export of common types and functions
pub mod prelude {
    pub use crate::builder::SimpleRequestBuilder;
    pub use crate::error::{Error, Result};
    pub use crate::parser::parse_message;
    pub use crate::sdp::SessionSummary;
    pub use crate::types::{
        generate_branch, CSeq, Header, HeaderAccess, HeaderName, Headers, Message, Method,
        Request, Response, SipUri, StatusCode, Via,
    };
}
