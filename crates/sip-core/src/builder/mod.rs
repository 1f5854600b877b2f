//! Builders for outgoing SIP messages.
//!
//! Responses are built from the request they answer with
//! [`crate::Response::from_request`]; requests use [`SimpleRequestBuilder`].

mod request;

pub use request::SimpleRequestBuilder;
