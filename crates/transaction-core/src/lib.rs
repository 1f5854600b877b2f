//! # SIP transaction layer
//!
//! Implements the client and server transaction state machines of
//! RFC 3261 Section 17 on top of an unreliable transport:
//!
//! - [`ClientTransaction`]: sends a request, retransmits it (Timer A/E) until
//!   a response arrives or Timer B/F expires, ACKs non-2xx finals to INVITE
//! - [`ServerTransaction`]: answers a new request with 100 Trying, hands its
//!   session description to an [`SdpHandler`], sends the final response
//!   chosen by a [`RequestHandler`], and absorbs retransmissions
//! - [`TransactionManager`]: owns all transactions, keyed by Via branch, and
//!   dispatches inbound messages to them
//!
//! Every transaction serializes its inputs (received messages, timer
//! firings, calls from the owner) through one lock, and checks each input
//! against an explicit transition table before acting on it.
//!
//! The transaction user learns about responses, timeouts and terminations
//! through [`TransactionEvent`]s.

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod manager;
pub mod server;
pub mod timer;
pub mod transaction;

pub use client::ClientTransaction;
pub use config::TransactionConfig;
pub use error::{Error, Result};
pub use handler::{AcceptAll, LoggingSdpHandler, RequestHandler, SdpHandler};
pub use manager::{AnyTransaction, TransactionManager, TransactionManagerBuilder};
pub use server::ServerTransaction;
pub use timer::{TimerSettings, TimerType};
pub use transaction::{
    Transaction, TransactionEvent, TransactionKey, TransactionKind, TransactionState,
};

#[cfg(test)]
pub(crate) mod test_support;

/// Re-export of common types
pub mod prelude {
    pub use crate::{
        AcceptAll, AnyTransaction, ClientTransaction, Error, LoggingSdpHandler, RequestHandler,
        Result, SdpHandler, ServerTransaction, TimerSettings, TimerType, Transaction,
        TransactionConfig, TransactionEvent, TransactionKey, TransactionKind, TransactionManager,
        TransactionState,
    };
    pub use sipline_core::prelude::{
        HeaderAccess, HeaderName, Message, Method, Request, Response, SimpleRequestBuilder,
        StatusCode,
    };
    pub use sipline_transport::{bind_udp, Transport, TransportEvent, UdpTransport};
}
