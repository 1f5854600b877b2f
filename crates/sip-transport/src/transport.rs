use std::fmt;
use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;

use sipline_core::Message;

use crate::error::Result;

/// Send side of a SIP transport.
///
/// Destinations are given as the host and port strings found in SIP headers
/// (Contact, Via), so resolution is the transport's job.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Address the transport is bound to
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Sends one already serialized message
    async fn send(&self, host: &str, port: &str, payload: Bytes) -> Result<()>;

    /// Stops the receive loop; later sends fail with `TransportClosed`
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// What the receive side reports
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A datagram that parsed as a SIP message
    MessageReceived {
        message: Message,
        source: SocketAddr,
        destination: SocketAddr,
    },

    /// Receive or parse failure; the datagram is dropped
    Error { error: String },

    /// The receive loop ended
    Closed,
}
