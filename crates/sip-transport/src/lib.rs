//! SIP transport layer implementation for the sipline stack
//!
//! Only UDP is provided. The receive loop parses every datagram with
//! [`sipline_core::parse_message`] and reports it as a [`TransportEvent`];
//! datagrams that do not parse never reach the transaction layer.

mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;
mod udp;

pub use error::{Error, Result};
pub use transport::{Transport, TransportEvent};
pub use udp::{UdpTransport, MAX_UDP_PACKET_SIZE};

/// Simplified bind function for UdpTransport
pub async fn bind_udp(
    addr: std::net::SocketAddr,
) -> Result<(UdpTransport, tokio::sync::mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr, None).await
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use super::{bind_udp, Error, Result, Transport, TransportEvent, UdpTransport};
}
