use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in SIP transport handling
#[derive(Error, Debug)]
pub enum Error {
    /// Binding the local socket failed
    #[error("Failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, #[source] io::Error),

    /// The socket refused the datagram
    #[error("Failed to send to {0}: {1}")]
    SendFailed(SocketAddr, #[source] io::Error),

    /// Serialized message exceeds what fits in one UDP datagram
    #[error("Packet too large: {0} bytes (max {1})")]
    PacketTooLarge(usize, usize),

    /// `close()` has been called
    #[error("Transport is closed")]
    TransportClosed,

    /// Destination host/port did not resolve to a socket address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
