use crate::transaction::TransactionKey;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in SIP transaction handling
#[derive(Error, Debug)]
pub enum Error {
    /// Error originating from the sip-core crate (parsing, building messages, etc.)
    #[error("SIP core error: {0}")]
    SipCoreError(#[from] sipline_core::Error),

    /// Error originating from the sip-transport crate.
    #[error("SIP transport error: {0}")]
    TransportError(String),

    /// Transaction not found for the given key.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionKey),

    /// Invalid transaction state transition attempted.
    #[error("Invalid transaction state transition: {0}")]
    InvalidStateTransition(String),

    /// The request has no Via branch to key a transaction on.
    #[error("Request has no Via branch")]
    MissingBranch,

    /// The request cannot start a transaction (e.g. ACK).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<sipline_transport::Error> for Error {
    fn from(e: sipline_transport::Error) -> Self {
        Error::TransportError(e.to_string())
    }
}
