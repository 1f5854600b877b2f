use std::str::Utf8Error;
use thiserror::Error;

/// A type alias for handling `Result`s with `Error`
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or building SIP messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Generic parse failure with a description of what was wrong
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The first line was neither a Request-Line nor a Status-Line
    #[error("Invalid start line: {0}")]
    InvalidStartLine(String),

    /// A header line did not have the `name: value` shape
    #[error("Invalid header line: {0}")]
    InvalidHeader(String),

    /// Status code outside 100..=699
    #[error("Invalid status code: {0}")]
    InvalidStatusCode(u16),

    /// Content-Length that is not a number, or larger than the body
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Header section is not valid UTF-8
    #[error("Invalid UTF-8 in message head: {0}")]
    Utf8(#[from] Utf8Error),

    /// A header needed for an operation was not present
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Malformed SIP URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}
