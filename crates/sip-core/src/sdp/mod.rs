//! A shallow view of an SDP body (RFC 8866).
//!
//! The transaction layer never negotiates media; it only needs enough of the
//! session description to log what a peer offered.

mod origin;

pub use origin::{parse_origin, Origin};

use crate::error::{Error, Result};

/// Session-level summary of an SDP payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub origin: Option<Origin>,
    pub session_name: Option<String>,
    /// Session-level `c=` address
    pub connection: Option<String>,
    /// `m=` lines, verbatim without the `m=` prefix
    pub media: Vec<String>,
}

impl SessionSummary {
    /// Parses `payload`. It must be UTF-8 and start with `v=0`.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)?;
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        if lines.next() != Some("v=0") {
            return Err(Error::ParseError("SDP must start with v=0".to_string()));
        }

        let mut summary = SessionSummary::default();
        for line in lines {
            let Some((kind, value)) = line.split_once('=') else {
                return Err(Error::ParseError(format!("bad SDP line {:?}", line)));
            };
            match kind {
                "o" => {
                    let (_, origin) = parse_origin(value)
                        .map_err(|_| Error::ParseError(format!("bad SDP origin {:?}", value)))?;
                    summary.origin = Some(origin);
                }
                "s" => summary.session_name = Some(value.to_string()),
                "c" if summary.media.is_empty() => {
                    // c=IN IP4 <address>
                    summary.connection = value.split_whitespace().nth(2).map(str::to_string);
                }
                "m" => summary.media.push(value.to_string()),
                _ => {}
            }
        }
        Ok(summary)
    }
}
