use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::method::is_token_char;

/// Header field names this crate interprets, plus a verbatim fallback.
///
/// Parsing is case-insensitive and understands the compact forms of
/// RFC 3261 Section 7.3.3 (`v`, `f`, `t`, `i`, `m`, `c`, `l`).
#[derive(Debug, Clone, Eq)]
pub enum HeaderName {
    Via,
    From,
    To,
    CallId,
    CSeq,
    Contact,
    MaxForwards,
    ContentType,
    ContentLength,
    Other(String),
}

impl HeaderName {
    pub fn as_str(&self) -> &str {
        match self {
            HeaderName::Via => "Via",
            HeaderName::From => "From",
            HeaderName::To => "To",
            HeaderName::CallId => "Call-ID",
            HeaderName::CSeq => "CSeq",
            HeaderName::Contact => "Contact",
            HeaderName::MaxForwards => "Max-Forwards",
            HeaderName::ContentType => "Content-Type",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::Other(name) => name,
        }
    }
}

impl PartialEq for HeaderName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str().eq_ignore_ascii_case(other.as_str())
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeaderName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(is_token_char) {
            return Err(Error::InvalidHeader(format!("bad header name {:?}", s)));
        }
        let name = match s.to_ascii_lowercase().as_str() {
            "via" | "v" => HeaderName::Via,
            "from" | "f" => HeaderName::From,
            "to" | "t" => HeaderName::To,
            "call-id" | "i" => HeaderName::CallId,
            "cseq" => HeaderName::CSeq,
            "contact" | "m" => HeaderName::Contact,
            "max-forwards" => HeaderName::MaxForwards,
            "content-type" | "c" => HeaderName::ContentType,
            "content-length" | "l" => HeaderName::ContentLength,
            _ => HeaderName::Other(s.to_string()),
        };
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_and_case_insensitive() {
        assert_eq!(HeaderName::from_str("v").unwrap(), HeaderName::Via);
        assert_eq!(HeaderName::from_str("CALL-ID").unwrap(), HeaderName::CallId);
        assert_eq!(HeaderName::from_str("l").unwrap(), HeaderName::ContentLength);
        assert_eq!(
            HeaderName::from_str("X-Custom").unwrap(),
            HeaderName::Other("x-custom".to_string())
        );
        assert!(HeaderName::from_str("Bad Name").is_err());
    }
}
