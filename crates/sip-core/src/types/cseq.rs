use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::method::Method;

/// CSeq header value: sequence number plus method (RFC 3261 Section 8.1.1.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }
}

impl FromStr for CSeq {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(seq), Some(method), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(Error::InvalidHeader(format!("bad CSeq {:?}", s)));
        };
        let seq = seq
            .parse::<u32>()
            .map_err(|_| Error::InvalidHeader(format!("bad CSeq number {:?}", seq)))?;
        Ok(CSeq::new(seq, method.parse()?))
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}
