//! # SIP Via Header
//!
//! Only the parts the transaction layer relies on are modelled: the sent
//! protocol, the sent-by host/port and the parameter list, in particular the
//! `branch` parameter that identifies a transaction (RFC 3261 Section 8.1.1.7).
//!
//! ```text
//! Via: SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds
//! ```

use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, space0},
    sequence::{delimited, tuple},
    IResult,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::uri::split_host_port;

/// Magic cookie that prefixes RFC 3261 compliant branch values.
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

/// Generates a fresh, globally unique branch value carrying the magic cookie.
pub fn generate_branch() -> String {
    format!("{}{}", BRANCH_MAGIC_COOKIE, Uuid::new_v4().simple())
}

/// One Via entry (a single hop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Via {
    pub transport: String,
    pub host: String,
    pub port: Option<u16>,
    /// `name[=value]` parameters in the order they appeared
    pub params: Vec<(String, Option<String>)>,
}

impl Via {
    /// Creates a UDP Via entry carrying the given branch.
    pub fn udp(host: impl Into<String>, port: Option<u16>, branch: impl Into<String>) -> Self {
        Self {
            transport: "UDP".to_string(),
            host: host.into(),
            port,
            params: vec![("branch".to_string(), Some(branch.into()))],
        }
    }

    pub fn branch(&self) -> Option<&str> {
        self.param("branch")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }
}

fn sent_protocol(input: &str) -> IResult<&str, &str> {
    let (input, (_, _, _, _, _, _, transport)) = tuple((
        tag_no_case("SIP"),
        space0,
        char('/'),
        delimited(space0, tag_no_case("2.0"), space0),
        char('/'),
        space0,
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    ))(input)?;
    Ok((input, transport))
}

impl FromStr for Via {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // A single field may carry several comma separated hops; the first one is the top Via.
        let first = s.split(',').next().unwrap_or_default().trim();
        let (rest, transport) = sent_protocol(first)
            .map_err(|_| Error::InvalidHeader(format!("bad Via sent-protocol: {}", s)))?;

        let mut parts = rest.trim_start().split(';');
        let sent_by = parts.next().unwrap_or_default().trim();
        if sent_by.is_empty() {
            return Err(Error::InvalidHeader(format!("Via without sent-by: {}", s)));
        }
        let (host, port) = split_host_port(sent_by)?;

        let params = parts
            .filter(|p| !p.trim().is_empty())
            .map(|p| match p.split_once('=') {
                Some((name, value)) => (name.trim().to_string(), Some(value.trim().to_string())),
                None => (p.trim().to_string(), None),
            })
            .collect();

        Ok(Via {
            transport: transport.to_ascii_uppercase(),
            host,
            port,
            params,
        })
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/2.0/{} ", self.transport)?;
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        for (name, value) in &self.params {
            match value {
                Some(value) => write!(f, ";{}={}", name, value)?,
                None => write!(f, ";{}", name)?,
            }
        }
        Ok(())
    }
}
