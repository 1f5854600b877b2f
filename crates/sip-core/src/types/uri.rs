//! Minimal SIP URI handling: enough to find where a Contact points.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A `sip:` or `sips:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipUri {
    pub scheme: String,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    /// Everything after the host part (`;params?headers`), verbatim
    pub tail: String,
}

impl SipUri {
    /// Port as a string, falling back to the scheme default (5060 / 5061).
    pub fn port_or_default(&self) -> String {
        match self.port {
            Some(port) => port.to_string(),
            None if self.scheme.eq_ignore_ascii_case("sips") => "5061".to_string(),
            None => "5060".to_string(),
        }
    }
}

impl FromStr for SipUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidUri(s.to_string()))?;
        if !scheme.eq_ignore_ascii_case("sip") && !scheme.eq_ignore_ascii_case("sips") {
            return Err(Error::InvalidUri(s.to_string()));
        }

        let (user, hostpart) = match rest.rsplit_once('@') {
            Some((user, hostpart)) => (Some(user.to_string()), hostpart),
            None => (None, rest),
        };

        let end = hostpart.find([';', '?']).unwrap_or(hostpart.len());
        let (host, port) = split_host_port(&hostpart[..end])?;
        if host.is_empty() {
            return Err(Error::InvalidUri(s.to_string()));
        }

        Ok(SipUri {
            scheme: scheme.to_ascii_lowercase(),
            user,
            host,
            port,
            tail: hostpart[end..].to_string(),
        })
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        f.write_str(&self.tail)
    }
}

/// Splits `host[:port]`, accepting bracketed IPv6 references.
pub(crate) fn split_host_port(s: &str) -> Result<(String, Option<u16>)> {
    let s = s.trim();
    let parse_port = |p: &str| {
        p.parse::<u16>()
            .map_err(|_| Error::ParseError(format!("invalid port {:?}", p)))
    };

    if let Some(stripped) = s.strip_prefix('[') {
        let (host, after) = stripped
            .split_once(']')
            .ok_or_else(|| Error::ParseError(format!("unterminated IPv6 reference {:?}", s)))?;
        let port = match after.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if after.is_empty() => None,
            None => return Err(Error::ParseError(format!("garbage after IPv6 reference {:?}", s))),
        };
        return Ok((host.to_string(), port));
    }

    match s.split_once(':') {
        Some((host, p)) => Ok((host.to_string(), Some(parse_port(p)?))),
        None => Ok((s.to_string(), None)),
    }
}

/// Pulls the URI out of a Contact (or From/To) header value.
///
/// Handles `"Name" <sip:...>;params`, `<sip:...>` and the bare `sip:...;params`
/// form, where parameters after the URI belong to the header, not the URI.
pub fn uri_from_name_addr(value: &str) -> Result<SipUri> {
    let value = value.trim();
    if let Some(start) = value.find('<') {
        let end = value[start..]
            .find('>')
            .ok_or_else(|| Error::InvalidUri(value.to_string()))?;
        return SipUri::from_str(&value[start + 1..start + end]);
    }
    let bare = value.split(';').next().unwrap_or_default();
    SipUri::from_str(bare)
}
