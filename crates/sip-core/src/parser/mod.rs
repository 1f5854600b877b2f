//! SIP message parser.
//!
//! [`parse_message`] turns one datagram into a [`Message`]. The head
//! (start line plus headers) must be UTF-8; the body is kept as raw bytes.

pub mod request;
pub mod response;
pub mod utils;

use std::str::FromStr;

use bytes::Bytes;
use nom::IResult;

use crate::error::{Error, Result};
use crate::types::{Header, HeaderName, Headers, Message, Method, Request, Response, StatusCode};

pub use request::parse_request_line;
pub use response::parse_status_line;

/// Result type of the nom parsers in this module
pub type ParseResult<'a, O> = IResult<&'a str, O>;

/// Parses a complete SIP message.
///
/// Leading empty lines are skipped (RFC 3261 Section 7.5). If a
/// Content-Length header is present the body is cut to that length, and a
/// length larger than the available bytes is an error.
pub fn parse_message(input: &[u8]) -> Result<Message> {
    let (head, body) = split_head_body(input);
    let head = std::str::from_utf8(head)?;

    let mut lines = utils::unfold_lines(head)
        .into_iter()
        .skip_while(|line| line.trim().is_empty());
    let start_line = lines
        .next()
        .ok_or_else(|| Error::ParseError("empty message".to_string()))?;

    let headers = lines
        .filter(|line| !line.is_empty())
        .map(|line| parse_header(&line))
        .collect::<Result<Headers>>()?;

    let body = match headers.get(&HeaderName::ContentLength) {
        Some(value) => {
            let len = value
                .parse::<usize>()
                .map_err(|_| Error::InvalidContentLength(value.to_string()))?;
            if len > body.len() {
                return Err(Error::InvalidContentLength(format!(
                    "{} exceeds {} available bytes",
                    len,
                    body.len()
                )));
            }
            &body[..len]
        }
        None => body,
    };
    let body = Bytes::copy_from_slice(body);

    let is_status_line = start_line
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("SIP/"));
    if is_status_line {
        let (_, (version, code, reason)) = parse_status_line(&start_line)
            .map_err(|_| Error::InvalidStartLine(start_line.clone()))?;
        check_version(version, &start_line)?;
        let status = StatusCode::from_u16(code)?;
        Ok(Message::Response(Response {
            status,
            reason: reason.to_string(),
            headers,
            body,
        }))
    } else {
        let (_, (method, uri, version)) = parse_request_line(&start_line)
            .map_err(|_| Error::InvalidStartLine(start_line.clone()))?;
        check_version(version, &start_line)?;
        Ok(Message::Request(Request {
            method: Method::from_str(method)?,
            uri: uri.to_string(),
            headers,
            body,
        }))
    }
}

fn parse_header(line: &str) -> Result<Header> {
    let (_, (name, value)) =
        utils::header_line(line).map_err(|_| Error::InvalidHeader(line.to_string()))?;
    Ok(Header::new(HeaderName::from_str(name)?, value))
}

fn check_version(version: &str, line: &str) -> Result<()> {
    if version.eq_ignore_ascii_case("SIP/2.0") {
        Ok(())
    } else {
        Err(Error::InvalidStartLine(line.to_string()))
    }
}

/// Splits at the first empty line. Without one the whole input is the head.
fn split_head_body(input: &[u8]) -> (&[u8], &[u8]) {
    if let Some(pos) = find(input, b"\r\n\r\n") {
        return (&input[..pos], &input[pos + 4..]);
    }
    if let Some(pos) = find(input, b"\n\n") {
        return (&input[..pos], &input[pos + 2..]);
    }
    (input, &input[input.len()..])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HeaderAccess;

    const INVITE: &str = "INVITE sip:bob@biloxi.com SIP/2.0\r\n\
Via: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bK776asdhds\r\n\
Max-Forwards: 70\r\n\
To: Bob <sip:bob@biloxi.com>\r\n\
From: Alice <sip:alice@atlanta.com>;tag=1928301774\r\n\
Call-ID: a84b4c76e66710@pc33.atlanta.com\r\n\
CSeq: 314159 INVITE\r\n\
Contact: <sip:alice@pc33.atlanta.com:5070>\r\n\
Content-Type: application/sdp\r\n\
Content-Length: 12\r\n\
\r\n\
v=0\r\no=alice\r\ntrailing garbage";

    #[test]
    fn test_parse_invite() {
        let msg = parse_message(INVITE.as_bytes()).unwrap();
        assert_eq!(msg.method(), Some(Method::Invite));
        assert_eq!(msg.via_branch().as_deref(), Some("z9hG4bK776asdhds"));
        assert_eq!(msg.contact_host().as_deref(), Some("pc33.atlanta.com"));
        assert_eq!(msg.contact_port().as_deref(), Some("5070"));
        assert_eq!(msg.sdp_payload(), Some(Bytes::from_static(b"v=0\r\no=alice")));
        assert!(msg.status_code().is_none());
    }

    #[test]
    fn test_parse_response_compact_headers() {
        let raw = b"SIP/2.0 180 Ringing\nv: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKabc\nl: 0\n\n";
        let msg = parse_message(raw).unwrap();
        assert_eq!(msg.status_code(), Some(StatusCode::RINGING));
        assert_eq!(msg.via_branch().as_deref(), Some("z9hG4bKabc"));
        assert!(msg.body().is_empty());
    }

    #[test]
    fn test_export_then_parse_preserves_headers() {
        let msg = parse_message(INVITE.as_bytes()).unwrap();
        let again = parse_message(&msg.export()).unwrap();
        assert_eq!(msg, again);
    }

    #[test]
    fn test_leading_crlf_is_skipped() {
        let raw = b"\r\nOPTIONS sip:carol@chicago.com SIP/2.0\r\nCSeq: 1 OPTIONS\r\n\r\n";
        let msg = parse_message(raw).unwrap();
        assert_eq!(msg.method(), Some(Method::Options));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(matches!(parse_message(b""), Err(Error::ParseError(_))));
        assert!(matches!(
            parse_message(b"HELLO\r\n\r\n"),
            Err(Error::InvalidStartLine(_))
        ));
        assert!(matches!(
            parse_message(b"INVITE sip:a@b SIP/3.0\r\n\r\n"),
            Err(Error::InvalidStartLine(_))
        ));
        assert!(matches!(
            parse_message(b"SIP/2.0 99 Odd\r\n\r\n"),
            Err(Error::InvalidStartLine(_))
        ));
        assert!(matches!(
            parse_message(b"SIP/2.0 200 OK\r\nbroken header\r\n\r\n"),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            parse_message(b"SIP/2.0 200 OK\r\nContent-Length: 10\r\n\r\nabc"),
            Err(Error::InvalidContentLength(_))
        ));
        assert!(matches!(
            parse_message(b"SIP/2.0 200 OK\r\nContent-Length: abc\r\n\r\n"),
            Err(Error::InvalidContentLength(_))
        ));
        assert!(matches!(
            parse_message(&[b'S', b'I', b'P', 0xff, b'\r', b'\n', b'\r', b'\n']),
            Err(Error::Utf8(_))
        ));
    }
}
