use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::char,
    combinator::all_consuming,
    sequence::tuple,
};

use crate::parser::utils::{is_token, sip_version};
use crate::parser::ParseResult;

/// Parser for a SIP Request-Line (RFC 3261 Section 7.1)
///
/// ```text
/// Request-Line = Method SP Request-URI SP SIP-Version CRLF
/// ```
pub fn parse_request_line(input: &str) -> ParseResult<'_, (&str, &str, &str)> {
    let (input, (method, _, uri, _, version)) = all_consuming(tuple((
        take_while1(is_token),
        char(' '),
        take_till1(|c: char| c == ' '),
        char(' '),
        sip_version,
    )))(input.trim_end())?;
    Ok((input, (method, uri, version)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_line() {
        let (_, (method, uri, version)) =
            parse_request_line("INVITE sip:bob@biloxi.com SIP/2.0").unwrap();
        assert_eq!(method, "INVITE");
        assert_eq!(uri, "sip:bob@biloxi.com");
        assert_eq!(version, "SIP/2.0");
    }

    #[test]
    fn test_request_line_rejects_missing_parts() {
        assert!(parse_request_line("INVITE sip:bob@biloxi.com").is_err());
        assert!(parse_request_line("INVITE  sip:bob@biloxi.com SIP/2.0").is_err());
        assert!(parse_request_line("INVITE sip:bob@biloxi.com HTTP/1.1").is_err());
    }
}
