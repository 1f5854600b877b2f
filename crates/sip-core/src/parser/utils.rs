// Utility functions for parsing

use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1, space0},
    combinator::{recognize, rest},
    sequence::tuple,
};

use crate::parser::ParseResult;
use crate::types::method::is_token_char;

pub(crate) fn is_token(c: char) -> bool {
    c.is_ascii() && is_token_char(c as u8)
}

/// `SIP-Version = "SIP" "/" 1*DIGIT "." 1*DIGIT`
pub fn sip_version(input: &str) -> ParseResult<'_, &str> {
    recognize(tuple((tag_no_case("SIP/"), digit1, char('.'), digit1)))(input)
}

/// `header-name HCOLON header-value`, value trimmed
pub fn header_line(input: &str) -> ParseResult<'_, (&str, &str)> {
    let (input, (name, _, _, value)) =
        tuple((take_while1(is_token), space0, char(':'), rest))(input)?;
    Ok((input, (name, value.trim())))
}

/// Splits the header section into logical lines.
///
/// Accepts CRLF or bare LF, and joins folded continuation lines (leading SP
/// or HTAB) onto the previous line with a single space.
pub fn unfold_lines(head: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in head.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        match lines.last_mut() {
            Some(previous) if line.starts_with([' ', '\t']) => {
                previous.push(' ');
                previous.push_str(line.trim());
            }
            _ => lines.push(line.to_string()),
        }
    }
    lines
}
