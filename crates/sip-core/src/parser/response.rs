use nom::{
    bytes::complete::take_while_m_n,
    character::complete::space1,
    combinator::{all_consuming, map_res, opt, rest},
    sequence::{preceded, tuple},
};

use crate::parser::utils::sip_version;
use crate::parser::ParseResult;

/// Parser for a SIP Status-Line (RFC 3261 Section 7.2)
///
/// ```text
/// Status-Line = SIP-Version SP Status-Code SP Reason-Phrase CRLF
/// ```
///
/// The line ending has already been stripped. An empty reason phrase is
/// tolerated.
pub fn parse_status_line(input: &str) -> ParseResult<'_, (&str, u16, &str)> {
    let (input, (version, _, code, reason)) = all_consuming(tuple((
        sip_version,
        space1,
        map_res(
            take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
            |digits: &str| digits.parse::<u16>(),
        ),
        opt(preceded(space1, rest)),
    )))(input.trim_end())?;
    Ok((input, (version, code, reason.unwrap_or_default())))
}
