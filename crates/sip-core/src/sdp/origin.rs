// SDP Origin (o=) line parsing

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{digit1, space1},
    combinator::{all_consuming, opt},
    sequence::tuple,
    IResult,
};

/// `o=<username> <sess-id> <sess-version> <nettype> <addrtype> <unicast-address>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub username: String,
    pub sess_id: String,
    pub sess_version: String,
    pub addr_type: String,
    pub unicast_address: String,
}

/// Use nom to parse the origin line
pub fn parse_origin(input: &str) -> IResult<&str, Origin> {
    let (input, _) = opt(tag("o="))(input)?;
    let (remainder, (username, _, sess_id, _, sess_version, _, _, _, addr_type, _, addr)) =
        all_consuming(tuple((
            take_till1(|c| c == ' '),
            space1,
            digit1,
            space1,
            digit1,
            space1,
            tag("IN"),
            space1,
            alt((tag("IP4"), tag("IP6"))),
            space1,
            take_till1(|c| c == ' '),
        )))(input.trim_end())?;

    Ok((
        remainder,
        Origin {
            username: username.to_string(),
            sess_id: sess_id.to_string(),
            sess_version: sess_version.to_string(),
            addr_type: addr_type.to_string(),
            unicast_address: addr.to_string(),
        },
    ))
}
