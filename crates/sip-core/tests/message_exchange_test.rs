//! Tests for the request/response helpers a transaction layer builds on

use sipline_core::prelude::*;

fn invite() -> Request {
    SimpleRequestBuilder::new(Method::Invite, "sip:bob@biloxi.com")
        .via("pc33.atlanta.com", Some(5060), "z9hG4bK74bf9")
        .max_forwards(70)
        .from("Alice", "sip:alice@atlanta.com", Some("9fxced76sl"))
        .to("Bob", "sip:bob@biloxi.com", None)
        .call_id("3848276298220188511@atlanta.example.com")
        .cseq(1)
        .contact("sip:alice@client.atlanta.example.com:5080")
        .sdp("v=0\r\no=alice 2890844526 2890844526 IN IP4 client.atlanta.example.com\r\ns=-\r\n")
        .build()
}

#[test]
fn test_invite_survives_the_wire() {
    let wire = Message::from(invite()).export();
    let parsed = parse_message(&wire).unwrap();

    assert_eq!(parsed.method(), Some(Method::Invite));
    assert_eq!(parsed.via_branch().as_deref(), Some("z9hG4bK74bf9"));
    assert_eq!(parsed.contact_host().as_deref(), Some("client.atlanta.example.com"));
    assert_eq!(parsed.contact_port().as_deref(), Some("5080"));

    let summary = SessionSummary::parse(&parsed.sdp_payload().unwrap()).unwrap();
    assert_eq!(summary.origin.unwrap().unicast_address, "client.atlanta.example.com");
}

#[test]
fn test_response_matches_request_branch() {
    let request = invite();
    let response = Response::from_request(StatusCode::RINGING, &request);
    let parsed = parse_message(&Message::from(response).export()).unwrap();

    assert_eq!(parsed.status_code(), Some(StatusCode::RINGING));
    assert_eq!(parsed.method(), Some(Method::Invite));
    assert_eq!(parsed.via_branch(), request.via_branch());
    assert_eq!(parsed.call_id(), request.call_id());
}

#[test]
fn test_cancel_and_ack_share_the_invite_branch() {
    let request = invite();
    let busy = Response::from_request(StatusCode::from_u16(486).unwrap(), &request);

    let cancel = request.cancel().unwrap();
    let ack = request.ack_for(&busy).unwrap();

    assert_eq!(cancel.via_branch(), request.via_branch());
    assert_eq!(ack.via_branch(), request.via_branch());
    assert_eq!(cancel.cseq().map(|c| c.seq), Some(1));
    assert_eq!(ack.cseq().map(|c| c.method), Some(Method::Ack));
    assert_eq!(ack.header(&HeaderName::To), busy.header(&HeaderName::To));
}

#[test]
fn test_folded_header_and_compact_contact() {
    let raw = b"BYE sip:alice@pc33.atlanta.com SIP/2.0\r\n\
v: SIP/2.0/UDP 192.0.2.4;branch=z9hG4bKnashds10\r\n\
Subject: a very\r\n long subject\r\n\
m: <sip:bob@192.0.2.4:5062>\r\n\
l: 0\r\n\r\n";
    let parsed = parse_message(raw).unwrap();

    assert_eq!(parsed.method(), Some(Method::Bye));
    assert_eq!(
        parsed.header(&HeaderName::Other("Subject".to_string())),
        Some("a very long subject")
    );
    assert_eq!(
        parsed.response_destination(),
        Some(("192.0.2.4".to_string(), "5062".to_string()))
    );
}

#[test]
fn test_builder_is_exported_at_crate_root() {
    let register = sipline_core::SimpleRequestBuilder::new(Method::Register, "sip:registrar.biloxi.com")
        .via("bobspc.biloxi.com", Some(5060), "z9hG4bKnashds7")
        .cseq(1826)
        .build();
    assert_eq!(register.method, Method::Register);
    assert_eq!(register.via_branch().as_deref(), Some("z9hG4bKnashds7"));
}
