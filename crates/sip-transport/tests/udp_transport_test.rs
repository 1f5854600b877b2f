//! UDP transport over the loopback interface

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;

use sipline_core::prelude::{HeaderAccess, Message, Method, Request, SimpleRequestBuilder};
use sipline_transport::prelude::*;
use sipline_transport::MAX_UDP_PACKET_SIZE;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn loopback() -> (UdpTransport, Receiver<TransportEvent>, SocketAddr) {
    init_tracing();
    let (transport, rx) = bind_udp("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = transport.local_addr().unwrap();
    (transport, rx, addr)
}

async fn next_event(rx: &mut Receiver<TransportEvent>) -> TransportEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport channel closed")
}

fn options() -> Request {
    SimpleRequestBuilder::new(Method::Options, "sip:carol@127.0.0.1")
        .via("127.0.0.1", None, "z9hG4bKloopback1")
        .from("Alice", "sip:alice@127.0.0.1", Some("a1"))
        .to("Carol", "sip:carol@127.0.0.1", None)
        .call_id("loopback-call")
        .cseq(1)
        .build()
}

#[tokio::test]
async fn test_message_round_trip_between_transports() {
    let (alice, _alice_rx, alice_addr) = loopback().await;
    let (_carol, mut carol_rx, carol_addr) = loopback().await;

    let payload = Message::from(options()).export();
    alice
        .send("127.0.0.1", &carol_addr.port().to_string(), payload)
        .await
        .unwrap();

    match next_event(&mut carol_rx).await {
        TransportEvent::MessageReceived { message, source, destination } => {
            assert_eq!(message.method(), Some(Method::Options));
            assert_eq!(message.via_branch().as_deref(), Some("z9hG4bKloopback1"));
            assert_eq!(source, alice_addr);
            assert_eq!(destination, carol_addr);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_garbage_datagram_reports_error() {
    let (alice, _alice_rx, _) = loopback().await;
    let (_carol, mut carol_rx, carol_addr) = loopback().await;

    alice
        .send(
            "127.0.0.1",
            &carol_addr.port().to_string(),
            Bytes::from_static(b"not sip at all\r\n\r\n"),
        )
        .await
        .unwrap();

    match next_event(&mut carol_rx).await {
        TransportEvent::Error { error } => assert!(error.contains("parsing")),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_send_rejections() {
    let (alice, mut alice_rx, _) = loopback().await;

    let too_big = Bytes::from(vec![b'x'; MAX_UDP_PACKET_SIZE + 1]);
    assert!(matches!(
        alice.send("127.0.0.1", "5060", too_big).await,
        Err(Error::PacketTooLarge(_, MAX_UDP_PACKET_SIZE))
    ));
    assert!(matches!(
        alice.send("127.0.0.1", "not-a-port", Bytes::new()).await,
        Err(Error::InvalidAddress(_))
    ));

    alice.close().await.unwrap();
    assert!(alice.is_closed());
    assert!(matches!(
        alice.send("127.0.0.1", "5060", Bytes::new()).await,
        Err(Error::TransportClosed)
    ));
    assert!(matches!(next_event(&mut alice_rx).await, TransportEvent::Closed));
}
