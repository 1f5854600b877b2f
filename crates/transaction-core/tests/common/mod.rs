// Shared helpers for the transaction integration tests

#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::sync::mpsc::Receiver;
use tracing_subscriber::EnvFilter;

use sipline_core::prelude::{Method, Request, SimpleRequestBuilder};
use sipline_transaction::TransactionEvent;
pub use sipline_transport::mock::{MockTransport, SentMessage};

/// Installs a fmt subscriber once; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn request(method: Method, branch: &str) -> Request {
    SimpleRequestBuilder::new(method, "sip:bob@biloxi.example.com")
        .via("pc33.atlanta.example.com", None, branch)
        .from("Alice", "sip:alice@atlanta.example.com", Some("9fxced76sl"))
        .to("Bob", "sip:bob@biloxi.example.com", None)
        .call_id("3848276298220188511@atlanta.example.com")
        .cseq(1)
        .contact("sip:alice@pc33.atlanta.example.com")
        .max_forwards(70)
        .build()
}

pub fn source() -> SocketAddr {
    "192.0.2.20:5060".parse().unwrap()
}

pub fn drain(rx: &mut Receiver<TransactionEvent>) -> Vec<TransactionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
