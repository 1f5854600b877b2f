//! Builders and handlers shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use sipline_core::{Method, Request, SimpleRequestBuilder};
pub(crate) use sipline_transport::mock::MockTransport;

use crate::manager::TransactionManager;
use crate::transaction::TransactionEvent;
use crate::{RequestHandler, SdpHandler, TransactionConfig};

pub(crate) fn manager(
    transport: Arc<MockTransport>,
    config: TransactionConfig,
    handler: Option<Arc<dyn RequestHandler>>,
) -> (TransactionManager, tokio::sync::mpsc::Receiver<TransactionEvent>) {
    let mut builder = TransactionManager::builder(transport).config(config);
    if let Some(handler) = handler {
        builder = builder.request_handler(handler);
    }
    builder.build()
}

/// Records each payload with the number of messages sent before it arrived
#[derive(Debug)]
pub(crate) struct RecordingSdp {
    transport: Arc<MockTransport>,
    calls: Mutex<Vec<(Vec<u8>, usize)>>,
}

impl RecordingSdp {
    pub fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Vec<u8>, usize)> {
        self.calls.lock().clone()
    }
}

impl SdpHandler for RecordingSdp {
    fn handle(&self, payload: &[u8]) {
        let sent = self.transport.sent().len();
        self.calls.lock().push((payload.to_vec(), sent));
    }
}

/// Leaves every final response to the test
#[derive(Debug)]
pub(crate) struct Deferred;

impl RequestHandler for Deferred {
    fn final_response(&self, _request: &Request) -> Option<u16> {
        None
    }
}

pub(crate) fn manager_with_sdp(
    transport: Arc<MockTransport>,
    sdp: Arc<RecordingSdp>,
    handler: Arc<dyn RequestHandler>,
) -> (TransactionManager, tokio::sync::mpsc::Receiver<TransactionEvent>) {
    TransactionManager::builder(transport)
        .sdp_handler(sdp)
        .request_handler(handler)
        .build()
}

pub(crate) fn request(method: Method, branch: &str) -> Request {
    SimpleRequestBuilder::new(method, "sip:bob@biloxi.example.com")
        .via("client.atlanta.example.com", Some(5060), branch)
        .from("Alice", "sip:alice@atlanta.example.com", Some("1928301774"))
        .to("Bob", "sip:bob@biloxi.example.com", None)
        .call_id("a84b4c76e66710@client.atlanta.example.com")
        .cseq(314159)
        .contact("sip:alice@client.atlanta.example.com:5062")
        .max_forwards(70)
        .build()
}

/// Drains every event already queued
pub(crate) fn drain(rx: &mut tokio::sync::mpsc::Receiver<TransactionEvent>) -> Vec<TransactionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
