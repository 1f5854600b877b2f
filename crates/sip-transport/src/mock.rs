//! Recording transport for testing the layers above.
//!
//! Every send is parsed back into a [`Message`] and kept together with the
//! destination and the (tokio) time it was sent, so tests running with
//! paused time can assert exact retransmission schedules.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use sipline_core::{parse_message, Message};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Local address reported by [`MockTransport::new`]
pub const MOCK_LOCAL_ADDR: ([u8; 4], u16) = ([192, 0, 2, 10], 5060);

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub host: String,
    pub port: String,
    pub message: Message,
    pub at: Instant,
}

#[derive(Debug)]
pub struct MockTransport {
    local_addr: SocketAddr,
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Self::with_local_addr(SocketAddr::from(MOCK_LOCAL_ADDR))
    }

    pub fn with_local_addr(local_addr: SocketAddr) -> Arc<Self> {
        Arc::new(Self {
            local_addr,
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Everything sent so far, oldest first
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// While set, every send fails with `TransportClosed`
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    async fn send(&self, host: &str, port: &str, payload: Bytes) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::TransportClosed);
        }
        let message = parse_message(&payload)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e.to_string())))?;
        self.sent.lock().push(SentMessage {
            host: host.to_string(),
            port: port.to_string(),
            message,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipline_core::HeaderAccess;

    #[tokio::test]
    async fn test_records_sends_and_failures() {
        let transport = MockTransport::new();
        let wire = Bytes::from_static(
            b"OPTIONS sip:carol@chicago.com SIP/2.0\r\nVia: SIP/2.0/UDP pc33.atlanta.com;branch=z9hG4bKmock\r\nCSeq: 1 OPTIONS\r\n\r\n",
        );

        transport.send("chicago.com", "5060", wire.clone()).await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].host, "chicago.com");
        assert_eq!(sent[0].message.via_branch().as_deref(), Some("z9hG4bKmock"));

        transport.set_failing(true);
        assert!(matches!(
            transport.send("chicago.com", "5060", wire).await,
            Err(Error::TransportClosed)
        ));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.local_addr().unwrap(), SocketAddr::from(MOCK_LOCAL_ADDR));
    }
}
