use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, trace, warn};

use sipline_core::parse_message;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportEvent};

/// Maximum UDP payload over IPv4
pub const MAX_UDP_PACKET_SIZE: usize = 65_507;
// Buffer size for receiving packets
const UDP_BUFFER_SIZE: usize = 65_535;
// Default channel capacity
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// UDP transport for SIP messages
#[derive(Clone)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

struct UdpTransportInner {
    socket: UdpSocket,
    closed: AtomicBool,
    shutdown: Notify,
    events_tx: mpsc::Sender<TransportEvent>,
}

impl UdpTransport {
    /// Creates a new UDP transport bound to the specified address
    pub async fn bind(
        addr: SocketAddr,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| Error::BindFailed(addr, e))?;

        // Get the actual bound address
        let local_addr = socket.local_addr()?;
        info!("SIP UDP transport bound to {}", local_addr);

        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let transport = UdpTransport {
            inner: Arc::new(UdpTransportInner {
                socket,
                closed: AtomicBool::new(false),
                shutdown: Notify::new(),
                events_tx,
            }),
        };

        transport.spawn_receive_loop();

        Ok((transport, events_rx))
    }

    // Spawns a task to receive packets from the UDP socket
    fn spawn_receive_loop(&self) {
        let transport = self.clone();
        tokio::spawn(async move {
            let inner = &transport.inner;
            let mut buffer = vec![0u8; UDP_BUFFER_SIZE];

            while !inner.closed.load(Ordering::Acquire) {
                let received = tokio::select! {
                    received = inner.socket.recv_from(&mut buffer) => received,
                    _ = inner.shutdown.notified() => break,
                };

                let (len, src) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        if inner.closed.load(Ordering::Acquire) {
                            break;
                        }
                        error!("Error receiving UDP packet: {}", e);
                        let _ = inner
                            .events_tx
                            .send(TransportEvent::Error {
                                error: format!("Error receiving packet: {}", e),
                            })
                            .await;
                        continue;
                    }
                };

                let local_addr = match inner.socket.local_addr() {
                    Ok(addr) => addr,
                    Err(e) => {
                        error!("Error getting local address: {}", e);
                        continue;
                    }
                };

                let packet = &buffer[..len];
                trace!("Received {} bytes from {}", len, src);

                match parse_message(packet) {
                    Ok(message) => {
                        debug!("Received SIP message from {}", src);
                        let event = TransportEvent::MessageReceived {
                            message,
                            source: src,
                            destination: local_addr,
                        };
                        if let Err(e) = inner.events_tx.send(event).await {
                            error!("Error sending event: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Error parsing SIP message from {}: {}", src, e);
                        let _ = inner
                            .events_tx
                            .send(TransportEvent::Error {
                                error: format!("Error parsing SIP message: {}", e),
                            })
                            .await;
                    }
                }
            }

            debug!("UDP receive loop stopped");
            let _ = inner.events_tx.send(TransportEvent::Closed).await;
        });
    }

    async fn resolve(host: &str, port: &str) -> Result<SocketAddr> {
        let port: u16 = port
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("{}:{}", host, port)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        lookup_host((host, port))
            .await
            .map_err(|_| Error::InvalidAddress(format!("{}:{}", host, port)))?
            .next()
            .ok_or_else(|| Error::InvalidAddress(format!("{}:{}", host, port)))
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.socket.local_addr().map_err(Error::from)
    }

    async fn send(&self, host: &str, port: &str, payload: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        if payload.len() > MAX_UDP_PACKET_SIZE {
            return Err(Error::PacketTooLarge(payload.len(), MAX_UDP_PACKET_SIZE));
        }

        let destination = Self::resolve(host, port).await?;
        self.inner
            .socket
            .send_to(&payload, destination)
            .await
            .map_err(|e| Error::SendFailed(destination, e))?;

        trace!("Sent {} bytes to {}", payload.len(), destination);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.shutdown.notify_one();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(addr) = self.inner.socket.local_addr() {
            write!(f, "UdpTransport({})", addr)
        } else {
            write!(f, "UdpTransport(<error>)")
        }
    }
}
