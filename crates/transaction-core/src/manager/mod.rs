//! The transaction manager: owns every transaction and routes inbound
//! messages to them by Via branch.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sipline_transaction::prelude::*;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let (transport, transport_rx) = bind_udp("127.0.0.1:5060".parse()?).await?;
//! let (manager, mut events) = TransactionManager::builder(Arc::new(transport)).build();
//! manager.start(transport_rx);
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

mod handlers;
mod registry;

pub use registry::{AnyTransaction, Registry};

use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use sipline_core::{generate_branch, Header, HeaderAccess, HeaderName, Method, Request, Via};
use sipline_transport::{Transport, TransportEvent};

use crate::client::ClientTransaction;
use crate::config::TransactionConfig;
use crate::error::{Error, Result};
use crate::handler::{AcceptAll, LoggingSdpHandler, RequestHandler, SdpHandler};
use crate::server::ServerTransaction;
use crate::transaction::context::TransactionContext;
use crate::transaction::{EventSink, Transaction, TransactionEvent, TransactionKey, TransactionState};

#[derive(Debug)]
struct ManagerInner {
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
    events: EventSink,
    config: TransactionConfig,
    sdp_handler: Arc<dyn SdpHandler>,
    request_handler: Arc<dyn RequestHandler>,
    shutdown: Notify,
}

/// Creates, finds and deletes transactions.
///
/// Explicitly constructed with [`TransactionManager::builder`]; clones share
/// the same registry.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    inner: Arc<ManagerInner>,
}

/// Builder for [`TransactionManager`]
#[derive(Debug)]
pub struct TransactionManagerBuilder {
    transport: Arc<dyn Transport>,
    config: TransactionConfig,
    sdp_handler: Arc<dyn SdpHandler>,
    request_handler: Arc<dyn RequestHandler>,
}

impl TransactionManagerBuilder {
    pub fn config(mut self, config: TransactionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sdp_handler(mut self, handler: Arc<dyn SdpHandler>) -> Self {
        self.sdp_handler = handler;
        self
    }

    pub fn request_handler(mut self, handler: Arc<dyn RequestHandler>) -> Self {
        self.request_handler = handler;
        self
    }

    /// Returns the manager and a first event receiver
    pub fn build(self) -> (TransactionManager, Receiver<TransactionEvent>) {
        let events = EventSink::new();
        let events_rx = events.subscribe(self.config.event_capacity);
        let manager = TransactionManager {
            inner: Arc::new(ManagerInner {
                transport: self.transport,
                registry: Arc::new(Registry::new()),
                events,
                config: self.config,
                sdp_handler: self.sdp_handler,
                request_handler: self.request_handler,
                shutdown: Notify::new(),
            }),
        };
        (manager, events_rx)
    }
}

impl TransactionManager {
    pub fn builder(transport: Arc<dyn Transport>) -> TransactionManagerBuilder {
        TransactionManagerBuilder {
            transport,
            config: TransactionConfig::default(),
            sdp_handler: Arc::new(LoggingSdpHandler),
            request_handler: Arc::new(AcceptAll),
        }
    }

    /// Manager with default settings and handlers
    pub fn new(transport: Arc<dyn Transport>) -> (Self, Receiver<TransactionEvent>) {
        Self::builder(transport).build()
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Another receiver for every [`TransactionEvent`]
    pub fn subscribe(&self) -> Receiver<TransactionEvent> {
        self.inner.events.subscribe(self.inner.config.event_capacity)
    }

    fn context(&self) -> TransactionContext {
        TransactionContext {
            transport: self.inner.transport.clone(),
            timers: self.inner.config.timers,
            events: self.inner.events.clone(),
            registry: Arc::downgrade(&self.inner.registry),
            sdp_handler: self.inner.sdp_handler.clone(),
            request_handler: self.inner.request_handler.clone(),
        }
    }

    fn key_for(request: &Request) -> Result<TransactionKey> {
        if request.method == Method::Ack {
            return Err(Error::InvalidRequest(
                "ACK does not start a transaction".to_string(),
            ));
        }
        request
            .via_branch()
            .map(TransactionKey::new)
            .ok_or(Error::MissingBranch)
    }

    /// Registers a client transaction for `request`. Nothing is sent until
    /// [`ClientTransaction::send`].
    ///
    /// # Panics
    ///
    /// If a transaction with the same branch is already registered. Branches
    /// are unique by construction, so a collision is a bug in the caller.
    pub fn create_client_transaction(&self, request: &Request) -> Result<ClientTransaction> {
        let key = Self::key_for(request)?;
        let tx = ClientTransaction::new(key.clone(), &request.method, self.context());
        if !self.inner.registry.insert_new(tx.clone().into()) {
            panic!("duplicate transaction branch {}", key);
        }
        debug!(id=%key, kind=%tx.kind(), "Created client transaction");
        Ok(tx)
    }

    /// Registers a server transaction for an inbound `request`; deliver the
    /// request with [`Transaction::receive`].
    ///
    /// # Panics
    ///
    /// If a transaction with the same branch is already registered.
    pub fn create_server_transaction(&self, request: &Request) -> Result<ServerTransaction> {
        let key = Self::key_for(request)?;
        let tx = ServerTransaction::new(key.clone(), &request.method, self.context());
        if !self.inner.registry.insert_new(tx.clone().into()) {
            panic!("duplicate transaction branch {}", key);
        }
        debug!(id=%key, kind=%tx.kind(), "Created server transaction");
        Ok(tx)
    }

    /// Creates a client transaction for `request` and sends it.
    ///
    /// A request without a Via branch gets one: appended to its top Via, or
    /// in a new top Via naming the transport's local address.
    pub async fn send_request(
        &self,
        mut request: Request,
        host: &str,
        port: &str,
    ) -> Result<ClientTransaction> {
        if request.via_branch().is_none() {
            self.add_branch(&mut request)?;
        }
        let tx = self.create_client_transaction(&request)?;
        tx.send(request, host, port).await?;
        Ok(tx)
    }

    fn add_branch(&self, request: &mut Request) -> Result<()> {
        let branch = generate_branch();
        match request.headers.first_mut(&HeaderName::Via) {
            Some(via) => {
                via.value = format!("{};branch={}", via.value, branch);
            }
            None => {
                let local = self.inner.transport.local_addr()?;
                let via = Via::udp(local.ip().to_string(), Some(local.port()), branch);
                request
                    .headers
                    .push_front(Header::new(HeaderName::Via, via.to_string()));
            }
        }
        Ok(())
    }

    pub fn lookup(&self, key: &TransactionKey) -> Option<AnyTransaction> {
        self.inner.registry.get(key)
    }

    /// Removes the transaction and cancels its timers. Absent keys are ignored.
    pub async fn delete_transaction(&self, key: &TransactionKey) {
        match self.inner.registry.remove(key) {
            Some(tx) => {
                debug!(id=%key, "Deleting transaction");
                tx.terminate().await;
            }
            None => trace!(id=%key, "Delete of unknown transaction ignored"),
        }
    }

    /// Sends a CANCEL for the pending INVITE client transaction `key`.
    pub async fn cancel_transaction(&self, key: &TransactionKey) -> Result<()> {
        match self.inner.registry.get(key) {
            Some(AnyTransaction::Client(tx)) => tx.cancel().await,
            Some(AnyTransaction::Server(_)) => Err(Error::InvalidRequest(format!(
                "{} is a server transaction",
                key
            ))),
            None => Err(Error::TransactionNotFound(key.clone())),
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn transaction_state(&self, key: &TransactionKey) -> Option<TransactionState> {
        self.inner.registry.get(key).map(|tx| tx.state())
    }

    pub fn transaction_keys(&self) -> Vec<TransactionKey> {
        self.inner.registry.keys()
    }

    /// Feeds transport events into [`TransactionManager::dispatch`] until the
    /// transport closes or [`TransactionManager::shutdown`] is called.
    ///
    /// Messages are dispatched one at a time in arrival order.
    pub async fn run(&self, mut transport_rx: Receiver<TransportEvent>) {
        debug!("Starting transaction message loop");
        loop {
            tokio::select! {
                _ = self.inner.shutdown.notified() => {
                    debug!("Transaction manager stopping message loop");
                    break;
                }
                event = transport_rx.recv() => match event {
                    Some(TransportEvent::MessageReceived { message, source, .. }) => {
                        self.dispatch(message, source).await;
                    }
                    Some(TransportEvent::Error { error }) => {
                        warn!(%error, "Transport reported an error");
                    }
                    Some(TransportEvent::Closed) | None => {
                        debug!("Transport closed, stopping message loop");
                        break;
                    }
                },
            }
        }
    }

    /// Spawns [`TransactionManager::run`]
    pub fn start(&self, transport_rx: Receiver<TransportEvent>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move { manager.run(transport_rx).await })
    }

    /// Terminates every transaction, stops the message loop and closes the
    /// transport.
    pub async fn shutdown(&self) {
        info!(transactions = self.transaction_count(), "Shutting down transaction manager");
        for key in self.inner.registry.keys() {
            self.delete_transaction(&key).await;
        }
        self.inner.shutdown.notify_one();
        if let Err(e) = self.inner.transport.close().await {
            warn!(error=%e, "Error closing transport");
        }
    }
}
