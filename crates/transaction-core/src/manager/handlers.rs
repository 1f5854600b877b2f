use std::net::SocketAddr;

use tracing::{debug, trace};

use sipline_core::{Message, Method, Request, Response};

use super::{AnyTransaction, TransactionManager};
use crate::server::ServerTransaction;
use crate::transaction::{Transaction, TransactionEvent, TransactionKey};

impl TransactionManager {
    /// Routes one inbound message.
    ///
    /// - request for a known server transaction: delivered to it
    /// - new request: a server transaction is created and handed the request
    /// - ACK matching nothing: reported as [`TransactionEvent::StrayAck`]
    /// - response for a known client transaction: delivered to it
    /// - response matching nothing: dropped
    ///
    /// Messages without a Via branch and messages whose branch belongs to a
    /// transaction of the wrong role are dropped. Nothing here is an error.
    pub async fn dispatch(&self, message: Message, source: SocketAddr) {
        let Some(key) = TransactionKey::from_message(&message) else {
            debug!(%source, "Dropping message without Via branch");
            return;
        };
        match message {
            Message::Request(request) => self.dispatch_request(key, request, source).await,
            Message::Response(response) => self.dispatch_response(key, response, source).await,
        }
    }

    async fn dispatch_request(&self, key: TransactionKey, request: Request, source: SocketAddr) {
        trace!(id=%key, method=%request.method, %source, "Dispatching request");
        match self.inner.registry.get(&key) {
            Some(AnyTransaction::Server(tx)) => {
                tx.receive(Message::Request(request)).await;
                return;
            }
            Some(AnyTransaction::Client(_)) => {
                debug!(id=%key, method=%request.method, "Request matches a client transaction, dropping");
                return;
            }
            None => {}
        }

        if request.method == Method::Ack {
            debug!(id=%key, %source, "ACK matches no transaction");
            self.inner.events.emit(TransactionEvent::StrayAck { request, source });
            return;
        }

        let ctx = self.context();
        let (tx, created) = self.inner.registry.get_or_insert_with(key.clone(), || {
            ServerTransaction::new(key.clone(), &request.method, ctx).into()
        });
        if created {
            debug!(id=%key, kind=%tx.kind(), "Created server transaction");
        }
        tx.receive(Message::Request(request)).await;
    }

    async fn dispatch_response(&self, key: TransactionKey, response: Response, source: SocketAddr) {
        trace!(id=%key, status=%response.status_code(), %source, "Dispatching response");
        match self.inner.registry.get(&key) {
            Some(AnyTransaction::Client(tx)) => tx.receive(Message::Response(response)).await,
            Some(AnyTransaction::Server(_)) => {
                debug!(id=%key, "Response matches a server transaction, dropping");
            }
            None => {
                debug!(id=%key, status=%response.status_code(), %source, "Orphan response, dropping");
            }
        }
    }
}
