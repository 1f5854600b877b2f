use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{trace, warn};

use sipline_core::{Request, Response};

use super::{TransactionKey, TransactionState};

/// What the transaction layer reports to the transaction user (TU).
#[derive(Debug, Clone)]
pub enum TransactionEvent {
    /// A server transaction was created for a new request
    NewRequest {
        transaction_id: TransactionKey,
        request: Request,
    },
    ProvisionalResponse {
        transaction_id: TransactionKey,
        response: Response,
    },
    SuccessResponse {
        transaction_id: TransactionKey,
        response: Response,
    },
    FailureResponse {
        transaction_id: TransactionKey,
        response: Response,
    },
    /// ACK matched a server transaction; it is never answered
    AckReceived {
        transaction_id: TransactionKey,
        request: Request,
    },
    /// CANCEL for a server transaction; already answered with 200
    CancelReceived {
        transaction_id: TransactionKey,
        cancel_request: Request,
    },
    /// ACK that matched no transaction (e.g. the ACK for a 2xx)
    StrayAck { request: Request, source: SocketAddr },
    StateChanged {
        transaction_id: TransactionKey,
        previous_state: TransactionState,
        new_state: TransactionState,
    },
    TransportError {
        transaction_id: TransactionKey,
        error: String,
    },
    /// Timer B or F expired without a final response
    TransactionTimeout { transaction_id: TransactionKey },
    TransactionTerminated { transaction_id: TransactionKey },
}

impl TransactionEvent {
    /// Transaction the event belongs to; `None` for a stray ACK
    pub fn transaction_id(&self) -> Option<&TransactionKey> {
        match self {
            TransactionEvent::NewRequest { transaction_id, .. }
            | TransactionEvent::ProvisionalResponse { transaction_id, .. }
            | TransactionEvent::SuccessResponse { transaction_id, .. }
            | TransactionEvent::FailureResponse { transaction_id, .. }
            | TransactionEvent::AckReceived { transaction_id, .. }
            | TransactionEvent::CancelReceived { transaction_id, .. }
            | TransactionEvent::StateChanged { transaction_id, .. }
            | TransactionEvent::TransportError { transaction_id, .. }
            | TransactionEvent::TransactionTimeout { transaction_id }
            | TransactionEvent::TransactionTerminated { transaction_id } => Some(transaction_id),
            TransactionEvent::StrayAck { .. } => None,
        }
    }
}

/// Fan-out of [`TransactionEvent`]s to every subscriber.
///
/// Delivery never waits: a subscriber whose channel is full misses the event,
/// a subscriber whose receiver was dropped is removed.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<TransactionEvent>>>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<TransactionEvent> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: TransactionEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!(event = ?dropped, "Event channel full, dropping event");
                true
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Removing closed event subscriber");
                false
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
