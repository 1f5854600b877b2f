//! Types shared by client and server transactions.

pub(crate) mod context;
pub mod event;
pub mod fsm;
pub mod key;
pub mod state;

use std::fmt;

use async_trait::async_trait;

use sipline_core::{Message, Method};

pub use event::{EventSink, TransactionEvent};
pub use key::TransactionKey;
pub use state::{AtomicTransactionState, TransactionState};

/// The four transaction state machines of RFC 3261 Section 17
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    InviteClient,
    NonInviteClient,
    InviteServer,
    NonInviteServer,
}

impl TransactionKind {
    pub fn client_for(method: &Method) -> Self {
        if *method == Method::Invite {
            TransactionKind::InviteClient
        } else {
            TransactionKind::NonInviteClient
        }
    }

    pub fn server_for(method: &Method) -> Self {
        if *method == Method::Invite {
            TransactionKind::InviteServer
        } else {
            TransactionKind::NonInviteServer
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::NonInviteClient)
    }

    pub fn is_invite(&self) -> bool {
        matches!(self, TransactionKind::InviteClient | TransactionKind::InviteServer)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::InviteClient => "INVITE client",
            TransactionKind::NonInviteClient => "non-INVITE client",
            TransactionKind::InviteServer => "INVITE server",
            TransactionKind::NonInviteServer => "non-INVITE server",
        };
        f.write_str(name)
    }
}

/// Behaviour common to client and server transactions.
///
/// All mutation goes through one lock per transaction, so `receive`, timer
/// callbacks and the owner's calls are applied one at a time.
#[async_trait]
pub trait Transaction: Send + Sync + fmt::Debug {
    fn key(&self) -> &TransactionKey;

    fn kind(&self) -> TransactionKind;

    /// Current state, read without taking the transaction lock
    fn state(&self) -> TransactionState;

    /// Every message seen or sent by this transaction, oldest first.
    /// Retransmissions are not recorded.
    async fn history(&self) -> Vec<Message>;

    /// Feeds an inbound message into the state machine
    async fn receive(&self, message: Message);

    /// Cancels all timers and moves to `Terminated` if not already there
    async fn terminate(&self);
}
