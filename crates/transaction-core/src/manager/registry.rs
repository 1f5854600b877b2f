use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use sipline_core::Message;

use crate::client::ClientTransaction;
use crate::server::ServerTransaction;
use crate::transaction::{Transaction, TransactionKey, TransactionKind, TransactionState};

/// A registered transaction of either role
#[derive(Debug, Clone)]
pub enum AnyTransaction {
    Client(ClientTransaction),
    Server(ServerTransaction),
}

impl AnyTransaction {
    pub(crate) fn instance(&self) -> u64 {
        match self {
            AnyTransaction::Client(tx) => tx.instance(),
            AnyTransaction::Server(tx) => tx.instance(),
        }
    }

    pub fn as_client(&self) -> Option<&ClientTransaction> {
        match self {
            AnyTransaction::Client(tx) => Some(tx),
            AnyTransaction::Server(_) => None,
        }
    }

    pub fn as_server(&self) -> Option<&ServerTransaction> {
        match self {
            AnyTransaction::Client(_) => None,
            AnyTransaction::Server(tx) => Some(tx),
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, AnyTransaction::Client(_))
    }
}

#[async_trait]
impl Transaction for AnyTransaction {
    fn key(&self) -> &TransactionKey {
        match self {
            AnyTransaction::Client(tx) => tx.key(),
            AnyTransaction::Server(tx) => tx.key(),
        }
    }

    fn kind(&self) -> TransactionKind {
        match self {
            AnyTransaction::Client(tx) => tx.kind(),
            AnyTransaction::Server(tx) => tx.kind(),
        }
    }

    fn state(&self) -> TransactionState {
        match self {
            AnyTransaction::Client(tx) => tx.state(),
            AnyTransaction::Server(tx) => tx.state(),
        }
    }

    async fn history(&self) -> Vec<Message> {
        match self {
            AnyTransaction::Client(tx) => tx.history().await,
            AnyTransaction::Server(tx) => tx.history().await,
        }
    }

    async fn receive(&self, message: Message) {
        match self {
            AnyTransaction::Client(tx) => tx.receive(message).await,
            AnyTransaction::Server(tx) => tx.receive(message).await,
        }
    }

    async fn terminate(&self) {
        match self {
            AnyTransaction::Client(tx) => tx.terminate().await,
            AnyTransaction::Server(tx) => tx.terminate().await,
        }
    }
}

impl From<ClientTransaction> for AnyTransaction {
    fn from(tx: ClientTransaction) -> Self {
        AnyTransaction::Client(tx)
    }
}

impl From<ServerTransaction> for AnyTransaction {
    fn from(tx: ServerTransaction) -> Self {
        AnyTransaction::Server(tx)
    }
}

/// Live transactions by branch.
///
/// Map guards are never held across an await: lookups hand out clones.
#[derive(Debug, Default)]
pub struct Registry {
    transactions: DashMap<TransactionKey, AnyTransaction>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new transaction; `false` if the key is taken.
    pub fn insert_new(&self, tx: AnyTransaction) -> bool {
        match self.transactions.entry(tx.key().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(tx);
                true
            }
        }
    }

    /// Existing transaction for `key`, or the one `create` makes. The flag is
    /// `true` when the transaction was created by this call.
    pub fn get_or_insert_with(
        &self,
        key: TransactionKey,
        create: impl FnOnce() -> AnyTransaction,
    ) -> (AnyTransaction, bool) {
        match self.transactions.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let tx = create();
                entry.insert(tx.clone());
                (tx, true)
            }
        }
    }

    pub fn get(&self, key: &TransactionKey) -> Option<AnyTransaction> {
        self.transactions.get(key).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, key: &TransactionKey) -> Option<AnyTransaction> {
        self.transactions.remove(key).map(|(_, tx)| tx)
    }

    /// Removes `key` only if it still maps to the given instance
    pub(crate) fn remove_instance(&self, key: &TransactionKey, instance: u64) -> bool {
        self.transactions
            .remove_if(key, |_, tx| tx.instance() == instance)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn keys(&self) -> Vec<TransactionKey> {
        self.transactions.iter().map(|entry| entry.key().clone()).collect()
    }
}
