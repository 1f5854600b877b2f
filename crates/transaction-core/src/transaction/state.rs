use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of a transaction (RFC 3261 Section 17).
///
/// Client transactions move `Initial -> Calling -> Proceeding -> Completed ->
/// Terminated`. Server transactions skip `Calling`: receiving the request puts
/// them in `Proceeding`, sending a final response in `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Nothing sent or received yet
    Initial,
    /// Request sent, no response yet (client only)
    Calling,
    /// Provisional response received (client) or request accepted (server)
    Proceeding,
    /// Final response received or sent, absorbing retransmissions
    Completed,
    /// Finished; the transaction is removed from the manager
    Terminated,
}

impl TransactionState {
    pub fn is_terminated(&self) -> bool {
        *self == TransactionState::Terminated
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Initial => "Initial",
            TransactionState::Calling => "Calling",
            TransactionState::Proceeding => "Proceeding",
            TransactionState::Completed => "Completed",
            TransactionState::Terminated => "Terminated",
        };
        f.write_str(name)
    }
}

impl From<TransactionState> for u8 {
    fn from(state: TransactionState) -> Self {
        match state {
            TransactionState::Initial => 0,
            TransactionState::Calling => 1,
            TransactionState::Proceeding => 2,
            TransactionState::Completed => 3,
            TransactionState::Terminated => 4,
        }
    }
}

impl From<u8> for TransactionState {
    fn from(value: u8) -> Self {
        match value {
            0 => TransactionState::Initial,
            1 => TransactionState::Calling,
            2 => TransactionState::Proceeding,
            3 => TransactionState::Completed,
            _ => TransactionState::Terminated,
        }
    }
}

/// Lock-free mirror of a transaction's state.
///
/// Only written while the transaction's lock is held; read without it so
/// that [`crate::Transaction::state`] never waits on a busy transaction.
#[derive(Debug)]
pub struct AtomicTransactionState {
    value: AtomicU8,
}

impl AtomicTransactionState {
    pub fn new(state: TransactionState) -> Self {
        Self {
            value: AtomicU8::new(state.into()),
        }
    }

    pub fn get(&self) -> TransactionState {
        TransactionState::from(self.value.load(Ordering::Acquire))
    }

    /// Stores `new_state` and returns the previous state
    pub fn set(&self, new_state: TransactionState) -> TransactionState {
        TransactionState::from(self.value.swap(new_state.into(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_state_set_returns_previous() {
        let state = AtomicTransactionState::new(TransactionState::Initial);
        assert_eq!(state.set(TransactionState::Calling), TransactionState::Initial);
        assert_eq!(state.get(), TransactionState::Calling);
        assert_eq!(state.set(TransactionState::Terminated), TransactionState::Calling);
        assert!(state.get().is_terminated());
    }

    #[test]
    fn test_u8_conversion() {
        for state in [
            TransactionState::Initial,
            TransactionState::Calling,
            TransactionState::Proceeding,
            TransactionState::Completed,
            TransactionState::Terminated,
        ] {
            assert_eq!(TransactionState::from(u8::from(state)), state);
        }
        assert_eq!(TransactionState::from(200), TransactionState::Terminated);
    }
}
