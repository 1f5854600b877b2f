use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use sipline_core::Message;
use sipline_transport::Transport;

use super::fsm::{self, FsmInput};
use super::{AtomicTransactionState, EventSink, TransactionEvent, TransactionKey, TransactionKind, TransactionState};
use crate::handler::{RequestHandler, SdpHandler};
use crate::manager::Registry;
use crate::timer::TimerSettings;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// What every transaction created by one manager shares.
#[derive(Debug, Clone)]
pub(crate) struct TransactionContext {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) timers: TimerSettings,
    pub(crate) events: EventSink,
    pub(crate) registry: Weak<Registry>,
    pub(crate) sdp_handler: Arc<dyn SdpHandler>,
    pub(crate) request_handler: Arc<dyn RequestHandler>,
}

impl TransactionContext {
    pub(crate) async fn send(
        &self,
        host: &str,
        port: &str,
        message: &Message,
    ) -> std::result::Result<(), sipline_transport::Error> {
        self.transport.send(host, port, message.export()).await
    }
}

/// Identity and state of one transaction.
///
/// `check` and `set_state` must only be called with the transaction's lock
/// held; that lock is what serializes transitions.
#[derive(Debug)]
pub(crate) struct TransactionCore {
    pub(crate) key: TransactionKey,
    pub(crate) kind: TransactionKind,
    /// Distinguishes this instance from a later one reusing the key
    pub(crate) instance: u64,
    pub(crate) ctx: TransactionContext,
    state: AtomicTransactionState,
}

impl TransactionCore {
    pub(crate) fn new(key: TransactionKey, kind: TransactionKind, ctx: TransactionContext) -> Self {
        Self {
            key,
            kind,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            ctx,
            state: AtomicTransactionState::new(TransactionState::Initial),
        }
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state.get()
    }

    /// Destination state for `input`, or `None` (logged) if the input is
    /// not valid in the current state.
    pub(crate) fn check(&self, input: FsmInput) -> Option<TransactionState> {
        let state = self.state();
        let next = fsm::destination(self.kind, state, input);
        if next.is_none() {
            debug!(id=%self.key, kind=%self.kind, %state, %input, "Ignoring input not valid in current state");
        }
        next
    }

    /// Records the new state and reports it. Entering `Terminated` also
    /// removes the transaction from its manager.
    pub(crate) fn set_state(&self, new_state: TransactionState) {
        let previous_state = self.state.set(new_state);
        if previous_state == new_state {
            return;
        }
        trace!(id=%self.key, from=%previous_state, to=%new_state, "State transition");
        self.emit(TransactionEvent::StateChanged {
            transaction_id: self.key.clone(),
            previous_state,
            new_state,
        });

        if new_state.is_terminated() {
            if let Some(registry) = self.ctx.registry.upgrade() {
                registry.remove_instance(&self.key, self.instance);
            }
            debug!(id=%self.key, "Transaction terminated");
            self.emit(TransactionEvent::TransactionTerminated {
                transaction_id: self.key.clone(),
            });
        }
    }

    pub(crate) fn emit(&self, event: TransactionEvent) {
        self.ctx.events.emit(event);
    }
}
