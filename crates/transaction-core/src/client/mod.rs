//! Client transactions (RFC 3261 Section 17.1).
//!
//! One type covers both state machines; the kind, picked from the request
//! method, decides which timers run:
//!
//! | kind        | retransmit        | timeout   | wait      |
//! |-------------|-------------------|-----------|-----------|
//! | INVITE      | A: T1, doubling   | B: 64*T1  | D         |
//! | non-INVITE  | E: T1, up to T2   | F: 64*T1  | K: T4     |

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use sipline_core::{HeaderAccess, Message, Method, Request, Response};
use sipline_transport::Transport;

use crate::error::{Error, Result};
use crate::server::{ServerTransaction, WeakServerTransaction};
use crate::timer::{TimerSlot, TimerType};
use crate::transaction::context::{TransactionContext, TransactionCore};
use crate::transaction::fsm::FsmInput;
use crate::transaction::{Transaction, TransactionEvent, TransactionKey, TransactionKind, TransactionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientTimer {
    Retransmit,
    Timeout,
    Wait,
}

#[derive(Debug)]
struct ClientData {
    history: Vec<Message>,
    origin: Option<Request>,
    destination: Option<(String, String)>,
    /// Overrides the manager's transport for every send
    listening_point: Option<Arc<dyn Transport>>,
    last_message: Option<Message>,
    /// ACK for a non-2xx final, re-sent for every retransmitted final
    ack: Option<Request>,
    retransmit_interval: Duration,
    retransmit: TimerSlot,
    timeout: TimerSlot,
    wait: TimerSlot,
}

impl ClientData {
    fn slot(&mut self, timer: ClientTimer) -> &mut TimerSlot {
        match timer {
            ClientTimer::Retransmit => &mut self.retransmit,
            ClientTimer::Timeout => &mut self.timeout,
            ClientTimer::Wait => &mut self.wait,
        }
    }

    fn cancel_timers(&mut self) {
        self.retransmit.cancel();
        self.timeout.cancel();
        self.wait.cancel();
    }
}

#[derive(Debug)]
struct ClientInner {
    core: TransactionCore,
    data: Mutex<ClientData>,
    server_tx: parking_lot::Mutex<Option<WeakServerTransaction>>,
}

/// Delivers one outbound request and collects its responses.
///
/// Cheap to clone; every clone drives the same transaction.
#[derive(Debug, Clone)]
pub struct ClientTransaction {
    inner: Arc<ClientInner>,
}

/// Non-owning handle, used for the server side of a pairing
#[derive(Debug, Clone)]
pub(crate) struct WeakClientTransaction(Weak<ClientInner>);

impl WeakClientTransaction {
    pub(crate) fn upgrade(&self) -> Option<ClientTransaction> {
        self.0.upgrade().map(|inner| ClientTransaction { inner })
    }
}

impl ClientTransaction {
    pub(crate) fn new(key: TransactionKey, method: &Method, ctx: TransactionContext) -> Self {
        let t1 = ctx.timers.t1;
        let kind = TransactionKind::client_for(method);
        Self {
            inner: Arc::new(ClientInner {
                core: TransactionCore::new(key, kind, ctx),
                data: Mutex::new(ClientData {
                    history: Vec::new(),
                    origin: None,
                    destination: None,
                    listening_point: None,
                    last_message: None,
                    ack: None,
                    retransmit_interval: t1,
                    retransmit: TimerSlot::new(),
                    timeout: TimerSlot::new(),
                    wait: TimerSlot::new(),
                }),
                server_tx: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub(crate) fn instance(&self) -> u64 {
        self.inner.core.instance
    }

    pub(crate) fn downgrade(&self) -> WeakClientTransaction {
        WeakClientTransaction(Arc::downgrade(&self.inner))
    }

    fn core(&self) -> &TransactionCore {
        &self.inner.core
    }

    fn timer_type(&self, timer: ClientTimer) -> TimerType {
        let invite = self.core().kind.is_invite();
        match (timer, invite) {
            (ClientTimer::Retransmit, true) => TimerType::A,
            (ClientTimer::Timeout, true) => TimerType::B,
            (ClientTimer::Wait, true) => TimerType::D,
            (ClientTimer::Retransmit, false) => TimerType::E,
            (ClientTimer::Timeout, false) => TimerType::F,
            (ClientTimer::Wait, false) => TimerType::K,
        }
    }

    /// Sends the request and starts the retransmit and timeout timers.
    ///
    /// Only valid once. A transport failure is not returned: it terminates
    /// the transaction and is reported as [`TransactionEvent::TransportError`].
    pub async fn send(&self, request: Request, host: &str, port: &str) -> Result<()> {
        let mut data = self.inner.data.lock().await;
        let Some(next) = self.core().check(FsmInput::RequestSent) else {
            return Err(Error::InvalidStateTransition(format!(
                "{} already sent its request",
                self.core().key
            )));
        };

        let message = Message::from(request.clone());
        info!(id=%self.core().key, method=%request.method, destination=%format!("{}:{}", host, port), "Sending request");
        data.origin = Some(request);
        data.destination = Some((host.to_string(), port.to_string()));
        data.history.push(message.clone());
        data.retransmit_interval = self.core().ctx.timers.t1;

        self.core().set_state(next);
        let interval = data.retransmit_interval;
        self.arm(&mut data, ClientTimer::Retransmit, interval);
        self.arm(&mut data, ClientTimer::Timeout, self.core().ctx.timers.transaction_timeout);

        if let Err(e) = self.transmit(&data, host, port, &message).await {
            self.on_transport_error(&mut data, e);
        }
        Ok(())
    }

    /// Sends the original request again, outside the timer schedule.
    pub async fn resend(&self) -> Result<()> {
        let mut data = self.inner.data.lock().await;
        let (Some(origin), Some((host, port))) = (data.origin.clone(), data.destination.clone())
        else {
            return Err(Error::InvalidStateTransition(format!(
                "{} has not sent a request",
                self.core().key
            )));
        };
        if self.core().state().is_terminated() {
            return Err(Error::InvalidStateTransition(format!(
                "{} is terminated",
                self.core().key
            )));
        }

        debug!(id=%self.core().key, "Resending request");
        if let Err(e) = self.transmit(&data, &host, &port, &Message::from(origin)).await {
            self.on_transport_error(&mut data, e);
        }
        Ok(())
    }

    /// Sends `message` without touching the state machine.
    ///
    /// The message is recorded in the history; a transport failure is
    /// returned to the caller.
    pub async fn stateless_send(&self, message: Message, host: &str, port: &str) -> Result<()> {
        let mut data = self.inner.data.lock().await;
        data.history.push(message.clone());
        debug!(id=%self.core().key, destination=%format!("{}:{}", host, port), "Stateless send");
        self.transmit(&data, host, port, &message).await?;
        Ok(())
    }

    /// Sends a CANCEL for a pending INVITE (RFC 3261 Section 9.1).
    ///
    /// Only valid in `Proceeding`: a CANCEL must not be sent before a
    /// provisional response arrived. The CANCEL shares this transaction's
    /// branch, so its 200 is routed back here and ignored; the INVITE is
    /// completed by the 487 that follows.
    pub async fn cancel(&self) -> Result<()> {
        if self.core().kind != TransactionKind::InviteClient {
            return Err(Error::InvalidRequest(format!(
                "{} is not an INVITE transaction",
                self.core().key
            )));
        }

        let mut data = self.inner.data.lock().await;
        let state = self.core().state();
        if state != TransactionState::Proceeding {
            return Err(Error::InvalidStateTransition(format!(
                "cannot cancel {} in {}",
                self.core().key,
                state
            )));
        }
        let (Some(origin), Some((host, port))) = (data.origin.as_ref(), data.destination.clone())
        else {
            return Err(Error::InvalidStateTransition(format!(
                "{} has not sent a request",
                self.core().key
            )));
        };

        let cancel = Message::from(origin.cancel()?);
        info!(id=%self.core().key, "Sending CANCEL");
        data.history.push(cancel.clone());
        self.transmit(&data, &host, &port, &cancel).await?;
        Ok(())
    }

    /// Transport the request, its retransmissions, ACK and CANCEL are sent
    /// through instead of the manager's. Fixed once the request is sent.
    pub async fn set_listening_point(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let mut data = self.inner.data.lock().await;
        if self.core().state() != TransactionState::Initial {
            return Err(Error::InvalidStateTransition(format!(
                "listening point of {} is fixed after send",
                self.core().key
            )));
        }
        debug!(id=%self.core().key, transport=?transport, "Listening point set");
        data.listening_point = Some(transport);
        Ok(())
    }

    /// The transport sends go through
    pub async fn listening_point(&self) -> Arc<dyn Transport> {
        let data = self.inner.data.lock().await;
        data.listening_point
            .clone()
            .unwrap_or_else(|| self.core().ctx.transport.clone())
    }

    async fn transmit(
        &self,
        data: &ClientData,
        host: &str,
        port: &str,
        message: &Message,
    ) -> std::result::Result<(), sipline_transport::Error> {
        match &data.listening_point {
            Some(transport) => transport.send(host, port, message.export()).await,
            None => self.core().ctx.send(host, port, message).await,
        }
    }

    /// Pairs this transaction with the server transaction it relays for.
    ///
    /// Both sides keep a non-owning reference. A CANCEL reaching the server
    /// transaction is then forwarded through [`ClientTransaction::cancel`].
    pub fn set_server_transaction(&self, server: &ServerTransaction) {
        *self.inner.server_tx.lock() = Some(server.downgrade());
        server.set_paired_client(self);
    }

    pub fn server_transaction(&self) -> Option<ServerTransaction> {
        self.inner
            .server_tx
            .lock()
            .as_ref()
            .and_then(WeakServerTransaction::upgrade)
    }

    pub async fn origin(&self) -> Option<Request> {
        self.inner.data.lock().await.origin.clone()
    }

    /// The most recent inbound message
    pub async fn last_message(&self) -> Option<Message> {
        self.inner.data.lock().await.last_message.clone()
    }

    pub async fn destination(&self) -> Option<(String, String)> {
        self.inner.data.lock().await.destination.clone()
    }

    fn arm(&self, data: &mut ClientData, timer: ClientTimer, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        data.slot(timer).arm(delay, move |generation| async move {
            if let Some(inner) = weak.upgrade() {
                ClientTransaction { inner }.on_timer(timer, generation).await;
            }
        });
        trace!(id=%self.core().key, timer=%self.timer_type(timer), interval=?delay, "Started timer");
    }

    async fn on_timer(&self, timer: ClientTimer, generation: u64) {
        let mut data = self.inner.data.lock().await;
        if !data.slot(timer).fired(generation) {
            trace!(id=%self.core().key, timer=%self.timer_type(timer), "Ignoring superseded timer");
            return;
        }
        debug!(id=%self.core().key, timer=%self.timer_type(timer), "Timer fired");

        match timer {
            ClientTimer::Retransmit => self.on_retransmit_timer(&mut data).await,
            ClientTimer::Timeout => self.on_timeout_timer(&mut data),
            ClientTimer::Wait => {
                if self.core().check(FsmInput::WaitTimer).is_some() {
                    self.enter_terminated(&mut data);
                }
            }
        }
    }

    async fn on_retransmit_timer(&self, data: &mut ClientData) {
        let state = self.core().state();
        if self.core().check(FsmInput::RetransmitTimer).is_none() {
            return;
        }

        let timers = &self.core().ctx.timers;
        let current = data.retransmit_interval;
        data.retransmit_interval = match (self.core().kind, state) {
            (TransactionKind::InviteClient, _) => timers.next_timer_a(current),
            // RFC 3261 17.1.2.2: in Proceeding, Timer E is reset to T2
            (_, TransactionState::Proceeding) => timers.t2,
            _ => timers.next_timer_e(current),
        };
        let interval = data.retransmit_interval;
        self.arm(data, ClientTimer::Retransmit, interval);

        if let (Some(origin), Some((host, port))) = (data.origin.clone(), data.destination.clone()) {
            debug!(id=%self.core().key, next_interval=?interval, "Retransmitting request");
            if let Err(e) = self.transmit(data, &host, &port, &Message::from(origin)).await {
                self.on_transport_error(data, e);
            }
        }
    }

    fn on_timeout_timer(&self, data: &mut ClientData) {
        let state = self.core().state();
        if self.core().check(FsmInput::TimeoutTimer).is_none() {
            return;
        }
        warn!(id=%self.core().key, timer=%self.timer_type(ClientTimer::Timeout), %state, "Transaction timed out");
        if state != TransactionState::Completed {
            self.core().emit(TransactionEvent::TransactionTimeout {
                transaction_id: self.core().key.clone(),
            });
        }
        self.enter_terminated(data);
    }

    fn on_transport_error(&self, data: &mut ClientData, e: sipline_transport::Error) {
        error!(id=%self.core().key, error=%e, "Transport error");
        if self.core().check(FsmInput::TransportError).is_none() {
            return;
        }
        self.core().emit(TransactionEvent::TransportError {
            transaction_id: self.core().key.clone(),
            error: e.to_string(),
        });
        self.enter_terminated(data);
    }

    fn enter_terminated(&self, data: &mut ClientData) {
        data.cancel_timers();
        self.core().set_state(TransactionState::Terminated);
    }

    async fn on_response(&self, data: &mut ClientData, response: Response) {
        let status = response.status_code();
        let input = if status.is_provisional() {
            FsmInput::Provisional
        } else if status.is_success() {
            FsmInput::Success
        } else {
            FsmInput::Failure
        };
        let state = self.core().state();
        let Some(next) = self.core().check(input) else {
            return;
        };
        trace!(id=%self.core().key, %status, "Received response");
        let transaction_id = self.core().key.clone();

        match input {
            FsmInput::Provisional => {
                self.core().set_state(next);
                self.core().emit(TransactionEvent::ProvisionalResponse { transaction_id, response });
            }
            FsmInput::Success => {
                self.core().emit(TransactionEvent::SuccessResponse { transaction_id, response });
                self.enter_terminated(data);
            }
            _ if state == TransactionState::Completed => {
                debug!(id=%self.core().key, %status, "Retransmitted final response");
                if let Some(ack) = data.ack.clone() {
                    self.send_ack(data, ack).await;
                }
            }
            _ => {
                self.core().emit(TransactionEvent::FailureResponse {
                    transaction_id,
                    response: response.clone(),
                });
                data.retransmit.cancel();
                if self.core().kind == TransactionKind::NonInviteClient {
                    data.timeout.cancel();
                }
                self.core().set_state(next);
                let wait = match self.core().kind {
                    TransactionKind::InviteClient => self.core().ctx.timers.wait_time_d,
                    _ => self.core().ctx.timers.wait_time_k,
                };
                self.arm(data, ClientTimer::Wait, wait);

                if self.core().kind == TransactionKind::InviteClient {
                    let ack = data.origin.as_ref().map(|origin| origin.ack_for(&response));
                    match ack {
                        Some(Ok(ack)) => {
                            data.history.push(Message::from(ack.clone()));
                            data.ack = Some(ack.clone());
                            self.send_ack(data, ack).await;
                        }
                        Some(Err(e)) => error!(id=%self.core().key, error=%e, "Cannot build ACK"),
                        None => {}
                    }
                }
            }
        }
    }

    async fn send_ack(&self, data: &mut ClientData, ack: Request) {
        let Some((host, port)) = data.destination.clone() else {
            return;
        };
        debug!(id=%self.core().key, "Sending ACK");
        if let Err(e) = self.transmit(data, &host, &port, &Message::from(ack)).await {
            self.on_transport_error(data, e);
        }
    }

    /// Runs a timer callback now, as if the timer had fired.
    #[cfg(test)]
    pub(crate) async fn fire_retransmit_timer(&self) {
        let mut data = self.inner.data.lock().await;
        data.retransmit.cancel();
        self.on_retransmit_timer(&mut data).await;
    }
}

#[async_trait]
impl Transaction for ClientTransaction {
    fn key(&self) -> &TransactionKey {
        &self.core().key
    }

    fn kind(&self) -> TransactionKind {
        self.core().kind
    }

    fn state(&self) -> TransactionState {
        self.core().state()
    }

    async fn history(&self) -> Vec<Message> {
        self.inner.data.lock().await.history.clone()
    }

    async fn receive(&self, message: Message) {
        let mut data = self.inner.data.lock().await;
        data.history.push(message.clone());
        data.last_message = Some(message.clone());

        let Message::Response(response) = message else {
            warn!(id=%self.core().key, "Client transaction received a request, ignoring");
            return;
        };

        let expected = data.origin.as_ref().map(|origin| origin.method.clone());
        let got = response.cseq().map(|cseq| cseq.method);
        if expected.is_some() && got != expected {
            debug!(id=%self.core().key, cseq_method=?got, expected=?expected, "Response for another method, ignoring");
            return;
        }

        self.on_response(&mut data, response).await;
    }

    async fn terminate(&self) {
        let mut data = self.inner.data.lock().await;
        if !self.core().state().is_terminated() {
            self.enter_terminated(&mut data);
        }
    }
}
