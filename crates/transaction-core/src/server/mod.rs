//! Server transactions (RFC 3261 Section 17.2).
//!
//! A new request is answered with 100 Trying straight away, its session
//! description goes to the [`crate::SdpHandler`], and the
//! [`crate::RequestHandler`] picks the final response. CANCEL and BYE are
//! answered with 200 at once, and ACK is never answered.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

use sipline_core::{Message, Method, Request, Response, StatusCode};

use crate::client::{ClientTransaction, WeakClientTransaction};
use crate::error::{Error, Result};
use crate::timer::{TimerSlot, TimerType};
use crate::transaction::context::{TransactionContext, TransactionCore};
use crate::transaction::fsm::FsmInput;
use crate::transaction::{Transaction, TransactionEvent, TransactionKey, TransactionKind, TransactionState};

#[derive(Debug)]
struct ServerData {
    history: Vec<Message>,
    origin: Option<Request>,
    /// Where responses to the origin go
    destination: Option<(String, String)>,
    last_response: Option<Response>,
    wait: TimerSlot,
}

#[derive(Debug)]
struct ServerInner {
    core: TransactionCore,
    data: Mutex<ServerData>,
    paired_client: parking_lot::Mutex<Option<WeakClientTransaction>>,
}

/// Handles one inbound request and its retransmissions.
#[derive(Debug, Clone)]
pub struct ServerTransaction {
    inner: Arc<ServerInner>,
}

#[derive(Debug, Clone)]
pub(crate) struct WeakServerTransaction(Weak<ServerInner>);

impl WeakServerTransaction {
    pub(crate) fn upgrade(&self) -> Option<ServerTransaction> {
        self.0.upgrade().map(|inner| ServerTransaction { inner })
    }
}

impl ServerTransaction {
    pub(crate) fn new(key: TransactionKey, method: &Method, ctx: TransactionContext) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                core: TransactionCore::new(key, TransactionKind::server_for(method), ctx),
                data: Mutex::new(ServerData {
                    history: Vec::new(),
                    origin: None,
                    destination: None,
                    last_response: None,
                    wait: TimerSlot::new(),
                }),
                paired_client: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub(crate) fn instance(&self) -> u64 {
        self.inner.core.instance
    }

    pub(crate) fn downgrade(&self) -> WeakServerTransaction {
        WeakServerTransaction(Arc::downgrade(&self.inner))
    }

    pub(crate) fn set_paired_client(&self, client: &ClientTransaction) {
        *self.inner.paired_client.lock() = Some(client.downgrade());
    }

    /// Client transaction relaying this request, if one was paired
    pub fn paired_client(&self) -> Option<ClientTransaction> {
        self.inner
            .paired_client
            .lock()
            .as_ref()
            .and_then(WeakClientTransaction::upgrade)
    }

    fn core(&self) -> &TransactionCore {
        &self.inner.core
    }

    fn wait_timer(&self) -> TimerType {
        if self.core().kind.is_invite() {
            TimerType::H
        } else {
            TimerType::J
        }
    }

    /// The request that created this transaction
    pub async fn origin(&self) -> Option<Request> {
        self.inner.data.lock().await.origin.clone()
    }

    pub async fn last_response(&self) -> Option<Response> {
        self.inner.data.lock().await.last_response.clone()
    }

    /// Sends a response with status `code` to the originating request.
    ///
    /// A provisional response keeps the transaction in `Proceeding`; a final
    /// one moves it to `Completed` and starts Timer H or J.
    pub async fn respond(&self, code: u16) -> Result<()> {
        let status = StatusCode::from_u16(code)?;
        let mut data = self.inner.data.lock().await;
        self.respond_locked(&mut data, status).await
    }

    async fn respond_locked(&self, data: &mut ServerData, status: StatusCode) -> Result<()> {
        let input = if status.is_provisional() {
            FsmInput::ProvisionalSent
        } else {
            FsmInput::FinalSent
        };
        let Some(next) = self.core().check(input) else {
            return Err(Error::InvalidStateTransition(format!(
                "cannot send {} from {} in {}",
                status,
                self.core().key,
                self.core().state()
            )));
        };

        if status.is_final() {
            self.core().set_state(next);
            self.arm_wait(data);
        }
        self.send_response(data, status).await;
        Ok(())
    }

    /// Builds and sends a response to the origin. Returns `false` if the
    /// transport failed, in which case the transaction is terminated.
    async fn send_response(&self, data: &mut ServerData, status: StatusCode) -> bool {
        let (Some(origin), Some((host, port))) = (data.origin.as_ref(), data.destination.clone())
        else {
            return false;
        };
        let response = Response::from_request(status, origin);
        data.last_response = Some(response.clone());
        let message = Message::from(response);
        data.history.push(message.clone());

        debug!(id=%self.core().key, %status, destination=%format!("{}:{}", host, port), "Sending response");
        match self.core().ctx.send(&host, &port, &message).await {
            Ok(()) => true,
            Err(e) => {
                self.on_transport_error(data, e);
                false
            }
        }
    }

    fn arm_wait(&self, data: &mut ServerData) {
        let delay = if self.core().kind.is_invite() {
            self.core().ctx.timers.wait_time_h
        } else {
            self.core().ctx.timers.wait_time_j
        };
        let weak = Arc::downgrade(&self.inner);
        data.wait.arm(delay, move |generation| async move {
            if let Some(inner) = weak.upgrade() {
                ServerTransaction { inner }.on_wait_timer(generation).await;
            }
        });
        trace!(id=%self.core().key, timer=%self.wait_timer(), interval=?delay, "Started timer");
    }

    async fn on_wait_timer(&self, generation: u64) {
        let mut data = self.inner.data.lock().await;
        if !data.wait.fired(generation) {
            return;
        }
        debug!(id=%self.core().key, timer=%self.wait_timer(), "Timer fired");
        if self.core().check(FsmInput::WaitTimer).is_some() {
            self.enter_terminated(&mut data);
        }
    }

    fn on_transport_error(&self, data: &mut ServerData, e: sipline_transport::Error) {
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

    fn enter_terminated(&self, data: &mut ServerData) {
        data.wait.cancel();
        self.core().set_state(TransactionState::Terminated);
    }

    /// CANCEL and BYE: always a single 200, no provisional, no SDP.
    async fn on_cancel_or_bye(&self, data: &mut ServerData, request: Request) {
        let Some((host, port)) = Message::from(request.clone()).response_destination() else {
            warn!(id=%self.core().key, method=%request.method, "No destination for 200, dropping request");
            return;
        };
        let transaction_id = self.core().key.clone();

        let origin_method = data.origin.as_ref().map(|origin| origin.method.clone());
        let state = self.core().state();
        let cancels_invite = request.method == Method::Cancel
            && origin_method == Some(Method::Invite)
            && state == TransactionState::Proceeding;

        if origin_method.is_none() {
            let Some(next) = self.core().check(FsmInput::TerminalRequestReceived) else {
                return;
            };
            data.origin = Some(request.clone());
            data.destination = Some((host.clone(), port.clone()));
            self.core().set_state(next);
            self.arm_wait(data);
            let event = match request.method {
                Method::Cancel => TransactionEvent::CancelReceived {
                    transaction_id,
                    cancel_request: request.clone(),
                },
                _ => TransactionEvent::NewRequest {
                    transaction_id,
                    request: request.clone(),
                },
            };
            self.core().emit(event);
            self.send_response(data, StatusCode::OK).await;
            return;
        }

        // Answer the CANCEL (or in-transaction BYE) itself
        let ok = Message::from(Response::from_request(StatusCode::OK, &request));
        data.history.push(ok.clone());
        debug!(id=%self.core().key, method=%request.method, destination=%format!("{}:{}", host, port), "Sending 200");
        if let Err(e) = self.core().ctx.send(&host, &port, &ok).await {
            self.on_transport_error(data, e);
            return;
        }

        if cancels_invite {
            info!(id=%self.core().key, "INVITE cancelled");
            self.core().emit(TransactionEvent::CancelReceived {
                transaction_id,
                cancel_request: request,
            });
            if let Err(e) = self.respond_locked(data, StatusCode::REQUEST_TERMINATED).await {
                debug!(id=%self.core().key, error=%e, "Cannot answer cancelled INVITE");
            }
            if let Some(client) = self.paired_client() {
                if let Err(e) = client.cancel().await {
                    debug!(id=%self.core().key, error=%e, "Paired client transaction not cancelled");
                }
            }
        }
    }

    async fn on_request(&self, data: &mut ServerData, request: Request) {
        match self.core().state() {
            TransactionState::Initial => {
                let message = Message::from(request.clone());
                let Some(destination) = message.response_destination() else {
                    warn!(id=%self.core().key, "No destination for responses, dropping request");
                    return;
                };
                let Some(next) = self.core().check(FsmInput::RequestReceived) else {
                    return;
                };
                info!(id=%self.core().key, method=%request.method, "New request");
                data.origin = Some(request.clone());
                data.destination = Some(destination);
                self.core().set_state(next);
                self.core().emit(TransactionEvent::NewRequest {
                    transaction_id: self.core().key.clone(),
                    request: request.clone(),
                });

                if !self.send_response(data, StatusCode::TRYING).await {
                    return;
                }
                if let Some(payload) = message.sdp_payload() {
                    self.core().ctx.sdp_handler.handle(&payload);
                }
                match self.core().ctx.request_handler.final_response(&request) {
                    Some(code) => match StatusCode::from_u16(code) {
                        Ok(status) => {
                            if let Err(e) = self.respond_locked(data, status).await {
                                warn!(id=%self.core().key, error=%e, "Final response not sent");
                            }
                        }
                        Err(e) => error!(id=%self.core().key, error=%e, "Request handler chose an invalid status"),
                    },
                    None => trace!(id=%self.core().key, "Final response deferred to the TU"),
                }
            }
            TransactionState::Proceeding | TransactionState::Completed => {
                if self.core().check(FsmInput::Retransmission).is_none() {
                    return;
                }
                let (Some(response), Some((host, port))) =
                    (data.last_response.clone(), data.destination.clone())
                else {
                    return;
                };
                debug!(id=%self.core().key, status=%response.status_code(), "Retransmitted request, resending last response");
                if let Err(e) = self.core().ctx.send(&host, &port, &Message::from(response)).await {
                    self.on_transport_error(data, e);
                }
            }
            state => {
                debug!(id=%self.core().key, %state, method=%request.method, "Ignoring request");
            }
        }
    }
}

#[async_trait]
impl Transaction for ServerTransaction {
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

        let Message::Request(request) = message else {
            debug!(id=%self.core().key, "Server transaction received a response, ignoring");
            return;
        };

        match request.method {
            Method::Ack => {
                debug!(id=%self.core().key, "ACK absorbed");
                self.core().emit(TransactionEvent::AckReceived {
                    transaction_id: self.core().key.clone(),
                    request,
                });
            }
            Method::Cancel | Method::Bye => self.on_cancel_or_bye(&mut data, request).await,
            _ => self.on_request(&mut data, request).await,
        }
    }

    async fn terminate(&self) {
        let mut data = self.inner.data.lock().await;
        if !self.core().state().is_terminated() {
            self.enter_terminated(&mut data);
        }
    }
}
