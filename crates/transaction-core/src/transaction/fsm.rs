//! Transition tables for the four transaction kinds.
//!
//! Every input is checked against the table of the transaction's kind before
//! any side effect runs. An input with no matching row is logged and ignored
//! by the caller; it neither changes state nor sends anything.

use std::fmt;

use super::{TransactionKind, TransactionState};
use TransactionState::{Calling, Completed, Initial, Proceeding, Terminated};

/// Something that happened to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsmInput {
    /// Client: the request was handed to the transport
    RequestSent,
    /// Client: 1xx received
    Provisional,
    /// Client: 2xx received
    Success,
    /// Client: 300-699 received
    Failure,
    /// Timer A or E
    RetransmitTimer,
    /// Timer B or F
    TimeoutTimer,
    /// Timer D, K, H or J
    WaitTimer,
    TransportError,
    /// Server: first request that expects a TU decision
    RequestReceived,
    /// Server: first request is CANCEL or BYE, answered at once
    TerminalRequestReceived,
    /// Server: the originating request arrived again
    Retransmission,
    /// Server: 1xx sent
    ProvisionalSent,
    /// Server: final response sent
    FinalSent,
}

impl fmt::Display for FsmInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a valid input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    To(TransactionState),
    Stay,
}

struct Rule {
    input: FsmInput,
    from: &'static [TransactionState],
    next: Next,
}

const fn rule(input: FsmInput, from: &'static [TransactionState], next: Next) -> Rule {
    Rule { input, from, next }
}

const ACTIVE: &[TransactionState] = &[Calling, Proceeding];
const ACTIVE_OR_DONE: &[TransactionState] = &[Calling, Proceeding, Completed];

static INVITE_CLIENT: &[Rule] = &[
    rule(FsmInput::RequestSent, &[Initial], Next::To(Calling)),
    rule(FsmInput::Provisional, ACTIVE, Next::To(Proceeding)),
    rule(FsmInput::Success, ACTIVE, Next::To(Terminated)),
    rule(FsmInput::Failure, ACTIVE, Next::To(Completed)),
    // retransmitted final: re-ACK
    rule(FsmInput::Failure, &[Completed], Next::Stay),
    rule(FsmInput::RetransmitTimer, ACTIVE_OR_DONE, Next::Stay),
    rule(FsmInput::TimeoutTimer, ACTIVE_OR_DONE, Next::To(Terminated)),
    rule(FsmInput::WaitTimer, &[Completed], Next::To(Terminated)),
    rule(FsmInput::TransportError, ACTIVE_OR_DONE, Next::To(Terminated)),
];

static NON_INVITE_CLIENT: &[Rule] = &[
    rule(FsmInput::RequestSent, &[Initial], Next::To(Calling)),
    rule(FsmInput::Provisional, ACTIVE, Next::To(Proceeding)),
    rule(FsmInput::Success, ACTIVE, Next::To(Terminated)),
    rule(FsmInput::Failure, ACTIVE, Next::To(Completed)),
    rule(FsmInput::RetransmitTimer, ACTIVE, Next::Stay),
    rule(FsmInput::TimeoutTimer, ACTIVE, Next::To(Terminated)),
    rule(FsmInput::WaitTimer, &[Completed], Next::To(Terminated)),
    rule(FsmInput::TransportError, ACTIVE, Next::To(Terminated)),
];

// Both server kinds share one table; only the wait timer (H or J) differs.
static SERVER: &[Rule] = &[
    rule(FsmInput::RequestReceived, &[Initial], Next::To(Proceeding)),
    rule(FsmInput::TerminalRequestReceived, &[Initial], Next::To(Completed)),
    rule(FsmInput::Retransmission, &[Proceeding, Completed], Next::Stay),
    rule(FsmInput::ProvisionalSent, &[Proceeding], Next::Stay),
    rule(FsmInput::FinalSent, &[Proceeding], Next::To(Completed)),
    rule(FsmInput::WaitTimer, &[Completed], Next::To(Terminated)),
    rule(FsmInput::TransportError, &[Proceeding, Completed], Next::To(Terminated)),
];

fn table(kind: TransactionKind) -> &'static [Rule] {
    match kind {
        TransactionKind::InviteClient => INVITE_CLIENT,
        TransactionKind::NonInviteClient => NON_INVITE_CLIENT,
        TransactionKind::InviteServer | TransactionKind::NonInviteServer => SERVER,
    }
}

/// Looks up `input` in `state` for `kind`; `None` means the input is invalid there.
pub fn next(kind: TransactionKind, state: TransactionState, input: FsmInput) -> Option<Next> {
    table(kind)
        .iter()
        .find(|rule| rule.input == input && rule.from.contains(&state))
        .map(|rule| rule.next)
}

/// Like [`next`], resolving `Stay` to the current state.
pub fn destination(
    kind: TransactionKind,
    state: TransactionState,
    input: FsmInput,
) -> Option<TransactionState> {
    next(kind, state, input).map(|next| match next {
        Next::To(to) => to,
        Next::Stay => state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TransactionState; 5] = [Initial, Calling, Proceeding, Completed, Terminated];

    #[test]
    fn test_invite_client_paths() {
        let kind = TransactionKind::InviteClient;
        assert_eq!(destination(kind, Initial, FsmInput::RequestSent), Some(Calling));
        assert_eq!(destination(kind, Calling, FsmInput::Provisional), Some(Proceeding));
        assert_eq!(destination(kind, Proceeding, FsmInput::Provisional), Some(Proceeding));
        assert_eq!(destination(kind, Proceeding, FsmInput::Success), Some(Terminated));
        assert_eq!(destination(kind, Calling, FsmInput::Failure), Some(Completed));
        assert_eq!(next(kind, Completed, FsmInput::Failure), Some(Next::Stay));
        assert_eq!(next(kind, Completed, FsmInput::RetransmitTimer), Some(Next::Stay));
        assert_eq!(destination(kind, Completed, FsmInput::TimeoutTimer), Some(Terminated));
        assert_eq!(destination(kind, Completed, FsmInput::WaitTimer), Some(Terminated));
    }

    #[test]
    fn test_send_only_from_initial() {
        for kind in [TransactionKind::InviteClient, TransactionKind::NonInviteClient] {
            for state in ALL {
                let valid = next(kind, state, FsmInput::RequestSent).is_some();
                assert_eq!(valid, state == Initial, "{:?} {:?}", kind, state);
            }
        }
    }

    #[test]
    fn test_terminated_accepts_nothing() {
        for kind in [
            TransactionKind::InviteClient,
            TransactionKind::NonInviteClient,
            TransactionKind::InviteServer,
            TransactionKind::NonInviteServer,
        ] {
            for input in [
                FsmInput::RequestSent,
                FsmInput::Provisional,
                FsmInput::Success,
                FsmInput::Failure,
                FsmInput::RetransmitTimer,
                FsmInput::TimeoutTimer,
                FsmInput::WaitTimer,
                FsmInput::TransportError,
                FsmInput::RequestReceived,
                FsmInput::Retransmission,
                FsmInput::FinalSent,
            ] {
                assert!(next(kind, Terminated, input).is_none());
            }
        }
    }

    #[test]
    fn test_non_invite_client_timers_stop_in_completed() {
        let kind = TransactionKind::NonInviteClient;
        assert!(next(kind, Completed, FsmInput::RetransmitTimer).is_none());
        assert!(next(kind, Completed, FsmInput::TimeoutTimer).is_none());
        assert!(next(kind, Completed, FsmInput::Failure).is_none());
        assert_eq!(destination(kind, Completed, FsmInput::WaitTimer), Some(Terminated));
    }

    #[test]
    fn test_server_paths() {
        let kind = TransactionKind::InviteServer;
        assert_eq!(destination(kind, Initial, FsmInput::RequestReceived), Some(Proceeding));
        assert_eq!(destination(kind, Initial, FsmInput::TerminalRequestReceived), Some(Completed));
        assert_eq!(next(kind, Proceeding, FsmInput::ProvisionalSent), Some(Next::Stay));
        assert_eq!(destination(kind, Proceeding, FsmInput::FinalSent), Some(Completed));
        assert!(next(kind, Completed, FsmInput::FinalSent).is_none());
        assert!(next(kind, Proceeding, FsmInput::RequestReceived).is_none());
        assert_eq!(destination(kind, Completed, FsmInput::WaitTimer), Some(Terminated));
    }
}
