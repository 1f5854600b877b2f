//! Registry and dispatch behaviour of the transaction manager

mod common;

use std::time::Duration;

use common::{drain, init_tracing, request, source, MockTransport};
use sipline_core::prelude::*;
use sipline_core::BRANCH_MAGIC_COOKIE;
use sipline_transaction::{
    AnyTransaction, Error, Transaction, TransactionEvent, TransactionKey, TransactionKind,
    TransactionManager, TransactionState,
};

#[tokio::test]
async fn test_registry_tracks_live_transactions() {
    init_tracing();
    let transport = MockTransport::new();
    let (manager, _events) = TransactionManager::new(transport.clone());

    let branches = ["z9hG4bKreg1", "z9hG4bKreg2", "z9hG4bKreg3", "z9hG4bKreg4"];
    let client = manager
        .create_client_transaction(&request(Method::Invite, branches[0]))
        .unwrap();
    manager
        .create_client_transaction(&request(Method::Options, branches[1]))
        .unwrap();
    let server = manager
        .create_server_transaction(&request(Method::Invite, branches[2]))
        .unwrap();
    manager
        .create_server_transaction(&request(Method::Register, branches[3]))
        .unwrap();

    assert_eq!(manager.transaction_count(), 4);
    for branch in branches {
        let key = TransactionKey::new(branch);
        let found = manager.lookup(&key).unwrap();
        assert_eq!(found.key(), &key);
    }
    assert_eq!(client.kind(), TransactionKind::InviteClient);
    assert_eq!(server.kind(), TransactionKind::InviteServer);
    assert!(matches!(
        manager.lookup(&TransactionKey::new(branches[3])),
        Some(AnyTransaction::Server(_))
    ));

    manager.delete_transaction(&TransactionKey::new(branches[1])).await;
    assert_eq!(manager.transaction_count(), 3);
    assert!(manager.lookup(&TransactionKey::new(branches[1])).is_none());

    // Deleting twice is harmless
    manager.delete_transaction(&TransactionKey::new(branches[1])).await;
    assert_eq!(manager.transaction_count(), 3);

    manager.shutdown().await;
    assert_eq!(manager.transaction_count(), 0);
    assert_eq!(client.state(), TransactionState::Terminated);
}

#[tokio::test]
#[should_panic(expected = "duplicate transaction branch")]
async fn test_duplicate_branch_panics() {
    let (manager, _events) = TransactionManager::new(MockTransport::new());
    let invite = request(Method::Invite, "z9hG4bKdup");
    manager.create_client_transaction(&invite).unwrap();
    let _ = manager.create_client_transaction(&invite);
}

#[tokio::test]
async fn test_requests_that_cannot_start_a_transaction() {
    let (manager, _events) = TransactionManager::new(MockTransport::new());

    let ack = request(Method::Ack, "z9hG4bKack");
    assert!(matches!(
        manager.create_client_transaction(&ack),
        Err(Error::InvalidRequest(_))
    ));

    let no_branch = SimpleRequestBuilder::new(Method::Options, "sip:bob@biloxi.example.com")
        .header(HeaderName::Via, "SIP/2.0/UDP pc33.atlanta.example.com")
        .build();
    assert!(matches!(
        manager.create_server_transaction(&no_branch),
        Err(Error::MissingBranch)
    ));
    assert_eq!(manager.transaction_count(), 0);
}

#[tokio::test]
async fn test_orphan_response_has_no_effect() {
    init_tracing();
    let transport = MockTransport::new();
    let (manager, mut events) = TransactionManager::new(transport.clone());
    let live = manager
        .create_client_transaction(&request(Method::Invite, "z9hG4bKlive"))
        .unwrap();

    let orphan = Response::from_request(StatusCode::OK, &request(Method::Invite, "z9hG4bKnobody"));
    manager.dispatch(Message::Response(orphan), source()).await;

    assert!(transport.sent().is_empty());
    assert_eq!(manager.transaction_count(), 1);
    assert_eq!(live.state(), TransactionState::Initial);
    assert!(live.history().await.is_empty());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_stray_ack_is_reported() {
    let transport = MockTransport::new();
    let (manager, mut events) = TransactionManager::new(transport.clone());

    manager
        .dispatch(Message::Request(request(Method::Ack, "z9hG4bKstray")), source())
        .await;

    assert_eq!(manager.transaction_count(), 0);
    assert!(transport.sent().is_empty());
    match drain(&mut events).as_slice() {
        [TransactionEvent::StrayAck { request, source: from }] => {
            assert_eq!(request.method, Method::Ack);
            assert_eq!(*from, source());
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[tokio::test]
async fn test_messages_are_routed_by_role() {
    let transport = MockTransport::new();
    let (manager, _events) = TransactionManager::new(transport.clone());
    let invite = request(Method::Invite, "z9hG4bKrole");
    let client = manager.create_client_transaction(&invite).unwrap();

    // A request carrying a client transaction's branch is not ours to answer
    manager.dispatch(Message::Request(invite.clone()), source()).await;
    assert!(transport.sent().is_empty());
    assert_eq!(manager.transaction_count(), 1);
    assert!(client.history().await.is_empty());

    let no_branch = SimpleRequestBuilder::new(Method::Options, "sip:bob@biloxi.example.com")
        .header(HeaderName::Via, "SIP/2.0/UDP pc33.atlanta.example.com")
        .build();
    manager.dispatch(Message::Request(no_branch), source()).await;
    assert_eq!(manager.transaction_count(), 1);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_send_request_generates_branch() {
    let transport = MockTransport::new();
    let (manager, _events) = TransactionManager::new(transport.clone());

    let bare = SimpleRequestBuilder::new(Method::Options, "sip:bob@biloxi.example.com")
        .from("Alice", "sip:alice@atlanta.example.com", Some("88sja8x"))
        .to("Bob", "sip:bob@biloxi.example.com", None)
        .call_id("987asjd97y7atg")
        .cseq(986759)
        .build();
    let tx = manager
        .send_request(bare, "biloxi.example.com", "5060")
        .await
        .unwrap();

    assert!(tx.key().branch().starts_with(BRANCH_MAGIC_COOKIE));
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let via = sent[0].message.top_via().unwrap();
    assert_eq!(via.host, "192.0.2.10");
    assert_eq!(via.port, Some(5060));
    assert_eq!(via.branch(), Some(tx.key().branch()));
    assert_eq!(tx.state(), TransactionState::Calling);

    // A top Via without a branch gets one appended
    let partial = SimpleRequestBuilder::new(Method::Options, "sip:bob@biloxi.example.com")
        .header(HeaderName::Via, "SIP/2.0/UDP pc33.atlanta.example.com;rport")
        .cseq(2)
        .build();
    let tx = manager
        .send_request(partial, "biloxi.example.com", "5060")
        .await
        .unwrap();
    let via = transport.sent()[1].message.top_via().unwrap();
    assert_eq!(via.host, "pc33.atlanta.example.com");
    assert_eq!(via.branch(), Some(tx.key().branch()));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_cancel_transaction_by_key() {
    let transport = MockTransport::new();
    let (manager, _events) = TransactionManager::new(transport.clone());

    assert!(matches!(
        manager
            .cancel_transaction(&TransactionKey::new("z9hG4bKmissing"))
            .await,
        Err(Error::TransactionNotFound(_))
    ));

    let invite = request(Method::Invite, "z9hG4bKbykey");
    let tx = manager
        .send_request(invite.clone(), "biloxi.example.com", "5060")
        .await
        .unwrap();
    manager
        .dispatch(
            Message::Response(Response::from_request(StatusCode::RINGING, &invite)),
            source(),
        )
        .await;
    assert_eq!(tx.state(), TransactionState::Proceeding);

    manager.cancel_transaction(tx.key()).await.unwrap();
    let last = transport.sent().last().cloned().unwrap();
    assert_eq!(last.message.method(), Some(Method::Cancel));

    manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_server_deleted_after_final_response() {
    let transport = MockTransport::new();
    let (manager, mut events) = TransactionManager::new(transport.clone());

    manager
        .dispatch(Message::Request(request(Method::Options, "z9hG4bKlife")), source())
        .await;
    let key = TransactionKey::new("z9hG4bKlife");
    assert_eq!(manager.transaction_state(&key), Some(TransactionState::Completed));

    tokio::time::sleep(Duration::from_secs(33)).await;
    assert!(manager.lookup(&key).is_none());

    let terminated = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, TransactionEvent::TransactionTerminated { .. }))
        .count();
    assert_eq!(terminated, 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_cancels_pending_timers() {
    let transport = MockTransport::new();
    let (manager, mut events) = TransactionManager::new(transport.clone());
    let tx = manager
        .send_request(request(Method::Invite, "z9hG4bKdelete"), "biloxi.example.com", "5060")
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(transport.sent().len(), 2);

    manager.delete_transaction(tx.key()).await;
    assert_eq!(tx.state(), TransactionState::Terminated);
    assert!(manager.lookup(tx.key()).is_none());

    // Neither Timer A nor Timer B may fire after the delete
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(transport.sent().len(), 2);
    let events = drain(&mut events);
    assert!(!events
        .iter()
        .any(|e| matches!(e, TransactionEvent::TransactionTimeout { .. })));
    let terminated = events
        .iter()
        .filter(|e| matches!(e, TransactionEvent::TransactionTerminated { .. }))
        .count();
    assert_eq!(terminated, 1);
}
