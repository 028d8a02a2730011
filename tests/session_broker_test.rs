// ABOUTME: Integration tests for the session exchange broker
// ABOUTME: Single-use consumption, TTL expiry and state-key uniqueness
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use gatehouse::errors::ErrorCode;
use gatehouse::models::ProviderIdentity;
use gatehouse::oauth::Provider;
use gatehouse::session::StateKey;
use gatehouse::store::memory::InMemorySessionStore;
use gatehouse::store::SessionStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn identity() -> ProviderIdentity {
    ProviderIdentity {
        external_id: "ext-1".into(),
        email: "user@example.com".into(),
    }
}

#[tokio::test]
async fn test_consume_before_provider_roundtrip_is_not_found() {
    let broker = common::broker();
    let key = StateKey::generate(Provider::Google);
    broker.create_pending_session(&key).await.unwrap();

    let err = broker.consume_session(&key).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_written_claims_come_back_on_consume() {
    let broker = common::broker();
    let key = StateKey::generate(Provider::GitHub);
    broker.create_pending_session(&key).await.unwrap();
    broker.write_session_result(&key, &identity()).await.unwrap();

    let claims = broker.consume_session(&key).await.unwrap();
    assert_eq!(claims, identity());
}

#[tokio::test]
async fn test_second_consume_always_fails() {
    let broker = common::broker();
    let key = StateKey::generate(Provider::Google);
    broker.create_pending_session(&key).await.unwrap();
    broker.write_session_result(&key, &identity()).await.unwrap();

    broker.consume_session(&key).await.unwrap();
    let err = broker.consume_session(&key).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_expired_key_indistinguishable_from_unknown() {
    let broker = common::broker_with_ttl(Duration::from_millis(5));
    let key = StateKey::generate(Provider::GitHub);
    broker.create_pending_session(&key).await.unwrap();
    broker.write_session_result(&key, &identity()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let expired = broker.consume_session(&key).await.unwrap_err();
    let unknown = broker
        .consume_session(&StateKey::generate(Provider::GitHub))
        .await
        .unwrap_err();
    assert_eq!(expired.code, unknown.code);
    assert_eq!(expired.message, unknown.message);
}

#[tokio::test]
async fn test_create_resets_a_written_slot() {
    let broker = common::broker();
    let key = StateKey::generate(Provider::Google);
    broker.create_pending_session(&key).await.unwrap();
    broker.write_session_result(&key, &identity()).await.unwrap();

    // Re-requesting the auth URL resets the slot to empty.
    broker.create_pending_session(&key).await.unwrap();
    let err = broker.consume_session(&key).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_corrupted_claims_surface_as_conflict() {
    let store = Arc::new(InMemorySessionStore::new(128));
    let broker = gatehouse::session::SessionBroker::new(store.clone(), Duration::from_secs(300));
    let key = StateKey::new(Provider::Google, "nonce-corrupt");
    store
        .put(&key.to_string(), "{not json", Duration::from_secs(300))
        .await
        .unwrap();

    let err = broker.consume_session(&key).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceConflict);
}

#[test]
fn test_ten_thousand_auth_url_requests_yield_distinct_states() {
    let nonces: HashSet<String> = (0..10_000)
        .map(|_| StateKey::generate(Provider::Google).nonce)
        .collect();
    assert_eq!(nonces.len(), 10_000);
}

#[tokio::test]
async fn test_concurrent_consumers_race_to_one_winner() {
    let broker = Arc::new(common::broker());
    let key = StateKey::generate(Provider::GitHub);
    broker.create_pending_session(&key).await.unwrap();
    broker.write_session_result(&key, &identity()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let broker = Arc::clone(&broker);
        let key = key.clone();
        handles.push(tokio::spawn(
            async move { broker.consume_session(&key).await },
        ));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
