// ABOUTME: Integration tests for the SQLite-backed repositories
// ABOUTME: Schema migration, user round trips and refresh-token set semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{password_user, sso_user};
use gatehouse::database::sql::Database;
use gatehouse::database::{ActionTokenRepository, UserRepository};
use gatehouse::errors::ErrorCode;
use gatehouse::models::{ActionToken, ActionTokenKind};
use gatehouse::oauth::Provider;
use tempfile::TempDir;

async fn database() -> (Database, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());
    (Database::connect(&url).await.unwrap(), dir)
}

#[tokio::test]
async fn test_user_round_trip_preserves_every_field() {
    let (db, _dir) = database().await;
    let mut user = sso_user("roundtrip@example.com", Provider::GitHub, "gh-42");
    user.is_two_factor_enabled = true;
    user.email_requests = 2;
    db.create(&user).await.unwrap();

    let loaded = db.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(loaded.email, user.email);
    assert_eq!(loaded.github_id, user.github_id);
    assert_eq!(loaded.referral_code, user.referral_code);
    assert!(loaded.registered_with_github);
    assert!(loaded.is_two_factor_enabled);
    assert_eq!(loaded.email_requests, 2);
    assert_eq!(loaded.trial_end_date.timestamp(), user.trial_end_date.timestamp());
}

#[tokio::test]
async fn test_lookups_by_email_external_id_and_referral_code() {
    let (db, _dir) = database().await;
    let user = sso_user("lookup@example.com", Provider::Google, "g-9");
    db.create(&user).await.unwrap();

    assert!(db.find_by_email("lookup@example.com").await.unwrap().is_some());
    assert!(db.find_by_email("other@example.com").await.unwrap().is_none());
    assert!(db
        .find_by_external_id(Provider::Google, "g-9")
        .await
        .unwrap()
        .is_some());
    assert!(db
        .find_by_external_id(Provider::GitHub, "g-9")
        .await
        .unwrap()
        .is_none());
    assert!(db
        .find_by_referral_code(&user.referral_code)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_duplicate_email_and_external_id_are_refused() {
    let (db, _dir) = database().await;
    let user = sso_user("dupe@example.com", Provider::Google, "g-dupe");
    db.create(&user).await.unwrap();

    let same_email = sso_user("dupe@example.com", Provider::GitHub, "gh-1");
    let err = db.create(&same_email).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);

    let same_identity = sso_user("fresh@example.com", Provider::Google, "g-dupe");
    let err = db.create(&same_identity).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceAlreadyExists);
}

#[tokio::test]
async fn test_update_persists_changed_fields() {
    let (db, _dir) = database().await;
    let mut user = password_user("mutate@example.com");
    db.create(&user).await.unwrap();

    user.is_active = true;
    user.google_id = Some("g-linked".into());
    user.email_requests = 1;
    db.update(&user).await.unwrap();

    let loaded = db.find_by_id(user.id).await.unwrap().unwrap();
    assert!(loaded.is_active);
    assert_eq!(loaded.google_id.as_deref(), Some("g-linked"));
    assert_eq!(loaded.email_requests, 1);
}

#[tokio::test]
async fn test_refresh_token_set_membership_and_clearing() {
    let (db, _dir) = database().await;
    let user = password_user("tokens@example.com");
    db.create(&user).await.unwrap();

    db.add_refresh_token(user.id, "token-a").await.unwrap();
    db.add_refresh_token(user.id, "token-b").await.unwrap();
    assert!(db.refresh_token_exists(user.id, "token-a").await.unwrap());

    db.remove_refresh_token(user.id, "token-a").await.unwrap();
    assert!(!db.refresh_token_exists(user.id, "token-a").await.unwrap());
    assert!(db.refresh_token_exists(user.id, "token-b").await.unwrap());

    db.clear_refresh_tokens(user.id).await.unwrap();
    assert!(!db.refresh_token_exists(user.id, "token-b").await.unwrap());
}

#[tokio::test]
async fn test_action_token_round_trip_and_delete() {
    let (db, _dir) = database().await;
    let user = password_user("action@example.com");
    db.create(&user).await.unwrap();

    let token = ActionToken::new(
        user.id,
        ActionTokenKind::EmailChange,
        Some("next@example.com".into()),
    );
    db.insert(&token).await.unwrap();

    let loaded = ActionTokenRepository::find(&db, &token.id).await.unwrap().unwrap();
    assert_eq!(loaded.user_id, user.id);
    assert_eq!(loaded.kind, ActionTokenKind::EmailChange);
    assert_eq!(loaded.new_value.as_deref(), Some("next@example.com"));

    db.delete(&token.id).await.unwrap();
    assert!(ActionTokenRepository::find(&db, &token.id)
        .await
        .unwrap()
        .is_none());
}
