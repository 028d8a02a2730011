// ABOUTME: Integration tests for the account linker
// ABOUTME: Provisioning, login, two-factor gating, link conflicts and unlink guards
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{linker_harness, sso_user};
use gatehouse::account::AuthenticateOutcome;
use gatehouse::database::UserRepository;
use gatehouse::errors::ErrorCode;
use gatehouse::models::{ProviderIdentity, RequestContext};
use gatehouse::oauth::Provider;
use gatehouse::session::StateKey;
use uuid::Uuid;

fn identity(external_id: &str, email: &str) -> ProviderIdentity {
    ProviderIdentity {
        external_id: external_id.into(),
        email: email.into(),
    }
}

async fn write_claims(
    harness: &common::LinkerHarness,
    provider: Provider,
    claims: &ProviderIdentity,
) -> StateKey {
    let key = StateKey::generate(provider);
    harness.broker.create_pending_session(&key).await.unwrap();
    harness.broker.write_session_result(&key, claims).await.unwrap();
    key
}

#[tokio::test]
async fn test_unknown_identity_provisions_a_user() {
    let harness = linker_harness(None);
    let key = write_claims(&harness, Provider::Google, &identity("g-1", "new@example.com")).await;

    let outcome = harness
        .linker
        .authenticate(Provider::Google, &key.nonce, &RequestContext::default(), None)
        .await
        .unwrap();

    let AuthenticateOutcome::Session(session) = outcome else {
        panic!("expected a full session");
    };
    assert!(session.refresh_token.is_some());
    assert_eq!(session.user.email, "new@example.com");
    assert_eq!(session.user.google_id.as_deref(), Some("g-1"));
    assert!(session.user.registered_with_google);
    assert!(session.user.is_active);
    assert!(session.user.trial_end_date > chrono::Utc::now());

    let stored = harness
        .users
        .find_by_external_id(Provider::Google, "g-1")
        .await
        .unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_session_is_single_use_for_authenticate() {
    let harness = linker_harness(None);
    let key = write_claims(&harness, Provider::Google, &identity("g-2", "a@example.com")).await;
    let ctx = RequestContext::default();

    harness
        .linker
        .authenticate(Provider::Google, &key.nonce, &ctx, None)
        .await
        .unwrap();
    let err = harness
        .linker
        .authenticate(Provider::Google, &key.nonce, &ctx, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceNotFound);
}

#[tokio::test]
async fn test_existing_user_logs_in_with_shared_projects() {
    let harness = linker_harness(None);
    let user = sso_user("known@example.com", Provider::GitHub, "gh-7");
    harness.users.create(&user).await.unwrap();
    let projects = vec![Uuid::new_v4(), Uuid::new_v4()];
    harness.users.set_shared_projects(user.id, projects.clone()).await;

    let key = write_claims(&harness, Provider::GitHub, &identity("gh-7", "known@example.com")).await;
    let outcome = harness
        .linker
        .authenticate(Provider::GitHub, &key.nonce, &RequestContext::default(), None)
        .await
        .unwrap();

    let AuthenticateOutcome::Session(session) = outcome else {
        panic!("expected a full session");
    };
    assert_eq!(session.user.id, user.id);
    assert_eq!(session.shared_project_ids, projects);
}

#[tokio::test]
async fn test_two_factor_user_gets_reduced_projection() {
    let harness = linker_harness(None);
    let mut user = sso_user("2fa@example.com", Provider::Google, "g-2fa");
    user.is_two_factor_enabled = true;
    harness.users.create(&user).await.unwrap();

    let key = write_claims(&harness, Provider::Google, &identity("g-2fa", "2fa@example.com")).await;
    let outcome = harness
        .linker
        .authenticate(Provider::Google, &key.nonce, &RequestContext::default(), None)
        .await
        .unwrap();

    let AuthenticateOutcome::SecondFactorRequired(challenge) = outcome else {
        panic!("expected a second-factor challenge");
    };
    assert!(challenge.is_two_factor_enabled);
    assert_eq!(challenge.email, "2fa@example.com");
    assert!(challenge.refresh_token.is_none());

    let claims = harness
        .issuer
        .validate_access_token(&challenge.access_token)
        .unwrap();
    assert!(!claims.is_second_factor_authenticated);
}

#[tokio::test]
async fn test_referral_code_attributes_registration() {
    let harness = linker_harness(None);
    let referrer = sso_user("ref@example.com", Provider::Google, "g-ref");
    harness.users.create(&referrer).await.unwrap();

    let key = write_claims(&harness, Provider::GitHub, &identity("gh-new", "b@example.com")).await;
    let outcome = harness
        .linker
        .authenticate(
            Provider::GitHub,
            &key.nonce,
            &RequestContext::default(),
            Some(&referrer.referral_code),
        )
        .await
        .unwrap();

    let AuthenticateOutcome::Session(session) = outcome else {
        panic!("expected a full session");
    };
    assert_eq!(session.user.referrer_id, Some(referrer.id));
}

#[tokio::test]
async fn test_bogus_referral_code_never_blocks_registration() {
    let harness = linker_harness(None);
    let key = write_claims(&harness, Provider::GitHub, &identity("gh-x", "c@example.com")).await;

    let outcome = harness
        .linker
        .authenticate(
            Provider::GitHub,
            &key.nonce,
            &RequestContext::default(),
            Some("no-such-code"),
        )
        .await
        .unwrap();

    let AuthenticateOutcome::Session(session) = outcome else {
        panic!("expected a full session");
    };
    assert!(session.user.referrer_id.is_none());
}

#[tokio::test]
async fn test_login_notification_reaches_the_configured_chat() {
    let harness = linker_harness(Some(42));
    let user = sso_user("watched@example.com", Provider::Google, "g-w");
    harness.users.create(&user).await.unwrap();

    let key = write_claims(&harness, Provider::Google, &identity("g-w", "watched@example.com")).await;
    harness
        .linker
        .authenticate(Provider::Google, &key.nonce, &RequestContext::default(), None)
        .await
        .unwrap();

    let messages = harness.notifier.received();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, 42);
    assert!(messages[0].1.contains("watched@example.com"));
}

#[tokio::test]
async fn test_linking_a_taken_identity_fails_and_leaves_target_unchanged() {
    let harness = linker_harness(None);
    let owner = sso_user("owner@example.com", Provider::Google, "g-shared");
    harness.users.create(&owner).await.unwrap();
    let target = sso_user("target@example.com", Provider::GitHub, "gh-t");
    harness.users.create(&target).await.unwrap();

    let key = write_claims(&harness, Provider::Google, &identity("g-shared", "owner@example.com")).await;
    let err = harness
        .linker
        .link(target.id, Provider::Google, &key.nonce)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceConflict);

    let unchanged = harness.users.find_by_id(target.id).await.unwrap().unwrap();
    assert!(unchanged.google_id.is_none());
}

#[tokio::test]
async fn test_linking_a_fresh_identity_attaches_it() {
    let harness = linker_harness(None);
    let user = sso_user("linkme@example.com", Provider::GitHub, "gh-l");
    harness.users.create(&user).await.unwrap();

    let key = write_claims(&harness, Provider::Google, &identity("g-fresh", "linkme@example.com")).await;
    let updated = harness
        .linker
        .link(user.id, Provider::Google, &key.nonce)
        .await
        .unwrap();
    assert_eq!(updated.google_id.as_deref(), Some("g-fresh"));
    assert_eq!(updated.github_id.as_deref(), Some("gh-l"));
}

#[tokio::test]
async fn test_unlink_refuses_the_origin_registration_method() {
    let harness = linker_harness(None);
    let user = sso_user("origin@example.com", Provider::GitHub, "gh-o");
    harness.users.create(&user).await.unwrap();

    let err = harness
        .linker
        .unlink(user.id, Provider::GitHub)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceConflict);

    let unchanged = harness.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(unchanged.github_id.as_deref(), Some("gh-o"));
}

#[tokio::test]
async fn test_unlink_clears_a_secondary_identity() {
    let harness = linker_harness(None);
    let mut user = sso_user("multi@example.com", Provider::GitHub, "gh-m");
    user.google_id = Some("g-m".into());
    harness.users.create(&user).await.unwrap();

    let updated = harness.linker.unlink(user.id, Provider::Google).await.unwrap();
    assert!(updated.google_id.is_none());
    assert_eq!(updated.github_id.as_deref(), Some("gh-m"));
}
